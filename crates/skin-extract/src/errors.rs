use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Champions folder not found: {path}")]
    #[diagnostic(
        code(extract::root_not_found),
        help("Put the extracted champion folders (e.g. Ahri/skins/skin1.bin) in '{path}', or pass another folder as ROOT")
    )]
    RootNotFound { path: Utf8PathBuf },

    #[error("Converter executable not found{}", display_path(.path))]
    #[diagnostic(
        code(config::converter_not_found),
        help("Point to ritobin_cli with 'skin-extract config set-converter <PATH>' or pass --converter <PATH>")
    )]
    ConverterNotFound { path: Option<Utf8PathBuf> },

    #[error("Configuration file error: {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("Check config.toml for syntax errors, or run 'skin-extract config reset'")
    )]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{failed} of {total} skins failed to extract")]
    #[diagnostic(
        code(extract::items_failed),
        help("Run with RUST_LOG=ltk_skin_extractor=debug for details on each failed skin")
    )]
    ItemsFailed { failed: usize, total: usize },

    #[error("Extraction failed")]
    #[diagnostic(code(extract::failed))]
    Extraction {
        #[source]
        source: ltk_skin_extractor::Error,
    },

    #[error("IO operation failed")]
    #[diagnostic(code(io::operation_failed))]
    IoError {
        #[from]
        source: std::io::Error,
    },
}

fn display_path(path: &Option<Utf8PathBuf>) -> String {
    match path {
        Some(path) => format!(": {}", path),
        None => String::new(),
    }
}

impl CliError {
    pub fn converter_not_found(path: Option<Utf8PathBuf>) -> Self {
        Self::ConverterNotFound { path }
    }

    pub fn config_parse_error(path: Utf8PathBuf, source: toml::de::Error) -> Self {
        Self::ConfigParseError { path, source }
    }
}

impl From<ltk_skin_extractor::Error> for CliError {
    fn from(error: ltk_skin_extractor::Error) -> Self {
        match error {
            ltk_skin_extractor::Error::RootNotFound(path) => Self::RootNotFound { path },
            ltk_skin_extractor::Error::ConverterNotFound(path) => Self::ConverterNotFound {
                path: Some(path),
            },
            source => Self::Extraction { source },
        }
    }
}
