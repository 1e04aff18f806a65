//! Application configuration management utilities.

use crate::errors::CliError;
use camino::{Utf8Path, Utf8PathBuf};
use ltk_skin_extractor::layout::DEFAULT_OUTPUT_DIR_NAME;
use ltk_skin_extractor::{AliasTable, DiscoveryStrategy, LayoutScheme};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io;

/// Application-wide configuration stored in config.toml.
///
/// Every field is optional in the file; missing fields take their defaults.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Path to the ritobin_cli executable.
    pub converter_path: Option<Utf8PathBuf>,
    /// Arguments passed to the converter before the file path.
    pub converter_args: Vec<String>,
    /// Folder with `<Champion>.json` skin name documents.
    pub metadata_dir: Option<Utf8PathBuf>,
    /// Worker threads; all hardware threads when unset.
    pub workers: Option<usize>,
    pub timeout_secs: u64,
    pub scheme: LayoutScheme,
    pub strategy: DiscoveryStrategy,
    pub output_dir_name: String,
    pub keep_text: bool,
    pub remove_aliases: bool,
    /// Pack each extracted skin into a `.fantome` archive.
    pub package: bool,
    /// Author written into packaged `.fantome` archives.
    pub package_author: Option<String>,
    /// Champion folder -> extra folder prefixes merged into it, on top of the
    /// built-in exceptions.
    pub aliases: AliasTable,
    /// Champion folder -> metadata document name, where they differ.
    pub metadata_names: BTreeMap<String, String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            converter_path: None,
            converter_args: Vec::new(),
            metadata_dir: None,
            workers: None,
            timeout_secs: ltk_skin_extractor::codec::DEFAULT_TIMEOUT.as_secs(),
            scheme: LayoutScheme::default(),
            strategy: DiscoveryStrategy::default(),
            output_dir_name: DEFAULT_OUTPUT_DIR_NAME.to_string(),
            keep_text: false,
            remove_aliases: true,
            package: false,
            package_author: None,
            aliases: AliasTable::new(),
            metadata_names: BTreeMap::new(),
        }
    }
}

impl AppConfig {
    /// Built-in alias exceptions extended with the `[aliases]` table.
    pub fn alias_table(&self) -> AliasTable {
        let mut table = AliasTable::with_defaults();
        table.extend(self.aliases.clone());
        table
    }
}

/// Returns the directory where the current executable resides.
pub fn install_dir() -> Option<Utf8PathBuf> {
    let exe = env::current_exe().ok()?;
    let parent = exe.parent()?;
    Utf8PathBuf::from_path_buf(parent.to_path_buf()).ok()
}

/// Returns the default configuration file path (config.toml next to the executable).
pub fn default_config_path() -> Option<Utf8PathBuf> {
    install_dir().map(|dir| dir.join("config.toml"))
}

/// Loads the application configuration from config.toml.
///
/// A missing file yields the defaults; a malformed one is an error.
pub fn load_config() -> Result<AppConfig, CliError> {
    match default_config_path() {
        Some(path) => load_config_from(&path),
        None => Ok(AppConfig::default()),
    }
}

pub fn load_config_from(path: &Utf8Path) -> Result<AppConfig, CliError> {
    if !path.as_std_path().exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    toml::from_str(&content).map_err(|e| CliError::config_parse_error(path.to_path_buf(), e))
}

/// Saves the application configuration to config.toml.
pub fn save_config(cfg: &AppConfig) -> io::Result<()> {
    match default_config_path() {
        Some(path) => save_config_to(&path, cfg),
        None => Err(io::Error::new(
            io::ErrorKind::NotFound,
            "Could not determine config path",
        )),
    }
}

pub fn save_config_to(path: &Utf8Path, cfg: &AppConfig) -> io::Result<()> {
    let content = toml::to_string_pretty(cfg).map_err(io::Error::other)?;
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap();
        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert!(cfg.remove_aliases);
        assert_eq!(cfg.output_dir_name, "skins_extracted");
        assert!(cfg.aliases.is_empty());
        assert_eq!(
            cfg.alias_table().match_len("heimerdinger", "heimertyellow"),
            Some(7)
        );
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap();
        fs::write(
            &path,
            r#"
converter_path = "tools/ritobin_cli.exe"
workers = 8
scheme = "nameQualified"

[aliases]
Nunu = ["Willump"]

[metadata_names]
Wukong = "MonkeyKing"
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.converter_path.as_deref(), Some(Utf8Path::new("tools/ritobin_cli.exe")));
        assert_eq!(cfg.workers, Some(8));
        assert_eq!(cfg.scheme, LayoutScheme::NameQualified);
        assert_eq!(cfg.strategy, DiscoveryStrategy::ByDeclaredIndex);
        assert_eq!(cfg.timeout_secs, 120);
        assert_eq!(cfg.aliases.match_len("Nunu", "WillumpBot"), Some(7));
        assert!(!cfg.package);
        assert_eq!(cfg.metadata_names["Wukong"], "MonkeyKing");
    }

    #[test]
    fn user_aliases_extend_builtin_ones() {
        let cfg: AppConfig = toml::from_str("[aliases]\nNunu = [\"Willump\"]").unwrap();
        let table = cfg.alias_table();
        assert_eq!(table.match_len("Nunu", "WillumpBot"), Some(7));
        assert_eq!(table.match_len("heimerdinger", "heimertyellow"), Some(7));

        let cfg: AppConfig =
            toml::from_str("[aliases]\nheimerdinger = [\"heimert\", \"heimerbot\"]").unwrap();
        assert_eq!(
            cfg.alias_table().prefixes_for("heimerdinger").count(),
            3
        );
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap();
        fs::write(&path, "workers = \"many\"").unwrap();
        assert!(matches!(
            load_config_from(&path),
            Err(CliError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn save_and_reload() {
        let dir = tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("config.toml")).unwrap();
        let cfg = AppConfig {
            converter_path: Some("C:/tools/ritobin_cli.exe".into()),
            converter_args: vec!["--keep-hashes".to_string()],
            keep_text: true,
            ..Default::default()
        };
        save_config_to(&path, &cfg).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }
}
