use camino::Utf8PathBuf;
use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    extract_skins, reset_config, scan_skins, set_converter, show_config, ExtractSkinsArgs,
    ScanSkinsArgs, StrategyArg,
};
use miette::Result;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Turn every skin of every champion folder into a standalone skin0 mod
    Extract(ExtractSkinsArgs),
    /// List what an extraction would process, without changing anything
    Scan {
        /// Folder containing the extracted champion folders
        root: Option<Utf8PathBuf>,

        /// How skin files are numbered
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,
    },
    /// Show or change the configuration stored next to the executable
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Print the current configuration
    Show,
    /// Set the path to the ritobin_cli executable
    SetConverter {
        /// Path to ritobin_cli
        path: String,
    },
    /// Reset the configuration to defaults
    Reset,
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn init_logging() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "skin_extract=info,ltk_skin_extractor=info".into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let args = parse_args();

    match args.command {
        Commands::Extract(args) => extract_skins(args),
        Commands::Scan { root, strategy } => scan_skins(ScanSkinsArgs { root, strategy }),
        Commands::Config { command } => match command {
            ConfigCommands::Show => show_config(),
            ConfigCommands::SetConverter { path } => set_converter(path),
            ConfigCommands::Reset => reset_config(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn parse_extract_flags() {
        let args = Args::try_parse_from([
            "skin-extract",
            "extract",
            "champs",
            "--workers",
            "4",
            "--scheme",
            "name",
            "--strategy",
            "sequential",
            "--keep-aliases",
            "--package",
            "--author",
            "Someone",
        ])
        .unwrap();

        match args.command {
            Commands::Extract(extract) => {
                assert_eq!(extract.root.as_deref(), Some(camino::Utf8Path::new("champs")));
                assert_eq!(extract.workers, Some(4));
                assert_eq!(extract.scheme, Some(commands::SchemeArg::Name));
                assert_eq!(extract.strategy, Some(StrategyArg::Sequential));
                assert!(extract.keep_aliases);
                assert!(!extract.keep_text);
                assert!(extract.package);
                assert_eq!(extract.author.as_deref(), Some("Someone"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn author_requires_package() {
        assert!(Args::try_parse_from(["skin-extract", "extract", "--author", "Someone"]).is_err());
    }

    #[test]
    fn parse_config_set_converter() {
        let args =
            Args::try_parse_from(["skin-extract", "config", "set-converter", "ritobin_cli.exe"])
                .unwrap();
        assert!(matches!(
            args.command,
            Commands::Config {
                command: ConfigCommands::SetConverter { .. }
            }
        ));
    }
}
