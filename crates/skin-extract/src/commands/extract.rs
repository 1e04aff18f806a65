use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::{load_config, AppConfig};
use crate::utils::print_ansi_boxed_lines;
use camino::Utf8PathBuf;
use clap::ValueEnum;
use colored::Colorize;
use ltk_skin_extractor::pool::available_parallelism;
use ltk_skin_extractor::{
    BatchReport, DiscoveryStrategy, EntityReport, ExtractOptions, ItemOutcome, LayoutScheme,
    MetadataSource, PackageOptions, RitobinCodec, SkinExtractor,
};
use miette::Result;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ROOT: &str = "process_champions";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchemeArg {
    /// <index>/<Champion>_<index>/...
    Index,
    /// <skin name>/<index>/<Champion>_<index>/..., needs skin metadata
    Name,
}

impl From<SchemeArg> for LayoutScheme {
    fn from(value: SchemeArg) -> Self {
        match value {
            SchemeArg::Index => LayoutScheme::IndexQualified,
            SchemeArg::Name => LayoutScheme::NameQualified,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum StrategyArg {
    /// Use the number in the file name
    Declared,
    /// Number files 0.. in sorted name order
    Sequential,
}

impl From<StrategyArg> for DiscoveryStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Declared => DiscoveryStrategy::ByDeclaredIndex,
            StrategyArg::Sequential => DiscoveryStrategy::SequentialSorted,
        }
    }
}

#[derive(clap::Args, Debug, Clone, Default)]
pub struct ExtractSkinsArgs {
    /// Folder containing the extracted champion folders
    pub root: Option<Utf8PathBuf>,

    /// Path to the ritobin_cli executable
    #[arg(short, long)]
    pub converter: Option<Utf8PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Output folder layout
    #[arg(long, value_enum)]
    pub scheme: Option<SchemeArg>,

    /// How skin files are numbered
    #[arg(long, value_enum)]
    pub strategy: Option<StrategyArg>,

    /// Folder with <Champion>.json skin name documents
    #[arg(long)]
    pub metadata_dir: Option<Utf8PathBuf>,

    /// Name of the output folder created in each champion folder
    #[arg(long)]
    pub output_dir_name: Option<String>,

    /// Seconds a single conversion may take before it is killed
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Keep the intermediate .py text dumps
    #[arg(long)]
    pub keep_text: bool,

    /// Do not delete related folders (e.g. Ahrixyz) after merging them
    #[arg(long)]
    pub keep_aliases: bool,

    /// Also pack each extracted skin into a .fantome archive
    #[arg(long)]
    pub package: bool,

    /// Author written into packaged .fantome archives
    #[arg(long, requires = "package")]
    pub author: Option<String>,
}

/// Merge command line flags over the configuration file.
pub fn resolve_options(args: &ExtractSkinsArgs, cfg: &AppConfig) -> ExtractOptions {
    let workers = args
        .workers
        .or(cfg.workers)
        .unwrap_or_else(available_parallelism);

    let metadata = args
        .metadata_dir
        .clone()
        .or_else(|| cfg.metadata_dir.clone())
        .map(|dir| {
            let overrides: HashMap<String, String> = cfg
                .metadata_names
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            MetadataSource::new(dir).with_overrides(overrides)
        });

    let package = (args.package || cfg.package).then(|| {
        let mut package = PackageOptions::default();
        if let Some(author) = args.author.clone().or_else(|| cfg.package_author.clone()) {
            package.author = author;
        }
        package
    });

    ExtractOptions {
        strategy: args.strategy.map(Into::into).unwrap_or(cfg.strategy),
        scheme: args.scheme.map(Into::into).unwrap_or(cfg.scheme),
        aliases: cfg.alias_table(),
        workers: workers.max(1),
        output_dir_name: args
            .output_dir_name
            .clone()
            .unwrap_or_else(|| cfg.output_dir_name.clone()),
        keep_text: args.keep_text || cfg.keep_text,
        remove_aliases: !args.keep_aliases && cfg.remove_aliases,
        metadata,
        package,
    }
}

/// Build the converter from flags and configuration.
pub fn resolve_codec(args: &ExtractSkinsArgs, cfg: &AppConfig) -> Result<RitobinCodec, CliError> {
    let program = args
        .converter
        .clone()
        .or_else(|| cfg.converter_path.clone())
        .ok_or_else(|| CliError::converter_not_found(None))?;
    let timeout = Duration::from_secs(args.timeout_secs.unwrap_or(cfg.timeout_secs).max(1));

    Ok(RitobinCodec::new(program)?
        .with_args(cfg.converter_args.clone())
        .with_timeout(timeout))
}

pub fn extract_skins(args: ExtractSkinsArgs) -> Result<()> {
    let cfg = load_config()?;
    let root = args
        .root
        .clone()
        .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_ROOT));

    let codec = resolve_codec(&args, &cfg)?;
    let options = resolve_options(&args, &cfg);

    println_pad!(
        "{} {}",
        "🧩 Extracting skins from:".bright_blue().bold(),
        root.as_str().bright_cyan().bold()
    );
    println_pad!(
        "{} {} {}",
        "🔧 Converter:".bright_yellow(),
        codec.program().as_str().bright_white(),
        format!("({} workers)", options.workers).dimmed()
    );

    let extractor = SkinExtractor::new(Arc::new(codec), options);
    let report = extractor.run(&root).map_err(CliError::from)?;

    print_report(&report);

    let failed = report.failed_count();
    if failed > 0 {
        return Err(CliError::ItemsFailed {
            failed,
            total: failed + report.completed_count(),
        }
        .into());
    }
    Ok(())
}

fn print_entity(entity: &EntityReport) {
    let invalid = if entity.invalid_count > 0 {
        format!("{} invalid", entity.invalid_count).bright_red()
    } else {
        format!("{} invalid", entity.invalid_count).dimmed()
    };
    println_pad!(
        "{} {} {} {}",
        "•".bright_cyan(),
        entity.entity.bright_cyan().bold(),
        format!("{} valid,", entity.valid_count()).bright_white(),
        invalid
    );

    for report in &entity.items {
        if let ItemOutcome::Failed { stage, cause } = &report.outcome {
            println_pad!(
                "    {} {} {}",
                "✗".bright_red(),
                report.item.source_path.as_str().bright_white(),
                format!("({}: {})", stage, cause).bright_red()
            );
        }
    }
    for warning in entity.all_warnings() {
        println_pad!("    {} {}", "!".bright_yellow(), warning.to_string().yellow());
    }
    for dir in &entity.removed_aliases {
        println_pad!("    {} {}", "Deleted folder:".dimmed(), dir.as_str().dimmed());
    }
    for archive in &entity.packages {
        println_pad!("    {} {}", "📦".bright_magenta(), archive.as_str().bright_white());
    }
}

fn print_report(report: &BatchReport) {
    println!();
    for entity in &report.entities {
        print_entity(entity);
    }
    println!();

    let failed = report.failed_count();
    let failed_line = if failed > 0 {
        format!("{} {}", "Failed:".bright_red().bold(), failed)
    } else {
        format!("{} {}", "Failed:".bright_white(), failed)
    };
    print_ansi_boxed_lines(&[
        format!(
            "{} {}",
            "Champions:".bright_white(),
            report.entities.len()
        ),
        format!(
            "{} {}",
            "Completed:".bright_green().bold(),
            report.completed_count()
        ),
        failed_line,
        format!("{} {}", "Warnings:".bright_yellow(), report.warning_count()),
        format!(
            "{} {:.1}s",
            "Time:".bright_white(),
            report.elapsed.as_secs_f64()
        ),
    ]);

    if failed == 0 {
        println_pad!("{}", "✅ Extraction complete!".bright_green().bold());
    }
}
