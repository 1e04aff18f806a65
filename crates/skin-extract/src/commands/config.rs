use crate::utils::config::{self, AppConfig};
use camino::Utf8PathBuf;
use colored::Colorize;
use miette::Result;

/// Print a config path entry with status indicator
fn print_path_config(name: &str, path: Option<&Utf8PathBuf>, validator: impl Fn(&Utf8PathBuf) -> bool) {
    match path {
        Some(p) => {
            let status = if validator(p) {
                "✓".bright_green()
            } else {
                "✗".bright_red()
            };
            println!("  {} {} {}", format!("{}:", name).bright_white(), p, status);
        }
        None => {
            println!(
                "  {} {}",
                format!("{}:", name).bright_white(),
                "(not set)".bright_yellow()
            );
        }
    }
}

fn print_value(name: &str, value: impl std::fmt::Display) {
    println!("  {} {}", format!("{}:", name).bright_white(), value);
}

pub fn show_config() -> Result<()> {
    let cfg = config::load_config()?;
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    println!();
    println!("  {} {}", "config_file:".bright_white(), config_path);

    print_path_config("converter_path", cfg.converter_path.as_ref(), |p| {
        p.as_std_path().is_file()
    });
    print_value("converter_args", format!("{:?}", cfg.converter_args));
    print_path_config("metadata_dir", cfg.metadata_dir.as_ref(), |p| {
        p.as_std_path().is_dir()
    });
    match cfg.workers {
        Some(workers) => print_value("workers", workers),
        None => print_value("workers", "(all threads)".dimmed()),
    }
    print_value("timeout_secs", cfg.timeout_secs);
    print_value("scheme", format!("{:?}", cfg.scheme));
    print_value("strategy", format!("{:?}", cfg.strategy));
    print_value("output_dir_name", &cfg.output_dir_name);
    print_value("keep_text", cfg.keep_text);
    print_value("remove_aliases", cfg.remove_aliases);
    print_value("package", cfg.package);
    if let Some(author) = &cfg.package_author {
        print_value("package_author", author);
    }

    let aliases = toml::to_string(&cfg.alias_table()).unwrap_or_default();
    if !aliases.trim().is_empty() {
        println!("  {}", "aliases:".bright_white());
        for line in aliases.lines() {
            println!("    {}", line.dimmed());
        }
    }
    for (entity, key) in &cfg.metadata_names {
        println!(
            "  {} {} -> {}",
            "metadata_name:".bright_white(),
            entity,
            key
        );
    }

    println!();
    Ok(())
}

pub fn set_converter(path: String) -> Result<()> {
    let path = Utf8PathBuf::from(&path);
    if !path.as_std_path().is_file() {
        eprintln!(
            "  {}",
            "The path must point to the ritobin_cli executable.".bright_yellow()
        );
        eprintln!(
            "  {}",
            "Example: C:\\tools\\ritobin\\ritobin_cli.exe".bright_yellow()
        );
        return Err(crate::errors::CliError::converter_not_found(Some(path)).into());
    }

    let mut cfg = config::load_config()?;
    cfg.converter_path = Some(path.clone());
    config::save_config(&cfg).map_err(|e| miette::miette!("Failed to save config: {}", e))?;

    println!(
        "{}",
        "✓ Converter path set successfully!".bright_green().bold()
    );
    println!();
    println!(
        "  {} {}",
        "Path:".bright_white().bold(),
        path.as_str().bright_green()
    );

    Ok(())
}

pub fn reset_config() -> Result<()> {
    let config_path = config::default_config_path()
        .map(|p| p.to_string())
        .unwrap_or_else(|| "Unknown".to_string());

    let default_cfg = AppConfig::default();
    config::save_config(&default_cfg)
        .map_err(|e| miette::miette!("Failed to reset config: {}", e))?;

    println!(
        "{}",
        "✓ Configuration reset to defaults".bright_green().bold()
    );
    println!();
    println!("  {} {}", "Config file:".bright_white().bold(), config_path);
    println!();
    println!(
        "  {}",
        "Run 'skin-extract config set-converter <path>' to point to ritobin_cli".bright_cyan()
    );

    Ok(())
}
