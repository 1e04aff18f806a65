use crate::commands::extract::{StrategyArg, DEFAULT_ROOT};
use crate::errors::CliError;
use crate::println_pad;
use crate::utils::config::load_config;
use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use ltk_skin_extractor::resolver::{discover, plan_batch, Discovery};
use ltk_skin_extractor::{AliasTable, DiscoveryStrategy, EntityPlan, Origin, SkinFileMatcher};
use miette::Result;

pub struct ScanSkinsArgs {
    pub root: Option<Utf8PathBuf>,
    pub strategy: Option<StrategyArg>,
}

/// What an extraction would pick up for one champion.
pub struct ScannedEntity {
    pub plan: EntityPlan,
    /// Primary folder first, then each related folder.
    pub scopes: Vec<Discovery>,
}

impl ScannedEntity {
    pub fn valid_count(&self) -> usize {
        self.scopes.iter().map(|d| d.items.len()).sum()
    }

    pub fn invalid_count(&self) -> usize {
        self.scopes.iter().map(Discovery::invalid_count).sum()
    }
}

pub fn scan_root(
    root: &Utf8Path,
    aliases: &AliasTable,
    strategy: DiscoveryStrategy,
) -> ltk_skin_extractor::Result<Vec<ScannedEntity>> {
    let matcher = SkinFileMatcher::new();
    let plans = plan_batch(root, aliases)?;

    Ok(plans
        .into_iter()
        .map(|plan| {
            let mut scopes = vec![discover(
                &matcher,
                &plan.dir,
                &plan.name,
                Origin::Primary,
                strategy,
            )];
            scopes.extend(
                plan.aliases
                    .iter()
                    .map(|dir| discover(&matcher, dir, &plan.name, Origin::Alias, strategy)),
            );
            ScannedEntity { plan, scopes }
        })
        .collect())
}

pub fn scan_skins(args: ScanSkinsArgs) -> Result<()> {
    let cfg = load_config()?;
    let root = args.root.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_ROOT));
    let strategy = args.strategy.map(Into::into).unwrap_or(cfg.strategy);

    let entities = scan_root(&root, &cfg.alias_table(), strategy).map_err(CliError::from)?;

    println_pad!(
        "{} {}",
        "🔎 Scanning:".bright_blue().bold(),
        root.as_str().bright_cyan().bold()
    );
    println!();

    for entity in &entities {
        println_pad!(
            "{} {} {} {}",
            "•".bright_cyan(),
            entity.plan.name.bright_cyan().bold(),
            format!("{} valid,", entity.valid_count()).bright_white(),
            format!("{} invalid", entity.invalid_count()).dimmed()
        );
        for alias in &entity.plan.aliases {
            println_pad!(
                "    {} {}",
                "merges:".bright_magenta(),
                alias.file_name().unwrap_or(alias.as_str())
            );
        }

        for scope in &entity.scopes {
            for (index, items) in scope.variant_groups() {
                let files: Vec<String> = items
                    .iter()
                    .map(|item| format!("{}/{}", item.character_name, item.file_name()))
                    .collect();
                println_pad!(
                    "    {} {}",
                    format!("{:>3}:", index).bright_white(),
                    files.join(", ").dimmed()
                );
            }
            for warning in &scope.warnings {
                println_pad!("    {} {}", "!".bright_yellow(), warning.to_string().yellow());
            }
        }
    }

    let valid: usize = entities.iter().map(ScannedEntity::valid_count).sum();
    println!();
    println_pad!(
        "{} {} champions, {} skin files",
        "✅ Scan complete:".bright_green().bold(),
        entities.len(),
        valid
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn touch(path: Utf8PathBuf) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"bin").unwrap();
    }

    #[test]
    fn scan_lists_entities_without_touching_files() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        touch(root.join("Ahri/skins/skin0.bin"));
        touch(root.join("Ahri/skins/skin5.bin"));
        touch(root.join("Ahri/skins/skin_old.bin"));
        touch(root.join("Ahrixyz/skins/skin0.bin"));
        touch(root.join("Annie/skins/skin1.bin"));

        let entities =
            scan_root(&root, &AliasTable::new(), DiscoveryStrategy::ByDeclaredIndex).unwrap();
        assert_eq!(entities.len(), 2);

        let ahri = &entities[0];
        assert_eq!(ahri.plan.name, "Ahri");
        assert_eq!(ahri.scopes.len(), 2);
        assert_eq!(ahri.valid_count(), 3);
        assert_eq!(ahri.invalid_count(), 1);
        assert_eq!(entities[1].valid_count(), 1);

        // Nothing was converted or removed
        assert!(root.join("Ahrixyz/skins/skin0.bin").as_std_path().is_file());
        assert!(!root.join("Ahri/skins_extracted").as_std_path().exists());
    }

    #[test]
    fn scan_missing_root() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().join("nope")).unwrap();
        let result = scan_root(&root, &AliasTable::new(), DiscoveryStrategy::ByDeclaredIndex);
        assert!(matches!(
            result.map_err(CliError::from),
            Err(CliError::RootNotFound { .. })
        ));
    }
}
