//! Skin file discovery and champion folder matching.
//!
//! Discovery turns a champion folder into an ordered list of [`WorkItem`]s, one
//! per `skin<N>.bin` found under its `skins/` directory. Related folders (for
//! example `Ahrixyz` next to `Ahri`) are assigned to their champion by
//! [`plan_batch`] and are discovered with the same rules, tagged as
//! [`Origin::Alias`].
//!
//! Nothing in this module fails a batch: unreadable directories yield empty
//! results and odd file names become [`Warning`]s.

use crate::error::{Error, Result, Warning};
use camino::{Utf8Path, Utf8PathBuf};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use walkdir::WalkDir;

/// Name of the folder inside a champion folder that holds the skin bins.
pub const SKINS_DIR_NAME: &str = "skins";

/// Subdirectories that never contain skin definitions and are not descended into.
const SKIPPED_DIR_NAMES: &[&str] = &["animations"];

/// Recognizes skin bin file names and extracts their declared index.
#[derive(Debug, Clone)]
pub struct SkinFileMatcher {
    pattern: Regex,
}

impl SkinFileMatcher {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"^skin(\d+)\.bin$").expect("skin file pattern is valid"),
        }
    }

    /// Whether a file looks like it was meant to be a skin bin (`skin*.bin`).
    ///
    /// Candidates that fail [`declared_index`](Self::declared_index) are
    /// reported as unrecognized instead of being silently skipped.
    pub fn is_candidate(&self, file_name: &str) -> bool {
        file_name.starts_with("skin") && file_name.ends_with(".bin")
    }

    /// Parse the digit run of `skin<digits>.bin` as a base-10 index.
    ///
    /// Returns `None` for names that do not match or whose index does not fit a `u32`.
    pub fn declared_index(&self, file_name: &str) -> Option<u32> {
        let captures = self.pattern.captures(file_name)?;
        captures.get(1)?.as_str().parse().ok()
    }
}

impl Default for SkinFileMatcher {
    fn default() -> Self {
        Self::new()
    }
}

/// How discovered files are assigned their logical index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiscoveryStrategy {
    /// The index in the file name is the logical index. Several files (from
    /// different folders) may share one index.
    #[default]
    ByDeclaredIndex,
    /// Files are sorted by name and numbered from zero. Used when skin names come
    /// from metadata keyed by position.
    SequentialSorted,
}

/// Where a work item was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Origin {
    Primary,
    Alias,
}

/// One skin bin to push through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Location of the bin at discovery time.
    pub source_path: Utf8PathBuf,
    /// Index parsed from the file name.
    pub declared_index: u32,
    /// Index the item is processed and relocated as.
    pub logical_index: u32,
    /// Champion that owns the output (the primary folder name).
    pub entity_name: String,
    /// Folder the item was discovered in. Equal to `entity_name` for primary items.
    pub character_name: String,
    pub origin: Origin,
}

impl WorkItem {
    pub fn file_name(&self) -> &str {
        self.source_path.file_name().unwrap_or("")
    }
}

/// Result of discovering one folder.
#[derive(Debug, Default)]
pub struct Discovery {
    /// Valid items ordered by `(logical_index, source_path)`.
    pub items: Vec<WorkItem>,
    pub warnings: Vec<Warning>,
}

impl Discovery {
    /// Number of candidate files rejected because of their name.
    pub fn invalid_count(&self) -> usize {
        self.warnings
            .iter()
            .filter(|w| matches!(w, Warning::UnrecognizedFileName { .. }))
            .count()
    }

    /// Items grouped by logical index.
    pub fn variant_groups(&self) -> BTreeMap<u32, Vec<&WorkItem>> {
        let mut groups: BTreeMap<u32, Vec<&WorkItem>> = BTreeMap::new();
        for item in &self.items {
            groups.entry(item.logical_index).or_default().push(item);
        }
        groups
    }
}

/// Discover the skin bins of one folder (a champion folder or one of its aliases).
///
/// Looks recursively under `<scope_dir>/skins`, skipping `animations` folders.
pub fn discover(
    matcher: &SkinFileMatcher,
    scope_dir: &Utf8Path,
    entity_name: &str,
    origin: Origin,
    strategy: DiscoveryStrategy,
) -> Discovery {
    let mut discovery = Discovery::default();
    let character_name = scope_dir.file_name().unwrap_or(entity_name).to_string();

    let skins_dir = scope_dir.join(SKINS_DIR_NAME);
    if !skins_dir.as_std_path().is_dir() {
        tracing::debug!("No skins folder in {}", scope_dir);
        return discovery;
    }

    let mut valid: Vec<(Utf8PathBuf, u32)> = Vec::new();
    let walker = WalkDir::new(skins_dir.as_std_path())
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| SKIPPED_DIR_NAMES.contains(&name)))
        });

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry under {}: {}", skins_dir, e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(entry.into_path()) else {
            continue;
        };
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if !matcher.is_candidate(file_name) {
            continue;
        }

        match matcher.declared_index(file_name) {
            Some(index) => valid.push((path, index)),
            None => {
                tracing::warn!("Invalid skin file name format: {}", path);
                discovery
                    .warnings
                    .push(Warning::UnrecognizedFileName { path });
            }
        }
    }

    if strategy == DiscoveryStrategy::SequentialSorted {
        valid.sort_by(|(a, _), (b, _)| a.file_name().cmp(&b.file_name()).then_with(|| a.cmp(b)));
    }

    for (position, (source_path, declared_index)) in valid.into_iter().enumerate() {
        let logical_index = match strategy {
            DiscoveryStrategy::ByDeclaredIndex => declared_index,
            DiscoveryStrategy::SequentialSorted => position as u32,
        };

        if declared_index != logical_index {
            tracing::warn!(
                "Mismatch in skin numbering for {}: file suggests {}, processing as {}",
                source_path,
                declared_index,
                logical_index
            );
            discovery.warnings.push(Warning::NumberingMismatch {
                path: source_path.clone(),
                declared: declared_index,
                logical: logical_index,
            });
        }

        discovery.items.push(WorkItem {
            source_path,
            declared_index,
            logical_index,
            entity_name: entity_name.to_string(),
            character_name: character_name.clone(),
            origin,
        });
    }

    discovery.items.sort_by(|a, b| {
        a.logical_index
            .cmp(&b.logical_index)
            .then_with(|| a.source_path.cmp(&b.source_path))
    });

    discovery
}

/// Extra folder-name prefixes that belong to a champion, for folders that do
/// not start with the champion's own name.
///
/// Keys and prefixes are matched case-sensitively.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AliasTable {
    entries: BTreeMap<String, Vec<String>>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Known naming exceptions shipped with the tool.
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        table.insert("heimerdinger", ["heimert"]);
        table
    }

    pub fn insert<I, S>(&mut self, entity: impl Into<String>, prefixes: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let known = self.entries.entry(entity.into()).or_default();
        for prefix in prefixes.into_iter().map(Into::into) {
            if !known.contains(&prefix) {
                known.push(prefix);
            }
        }
    }

    /// Merge another table into this one.
    pub fn extend(&mut self, other: AliasTable) {
        for (entity, prefixes) in other.entries {
            self.insert(entity, prefixes);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All prefixes that identify folders of `entity`, starting with its own name.
    pub fn prefixes_for<'a>(&'a self, entity: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        std::iter::once(entity).chain(
            self.entries
                .get(entity)
                .into_iter()
                .flatten()
                .map(String::as_str),
        )
    }

    /// Length of the longest prefix of `entity` that `dir_name` starts with, if
    /// `dir_name` is a related folder of `entity`. A folder is never related to itself.
    pub fn match_len(&self, entity: &str, dir_name: &str) -> Option<usize> {
        if entity == dir_name {
            return None;
        }
        self.prefixes_for(entity)
            .filter(|prefix| !prefix.is_empty() && dir_name.starts_with(prefix))
            .map(str::len)
            .max()
    }
}

/// A champion folder and the related folders merged into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityPlan {
    pub name: String,
    pub dir: Utf8PathBuf,
    pub aliases: Vec<Utf8PathBuf>,
}

/// Decide which folders under `root` are champions and which are aliases.
///
/// A folder claimed by another folder's prefixes is merged into the claiming
/// champion with the longest matching prefix instead of being processed on its
/// own. Fails only when `root` is not a directory.
pub fn plan_batch(root: &Utf8Path, aliases: &AliasTable) -> Result<Vec<EntityPlan>> {
    if !root.as_std_path().is_dir() {
        return Err(Error::RootNotFound(root.to_path_buf()));
    }

    let mut dirs = list_dirs(root)?;
    dirs.sort();
    let names: Vec<&str> = dirs.iter().filter_map(|d| d.file_name()).collect();

    let claimants = |name: &str| -> Vec<(usize, usize)> {
        names
            .iter()
            .enumerate()
            .filter_map(|(idx, owner)| aliases.match_len(owner, name).map(|len| (idx, len)))
            .collect()
    };

    let is_entity: Vec<bool> = names.iter().map(|name| claimants(*name).is_empty()).collect();

    let mut plans: Vec<Option<EntityPlan>> = dirs
        .iter()
        .zip(&names)
        .map(|(dir, name)| {
            Some(EntityPlan {
                name: name.to_string(),
                dir: dir.clone(),
                aliases: Vec::new(),
            })
        })
        .collect();

    for (idx, name) in names.iter().enumerate() {
        if is_entity[idx] {
            continue;
        }
        // Longest prefix wins; ties go to the first folder in sorted order.
        let owner = claimants(*name)
            .into_iter()
            .filter(|(owner, _)| is_entity[*owner])
            .max_by(|(a_idx, a_len), (b_idx, b_len)| a_len.cmp(b_len).then(b_idx.cmp(a_idx)));

        if let Some((owner, _)) = owner {
            if let Some(alias) = plans[idx].take() {
                if let Some(plan) = plans[owner].as_mut() {
                    plan.aliases.push(alias.dir);
                }
            }
        }
    }

    Ok(plans.into_iter().flatten().collect())
}

fn list_dirs(parent: &Utf8Path) -> std::io::Result<Vec<Utf8PathBuf>> {
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(parent.as_std_path())? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        if let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) {
            dirs.push(path);
        }
    }
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn utf8_root(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap()
    }

    fn touch(path: &Utf8Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"bin").unwrap();
    }

    #[test]
    fn test_declared_index() {
        let matcher = SkinFileMatcher::new();
        assert_eq!(matcher.declared_index("skin0.bin"), Some(0));
        assert_eq!(matcher.declared_index("skin15.bin"), Some(15));
        assert_eq!(matcher.declared_index("skin007.bin"), Some(7));
        assert_eq!(matcher.declared_index("skin.bin"), None);
        assert_eq!(matcher.declared_index("skin1a.bin"), None);
        assert_eq!(matcher.declared_index("skin_base.bin"), None);
        assert_eq!(matcher.declared_index("skin99999999999.bin"), None);
        assert_eq!(matcher.declared_index("Skin1.bin"), None);
    }

    #[test]
    fn test_candidates() {
        let matcher = SkinFileMatcher::new();
        assert!(matcher.is_candidate("skin1.bin"));
        assert!(matcher.is_candidate("skin_base.bin"));
        assert!(!matcher.is_candidate("skin1.py"));
        assert!(!matcher.is_candidate("ahri.bin"));
    }

    #[test]
    fn test_discover_by_declared_index() {
        let dir = tempdir().unwrap();
        let ahri = utf8_root(&dir).join("Ahri");
        touch(&ahri.join("skins/skin5.bin"));
        touch(&ahri.join("skins/skin0.bin"));
        touch(&ahri.join("skins/nested/skin1.bin"));
        touch(&ahri.join("skins/skin_base.bin"));
        touch(&ahri.join("skins/skin2a.bin"));
        touch(&ahri.join("skins/readme.txt"));
        touch(&ahri.join("skins/animations/skin3.bin"));

        let discovery = discover(
            &SkinFileMatcher::new(),
            &ahri,
            "Ahri",
            Origin::Primary,
            DiscoveryStrategy::ByDeclaredIndex,
        );

        let indices: Vec<u32> = discovery.items.iter().map(|i| i.logical_index).collect();
        assert_eq!(indices, vec![0, 1, 5]);
        assert!(discovery
            .items
            .iter()
            .all(|i| i.declared_index == i.logical_index));
        assert!(discovery.items.iter().all(|i| i.character_name == "Ahri"));

        // One warning per rejected candidate, nothing for unrelated files
        assert_eq!(discovery.warnings.len(), 2);
        assert_eq!(discovery.invalid_count(), 2);
    }

    #[test]
    fn test_discover_sequential_sorted() {
        let dir = tempdir().unwrap();
        let ahri = utf8_root(&dir).join("Ahri");
        touch(&ahri.join("skins/skin0.bin"));
        touch(&ahri.join("skins/skin10.bin"));
        touch(&ahri.join("skins/skin2.bin"));

        let discovery = discover(
            &SkinFileMatcher::new(),
            &ahri,
            "Ahri",
            Origin::Primary,
            DiscoveryStrategy::SequentialSorted,
        );

        let pairs: Vec<(u32, u32)> = discovery
            .items
            .iter()
            .map(|i| (i.logical_index, i.declared_index))
            .collect();
        // Lexicographic order: skin0, skin10, skin2
        assert_eq!(pairs, vec![(0, 0), (1, 10), (2, 2)]);

        let mismatches: Vec<_> = discovery
            .warnings
            .iter()
            .filter(|w| matches!(w, Warning::NumberingMismatch { .. }))
            .collect();
        assert_eq!(mismatches.len(), 1);
    }

    #[test]
    fn test_discover_missing_skins_dir() {
        let dir = tempdir().unwrap();
        let ahri = utf8_root(&dir).join("Ahri");
        fs::create_dir_all(&ahri).unwrap();

        let discovery = discover(
            &SkinFileMatcher::new(),
            &ahri,
            "Ahri",
            Origin::Primary,
            DiscoveryStrategy::ByDeclaredIndex,
        );
        assert!(discovery.items.is_empty());
        assert!(discovery.warnings.is_empty());
    }

    #[test]
    fn test_alias_table_match() {
        let table = AliasTable::with_defaults();
        assert_eq!(table.match_len("Ahri", "Ahrixyz"), Some(4));
        assert_eq!(table.match_len("Ahri", "Ahri"), None);
        assert_eq!(table.match_len("Ahri", "Annie"), None);
        assert_eq!(table.match_len("heimerdinger", "heimertyellow"), Some(7));
    }

    #[test]
    fn test_alias_table_extend_keeps_defaults() {
        let mut table = AliasTable::with_defaults();
        let mut extra = AliasTable::new();
        extra.insert("Nunu", ["Willump"]);
        extra.insert("heimerdinger", ["heimert", "heimerbot"]);
        table.extend(extra);

        assert_eq!(table.match_len("Nunu", "WillumpBot"), Some(7));
        assert_eq!(table.match_len("heimerdinger", "heimertyellow"), Some(7));
        assert_eq!(
            table.prefixes_for("heimerdinger").collect::<Vec<_>>(),
            vec!["heimerdinger", "heimert", "heimerbot"]
        );
    }

    #[test]
    fn test_plan_batch_merges_aliases() {
        let dir = tempdir().unwrap();
        let root = utf8_root(&dir);
        for name in ["Ahri", "Ahrixyz", "Annie", "Nunu", "NunuW", "NunuWillump"] {
            fs::create_dir_all(root.join(name)).unwrap();
        }

        let plans = plan_batch(&root, &AliasTable::new()).unwrap();
        let names: Vec<&str> = plans.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ahri", "Annie", "Nunu"]);

        assert_eq!(plans[0].aliases, vec![root.join("Ahrixyz")]);
        assert!(plans[1].aliases.is_empty());
        assert_eq!(
            plans[2].aliases,
            vec![root.join("NunuW"), root.join("NunuWillump")]
        );
    }

    #[test]
    fn test_plan_batch_missing_root() {
        let dir = tempdir().unwrap();
        let root = utf8_root(&dir).join("process_champions");
        assert!(matches!(
            plan_batch(&root, &AliasTable::new()),
            Err(Error::RootNotFound(_))
        ));
    }
}
