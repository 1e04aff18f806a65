//! Skin display names keyed by skin number.
//!
//! Metadata documents are plain JSON arrays, one file per champion, as produced
//! from Data Dragon's champion data:
//!
//! ```json
//! [
//!   { "id": 103000, "num": 0, "name": "default" },
//!   { "id": 103001, "num": 1, "name": "Dynasty Ahri" }
//! ]
//! ```

use crate::error::Result;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Characters that are not allowed in folder names on Windows.
const INVALID_NAME_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// One entry of a metadata document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkinRecord {
    #[serde(default)]
    pub id: Option<u64>,
    pub num: u32,
    pub name: String,
}

/// Skin names of one champion, already sanitized for use as folder names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkinMetadata {
    names: BTreeMap<u32, String>,
}

impl SkinMetadata {
    pub fn from_records(records: impl IntoIterator<Item = SkinRecord>) -> Self {
        let names = records
            .into_iter()
            .filter_map(|record| {
                let name = sanitize_name(&record.name);
                (!name.is_empty()).then_some((record.num, name))
            })
            .collect();
        Self { names }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<SkinRecord> = serde_json::from_str(json.trim_start_matches('\u{feff}'))?;
        Ok(Self::from_records(records))
    }

    pub fn load(path: &Utf8Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_std_path())?;
        Self::from_json(&contents)
    }

    /// Name of the skin with the given number.
    pub fn name_for(&self, num: u32) -> Option<&str> {
        self.names.get(&num).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Locates metadata documents inside a directory.
#[derive(Debug, Clone)]
pub struct MetadataSource {
    dir: Utf8PathBuf,
    /// Champion folder name -> document key, for folders whose name differs from
    /// the metadata key.
    overrides: HashMap<String, String>,
}

impl MetadataSource {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            overrides: HashMap::new(),
        }
    }

    pub fn with_overrides(mut self, overrides: HashMap<String, String>) -> Self {
        self.overrides = overrides;
        self
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }

    /// Path of the document for `entity`, if one exists.
    ///
    /// Tries `<key>.json` first, then any `.json` file whose stem matches the key
    /// case-insensitively.
    pub fn document_for(&self, entity: &str) -> Option<Utf8PathBuf> {
        let key = self
            .overrides
            .get(entity)
            .map(String::as_str)
            .unwrap_or(entity);

        let exact = self.dir.join(format!("{}.json", key));
        if exact.as_std_path().is_file() {
            return Some(exact);
        }

        let entries = std::fs::read_dir(self.dir.as_std_path()).ok()?;
        entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.path()).ok())
            .find(|path| {
                path.extension() == Some("json")
                    && path
                        .file_stem()
                        .is_some_and(|stem| stem.eq_ignore_ascii_case(key))
            })
    }

    /// Load the metadata for `entity`. Returns `Ok(None)` when no document exists.
    pub fn load(&self, entity: &str) -> Result<Option<SkinMetadata>> {
        match self.document_for(entity) {
            Some(path) => SkinMetadata::load(&path).map(Some),
            None => Ok(None),
        }
    }
}

/// Make a skin name usable as a single folder name.
///
/// Strips characters Windows rejects and collapses runs of whitespace. Names
/// made only of dots (`.`, `..`) would escape the output folder and become
/// empty.
pub fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !INVALID_NAME_CHARS.contains(c) && !c.is_control())
        .collect();
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.chars().all(|c| c == '.') {
        return String::new();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const AHRI_JSON: &str = r#"[
        { "id": 103000, "num": 0, "name": "default" },
        { "id": 103001, "num": 1, "name": "Dynasty Ahri" },
        { "num": 5, "name": "K/DA  Ahri: Prestige?" }
    ]"#;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("K/DA  Ahri: Prestige?"), "KDA Ahri Prestige");
        assert_eq!(sanitize_name("  Arcade Ahri "), "Arcade Ahri");
        assert_eq!(sanitize_name("???"), "");
    }

    #[test]
    fn test_sanitize_rejects_dot_names() {
        assert_eq!(sanitize_name(".."), "");
        assert_eq!(sanitize_name(" . "), "");
        assert_eq!(sanitize_name("../.."), "");
        assert_eq!(sanitize_name("..?"), "");
        assert_eq!(sanitize_name("Ahri..."), "Ahri...");

        let metadata = SkinMetadata::from_json(
            r#"[{"num": 1, "name": ".."}, {"num": 2, "name": "Arcade Ahri"}]"#,
        )
        .unwrap();
        assert_eq!(metadata.name_for(1), None);
        assert_eq!(metadata.name_for(2), Some("Arcade Ahri"));
    }

    #[test]
    fn test_from_json() {
        let metadata = SkinMetadata::from_json(AHRI_JSON).unwrap();
        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata.name_for(1), Some("Dynasty Ahri"));
        assert_eq!(metadata.name_for(5), Some("KDA Ahri Prestige"));
        assert_eq!(metadata.name_for(2), None);
    }

    #[test]
    fn test_from_json_with_bom() {
        let json = format!("\u{feff}{}", AHRI_JSON);
        assert!(SkinMetadata::from_json(&json).is_ok());
    }

    #[test]
    fn test_source_lookup() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        fs::write(root.join("Ahri.json"), AHRI_JSON).unwrap();
        fs::write(root.join("MonkeyKing.json"), r#"[{"num": 0, "name": "default"}]"#).unwrap();

        let mut overrides = HashMap::new();
        overrides.insert("wukong".to_string(), "MonkeyKing".to_string());
        let source = MetadataSource::new(root.clone()).with_overrides(overrides);

        assert_eq!(source.document_for("Ahri"), Some(root.join("Ahri.json")));
        assert_eq!(source.document_for("ahri"), Some(root.join("Ahri.json")));
        assert_eq!(
            source.document_for("wukong"),
            Some(root.join("MonkeyKing.json"))
        );
        assert!(source.load("Annie").unwrap().is_none());
        assert_eq!(
            source.load("Ahri").unwrap().unwrap().name_for(1),
            Some("Dynasty Ahri")
        );
    }
}
