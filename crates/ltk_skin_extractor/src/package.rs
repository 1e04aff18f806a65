//! Fantome packaging of extracted variant bundles.
//!
//! Each bundle folder (`<index>/<entity>_<index>`) is zipped into a sibling
//! `<entity>_<index>.fantome` archive that mod managers can install directly:
//!
//! ```text
//! Ahri_5.fantome
//!   META/info.json
//!   RAW/data/characters/Ahri/skins/skin0.bin
//! ```
//!
//! The bundle folder itself is left in place.

use crate::error::PackageError;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use tempfile::NamedTempFile;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const FANTOME_EXTENSION: &str = "fantome";

/// Archive folder loose game files are stored under.
const RAW_DIR: &str = "RAW";
const INFO_PATH: &str = "META/info.json";

/// Contents of `META/info.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct FantomeInfo {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Author")]
    pub author: String,
    #[serde(rename = "Version")]
    pub version: String,
    #[serde(rename = "Description")]
    pub description: String,
}

/// Fields shared by every archive of a run. The name comes from the skin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOptions {
    pub author: String,
    pub version: String,
    pub description: String,
}

impl Default for PackageOptions {
    fn default() -> Self {
        Self {
            author: "Unknown".to_string(),
            version: "1.0".to_string(),
            description: "Extracted with skin-extract".to_string(),
        }
    }
}

impl PackageOptions {
    pub fn info_for(&self, name: impl Into<String>) -> FantomeInfo {
        FantomeInfo {
            name: name.into(),
            author: self.author.clone(),
            version: self.version.clone(),
            description: self.description.clone(),
        }
    }
}

/// Where the archive of `bundle_dir` is written.
pub fn archive_path_for(bundle_dir: &Utf8Path) -> Utf8PathBuf {
    let name = bundle_dir.file_name().unwrap_or("bundle");
    let file_name = format!("{}.{}", name, FANTOME_EXTENSION);
    match bundle_dir.parent() {
        Some(parent) => parent.join(file_name),
        None => Utf8PathBuf::from(file_name),
    }
}

/// Zip `bundle_dir` into its `.fantome` archive, replacing an older one.
///
/// The archive is written to a temporary file first, so a failure never
/// leaves a truncated archive behind.
pub fn pack_bundle(bundle_dir: &Utf8Path, info: &FantomeInfo) -> Result<Utf8PathBuf, PackageError> {
    if !bundle_dir.as_std_path().is_dir() {
        return Err(PackageError::MissingBundle(bundle_dir.to_path_buf()));
    }

    let archive = archive_path_for(bundle_dir);
    let io_err = |source: std::io::Error| PackageError::Io {
        path: archive.clone(),
        source,
    };
    let zip_err = |source: zip::result::ZipError| PackageError::Zip {
        path: archive.clone(),
        source,
    };

    let dir = archive.parent().unwrap_or(Utf8Path::new("."));
    let temp = NamedTempFile::new_in(dir).map_err(io_err)?;
    let mut zip = ZipWriter::new(BufWriter::new(temp));
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut file_count = 0usize;
    for entry in WalkDir::new(bundle_dir.as_std_path()).sort_by_file_name() {
        let entry = entry.map_err(|e| io_err(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(bundle_dir.as_std_path())
            .map_err(|e| io_err(std::io::Error::other(e)))?;
        let parts: Vec<String> = relative
            .components()
            .map(|part| part.as_os_str().to_string_lossy().into_owned())
            .collect();

        zip.start_file(format!("{}/{}", RAW_DIR, parts.join("/")), options)
            .map_err(zip_err)?;
        let mut file = File::open(entry.path()).map_err(io_err)?;
        std::io::copy(&mut file, &mut zip).map_err(io_err)?;
        file_count += 1;
    }

    zip.start_file(INFO_PATH, options).map_err(zip_err)?;
    zip.write_all(serde_json::to_string_pretty(info)?.as_bytes())
        .map_err(io_err)?;

    let writer = zip.finish().map_err(zip_err)?;
    let temp = writer.into_inner().map_err(|e| io_err(e.into_error()))?;
    temp.as_file().sync_all().map_err(io_err)?;
    temp.persist(&archive).map_err(|e| io_err(e.error))?;

    tracing::debug!("Packed {} files into {}", file_count, archive);
    Ok(archive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Read;
    use tempfile::tempdir;

    fn read_entry(archive: &Utf8Path, name: &str) -> String {
        let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
        let mut entry = zip.by_name(name).unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        contents
    }

    #[test]
    fn test_archive_path() {
        assert_eq!(
            archive_path_for(Utf8Path::new("/out/5/Ahri_5")),
            Utf8PathBuf::from("/out/5/Ahri_5.fantome")
        );
        assert_eq!(
            archive_path_for(Utf8Path::new("/out/5/Dr. Mundo_5")),
            Utf8PathBuf::from("/out/5/Dr. Mundo_5.fantome")
        );
    }

    #[test]
    fn test_pack_bundle() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let bundle = root.join("5/Ahri_5");
        let bin = bundle.join("data/characters/Ahri/skins/skin0.bin");
        fs::create_dir_all(bin.parent().unwrap()).unwrap();
        fs::write(&bin, b"skin five").unwrap();

        let info = PackageOptions::default().info_for("Arcade Ahri");
        let archive = pack_bundle(&bundle, &info).unwrap();
        assert_eq!(archive, root.join("5/Ahri_5.fantome"));

        let zip = zip::ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec!["META/info.json", "RAW/data/characters/Ahri/skins/skin0.bin"]
        );

        assert_eq!(
            read_entry(&archive, "RAW/data/characters/Ahri/skins/skin0.bin"),
            "skin five"
        );
        let stored: FantomeInfo =
            serde_json::from_str(&read_entry(&archive, "META/info.json")).unwrap();
        assert_eq!(stored, info);
        assert!(read_entry(&archive, "META/info.json").contains("\"Name\": \"Arcade Ahri\""));

        // Bundle is kept
        assert!(bin.as_std_path().is_file());
    }

    #[test]
    fn test_repack_replaces_archive() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let bundle = root.join("1/Ahri_1");
        fs::create_dir_all(&bundle).unwrap();
        fs::write(bundle.join("skin0.bin"), b"new").unwrap();
        fs::write(root.join("1/Ahri_1.fantome"), b"stale, not a zip").unwrap();

        let archive = pack_bundle(&bundle, &PackageOptions::default().info_for("Ahri 1")).unwrap();
        assert_eq!(read_entry(&archive, "RAW/skin0.bin"), "new");
    }

    #[test]
    fn test_missing_bundle() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        assert!(matches!(
            pack_bundle(&root.join("0/Ahri_0"), &PackageOptions::default().info_for("x")),
            Err(PackageError::MissingBundle(_))
        ));
    }
}
