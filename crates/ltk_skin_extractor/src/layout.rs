//! Output directory layout for extracted skins.
//!
//! Every extracted skin ends up as a self-contained mod folder whose bin is
//! named `skin0.bin`, regardless of the number it started with:
//!
//! ```text
//! skins_extracted/
//!   5/                                  # IndexQualified
//!     Ahri_5/data/characters/Ahri/skins/skin0.bin
//!   Spirit Blossom Ahri/                # NameQualified
//!     5/Ahri_5/data/characters/Ahri/skins/skin0.bin
//! ```

use crate::resolver::WorkItem;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// File name every relocated skin bin receives.
pub const CANONICAL_FILE_NAME: &str = "skin0.bin";

/// Default name of the output folder created inside each champion folder.
pub const DEFAULT_OUTPUT_DIR_NAME: &str = "skins_extracted";

/// Shape of the output tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LayoutScheme {
    /// `<root>/<index>/<entity>_<index>/...`
    #[default]
    IndexQualified,
    /// `<root>/<skin name>/<index>/<entity>_<index>/...`, falling back to
    /// [`IndexQualified`](Self::IndexQualified) when no name is known.
    NameQualified,
}

/// Computes destinations under one output root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    output_root: Utf8PathBuf,
    scheme: LayoutScheme,
}

impl Layout {
    pub fn new(output_root: impl Into<Utf8PathBuf>, scheme: LayoutScheme) -> Self {
        Self {
            output_root: output_root.into(),
            scheme,
        }
    }

    pub fn output_root(&self) -> &Utf8Path {
        &self.output_root
    }

    pub fn scheme(&self) -> LayoutScheme {
        self.scheme
    }

    /// Self-contained mod folder of `item`'s variant, `<base>/<i>/<entity>_<i>`.
    ///
    /// `variant_name` is only consulted by [`LayoutScheme::NameQualified`].
    pub fn bundle_dir_for(&self, item: &WorkItem, variant_name: Option<&str>) -> Utf8PathBuf {
        let index = item.logical_index.to_string();
        let base = match (self.scheme, variant_name) {
            (LayoutScheme::NameQualified, Some(name)) if !name.is_empty() => {
                self.output_root.join(name)
            }
            _ => self.output_root.clone(),
        };
        base.join(&index).join(format!("{}_{}", item.entity_name, index))
    }

    /// Destination of the relocated bin for `item`, inside its bundle folder.
    pub fn destination_for(&self, item: &WorkItem, variant_name: Option<&str>) -> Utf8PathBuf {
        self.bundle_dir_for(item, variant_name)
            .join("data")
            .join("characters")
            .join(&item.character_name)
            .join("skins")
            .join(CANONICAL_FILE_NAME)
    }
}
