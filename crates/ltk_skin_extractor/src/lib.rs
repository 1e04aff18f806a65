//! Skin extraction for League of Legends champion folders.
//!
//! This crate turns every `skins/skin<N>.bin` of an extracted champion folder into
//! a standalone mod folder whose bin is a `skin0.bin`, so any skin can be loaded
//! in place of the default one. It supports:
//!
//! - **Discovery**: recursive `skin<N>.bin` search with declared or sequential numbering
//! - **Related folders**: folders like `Ahrixyz` are merged into `Ahri` and removed afterwards
//! - **Patching**: skin self references are rewritten to `Skin0` in the text dump
//! - **Pluggable conversion**: bin/text conversion goes through a [`SkinCodec`],
//!   usually an external `ritobin_cli` via [`RitobinCodec`]
//! - **Parallelism**: items run on a fixed-size [`WorkerPool`]
//! - **Packaging**: finished variant bundles can be zipped into `.fantome` archives
//!
//! # Example
//!
//! ```no_run
//! use camino::Utf8Path;
//! use ltk_skin_extractor::{ExtractOptions, RitobinCodec, SkinExtractor};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let codec = RitobinCodec::new("tools/ritobin_cli.exe")?;
//! let options = ExtractOptions {
//!     workers: 4,
//!     ..Default::default()
//! };
//!
//! let extractor = SkinExtractor::new(Arc::new(codec), options).with_progress(|progress| {
//!     println!("Stage: {:?}, Progress: {}/{}",
//!         progress.stage, progress.current, progress.total);
//! });
//!
//! let report = extractor.run(Utf8Path::new("process_champions"))?;
//! println!("Extracted {} skins, {} failed",
//!     report.completed_count(), report.failed_count());
//! # Ok(())
//! # }
//! ```

pub mod codec;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod package;
pub mod patcher;
pub mod pipeline;
pub mod pool;
pub mod resolver;

// Re-export main types
pub use codec::{RitobinCodec, SkinCodec};
pub use error::{CodecError, Error, PackageError, PoolError, Result, TaskError, Warning};
pub use layout::{Layout, LayoutScheme};
pub use metadata::{MetadataSource, SkinMetadata};
pub use package::{FantomeInfo, PackageOptions};
pub use patcher::{PatchOutcome, TextPatcher};
pub use pipeline::{
    BatchReport, EntityReport, ExtractOptions, ExtractProgress, ExtractStage, ItemOutcome,
    ItemReport, SkinExtractor, Stage,
};
pub use pool::{TaskHandle, WorkerPool};
pub use resolver::{AliasTable, DiscoveryStrategy, EntityPlan, Origin, SkinFileMatcher, WorkItem};
