//! Error and warning types for skin extraction.
//!
//! Fatal conditions use [`Error`] and the crate-wide [`Result<T>`] alias. Only a
//! missing champions root (or a broken setup such as a missing converter) ever
//! aborts a batch; everything that goes wrong with a single skin file is turned
//! into an [`ItemOutcome::Failed`](crate::pipeline::ItemOutcome::Failed) entry,
//! and every recoverable oddity is recorded as a [`Warning`].

use camino::Utf8PathBuf;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort an extraction run.
#[derive(Error, Debug)]
pub enum Error {
    /// The champions root directory does not exist or is not a directory.
    #[error("Champions root not found: {0}")]
    RootNotFound(Utf8PathBuf),

    /// The configured converter executable does not exist.
    #[error("Converter not found: {0}")]
    ConverterNotFound(Utf8PathBuf),

    /// Filesystem I/O failed outside of a single work item.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse a skin metadata document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure reported by a [`SkinCodec`](crate::codec::SkinCodec).
#[derive(Error, Debug)]
pub enum CodecError {
    /// The converter process could not be started.
    #[error("Failed to start converter '{program}': {source}")]
    Spawn {
        program: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The converter exited unsuccessfully. `code` is `None` when the process
    /// was terminated by a signal.
    #[error("Converter failed on {path} (exit code: {})", display_code(.code))]
    Exit { path: Utf8PathBuf, code: Option<i32> },

    /// The converter did not finish within the configured timeout and was killed.
    #[error("Converter timed out after {:?} on {path}", .after)]
    TimedOut { path: Utf8PathBuf, after: Duration },

    /// The converter reported success but the expected output file is missing.
    #[error("Converter produced no output for {path} (expected {expected})")]
    MissingOutput {
        path: Utf8PathBuf,
        expected: Utf8PathBuf,
    },

    /// I/O failed while supervising the converter.
    #[error("IO error while converting {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn display_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => code.to_string(),
        None => "terminated".to_string(),
    }
}

/// Failure while writing a `.fantome` archive.
#[derive(Error, Debug)]
pub enum PackageError {
    #[error("Bundle folder not found: {0}")]
    MissingBundle(Utf8PathBuf),

    #[error("IO error while packaging {path}: {source}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write archive {path}: {source}")]
    Zip {
        path: Utf8PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to serialize package info: {0}")]
    Json(#[from] serde_json::Error),
}

/// Returned by [`WorkerPool::submit`](crate::pool::WorkerPool::submit).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("worker pool is shutting down")]
    ShuttingDown,
}

/// Returned by [`TaskHandle::join`](crate::pool::TaskHandle::join).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task panicked; the payload message is preserved when it was a string.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was dropped without running.
    #[error("task was abandoned before it ran")]
    Abandoned,
}

/// A recoverable condition noticed while extracting. Warnings are logged as
/// they happen and collected into the entity report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A `skin*.bin` file whose name does not match `skin<digits>.bin`.
    UnrecognizedFileName { path: Utf8PathBuf },

    /// The index in the file name differs from the index it is processed as.
    NumberingMismatch {
        path: Utf8PathBuf,
        declared: u32,
        logical: u32,
    },

    /// No skin data / resource resolver entry was found in the text dump.
    /// Usually means the hash tables used by the converter are outdated.
    PatchNotApplicable { path: Utf8PathBuf },

    /// A merged alias directory could not be removed.
    AliasCleanupFailed { dir: Utf8PathBuf, message: String },

    /// Skin names could not be loaded for an entity.
    MetadataUnavailable { entity: String, message: String },

    /// The intermediate text file could not be removed after relocation.
    TextCleanupFailed { path: Utf8PathBuf, message: String },

    /// A variant bundle could not be packed into a `.fantome` archive.
    PackagingFailed { bundle: Utf8PathBuf, message: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnrecognizedFileName { path } => {
                write!(f, "Invalid skin file name format: {}", path)
            }
            Warning::NumberingMismatch {
                path,
                declared,
                logical,
            } => write!(
                f,
                "Mismatch in skin numbering for {}: file suggests {}, processing as {}",
                path, declared, logical
            ),
            Warning::PatchNotApplicable { path } => write!(
                f,
                "Outdated hashes, skin pattern not found in {}",
                path
            ),
            Warning::AliasCleanupFailed { dir, message } => {
                write!(f, "Failed to delete folder {}: {}", dir, message)
            }
            Warning::MetadataUnavailable { entity, message } => {
                write!(f, "No skin names for {}: {}", entity, message)
            }
            Warning::TextCleanupFailed { path, message } => {
                write!(f, "Failed to remove {}: {}", path, message)
            }
            Warning::PackagingFailed { bundle, message } => {
                write!(f, "Failed to package {}: {}", bundle, message)
            }
        }
    }
}
