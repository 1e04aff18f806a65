//! Skin number canonicalization in converted text dumps.
//!
//! A skin bin references itself by path, e.g.
//! `"Characters/Ahri/Skins/Skin5" = SkinCharacterDataProperties {`. To make every
//! extracted skin a drop-in `skin0.bin`, those self references are rewritten to
//! `Skin0`. Only the skin data entry and its resource resolver entry are touched;
//! every other line is copied byte for byte.

use regex::bytes::Regex;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const SKIN_DATA_PATTERN: &str =
    r#"("Characters/[^/]+/Skins/Skin)\d+(" *= *SkinCharacterDataProperties *\{)"#;
const RESOURCE_RESOLVER_PATTERN: &str =
    r#"("Characters/[^/]+/Skins/Skin)\d+(/Resources" *= *ResourceResolver *\{)"#;
const SKIN_NUMBER_PATTERN: &str = r"Skin\d+";
const CANONICAL_SKIN: &[u8] = b"Skin0";

/// What [`TextPatcher::patch_file`] did to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    /// At least one line changed; the file was replaced.
    Rewritten { lines: usize },
    /// The entries were found but already point at `Skin0`. File untouched.
    AlreadyCanonical,
    /// Neither entry was found. File untouched.
    MarkersNotFound,
}

impl PatchOutcome {
    pub fn modified(&self) -> bool {
        matches!(self, PatchOutcome::Rewritten { .. })
    }
}

/// Rewrites skin self references to `Skin0`.
///
/// Patterns are compiled once; share one patcher across workers by reference.
#[derive(Debug, Clone)]
pub struct TextPatcher {
    structural: [Regex; 2],
    skin_number: Regex,
}

#[derive(Debug, Default)]
struct LineStats {
    matched: usize,
    changed: usize,
}

impl LineStats {
    fn outcome(&self) -> PatchOutcome {
        if self.changed > 0 {
            PatchOutcome::Rewritten {
                lines: self.changed,
            }
        } else if self.matched > 0 {
            PatchOutcome::AlreadyCanonical
        } else {
            PatchOutcome::MarkersNotFound
        }
    }
}

impl TextPatcher {
    pub fn new() -> Self {
        let compile = |pattern: &str| Regex::new(pattern).expect("patch pattern is valid");
        Self {
            structural: [
                compile(SKIN_DATA_PATTERN),
                compile(RESOURCE_RESOLVER_PATTERN),
            ],
            skin_number: compile(SKIN_NUMBER_PATTERN),
        }
    }

    /// Patch a single line. Returns `None` if it is not a skin data or resource
    /// resolver entry.
    fn patch_line<'a>(&self, line: &'a [u8]) -> Option<std::borrow::Cow<'a, [u8]>> {
        if !self.structural.iter().any(|re| re.is_match(line)) {
            return None;
        }
        Some(self.skin_number.replace_all(line, CANONICAL_SKIN))
    }

    /// Patch in-memory text. Returns the patched text and what happened.
    pub fn patch_str(&self, text: &str) -> (String, PatchOutcome) {
        let mut stats = LineStats::default();
        let mut output = String::with_capacity(text.len());

        for line in text.split_inclusive('\n') {
            match self.patch_line(line.as_bytes()) {
                Some(patched) => {
                    stats.matched += 1;
                    if patched.as_ref() != line.as_bytes() {
                        stats.changed += 1;
                    }
                    // Replacement only swaps ASCII digits, so the bytes stay valid UTF-8.
                    output.push_str(&String::from_utf8_lossy(&patched));
                }
                None => output.push_str(line),
            }
        }

        (output, stats.outcome())
    }

    /// Patch the file at `path` in place.
    ///
    /// The result is written to a temporary file in the same directory and only
    /// moved over the original if a line actually changed; otherwise the
    /// temporary file is discarded and the original is left untouched.
    pub fn patch_file(&self, path: impl AsRef<Path>) -> io::Result<PatchOutcome> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut reader = BufReader::new(File::open(path)?);
        let temp = NamedTempFile::new_in(dir)?;
        let mut writer = BufWriter::new(temp);

        let mut stats = LineStats::default();
        let mut line = Vec::new();
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            match self.patch_line(&line) {
                Some(patched) => {
                    stats.matched += 1;
                    if patched.as_ref() != line.as_slice() {
                        stats.changed += 1;
                    }
                    writer.write_all(&patched)?;
                }
                None => writer.write_all(&line)?,
            }
        }

        let outcome = stats.outcome();
        if !outcome.modified() {
            // Dropping the temp file deletes it.
            return Ok(outcome);
        }

        let temp = writer.into_inner().map_err(|e| e.into_error())?;
        temp.as_file().sync_all()?;
        temp.persist(path).map_err(|e| e.error)?;
        Ok(outcome)
    }
}

impl Default for TextPatcher {
    fn default() -> Self {
        Self::new()
    }
}
