//! Bin ⇄ text conversion boundary.
//!
//! The pipeline never touches the bin format itself. It hands a file to a
//! [`SkinCodec`], which converts it in place next to the original: `skin5.bin`
//! becomes `skin5.py` and back. [`RitobinCodec`] drives an external converter
//! executable (typically `ritobin_cli`); tests plug in their own implementations.

use crate::error::{CodecError, Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Extension of the intermediate text representation.
pub const TEXT_EXTENSION: &str = "py";
/// Extension of the binary representation.
pub const BINARY_EXTENSION: &str = "bin";

/// Default upper bound for a single converter invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// How often a running converter is polled for completion.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Converts skin files between their binary and text representations.
///
/// Implementations must be safe to call from several worker threads at once
/// for *different* files.
pub trait SkinCodec: Send + Sync {
    /// Convert `binary` to text, returning the path of the text file.
    fn to_text(&self, binary: &Utf8Path) -> std::result::Result<Utf8PathBuf, CodecError>;

    /// Convert `text` back to binary, returning the path of the bin file.
    fn to_binary(&self, text: &Utf8Path) -> std::result::Result<Utf8PathBuf, CodecError>;
}

/// [`SkinCodec`] backed by an external converter executable.
///
/// The converter is called as `<program> <args...> <file>` and must write the
/// converted file next to its input with the extension swapped. Exit status
/// zero means success.
#[derive(Debug, Clone)]
pub struct RitobinCodec {
    program: Utf8PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

impl RitobinCodec {
    /// Create a codec for the converter at `program`.
    ///
    /// Fails with [`Error::ConverterNotFound`] if the executable does not exist.
    pub fn new(program: impl Into<Utf8PathBuf>) -> Result<Self> {
        let program = program.into();
        if !program.as_std_path().is_file() {
            return Err(Error::ConverterNotFound(program));
        }
        Ok(Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Extra arguments passed before the file path.
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.args = args;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Utf8Path {
        &self.program
    }

    fn convert(
        &self,
        input: &Utf8Path,
        expected: Utf8PathBuf,
    ) -> std::result::Result<Utf8PathBuf, CodecError> {
        tracing::debug!("Running {} on {}", self.program, input);

        let mut child = Command::new(self.program.as_std_path())
            .args(&self.args)
            .arg(input.as_std_path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| CodecError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let start = Instant::now();
        let status = loop {
            let polled = child.try_wait().map_err(|source| CodecError::Io {
                path: input.to_path_buf(),
                source,
            })?;
            if let Some(status) = polled {
                break status;
            }
            if start.elapsed() > self.timeout {
                let _ = child.kill();
                let _ = child.wait();
                return Err(CodecError::TimedOut {
                    path: input.to_path_buf(),
                    after: self.timeout,
                });
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        if !status.success() {
            return Err(CodecError::Exit {
                path: input.to_path_buf(),
                code: status.code(),
            });
        }

        if !expected.as_std_path().is_file() {
            return Err(CodecError::MissingOutput {
                path: input.to_path_buf(),
                expected,
            });
        }

        tracing::debug!(
            "Converted {} in {}ms",
            input,
            start.elapsed().as_millis()
        );
        Ok(expected)
    }
}

impl SkinCodec for RitobinCodec {
    fn to_text(&self, binary: &Utf8Path) -> std::result::Result<Utf8PathBuf, CodecError> {
        self.convert(binary, binary.with_extension(TEXT_EXTENSION))
    }

    fn to_binary(&self, text: &Utf8Path) -> std::result::Result<Utf8PathBuf, CodecError> {
        self.convert(text, text.with_extension(BINARY_EXTENSION))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    /// In-process stand-in for the converter: copies bytes to the sibling file
    /// with the other extension, like the real tool leaves its input in place.
    pub(crate) struct CopyCodec;

    impl SkinCodec for CopyCodec {
        fn to_text(&self, binary: &Utf8Path) -> std::result::Result<Utf8PathBuf, CodecError> {
            copy_to(binary, binary.with_extension(TEXT_EXTENSION))
        }

        fn to_binary(&self, text: &Utf8Path) -> std::result::Result<Utf8PathBuf, CodecError> {
            copy_to(text, text.with_extension(BINARY_EXTENSION))
        }
    }

    pub(crate) fn copy_to(
        from: &Utf8Path,
        to: Utf8PathBuf,
    ) -> std::result::Result<Utf8PathBuf, CodecError> {
        fs::copy(from, &to).map_err(|source| CodecError::Io {
            path: from.to_path_buf(),
            source,
        })?;
        Ok(to)
    }

    #[test]
    fn test_round_trip_without_patch_is_identity() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let bin = root.join("skin3.bin");
        let original: Vec<u8> = (0u8..=255).cycle().take(4096).collect();
        fs::write(&bin, &original).unwrap();

        let codec = CopyCodec;
        let text = codec.to_text(&bin).unwrap();
        assert_eq!(text, root.join("skin3.py"));

        let back = codec.to_binary(&text).unwrap();
        assert_eq!(back, bin);
        assert_eq!(fs::read(&back).unwrap(), original);
    }

    #[test]
    fn test_missing_converter() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let result = RitobinCodec::new(root.join("ritobin_cli.exe"));
        assert!(matches!(result, Err(Error::ConverterNotFound(_))));
    }

    /// Converter that runs a shell script through `/bin/sh`. The script is read,
    /// not executed, so no executable bit is needed.
    #[cfg(unix)]
    fn script_codec(root: &Utf8Path, name: &str, body: &str) -> RitobinCodec {
        let path = root.join(name);
        fs::write(&path, format!("{}\n", body)).unwrap();
        RitobinCodec::new("/bin/sh")
            .unwrap()
            .with_args(vec![path.to_string()])
    }

    #[cfg(unix)]
    #[test]
    fn test_external_converter_success() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let codec = script_codec(&root, "convert.sh", r#"cp "$1" "${1%.*}.py""#);
        let bin = root.join("skin1.bin");
        fs::write(&bin, b"data").unwrap();

        let text = codec.to_text(&bin).unwrap();
        assert_eq!(fs::read(text).unwrap(), b"data");
    }

    #[cfg(unix)]
    #[test]
    fn test_external_converter_failure_exit_code() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let codec = script_codec(&root, "fail.sh", "exit 3");
        let bin = root.join("skin1.bin");
        fs::write(&bin, b"data").unwrap();

        match codec.to_text(&bin) {
            Err(CodecError::Exit { code, path }) => {
                assert_eq!(code, Some(3));
                assert_eq!(path, bin);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_external_converter_missing_output() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let codec = script_codec(&root, "noop.sh", "exit 0");
        let bin = root.join("skin1.bin");
        fs::write(&bin, b"data").unwrap();

        assert!(matches!(
            codec.to_text(&bin),
            Err(CodecError::MissingOutput { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_external_converter_timeout() {
        let dir = tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let codec = script_codec(&root, "hang.sh", "sleep 5").with_timeout(Duration::from_millis(200));
        let bin = root.join("skin1.bin");
        fs::write(&bin, b"data").unwrap();

        let start = Instant::now();
        assert!(matches!(
            codec.to_text(&bin),
            Err(CodecError::TimedOut { .. })
        ));
        assert!(start.elapsed() < Duration::from_secs(4));
    }
}
