//! Artifact persistence: "write bytes, get a path".
//!
//! [`DirectorySink`] writes every artifact through a temp file created in
//! the destination directory and then renames it into place, so a reader
//! never observes a half-written file. Names are derived from the artifact
//! kind plus, by default, a short content hash:
//!
//! | Policy | Document file | Same name reused? |
//! |--------|---------------|-------------------|
//! | [`NamingPolicy::ContentHash`] | `convertedDocument-3f9a0c1b2d4e.pdf` | only for identical bytes |
//! | [`NamingPolicy::Fixed`]       | `convertedDocument.pdf`              | always (last write wins) |

use crate::error::ConvertError;
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// Storage boundary consumed by the coordinator.
///
/// `write` is called from tokio's blocking pool and must be atomic with
/// respect to concurrent readers. The coordinator never retries a failed
/// write.
pub trait ArtifactSink: Send + Sync {
    /// Persist `bytes` under a name derived from `suggested_name` (which
    /// includes an extension, e.g. `convertedRecord.json`) and return the
    /// final location.
    fn write(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, ConvertError>;
}

/// How a [`DirectorySink`] turns a suggested name into a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NamingPolicy {
    /// Append the first 12 hex digits of the content's SHA-256.
    #[default]
    ContentHash,
    /// Use the suggested name as-is and overwrite any previous artifact.
    Fixed,
}

/// Writes artifacts into one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
    naming: NamingPolicy,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            naming: NamingPolicy::default(),
        }
    }

    /// A sink in the OS temporary directory.
    pub fn temp() -> Self {
        Self::new(std::env::temp_dir())
    }

    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = naming;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// The file name `write` would use for these bytes.
    pub fn file_name(&self, bytes: &[u8], suggested_name: &str) -> String {
        let clean = sanitize_name(suggested_name);
        match self.naming {
            NamingPolicy::Fixed => clean,
            NamingPolicy::ContentHash => {
                let hash = sha256_hex(bytes);
                let tag = &hash[..12];
                let path = Path::new(&clean);
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_else(|| clean.clone());
                match path.extension() {
                    Some(ext) => format!("{stem}-{tag}.{}", ext.to_string_lossy()),
                    None => format!("{stem}-{tag}"),
                }
            }
        }
    }
}

impl ArtifactSink for DirectorySink {
    fn write(&self, bytes: &[u8], suggested_name: &str) -> Result<PathBuf, ConvertError> {
        let path = self.dir.join(self.file_name(bytes, suggested_name));
        let io_err = |source: std::io::Error| ConvertError::Io {
            path: path.clone(),
            source,
        };

        std::fs::create_dir_all(&self.dir).map_err(io_err)?;

        // Temp file in the same directory so the final rename stays on one
        // filesystem and is atomic.
        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        debug!("Persisted {} bytes → {}", bytes.len(), path.display());
        Ok(path)
    }
}

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("valid regex"));

/// Reduce a suggested name to `[A-Za-z0-9._-]`, with no leading dots.
pub fn sanitize_name(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name.trim(), "_");
    let trimmed = replaced.trim_start_matches('.');
    if trimmed.is_empty() {
        "artifact".to_string()
    } else {
        trimmed.to_string()
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    format!("{:x}", h.finalize())
}
