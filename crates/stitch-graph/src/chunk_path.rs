//! Root-relative output paths of emitted chunks.

use std::fmt;
use std::path::PathBuf;

use path_clean::PathClean;

use crate::{Error, Result};

/// Output path of a single-module chunk, relative to the output root.
///
/// Always stored with `/` separators and a leading `/` (`/components/Button.js`),
/// so two paths can be compared and related without touching the file system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkPath(String);

impl ChunkPath {
    /// Build a chunk path from a bundler file name such as `components/Button.js`.
    ///
    /// Leading slashes are accepted, `.` and `..` segments are normalized, and
    /// paths escaping the output root are rejected.
    pub fn new(file_name: impl AsRef<str>) -> Result<Self> {
        let raw = file_name.as_ref().replace('\\', "/");
        let trimmed = raw.trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(Error::InvalidChunkPath(raw));
        }

        let cleaned = PathBuf::from(trimmed).clean();
        let text = cleaned.to_string_lossy().replace('\\', "/");
        if text == "." || text == ".." || text.starts_with("../") {
            return Err(Error::InvalidChunkPath(raw));
        }

        Ok(Self(format!("/{text}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// File name component (`Button.js` for `/components/Button.js`).
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Path without the leading `/` (`components/Button.js`).
    pub fn file_name(&self) -> &str {
        &self.0[1..]
    }

    /// Directory segments, excluding the file name.
    fn dir_segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.file_name().split('/').collect();
        segments.pop();
        segments
    }

    /// Relative import specifier from the chunk `importer` to this chunk.
    ///
    /// The result always starts with `./` or `../` so the host loader treats it
    /// as a relative file reference rather than a bare package name.
    pub fn relative_from(&self, importer: &ChunkPath) -> String {
        let from = importer.dir_segments();
        let to: Vec<&str> = self.file_name().split('/').collect();

        // The last segment of `to` is a file and must never match a directory.
        let common = from
            .iter()
            .zip(&to[..to.len() - 1])
            .take_while(|(a, b)| a == b)
            .count();

        let mut parts: Vec<&str> = vec![".."; from.len() - common];
        parts.extend_from_slice(&to[common..]);
        let relative = parts.join("/");

        if relative.starts_with("../") {
            relative
        } else {
            format!("./{relative}")
        }
    }
}

impl fmt::Display for ChunkPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
