//! Size-gated file reading.
//!
//! Reads source files into memory for hashing, parsing, and rule dispatch.
//! Files over the size cap are rejected before any read happens; sources
//! with invalid UTF-8 sequences are read lossily and left for the parser
//! to judge.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{Error, Result};

/// Size at which to log about large files (1MB).
pub const LARGE_FILE_WARN: u64 = 1024 * 1024;

/// Maximum file size to read (10MB).
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// File content with metadata.
#[derive(Debug)]
pub struct FileContent {
    /// The source text.
    pub text: String,

    /// File size in bytes on disk.
    pub size: u64,
}

/// Size-gated file reader.
pub struct FileReader {
    max_size: u64,
}

impl Default for FileReader {
    fn default() -> Self {
        Self {
            max_size: MAX_FILE_SIZE,
        }
    }
}

impl FileReader {
    /// Create a new file reader with the default size cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reader with a custom size cap.
    pub fn with_max_size(max_size: u64) -> Self {
        Self { max_size }
    }

    /// Read a file, checking the size cap first.
    pub fn read(&self, path: &Path) -> Result<FileContent> {
        let metadata = std::fs::metadata(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        let size = metadata.len();
        if size > self.max_size {
            return Err(Error::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("file too large ({size} bytes, max {})", self.max_size),
                ),
            });
        }

        if size > LARGE_FILE_WARN {
            tracing::info!(
                path = %path.display(),
                size_mb = size as f64 / 1_000_000.0,
                "reading large file"
            );
        }

        let mut file = File::open(path).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut buffer = Vec::with_capacity(size as usize);
        file.read_to_end(&mut buffer).map_err(|e| Error::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(FileContent {
            text: String::from_utf8_lossy(&buffer).into_owned(),
            size,
        })
    }
}

#[cfg(test)]
#[path = "reader_tests.rs"]
mod tests;
