//! Scratch files for downloaded archives
//!
//! A scratch file belongs to exactly one in-flight download. It is deleted
//! when dropped, so every exit path of a worker removes it;
//! [`ScratchFile::release`] removes it eagerly and reports removal errors.

use crate::IngestError;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Exclusively owned local file holding one downloaded archive
#[derive(Debug)]
pub struct ScratchFile {
    file: NamedTempFile,
}

impl ScratchFile {
    /// Creates an empty scratch file in `dir`, or in the OS temp dir
    pub fn create(dir: Option<&Path>) -> Result<Self, IngestError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("archive-").suffix(".part");
        let file = match dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(IngestError::Scratch)?;
        Ok(Self { file })
    }

    /// Path of the file on disk
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Path of the file on disk, owned
    pub fn path_buf(&self) -> PathBuf {
        self.file.path().to_path_buf()
    }

    /// Opens an async writer over the file
    pub fn writer(&self) -> Result<tokio::fs::File, IngestError> {
        let file = self.file.as_file().try_clone().map_err(IngestError::Scratch)?;
        Ok(tokio::fs::File::from_std(file))
    }

    /// Deletes the file now
    pub fn release(self) -> Result<(), IngestError> {
        self.file.close().map_err(IngestError::Scratch)
    }
}
