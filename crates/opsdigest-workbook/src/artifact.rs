use std::path::{Path, PathBuf};

use crate::error::WorkbookError;

/// A rendered spreadsheet on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub file_name: String,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { path, file_name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_bytes(&self) -> Result<Vec<u8>, WorkbookError> {
        std::fs::read(&self.path).map_err(|source| WorkbookError::io(&self.path, source))
    }

    pub fn size_bytes(&self) -> Result<u64, WorkbookError> {
        std::fs::metadata(&self.path)
            .map(|metadata| metadata.len())
            .map_err(|source| WorkbookError::io(&self.path, source))
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    pub fn remove(&self) -> Result<(), WorkbookError> {
        std::fs::remove_file(&self.path).map_err(|source| WorkbookError::io(&self.path, source))
    }
}
