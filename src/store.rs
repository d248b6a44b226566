use std::fs;
use std::io::Write;
use std::path::Path;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::Builder;

use crate::error::PrepError;

/// The working directory a submission is prepared into.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: Utf8PathBuf,
}

impl Workspace {
    pub fn new(root: &Path) -> Result<Self, PrepError> {
        let root = Utf8PathBuf::from_path_buf(root.to_path_buf()).map_err(|path| {
            PrepError::Filesystem(format!("non UTF-8 working directory: {}", path.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn path(&self, file_name: &str) -> Utf8PathBuf {
        self.root.join(file_name)
    }

    pub fn ensure_root(&self) -> Result<(), PrepError> {
        fs::create_dir_all(self.root.as_std_path())
            .map_err(|err| PrepError::Filesystem(err.to_string()))
    }

    pub fn write_file(&self, file_name: &str, content: &[u8]) -> Result<Utf8PathBuf, PrepError> {
        let path = self.path(file_name);
        Self::write_bytes_atomic(&path, content)?;
        Ok(path)
    }

    /// Writes through a temporary sibling so readers never observe a partial file.
    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), PrepError> {
        let parent = path
            .parent()
            .ok_or_else(|| PrepError::Filesystem("invalid destination path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| PrepError::Filesystem(err.to_string()))?;
        let mut temp = Builder::new()
            .prefix(".dmrr-prep")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| PrepError::Filesystem(err.to_string()))?;
        temp.write_all(content)
            .map_err(|err| PrepError::Filesystem(err.to_string()))?;
        temp.persist(path.as_std_path())
            .map_err(|err| PrepError::Filesystem(err.to_string()))?;
        Ok(())
    }

    /// Fails on the first listed file that is not a regular file on disk.
    pub fn verify_written<'a, I>(&self, file_names: I) -> Result<(), PrepError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in file_names {
            let path = self.path(name);
            if !path.as_std_path().is_file() {
                return Err(PrepError::MissingOutput(path.to_string()));
            }
        }
        Ok(())
    }
}
