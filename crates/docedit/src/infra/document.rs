//! Reading and writing document files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

/// A document file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the full document text.
    pub fn read(&self) -> Result<String> {
        if !self.path.exists() {
            return Err(anyhow!("document not found: {}", self.path.display()));
        }
        fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read document {}", self.path.display()))
    }

    /// Replace the document contents.
    pub fn write(&self, contents: &str) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).with_context(|| {
                format!("failed to create document directory: {}", parent.display())
            })?;
        }
        fs::write(&self.path, contents)
            .with_context(|| format!("failed to write document {}", self.path.display()))?;
        tracing::debug!(path = %self.path.display(), bytes = contents.len(), "document written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let document = DocumentFile::new(temp.path().join("notes/doc.md"));
        document.write("# Notes\n$a+b$\n")?;
        assert_eq!(document.read()?, "# Notes\n$a+b$\n");
        Ok(())
    }

    #[test]
    fn missing_document_is_an_error() {
        let document = DocumentFile::new("definitely/not/here.md");
        let err = document.read().unwrap_err();
        assert!(err.to_string().contains("document not found"));
    }
}
