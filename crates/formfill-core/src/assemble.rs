//! Final document serialization
//!
//! Serialization itself is delegated to lopdf; what lives here is the
//! byte-stream contract (page count and order preserved) and the scratch
//! file discipline: anything staged on disk gets a unique, request-scoped
//! name and is gone by the time the operation returns, success or failure.

use crate::document::FormDocument;
use crate::error::FormFillError;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Serialize the document into a complete, standalone PDF byte stream.
pub fn assemble(document: FormDocument) -> Result<Vec<u8>, FormFillError> {
    let mut doc = document.doc;
    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| FormFillError::Serialization(e.to_string()))?;
    Ok(buffer)
}

/// A uniquely named temporary file removed on drop.
///
/// Concurrent fill requests may share a directory, so the name carries a
/// fresh UUID per instance.
#[derive(Debug)]
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    pub fn in_dir(dir: &Path) -> Self {
        let name = format!(".formfill-{}.tmp", Uuid::new_v4());
        Self {
            path: dir.join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Move the scratch file into its final place. The rename leaves nothing
    /// behind at the scratch path, so the drop cleanup becomes a no-op.
    pub fn persist(self, dest: &Path) -> io::Result<()> {
        fs::rename(&self.path, dest)
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Write `bytes` to `path` by staging through a scratch file in the same
/// directory, so a failed write never leaves a partial output file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FormFillError> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    let scratch = ScratchFile::in_dir(dir.unwrap_or_else(|| Path::new(".")));
    fs::write(scratch.path(), bytes)?;
    scratch.persist(path)?;
    Ok(())
}
