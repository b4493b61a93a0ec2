//! Atomic output files (temp file + rename).
//!
//! Writers produce their output at a temporary sibling path and only rename
//! it over the destination once everything succeeded. A dropped, uncommitted
//! [`StagedFile`] removes its temporary file, so a failed operation never
//! leaves a seemingly-valid output behind.

use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Result, WatermarkError};

const STAGING_PREFIX: &str = ".tilemark-partial-";

/// A destination path plus the temporary sibling the output is written to.
#[derive(Debug)]
pub struct StagedFile {
    destination: PathBuf,
    temp_path: PathBuf,
    committed: bool,
}

impl StagedFile {
    /// Prepare a staged write for `destination`, creating parent directories.
    ///
    /// The temporary name keeps the destination's extension last, so tools
    /// that infer the container from the extension still work.
    pub fn new(destination: &Path) -> Result<Self> {
        let file_name = destination
            .file_name()
            .ok_or_else(|| {
                WatermarkError::io(format!(
                    "destination {} has no file name",
                    destination.display()
                ))
            })?
            .to_string_lossy()
            .into_owned();

        let parent = match destination.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        Ok(Self {
            destination: destination.to_path_buf(),
            temp_path: parent.join(format!("{}{}", STAGING_PREFIX, file_name)),
            committed: false,
        })
    }

    /// Where the output should be written until it is committed.
    pub fn temp_path(&self) -> &Path {
        &self.temp_path
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Atomically move the finished output over the destination.
    pub fn commit(mut self) -> Result<PathBuf> {
        std::fs::rename(&self.temp_path, &self.destination)?;
        self.committed = true;
        debug!(destination = %self.destination.display(), "Committed output file");
        Ok(self.destination.clone())
    }
}

impl Drop for StagedFile {
    fn drop(&mut self) {
        if !self.committed {
            // Ignore error if nothing was written yet
            let _ = std::fs::remove_file(&self.temp_path);
        }
    }
}
