use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::detection::{Detection, DetectionBatch};
use crate::error::ReviewResult;

/// Append-only CSV log of every saved detection.
///
/// A missing file is an empty log. Appends rewrite the whole file through a
/// temp file that is renamed into place, under `write_lock`, so concurrent
/// callers in this process never lose each other's rows.
pub struct PredictionStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl PredictionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Concatenates `batches` after the existing rows. Returns the number of
    /// rows added; adding nothing leaves the file untouched.
    pub fn append(&self, batches: &[DetectionBatch]) -> ReviewResult<usize> {
        let new_rows: Vec<&Detection> = batches.iter().flatten().collect();
        if new_rows.is_empty() {
            debug!("no rows to append to {}", self.path.display());
            return Ok(0);
        }

        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let existing = self.read_rows()?;
        let mut tmp = NamedTempFile::new_in(self.parent_dir())?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file_mut());
            for row in existing.iter().chain(new_rows.iter().copied()) {
                writer.serialize(row)?;
            }
            writer.flush()?;
        }
        tmp.as_file_mut().flush()?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        info!(
            "appended {} rows to {} ({} total)",
            new_rows.len(),
            self.path.display(),
            existing.len() + new_rows.len()
        );
        Ok(new_rows.len())
    }

    pub fn read_all(&self) -> ReviewResult<Vec<Detection>> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        self.read_rows()
    }

    /// Removes the log. Clearing a log that does not exist is fine.
    pub fn clear(&self) -> ReviewResult<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("cleared prediction log {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_rows(&self) -> ReviewResult<Vec<Detection>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        let rows = reader
            .deserialize::<Detection>()
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }
}
