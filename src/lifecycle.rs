//! Per-run temporary artifact tracking.
//!
//! A [`RunWorkspace`] owns a uniquely named directory for one dub run and a
//! registry of every path handed out for that run. Paths are registered before
//! the caller touches them, so a stage that fails half way still has its output
//! swept. Release happens once, either explicitly through [`RunWorkspace::release`]
//! or from `Drop`.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::{Builder, TempDir};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{DubError, Result};

const WORKSPACE_PREFIX: &str = "redub-";

/// Outcome of a cleanup pass
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    /// Paths that existed and were deleted
    pub removed: usize,
    /// Paths that were registered but never created
    pub missing: usize,
    /// Paths that could not be deleted
    pub failed: Vec<PathBuf>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct RunWorkspace {
    run_id: Uuid,
    dir: PathBuf,
    root: Mutex<Option<TempDir>>,
    registry: Mutex<Vec<PathBuf>>,
}

impl RunWorkspace {
    /// Create a fresh workspace directory under `base_dir`, which must already exist
    pub fn create(base_dir: &Path) -> Result<Self> {
        if !base_dir.is_dir() {
            return Err(DubError::Config(format!(
                "Workspace base directory does not exist: {}",
                base_dir.display()
            )));
        }

        let run_id = Uuid::new_v4();
        let root = Builder::new()
            .prefix(&format!("{}{}-", WORKSPACE_PREFIX, run_id))
            .tempdir_in(base_dir)?;
        let dir = root.path().to_path_buf();

        debug!("Created run workspace {}", dir.display());
        Ok(Self {
            run_id,
            dir,
            root: Mutex::new(Some(root)),
            registry: Mutex::new(Vec::new()),
        })
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Reserve a path inside the workspace and register it
    pub fn allocate(&self, file_name: &str) -> PathBuf {
        self.register(self.dir.join(file_name))
    }

    /// Track an arbitrary path for deletion at release time
    pub fn register<P: Into<PathBuf>>(&self, path: P) -> PathBuf {
        let path = path.into();
        let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
        if !registry.contains(&path) {
            registry.push(path.clone());
        }
        path
    }

    pub fn registered(&self) -> Vec<PathBuf> {
        self.registry
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Delete every registered path newest first, then the workspace directory.
    /// Calling this again is a no-op.
    pub fn release(&self) -> CleanupReport {
        let paths: Vec<PathBuf> = {
            let mut registry = self.registry.lock().unwrap_or_else(|e| e.into_inner());
            registry.drain(..).collect()
        };
        let root = self.root.lock().unwrap_or_else(|e| e.into_inner()).take();

        let mut report = CleanupReport::default();
        for path in paths.iter().rev() {
            match remove_path(path) {
                Ok(true) => report.removed += 1,
                Ok(false) => report.missing += 1,
                Err(e) => {
                    warn!("Failed to remove temporary artifact {}: {}", path.display(), e);
                    report.failed.push(path.clone());
                }
            }
        }

        let Some(root) = root else {
            return report;
        };
        match root.close() {
            Ok(()) => report.removed += 1,
            Err(e) => {
                warn!("Failed to remove run workspace {}: {}", self.dir.display(), e);
                report.failed.push(self.dir.clone());
            }
        }

        debug!(
            "Released run workspace {} ({} removed, {} never created, {} failed)",
            self.run_id,
            report.removed,
            report.missing,
            report.failed.len()
        );
        report
    }
}

impl Drop for RunWorkspace {
    fn drop(&mut self) {
        self.release();
    }
}

/// Returns `Ok(false)` when there was nothing to delete
fn remove_path(path: &Path) -> std::io::Result<bool> {
    let metadata = match std::fs::symlink_metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(e),
    };

    let result = if metadata.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };

    match result {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}
