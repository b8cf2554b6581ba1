// Per-run scratch directory and partial output cleanup

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::TempDir;
use uuid::Uuid;

/// Directory name prefix for full runs
pub const RUN_PREFIX: &str = "restorepipe";
/// Directory name prefix for still previews
pub const PREVIEW_PREFIX: &str = "restorepipe-preview";

/// Private directory holding one run's script and manifest. Each call gets
/// a fresh directory, so concurrent runs of the same job never share one.
/// Removed on drop unless asked to keep it.
#[derive(Debug)]
pub struct TempWorkspace {
    dir: Option<TempDir>,
    path: PathBuf,
    keep: bool,
}

impl TempWorkspace {
    pub fn create(root: &Path, prefix: &str, job_id: Uuid, keep: bool) -> io::Result<Self> {
        fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-{}-", prefix, job_id))
            .tempdir_in(root)?;
        let path = dir.path().to_path_buf();
        tracing::debug!("workspace {}", path.display());
        Ok(Self {
            dir: Some(dir),
            path,
            keep,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Write `value` as pretty JSON into the workspace
    pub fn write_json<T: Serialize>(&self, name: &str, value: &T) -> io::Result<PathBuf> {
        let path = self.file(name);
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

impl Drop for TempWorkspace {
    fn drop(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };
        if self.keep {
            let path = dir.keep();
            tracing::info!("keeping temp files in {}", path.display());
            return;
        }
        if let Err(e) = dir.close() {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("failed to remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Deletes the output file on drop unless the run succeeded.
#[derive(Debug)]
pub struct PartialOutput {
    path: PathBuf,
    armed: bool,
}

impl PartialOutput {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            armed: true,
        }
    }

    /// The output is complete; leave it in place
    pub fn keep(mut self) {
        self.armed = false;
    }
}

impl Drop for PartialOutput {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match fs::remove_file(&self.path) {
            Ok(()) => tracing::info!("removed partial output {}", self.path.display()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                "failed to remove partial output {}: {}",
                self.path.display(),
                e
            ),
        }
    }
}
