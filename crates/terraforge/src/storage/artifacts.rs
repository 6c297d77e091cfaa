//! Artifact file naming and lifecycle.
//!
//! Every artifact is named deterministically from the owning job's id:
//! `{job_id}.blend` for the primary output, `{job_id}_preview.png` for the
//! preview, `{job_id}_params.json` for the transient parameter file.
//! Location is a pure function of job identity, so no artifact index is
//! needed and orphaned files can be reconciled by a sweep over this
//! convention. File names are unique per job; concurrent workers never
//! collide.

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::StorageError;
use crate::sanitize;

/// The three artifact paths derived for one job.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub blend: PathBuf,
    pub preview: PathBuf,
    pub params: PathBuf,
}

/// Filesystem convention for generated files, rooted at one directory.
#[derive(Clone)]
pub struct ArtifactStore {
    output_directory: PathBuf,
}

impl ArtifactStore {
    pub fn new<P: AsRef<Path>>(output_directory: P) -> Self {
        Self {
            output_directory: output_directory.as_ref().to_path_buf(),
        }
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    /// Derives the artifact paths for a job.
    pub fn paths_for(&self, job_id: &str) -> ArtifactPaths {
        ArtifactPaths {
            blend: self.output_directory.join(format!("{}.blend", job_id)),
            preview: self
                .output_directory
                .join(format!("{}_preview.png", job_id)),
            params: self
                .output_directory
                .join(format!("{}_params.json", job_id)),
        }
    }

    /// Serializes generation parameters to the job's transient params file.
    pub fn write_params<T: Serialize>(
        &self,
        job_id: &str,
        params: &T,
    ) -> Result<PathBuf, StorageError> {
        self.ensure_directory(&self.output_directory)?;

        let path = self.paths_for(job_id).params;
        let bytes = serde_json::to_vec_pretty(params)?;
        std::fs::write(&path, bytes).map_err(|e| StorageError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        Ok(path)
    }

    /// Removes the transient params file. Best-effort: a failed removal is
    /// logged and never escalated.
    pub fn remove_transient_params(&self, job_id: &str) {
        let path = self.paths_for(job_id).params;
        if let Err(e) = std::fs::remove_file(&path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                log::warn!(
                    "Failed to remove transient params file {}: {}",
                    sanitize::redact_path(&path),
                    e
                );
            }
        }
    }

    /// Removes an entity's recorded artifact files. Best-effort: failures
    /// are logged and never block the surrounding deletion.
    pub fn remove_entity_files(&self, blend_file_path: &str, preview_path: Option<&str>) {
        let mut targets = vec![PathBuf::from(blend_file_path)];
        if let Some(preview) = preview_path {
            targets.push(PathBuf::from(preview));
        }

        for path in targets {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    log::warn!(
                        "Failed to remove artifact file {}: {}",
                        sanitize::redact_path(&path),
                        e
                    );
                }
            }
        }
    }

    fn ensure_directory(&self, path: &Path) -> Result<(), StorageError> {
        if !path.exists() {
            std::fs::create_dir_all(path).map_err(|e| StorageError::CreateDirectory {
                path: path.to_path_buf(),
                source: e,
            })?;
        }
        Ok(())
    }
}
