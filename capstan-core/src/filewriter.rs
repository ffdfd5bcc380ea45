//! Durable artifact writer.
//!
//! Artifacts for a cluster live under `<output-dir>/<cluster-name>/`. Writes are atomic: a
//! reader never observes a half-written kubeconfig or cluster config.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub trait FileWriter: Send + Sync {
    /// Persist `content` as `file_name` and return the final path.
    fn write(&self, file_name: &str, content: &[u8]) -> Result<PathBuf>;

    /// Directory all artifacts are written to.
    fn dir(&self) -> &Path;
}

#[derive(Debug, Clone)]
pub struct DirWriter {
    dir: PathBuf,
}

impl DirWriter {
    /// Writer rooted at `<output_dir>/<cluster_name>`; the directory is created eagerly.
    pub fn for_cluster(output_dir: &Path, cluster_name: &str) -> Result<Self> {
        let dir = output_dir.join(cluster_name);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory: {}", dir.display()))?;
        Ok(Self { dir })
    }
}

impl FileWriter for DirWriter {
    fn write(&self, file_name: &str, content: &[u8]) -> Result<PathBuf> {
        let path = self.dir.join(file_name);
        write_atomic(&path, content)?;
        log::debug!("wrote {}", path.display());
        Ok(path)
    }

    fn dir(&self) -> &Path {
        &self.dir
    }
}

pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let tmp_path = temp_path(path);
    let mut file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp file: {}", tmp_path.display()))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    file.sync_all()
        .with_context(|| format!("Failed to flush {}", tmp_path.display()))?;

    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to atomically replace file: {}", path.display()))?;

    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            dir.sync_all().ok();
        }
    }

    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("artifact");
    path.with_file_name(format!("{}.tmp", file_name))
}
