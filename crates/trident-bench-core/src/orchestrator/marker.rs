use anyhow::Context;
use std::path::{Path, PathBuf};

/// Path of the completion marker for `dir`: a sibling file `<dir>.done`.
pub fn marker_path(dir: &Path) -> PathBuf {
    let mut name = dir
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".done");
    dir.with_file_name(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    /// Marker present, the directory can be reused.
    Complete,
    /// Nothing there yet.
    Missing,
    /// Directory exists without a marker: an earlier build died half-way.
    Partial,
}

/// A marker only counts while its directory is still there; a marker left
/// behind by a deleted directory reads as `Missing`.
pub fn build_state(dir: &Path) -> BuildState {
    match (marker_path(dir).exists(), dir.exists()) {
        (true, true) => BuildState::Complete,
        (false, true) => BuildState::Partial,
        (_, false) => BuildState::Missing,
    }
}

pub fn mark_complete(dir: &Path) -> anyhow::Result<()> {
    let marker = marker_path(dir);
    std::fs::write(&marker, chrono::Local::now().to_rfc3339())
        .with_context(|| format!("failed to write completion marker {}", marker.display()))
}

/// Decides whether `dir` still has to be built. A partial directory is
/// either adopted (marker written) or deleted so the build starts clean.
pub fn needs_build(dir: &Path, adopt_unmarked: bool) -> anyhow::Result<bool> {
    match build_state(dir) {
        BuildState::Complete => {
            tracing::info!(" Reuse {} (already complete)", dir.display());
            Ok(false)
        }
        BuildState::Missing => {
            let stale = marker_path(dir);
            if stale.exists() {
                tracing::warn!(" {} is gone, dropping stale marker", dir.display());
                remove_path(&stale)?;
            }
            Ok(true)
        }
        BuildState::Partial if adopt_unmarked => {
            tracing::warn!(" Adopting unmarked directory {}", dir.display());
            mark_complete(dir)?;
            Ok(false)
        }
        BuildState::Partial => {
            tracing::warn!(
                " {} exists without completion marker, removing and rebuilding",
                dir.display()
            );
            remove_path(dir)?;
            Ok(true)
        }
    }
}

pub(crate) fn remove_path(path: &Path) -> anyhow::Result<()> {
    let meta = std::fs::symlink_metadata(path)
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let removed = if meta.is_dir() {
        std::fs::remove_dir_all(path)
    } else {
        std::fs::remove_file(path)
    };
    removed.with_context(|| format!("failed to remove {}", path.display()))
}
