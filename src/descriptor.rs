//! Transient torrent descriptor persistence
//!
//! Descriptors live at `<torrents_dir>/<release_id>.torrent` between the
//! download step and the submit step, and are deleted unconditionally after
//! the submit attempt. Cleanup is best-effort: a missing temp file is not a
//! user-facing problem.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

/// The transient path a release's descriptor is written to.
pub fn path_for(torrents_dir: &Path, release_id: &str) -> PathBuf {
    torrents_dir.join(format!("{release_id}.torrent"))
}

/// Persist descriptor bytes, creating the directory if needed.
pub async fn save(torrents_dir: &Path, release_id: &str, data: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(torrents_dir)
        .await
        .map_err(|source| Error::FileSystem {
            path: torrents_dir.to_path_buf(),
            source,
        })?;

    let path = path_for(torrents_dir, release_id);
    tokio::fs::write(&path, data)
        .await
        .map_err(|source| Error::FileSystem {
            path: path.clone(),
            source,
        })?;

    tracing::debug!(path = %path.display(), bytes = data.len(), "descriptor saved");
    Ok(path)
}

/// Delete a descriptor file. Failures are logged, never propagated.
pub async fn cleanup(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "descriptor cleaned up"),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "failed to clean up descriptor");
        }
    }
}
