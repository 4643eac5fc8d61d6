use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use crate::rm::{ArtifactReference, Visibility};

/// What to stage: an existing local file, or a payload provided inline.
pub enum StageSource<'a> {
    LocalFile(&'a Path),
    Inline(&'a [u8]),
}

/// Copies build artifacts into a store shared with the cluster and reports
/// their true location, size and modification timestamp.
pub trait ArtifactStore {
    fn stage(&self, source: StageSource, dest_name: &str) -> crate::Result<ArtifactReference>;

    /// Re-fetches (size, modification timestamp in ms) of a staged artifact.
    fn stat(&self, reference: &ArtifactReference) -> crate::Result<(u64, u64)>;
}

/// Artifact store backed by a directory on a shared filesystem.
pub struct SharedDirStore {
    root: PathBuf,
}

impl SharedDirStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl ArtifactStore for SharedDirStore {
    fn stage(&self, source: StageSource, dest_name: &str) -> crate::Result<ArtifactReference> {
        let destination = self.root.join(dest_name);
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }

        match source {
            StageSource::LocalFile(path) => {
                log::info!(
                    "Staging {} into the shared store as {}",
                    path.display(),
                    destination.display()
                );
                std::fs::copy(path, &destination)?;
            }
            StageSource::Inline(payload) => {
                log::info!(
                    "Staging an inline payload of {} bytes into the shared store as {}",
                    payload.len(),
                    destination.display()
                );
                std::fs::write(&destination, payload)?;
            }
        }

        let (size_bytes, timestamp_ms) = file_stat(&destination)?;
        Ok(ArtifactReference {
            uri: destination.to_string_lossy().into_owned(),
            size_bytes,
            timestamp_ms,
            visibility: Visibility::Application,
        })
    }

    fn stat(&self, reference: &ArtifactReference) -> crate::Result<(u64, u64)> {
        file_stat(Path::new(&reference.uri))
    }
}

fn file_stat(path: &Path) -> crate::Result<(u64, u64)> {
    let metadata = std::fs::metadata(path)?;
    let timestamp_ms = metadata
        .modified()?
        .duration_since(UNIX_EPOCH)
        .map_err(|_| crate::Error::InvalidInput(format!(
            "Modification time of {} predates the epoch",
            path.display()
        )))?
        .as_millis() as u64;
    Ok((metadata.len(), timestamp_ms))
}
