//! Release of evidence images that substantiate a claimed lap time.

use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use thiserror::Error;

/// Failure to release an evidence file. Callers log it; it never fails a submission.
#[derive(Debug, Error)]
pub enum EvidenceError {
    #[error("evidence path `{path}` escapes the evidence directory")]
    OutsideRoot { path: String },
    #[error("failed to remove evidence file `{}`", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// True when `path` is a non-empty relative path that cannot leave the evidence root.
pub fn is_confined(path: &str) -> bool {
    !path.is_empty()
        && Path::new(path)
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

/// Storage holding the images referenced by results.
pub trait EvidenceStore: Send + Sync {
    /// Delete the file behind `path`. A file that is already gone counts as released.
    fn discard(&self, path: &str) -> BoxFuture<'static, Result<(), EvidenceError>>;
}

/// Evidence kept as files below a root directory; stored paths are relative to it.
#[derive(Clone, Debug)]
pub struct FsEvidenceStore {
    root: Arc<PathBuf>,
}

impl FsEvidenceStore {
    /// Store rooted at `root`; the directory need not exist yet.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Arc::new(root.into()),
        }
    }

    /// Map a stored relative path to a location inside the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, EvidenceError> {
        if !is_confined(path) {
            return Err(EvidenceError::OutsideRoot {
                path: path.to_owned(),
            });
        }
        Ok(self.root.join(path))
    }
}

impl EvidenceStore for FsEvidenceStore {
    fn discard(&self, path: &str) -> BoxFuture<'static, Result<(), EvidenceError>> {
        let resolved = self.resolve(path);
        Box::pin(async move {
            let resolved = resolved?;
            match tokio::fs::remove_file(&resolved).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(EvidenceError::Remove {
                    path: resolved,
                    source,
                }),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn discard_removes_file_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("42");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("lap.jpg"), b"jpeg").unwrap();

        let store = FsEvidenceStore::new(dir.path());
        store.discard("42/lap.jpg").await.unwrap();
        assert!(!nested.join("lap.jpg").exists());
    }

    #[tokio::test]
    async fn missing_file_counts_as_released() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEvidenceStore::new(dir.path());
        assert!(store.discard("gone.jpg").await.is_ok());
    }

    #[tokio::test]
    async fn paths_leaving_the_root_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsEvidenceStore::new(dir.path());
        for path in ["../secret.jpg", "/etc/passwd", "a/../../b.jpg", ""] {
            assert!(
                matches!(
                    store.discard(path).await,
                    Err(EvidenceError::OutsideRoot { .. })
                ),
                "{path} should be refused"
            );
        }
    }

    #[test]
    fn confinement_accepts_only_plain_relative_paths() {
        assert!(is_confined("42/lap.jpg"));
        assert!(is_confined("./lap.jpg"));
        assert!(!is_confined("../lap.jpg"));
        assert!(!is_confined("/tmp/lap.jpg"));
        assert!(!is_confined(""));
    }
}
