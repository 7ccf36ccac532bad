//! Stored-image collaborator
//!
//! Uploading happens outside this service; requests arrive with the stored
//! path the upload collaborator produced. This side only needs to release
//! files again — after a place is deleted, or as compensation when a
//! create fails after its upload already succeeded. Removal is best-effort:
//! failures are logged, never propagated, because the database state is
//! already correct by the time removal runs.

use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

pub trait ImageStore: Send + Sync {
    /// Request deletion of a stored file. Never fails the calling request.
    fn remove(&self, stored: &str);
}

/// Images stored on the local filesystem under one root.
pub struct LocalImageStore {
    root: PathBuf,
}

impl LocalImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalImageStore { root: root.into() }
    }

    // Stored references are paths relative to the root; anything that
    // escapes the root is refused.
    fn resolve(&self, stored: &str) -> Option<PathBuf> {
        let relative = Path::new(stored);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return None;
        }
        Some(self.root.join(relative))
    }
}

impl ImageStore for LocalImageStore {
    fn remove(&self, stored: &str) {
        let path = match self.resolve(stored) {
            Some(path) => path,
            None => {
                warn!("refusing to remove image outside the upload root: {}", stored);
                return;
            }
        };
        match std::fs::remove_file(&path) {
            Ok(()) => debug!("removed stored image {}", path.display()),
            Err(e) => warn!("could not remove stored image {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_deletes_file_under_root() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("tower.png");
        std::fs::write(&file, b"png").unwrap();

        let store = LocalImageStore::new(temp.path());
        store.remove("tower.png");
        assert!(!file.exists());
    }

    #[test]
    fn test_remove_of_missing_file_is_silent() {
        let temp = tempfile::tempdir().unwrap();
        let store = LocalImageStore::new(temp.path());
        store.remove("never-uploaded.png");
    }

    #[test]
    fn test_remove_refuses_traversal() {
        let temp = tempfile::tempdir().unwrap();
        let outside = temp.path().join("outside.png");
        std::fs::write(&outside, b"png").unwrap();

        let uploads = temp.path().join("uploads");
        std::fs::create_dir(&uploads).unwrap();
        let store = LocalImageStore::new(&uploads);

        store.remove("../outside.png");
        assert!(outside.exists());

        store.remove(outside.to_str().unwrap());
        assert!(outside.exists());
    }
}
