// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Filesystem based index storage. */

use {
    crate::{
        error::{PackagesIndexError, Result},
        repository::IndexStore,
    },
    async_trait::async_trait,
    std::{
        io::Write,
        path::{Component, Path, PathBuf},
    },
};

/// An [IndexStore] backed by a directory on the filesystem.
///
/// Keys are paths relative to the root directory.
#[derive(Clone, Debug)]
pub struct FilesystemIndexStore {
    root_dir: PathBuf,
}

impl FilesystemIndexStore {
    /// Construct a new instance, bound to the root directory specified.
    ///
    /// No validation of the passed path is performed. The directory does not need to exist.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            root_dir: path.as_ref().to_path_buf(),
        }
    }

    /// The root directory of this store.
    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Resolve the filesystem path for a key.
    ///
    /// Keys escaping the root directory are rejected.
    pub fn key_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key.trim_start_matches('/'));

        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
            || key.trim_matches('/').is_empty()
        {
            return Err(PackagesIndexError::storage(
                key,
                format!("key is not a relative path: {}", key),
            ));
        }

        Ok(self.root_dir.join(relative))
    }
}

#[async_trait]
impl IndexStore for FilesystemIndexStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.key_path(key)?;

        match async_std::fs::read(&path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PackagesIndexError::storage(key, e)),
        }
    }

    async fn put(&self, key: &str, data: Vec<u8>) -> Result<()> {
        let dest_path = self.key_path(key)?;

        async_std::task::spawn_blocking(move || replace_file(&dest_path, &data))
            .await
            .map_err(|e| PackagesIndexError::storage(key, e))
    }
}

/// Atomically replace the content of a file.
///
/// Content is staged in a sibling file and renamed into place so readers only ever
/// see the old or the new content. The rename is synced to the parent directory.
fn replace_file(dest_path: &Path, data: &[u8]) -> std::io::Result<()> {
    let parent = dest_path.parent().ok_or_else(|| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("{} has no parent directory", dest_path.display()),
        )
    })?;

    std::fs::create_dir_all(parent)?;

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(data)?;
    temp.as_file().sync_all()?;
    temp.persist(dest_path).map_err(|e| e.error)?;

    sync_dir(parent)
}

#[cfg(unix)]
fn sync_dir(path: &Path) -> std::io::Result<()> {
    std::fs::File::open(path)?.sync_all()
}

// Directories can't be opened as files on other platforms.
#[cfg(not(unix))]
fn sync_dir(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_write() -> Result<()> {
        let td = tempfile::tempdir()?;
        let store = FilesystemIndexStore::new(td.path());

        let key = "dists/stable/main/binary-amd64/Packages.gz";
        assert_eq!(store.get(key).await?, None);

        store.put(key, b"first".to_vec()).await?;
        store.put(key, b"second".to_vec()).await?;
        assert_eq!(store.get(key).await?, Some(b"second".to_vec()));
        assert_eq!(std::fs::read(store.key_path(key)?)?, b"second");

        // Only the destination file remains; staging files are renamed away.
        let dir = td.path().join("dists/stable/main/binary-amd64");
        assert_eq!(std::fs::read_dir(dir)?.count(), 1);

        store.put("/Packages.gz", vec![]).await?;
        assert_eq!(store.get("Packages.gz").await?, Some(vec![]));

        Ok(())
    }

    #[test]
    fn replace_file_creates_parents() -> Result<()> {
        let td = tempfile::tempdir()?;
        let path = td.path().join("a/b/Packages.gz");

        replace_file(&path, b"first")?;
        replace_file(&path, b"second")?;

        assert_eq!(std::fs::read(&path)?, b"second");
        assert_eq!(std::fs::read_dir(td.path().join("a/b"))?.count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn put_failure_is_storage_error() -> Result<()> {
        let td = tempfile::tempdir()?;
        std::fs::write(td.path().join("dists"), b"not a directory")?;
        let store = FilesystemIndexStore::new(td.path());

        assert!(matches!(
            store.put("dists/Packages.gz", b"data".to_vec()).await,
            Err(PackagesIndexError::Storage { key, .. }) if key == "dists/Packages.gz"
        ));
        assert_eq!(std::fs::read(td.path().join("dists"))?, b"not a directory");

        Ok(())
    }

    #[test]
    fn rejects_escaping_keys() {
        let store = FilesystemIndexStore::new("/nonexistent");

        for key in ["../Packages.gz", "dists/../../Packages.gz", "", "/"] {
            assert!(matches!(
                store.key_path(key),
                Err(PackagesIndexError::Storage { .. })
            ));
        }

        assert_eq!(
            store.key_path("dists/stable/Packages.gz").unwrap(),
            PathBuf::from("/nonexistent/dists/stable/Packages.gz")
        );
    }
}
