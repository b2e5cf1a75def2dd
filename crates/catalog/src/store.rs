//! File-backed persistence for the catalog.
//!
//! The whole catalog lives in one YAML document. Writes go to a temp file in
//! the same directory which is then renamed over the cache file, so readers
//! never observe a partially written catalog.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use {plugctl_config::Settings, tracing::debug};

use crate::{
    catalog::Catalog,
    error::{Error, Result},
};

/// Name of the file holding the catalog cache.
pub const CATALOG_CACHE_FILE_NAME: &str = "catalog.yaml";

const LOCK_FILE_NAME: &str = "catalog.yaml.lock";

/// Handle on the catalog cache file under one root directory.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    dir: PathBuf,
}

impl CatalogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.catalog_cache_dir)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(CATALOG_CACHE_FILE_NAME)
    }

    /// Read the catalog. A missing or empty file yields an empty catalog.
    pub fn load(&self) -> Result<Catalog> {
        let path = self.path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no catalog cache yet, starting empty");
                return Ok(Catalog::default());
            },
            Err(e) => return Err(Error::persistence(path, e)),
        };
        if raw.trim().is_empty() {
            return Ok(Catalog::default());
        }
        serde_yaml::from_str(&raw).map_err(|source| Error::StoreCorrupt { path, source })
    }

    /// Write the whole catalog, replacing the cache file atomically.
    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        let path = self.path();
        let out = serde_yaml::to_string(catalog).map_err(Error::Encode)?;

        fs::create_dir_all(&self.dir).map_err(|e| Error::persistence(&self.dir, e))?;
        let mut tmp =
            tempfile::NamedTempFile::new_in(&self.dir).map_err(|e| Error::persistence(&path, e))?;
        tmp.write_all(out.as_bytes())
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| Error::persistence(tmp.path(), e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o644))
                .map_err(|e| Error::persistence(tmp.path(), e))?;
        }
        tmp.persist(&path)
            .map_err(|e| Error::persistence(&path, e.error))?;

        debug!(
            path = %path.display(),
            plugins = catalog.index_by_path.len(),
            "saved catalog cache"
        );
        Ok(())
    }

    /// Remove the cache file. A missing file is fine.
    pub fn clean(&self) -> Result<()> {
        let path = self.path();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::persistence(path, e)),
        }
    }

    /// Rewrite the cache in the current format.
    ///
    /// Run after upgrading from a release whose cache lacked some indices.
    pub fn refresh(&self) -> Result<()> {
        self.with_lock(|| {
            let catalog = self.load()?;
            self.save(&catalog)
        })
    }

    /// Run `f` while holding an exclusive advisory lock on the cache.
    ///
    /// Serializes load-mutate-save cycles between processes sharing the same
    /// cache directory.
    pub fn with_lock<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let lock_path = self.dir.join(LOCK_FILE_NAME);
        let lock_err = |source| Error::Lock {
            path: lock_path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(|e| Error::persistence(&self.dir, e))?;
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(lock_err)?;
        let mut lock = fd_lock::RwLock::new(file);
        let _guard = lock.write().map_err(lock_err)?;
        f()
    }
}
