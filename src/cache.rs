//! Versioned static-asset cache for offline use
//!
//! Assets are copied into `<root>/<cache name>/` on install and served
//! cache-first afterwards. Activating a cache version purges every other
//! version found under the same root.

use crate::error::{PixkitError, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Identifier of the current cache version
pub const CACHE_NAME: &str = "pixkit-v1";

/// Request paths stored on install; `/` is served from `index.html`
pub const PRECACHE_PATHS: &[&str] = &[
    "/",
    "/index.html",
    "/styles.css",
    "/script.js",
    "/manifest.json",
];

/// Where a fetched asset came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetSource {
    Cache,
    /// Cache miss served from the asset directory
    Origin,
}

/// Asset bytes returned by [`AssetCache::fetch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedAsset {
    pub bytes: Vec<u8>,
    pub source: AssetSource,
}

/// Static-asset cache manager
#[derive(Debug, Clone)]
pub struct AssetCache {
    root: PathBuf,
    name: String,
}

impl AssetCache {
    /// Open the current cache version under the default root
    ///
    /// The root is `$PIXKIT_CACHE_DIR` when set, else `<platform cache dir>/pixkit`.
    ///
    /// # Errors
    /// - No platform cache directory and no override
    pub fn new() -> Result<Self> {
        Ok(Self::with_root(Self::default_root()?))
    }

    /// Open the current cache version under an explicit root
    #[must_use]
    pub fn with_root<P: AsRef<Path>>(root: P) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            name: CACHE_NAME.to_string(),
        }
    }

    /// Use a different cache version name
    #[must_use]
    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    fn default_root() -> Result<PathBuf> {
        if let Ok(cache_override) = std::env::var("PIXKIT_CACHE_DIR") {
            return Ok(PathBuf::from(cache_override));
        }

        Ok(dirs::cache_dir()
            .ok_or_else(|| {
                PixkitError::invalid_config(
                    "Failed to determine cache directory. Set PIXKIT_CACHE_DIR environment variable.",
                )
            })?
            .join("pixkit"))
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory holding this version's assets
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.root.join(&self.name)
    }

    /// Map a request path to a file name relative to an asset root
    ///
    /// # Errors
    /// - Path escapes the asset root
    pub fn asset_file_name(request_path: &str) -> Result<PathBuf> {
        let trimmed = request_path.trim_start_matches('/');
        if trimmed.is_empty() {
            return Ok(PathBuf::from("index.html"));
        }

        let relative = PathBuf::from(trimmed);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(PixkitError::invalid_input(format!(
                "Asset path '{}' is not allowed",
                request_path
            )));
        }
        Ok(relative)
    }

    /// Copy every precached asset from `asset_dir` into the cache
    ///
    /// All assets are read first, then written into a staging directory that
    /// replaces this version's directory only once every write succeeded. A
    /// missing asset or a failed write leaves the previous cache contents in place.
    ///
    /// # Errors
    /// - A precached asset is missing from `asset_dir`
    /// - Cache directory cannot be written
    pub fn install<P: AsRef<Path>>(&self, asset_dir: P) -> Result<usize> {
        let asset_dir = asset_dir.as_ref();

        let mut staged = Vec::with_capacity(PRECACHE_PATHS.len());
        for request_path in PRECACHE_PATHS {
            let relative = Self::asset_file_name(request_path)?;
            let source = asset_dir.join(&relative);
            let bytes = fs::read(&source)
                .map_err(|e| PixkitError::file_io_error("read asset", &source, &e))?;
            staged.push((relative, bytes));
        }

        let staging_dir = self.staging_dir();
        if staging_dir.exists() {
            fs::remove_dir_all(&staging_dir).map_err(|e| {
                PixkitError::file_io_error("clear staging directory", &staging_dir, &e)
            })?;
        }
        if let Err(e) = Self::write_assets(&staging_dir, &staged) {
            if let Err(cleanup) = fs::remove_dir_all(&staging_dir) {
                log::warn!(
                    "Failed to clean up staging directory {}: {}",
                    staging_dir.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        let cache_dir = self.cache_dir();
        if cache_dir.exists() {
            fs::remove_dir_all(&cache_dir)
                .map_err(|e| PixkitError::file_io_error("replace cache", &cache_dir, &e))?;
        }
        fs::rename(&staging_dir, &cache_dir)
            .map_err(|e| PixkitError::file_io_error("publish cache", &cache_dir, &e))?;

        log::info!(
            "Installed {} assets into cache {} ({})",
            staged.len(),
            self.name,
            cache_dir.display()
        );
        Ok(staged.len())
    }

    fn staging_dir(&self) -> PathBuf {
        self.root.join(format!(".{}.staging", self.name))
    }

    fn write_assets(target_dir: &Path, assets: &[(PathBuf, Vec<u8>)]) -> Result<()> {
        for (relative, bytes) in assets {
            let target = target_dir.join(relative);
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| {
                    PixkitError::file_io_error("create cache directory", parent, &e)
                })?;
            }
            fs::write(&target, bytes)
                .map_err(|e| PixkitError::file_io_error("write cached asset", &target, &e))?;
        }
        Ok(())
    }

    /// Cached bytes for a request path, if present
    ///
    /// # Errors
    /// - Path escapes the cache directory
    /// - Cached file exists but cannot be read
    pub fn lookup(&self, request_path: &str) -> Result<Option<Vec<u8>>> {
        let cached = self.cache_dir().join(Self::asset_file_name(request_path)?);
        if !cached.is_file() {
            return Ok(None);
        }
        fs::read(&cached)
            .map(Some)
            .map_err(|e| PixkitError::file_io_error("read cached asset", &cached, &e))
    }

    /// Serve from the cache, falling back to `asset_dir` on a miss
    ///
    /// # Errors
    /// - Asset is neither cached nor present in `asset_dir`
    pub fn fetch<P: AsRef<Path>>(&self, request_path: &str, asset_dir: P) -> Result<FetchedAsset> {
        if let Some(bytes) = self.lookup(request_path)? {
            return Ok(FetchedAsset {
                bytes,
                source: AssetSource::Cache,
            });
        }

        let origin = asset_dir.as_ref().join(Self::asset_file_name(request_path)?);
        log::debug!("Cache miss for {}, reading {}", request_path, origin.display());
        let bytes = fs::read(&origin)
            .map_err(|e| PixkitError::file_io_error("read asset", &origin, &e))?;
        Ok(FetchedAsset {
            bytes,
            source: AssetSource::Origin,
        })
    }

    /// Names of every cache version under the root, sorted
    ///
    /// Hidden entries such as install staging directories are skipped.
    ///
    /// # Errors
    /// - Root exists but cannot be listed
    pub fn list_caches(&self) -> Result<Vec<String>> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.root)
            .map_err(|e| PixkitError::file_io_error("read cache root", &self.root, &e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry?;
            if entry.path().is_dir() {
                if let Some(name) = entry.file_name().to_str() {
                    if !name.starts_with('.') {
                        names.push(name.to_string());
                    }
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete every cache version other than this one
    ///
    /// Returns the purged cache names.
    ///
    /// # Errors
    /// - A stale cache directory cannot be removed
    pub fn activate(&self) -> Result<Vec<String>> {
        let mut purged = Vec::new();

        for name in self.list_caches()? {
            if name == self.name {
                continue;
            }
            let path = self.root.join(&name);
            log::info!("Removing stale cache: {}", name);
            fs::remove_dir_all(&path)
                .map_err(|e| PixkitError::file_io_error("remove stale cache", &path, &e))?;
            purged.push(name);
        }

        Ok(purged)
    }
}
