/*
 *  cache.rs
 *
 *  PaperPi - e-paper plugin rotation
 *  (c) 2020-26 Stuart Hunter
 *
 *  On-disk cache for downloaded plugin assets
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use log::{debug, error, info, warn};
use rand::distr::Alphanumeric;
use rand::Rng;
use reqwest::{header, Client};
use thiserror::Error;
use tokio::sync::Mutex as AsyncMutex;

use crate::constants::CACHE_PREFIX;

const USER_AGENT: &str = concat!("PaperPi ", env!("CARGO_PKG_NAME"), " v", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("download failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("'{0}' is not a usable cache id")]
    InvalidId(String),
}

/// Shared by every unit; downloads of the same target are serialized
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    temporary: bool,
    client: Client,
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl CacheStore {
    /// Use `path`, or a fresh `paperpi_XXXXXXXX` directory under the temp dir
    pub fn new(path: Option<PathBuf>) -> Result<Self, CacheError> {
        let (root, temporary) = match path {
            Some(p) => (p, false),
            None => {
                let suffix: String = rand::rng()
                    .sample_iter(&Alphanumeric)
                    .take(8)
                    .map(char::from)
                    .collect();
                (std::env::temp_dir().join(format!("{}{}", CACHE_PREFIX, suffix)), true)
            }
        };
        std::fs::create_dir_all(&root)?;

        let mut headers = header::HeaderMap::new();
        headers.insert("User-Agent", header::HeaderValue::from_static(USER_AGENT));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()?;

        info!("file cache at {} (temporary: {})", root.display(), temporary);
        Ok(Self { root, temporary, client, locks: Mutex::new(HashMap::new()) })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Where `relative_id` lives in the cache; `None` for ids escaping the root
    pub fn local_path(&self, relative_id: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        let mut parts = 0;
        for component in Path::new(relative_id).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    parts += 1;
                }
                Component::CurDir => {}
                _ => return None,
            }
        }
        (parts > 0).then_some(path)
    }

    /// Download `url` to `relative_id` unless it is already cached
    ///
    /// Returns the local path, or `None` after logging any failure.
    pub async fn fetch_and_cache(&self, url: &str, relative_id: &str, force: bool) -> Option<PathBuf> {
        let Some(local) = self.local_path(relative_id) else {
            error!("{}", CacheError::InvalidId(relative_id.to_string()));
            return None;
        };
        if !force && local.exists() {
            debug!("{} previously cached", local.display());
            return Some(local);
        }

        let lock = self.lock_for(&local);
        let cached = {
            let _guard = lock.lock().await;
            self.fetch_locked(url, local.clone(), force).await
        };
        self.release_lock(&local, lock);
        cached
    }

    async fn fetch_locked(&self, url: &str, local: PathBuf, force: bool) -> Option<PathBuf> {
        // someone else may have finished it while we waited
        if !force && local.exists() {
            debug!("{} cached while waiting", local.display());
            return Some(local);
        }

        debug!("caching {} to {}", url, local.display());
        match self.download(url, &local).await {
            Ok(bytes) => {
                debug!("wrote {} bytes to {}", bytes, local.display());
                Some(local)
            }
            Err(e) => {
                error!("failed to cache {}: {}", url, e);
                None
            }
        }
    }

    fn lock_table(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Arc<AsyncMutex<()>>>> {
        match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock_for(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        self.lock_table().entry(path.to_path_buf()).or_default().clone()
    }

    /// Forget the path lock once only the table and `lock` hold it
    fn release_lock(&self, path: &Path, lock: Arc<AsyncMutex<()>>) {
        let mut locks = self.lock_table();
        if Arc::strong_count(&lock) <= 2 {
            locks.remove(path);
        }
    }

    async fn download(&self, url: &str, local: &Path) -> Result<usize, CacheError> {
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()? // none 2xx raise
            .bytes()
            .await?;

        let mut part = local.as_os_str().to_owned();
        part.push(".part");
        let part = PathBuf::from(part);
        tokio::fs::write(&part, &body).await?;
        tokio::fs::rename(&part, local).await?;
        Ok(body.len())
    }

    /// Remove plain files in `subpath` last modified more than `age` ago
    pub fn evict_older_than(&self, age: Duration, subpath: &str) -> Vec<PathBuf> {
        let dir = if subpath.is_empty() {
            Some(self.root.clone())
        } else {
            self.local_path(subpath)
        };
        let Some(dir) = dir else {
            error!("{}", CacheError::InvalidId(subpath.to_string()));
            return Vec::new();
        };
        if age.is_zero() {
            warn!("evicting every file in {}", dir.display());
        }

        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!("cannot scan {} for stale files: {}", dir.display(), e);
                return Vec::new();
            }
        };

        let now = SystemTime::now();
        let mut stale: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .filter(|entry| {
                let Ok(meta) = entry.metadata() else { return false };
                if !meta.is_file() {
                    return false;
                }
                meta.modified()
                    .ok()
                    .and_then(|m| now.duration_since(m).ok())
                    .is_some_and(|elapsed| elapsed > age)
            })
            .map(|entry| entry.path())
            .collect();
        stale.sort();

        stale.retain(|file| match std::fs::remove_file(file) {
            Ok(()) => {
                debug!("evicted {}", file.display());
                true
            }
            Err(e) => {
                warn!("could not evict {}: {}", file.display(), e);
                false
            }
        });
        info!("evicted {} stale files from {}", stale.len(), dir.display());
        stale
    }

    /// Recursively remove the cache root
    pub fn cleanup(&self) {
        debug!("removing cache {}", self.root.display());
        if let Err(e) = std::fs::remove_dir_all(&self.root) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("could not remove cache {}: {}", self.root.display(), e);
            }
        }
    }
}
