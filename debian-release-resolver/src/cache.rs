// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Local cache of `Packages` indices.

Indices are stored decompressed under a directory of the cache root. File
names are derived from the SHA-256 of the component URL they came from, so
the URL is all that is needed to find a cached index.

The creation time of a decompressed index is its *freshness token*: the last
time we know the remote copy to have matched ours. It is sent back to the
remote as an `If-Modified-Since` constraint to avoid downloads of unchanged
indices.
*/

use {
    crate::{
        error::{ResolverError, Result},
        io::{creation_time, decompress_file, ensure_directory, remove_if_exists, Compression},
        repository::{fetch::fetch_compressed_index, location::ComponentUrl, IndexTransport},
    },
    log::{debug, warn},
    sha2::{Digest, Sha256},
    std::{
        path::{Path, PathBuf},
        time::{SystemTime, UNIX_EPOCH},
    },
};

/// Name of the directory under the cache root holding indices.
pub const INDEX_CACHE_DIRECTORY: &str = "deb";

/// Compute the cache key of a component URL.
pub fn cache_key(component_url: &str) -> String {
    hex::encode(Sha256::digest(component_url.as_bytes()))
}

/// A decompressed `Packages` index available locally.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CachedIndex {
    /// Path of the decompressed index.
    pub path: PathBuf,
    /// When the index was decompressed.
    pub fresh_at: SystemTime,
}

impl CachedIndex {
    /// The freshness token as milliseconds since the UNIX epoch.
    pub fn fresh_at_millis(&self) -> u128 {
        self.fresh_at
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default()
    }
}

/// Maintains decompressed `Packages` indices in a local directory.
#[derive(Clone, Debug)]
pub struct IndexCache {
    dir: PathBuf,
    compressions: Vec<String>,
}

impl IndexCache {
    /// Construct an instance rooted at a cache directory.
    ///
    /// `compressions` are compression identifiers (e.g. `gz`) in the order
    /// they should be attempted. The index directory is created if missing.
    pub async fn new(cache_root: impl AsRef<Path>, compressions: Vec<String>) -> Result<Self> {
        let dir = ensure_directory(cache_root.as_ref().join(INDEX_CACHE_DIRECTORY)).await?;

        Ok(Self { dir, compressions })
    }

    /// Construct an instance using [Compression::default_preferred_order()].
    pub async fn with_default_compressions(cache_root: impl AsRef<Path>) -> Result<Self> {
        Self::new(
            cache_root,
            Compression::default_preferred_order()
                .map(|c| c.to_string())
                .collect(),
        )
        .await
    }

    /// The directory holding cached indices.
    pub fn directory(&self) -> &Path {
        &self.dir
    }

    /// Compression identifiers in the order they are attempted.
    pub fn compressions(&self) -> &[String] {
        &self.compressions
    }

    /// Path of the decompressed index for a component.
    pub fn index_path(&self, component: &ComponentUrl) -> PathBuf {
        self.dir.join(format!("{}.txt", cache_key(component.as_str())))
    }

    fn compressed_path(&self, component: &ComponentUrl, compression: Compression) -> PathBuf {
        self.dir.join(format!(
            "{}{}",
            cache_key(component.as_str()),
            compression.extension()
        ))
    }

    /// Obtain the currently cached index for a component, without fetching.
    pub async fn cached_index(&self, component: &ComponentUrl) -> Result<Option<CachedIndex>> {
        let path = self.index_path(component);

        Ok(creation_time(&path)
            .await?
            .map(|fresh_at| CachedIndex { path, fresh_at }))
    }

    /// Ensure a current index for a component is available locally.
    ///
    /// Compressions are attempted in order. The first one yielding a usable
    /// index wins, even if the usable index is the previously cached copy
    /// because fetching or decompressing a new copy failed.
    ///
    /// Errors if no compression yields a usable index.
    pub async fn fetch_index(
        &self,
        transport: &dyn IndexTransport,
        component: &ComponentUrl,
    ) -> Result<CachedIndex> {
        let path = self.index_path(component);
        let mut fresh_at = creation_time(&path).await?;

        for identifier in &self.compressions {
            let compression = match Compression::from_identifier(identifier) {
                Ok(compression) => compression,
                Err(e) => {
                    warn!("not fetching {}: {}", component, e);
                    continue;
                }
            };

            let url = component.packages_url(compression)?;
            let compressed = self.compressed_path(component, compression);

            let downloaded = fetch_compressed_index(transport, &url, &compressed, fresh_at).await;

            if downloaded || fresh_at.is_none() {
                match decompress_file(&compressed, identifier, &path).await {
                    Ok(size) => {
                        debug!("decompressed {} ({} bytes) to {}", url, size, path.display());
                        fresh_at = creation_time(&path).await?;
                    }
                    Err(e) => {
                        warn!("error decompressing {}: {}", url, e);
                    }
                }

                if let Err(e) = remove_if_exists(&compressed).await {
                    warn!("{}", e);
                }
            } else {
                debug!("reusing cached index for {}", url);
            }

            if let Some(fresh_at) = fresh_at {
                return Ok(CachedIndex { path, fresh_at });
            }
        }

        match fresh_at {
            Some(fresh_at) => {
                warn!("no compression could be fetched for {}; using cached index", component);
                Ok(CachedIndex { path, fresh_at })
            }
            None => Err(ResolverError::IndexUnavailable(component.to_string())),
        }
    }
}
