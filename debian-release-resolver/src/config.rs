// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Resolver configuration. */

use {
    crate::{error::Result, io::Compression},
    serde::{Deserialize, Serialize},
    std::{
        path::{Path, PathBuf},
        time::Duration,
    },
};

/// Name of the directory under the user cache directory holding our state.
pub const CACHE_DIRECTORY_NAME: &str = "debian-release-resolver";

/// Resolve the default root cache directory.
///
/// This is `debian-release-resolver` under the user's cache directory (e.g.
/// `$XDG_CACHE_HOME` or `~/.cache` on Linux), falling back to the system
/// temporary directory.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(CACHE_DIRECTORY_NAME)
}

fn default_compressions() -> Vec<String> {
    Compression::default_preferred_order()
        .map(|c| c.to_string())
        .collect()
}

fn default_parse_cache_ttl_secs() -> u64 {
    86400
}

fn default_concurrency() -> usize {
    4
}

/// Configures a [crate::resolver::ReleaseResolver].
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ResolverConfig {
    /// Root directory for cached state.
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Compression identifiers of indices, in the order they are attempted.
    #[serde(default = "default_compressions")]
    pub compressions: Vec<String>,

    /// How long parse results are retained in memory, in seconds.
    #[serde(default = "default_parse_cache_ttl_secs")]
    pub parse_cache_ttl_secs: u64,

    /// Maximum number of components processed at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// `User-Agent` sent with HTTP requests.
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            compressions: default_compressions(),
            parse_cache_ttl_secs: default_parse_cache_ttl_secs(),
            concurrency: default_concurrency(),
            user_agent: None,
        }
    }
}

impl ResolverConfig {
    /// Parse an instance from a YAML document.
    pub fn from_yaml_reader(reader: impl std::io::Read) -> Result<Self> {
        Ok(serde_yaml::from_reader(reader)?)
    }

    /// Parse an instance from a YAML file.
    pub fn from_yaml_path(path: impl AsRef<Path>) -> Result<Self> {
        let fh = std::fs::File::open(path.as_ref())?;

        Self::from_yaml_reader(std::io::BufReader::new(fh))
    }

    /// How long parse results are retained in memory.
    pub fn parse_cache_ttl(&self) -> Duration {
        Duration::from_secs(self.parse_cache_ttl_secs)
    }

    /// Effective concurrency. Never less than 1.
    pub fn effective_concurrency(&self) -> usize {
        self.concurrency.max(1)
    }
}
