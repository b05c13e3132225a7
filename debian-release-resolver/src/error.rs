// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Error handling. */

use {std::sync::Arc, thiserror::Error};

/// Primary crate error type.
#[derive(Debug, Error)]
pub enum ResolverError {
    #[error("URL error: {0:?}")]
    Url(#[from] url::ParseError),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0:?}")]
    Reqwest(#[from] reqwest::Error),

    #[error("I/O error: {0:?}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0:?}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid repository location {location}: {reason}")]
    InvalidRepositoryLocation { location: String, reason: String },

    #[error("repository location {location} lacks required parameter: {parameter}")]
    MissingLocationParameter {
        location: String,
        parameter: &'static str,
    },

    #[error("repository location {0} defines neither a release nor a suite")]
    NoReleaseSelector(String),

    #[error("transport I/O error on {0}: {1:?}")]
    TransportIo(String, std::io::Error),

    #[error("bad HTTP status fetching {0}: {1}")]
    TransportStatus(String, u16),

    #[error("unsupported transport URL scheme: {0}")]
    UnsupportedTransportScheme(String),

    #[error("unsupported compression: {0}")]
    UnsupportedCompression(String),

    #[error("error extracting {path}: {source:?}")]
    Extraction {
        path: String,
        source: std::io::Error,
    },

    #[error("cache I/O error on path {0}: {1:?}")]
    CacheIoPath(String, std::io::Error),

    #[error("no package index could be obtained for {0}")]
    IndexUnavailable(String),

    #[error("no package index could be obtained for any component of {0}")]
    NoIndexAvailable(String),

    #[error("{0}")]
    Shared(Arc<ResolverError>),
}

/// Result wrapper for this crate.
pub type Result<T> = std::result::Result<T, ResolverError>;
