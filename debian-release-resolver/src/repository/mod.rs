// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian repository primitives.

A Debian repository is a collection of files holding packages and other
support primitives. See <https://wiki.debian.org/DebianRepository/Format>
for the canonical definition of a Debian repository.

This module defines the [IndexTransport] trait, through which all remote
reads go, along with implementations for HTTP and local filesystem hosted
repositories. [location] turns parameterized repository URLs into per-component
index locations and [fetch] implements conditional retrieval of `Packages`
indices.
*/

use {
    crate::error::{ResolverError, Result},
    async_trait::async_trait,
    futures::AsyncRead,
    std::{pin::Pin, time::SystemTime},
    url::Url,
};

pub mod fetch;
pub mod filesystem;
#[cfg(feature = "http")]
pub mod http;
pub mod location;

/// Result of a conditional freshness probe.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProbeStatus {
    /// The remote content has not changed since the probed time.
    NotModified,
    /// The remote content changed, or the transport could not tell.
    Modified,
}

/// Generic mechanism for reading content from a repository.
///
/// Implementations report transport failures as errors. Deciding what a
/// failure means is left to callers.
#[async_trait]
pub trait IndexTransport: Send + Sync {
    /// Probe whether content at a URL changed since a point in time.
    async fn probe(&self, url: &Url, modified_since: SystemTime) -> Result<ProbeStatus>;

    /// Get the content of a URL as an async reader.
    ///
    /// The raw content is returned without any decoding applied.
    async fn get(&self, url: &Url) -> Result<Pin<Box<dyn AsyncRead + Send>>>;
}

/// An [IndexTransport] that dispatches on the URL scheme.
///
/// `http://` and `https://` URLs go to [http::HttpTransport] and `file://`
/// URLs go to [filesystem::FilesystemTransport].
pub struct SchemeTransport {
    #[cfg(feature = "http")]
    http: http::HttpTransport,
    filesystem: filesystem::FilesystemTransport,
}

impl SchemeTransport {
    /// Construct an instance, optionally sending a custom HTTP `User-Agent`.
    pub fn new(user_agent: Option<&str>) -> Result<Self> {
        #[cfg(not(feature = "http"))]
        let _ = user_agent;

        Ok(Self {
            #[cfg(feature = "http")]
            http: match user_agent {
                Some(user_agent) => http::HttpTransport::with_user_agent(user_agent)?,
                None => http::HttpTransport::default(),
            },
            filesystem: filesystem::FilesystemTransport::default(),
        })
    }

    fn transport_for_url(&self, url: &Url) -> Result<&dyn IndexTransport> {
        match url.scheme() {
            #[cfg(feature = "http")]
            "http" | "https" => Ok(&self.http),
            "file" => Ok(&self.filesystem),
            scheme => Err(ResolverError::UnsupportedTransportScheme(scheme.to_string())),
        }
    }
}

#[async_trait]
impl IndexTransport for SchemeTransport {
    async fn probe(&self, url: &Url, modified_since: SystemTime) -> Result<ProbeStatus> {
        self.transport_for_url(url)?
            .probe(url, modified_since)
            .await
    }

    async fn get(&self, url: &Url) -> Result<Pin<Box<dyn AsyncRead + Send>>> {
        self.transport_for_url(url)?.get(url).await
    }
}

#[cfg(test)]
mod test {
    use {super::*, futures::AsyncReadExt};

    #[tokio::test]
    async fn scheme_dispatch() -> Result<()> {
        let td = tempfile::tempdir()?;
        let path = td.path().join("Packages.gz");
        std::fs::write(&path, b"data")?;

        let transport = SchemeTransport::new(None)?;

        let url = Url::from_file_path(&path).unwrap();
        let mut data = vec![];
        transport.get(&url).await?.read_to_end(&mut data).await?;
        assert_eq!(data, b"data");

        let res = transport
            .get(&Url::parse("ftp://example.com/Packages.gz")?)
            .await;
        assert!(matches!(
            res,
            Err(ResolverError::UnsupportedTransportScheme(s)) if s == "ftp"
        ));

        Ok(())
    }
}
