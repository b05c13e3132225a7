// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Conditional retrieval of compressed indices. */

use {
    crate::{
        error::{ResolverError, Result},
        io::{pipe_to_file, remove_if_exists},
        repository::{IndexTransport, ProbeStatus},
    },
    log::{debug, warn},
    std::{path::Path, time::SystemTime},
    url::Url,
};

async fn download(transport: &dyn IndexTransport, url: &Url, dest: &Path) -> Result<u64> {
    let reader = transport.get(url).await?;

    pipe_to_file(reader, dest)
        .await
        .map_err(|e| ResolverError::TransportIo(url.to_string(), e))
}

/// Fetch a compressed index to a local path if the remote copy changed.
///
/// `last_fresh` is the time our local copy of the content was last known to be
/// current. When [None], the content is always downloaded. Otherwise the
/// transport is probed and the download only happens if the content was
/// modified since then. A failed probe is treated as a modification.
///
/// Download failures are logged and reported as no download having occurred.
/// A partially written `dest` is removed.
///
/// Returns whether new content now exists at `dest`.
pub async fn fetch_compressed_index(
    transport: &dyn IndexTransport,
    url: &Url,
    dest: &Path,
    last_fresh: Option<SystemTime>,
) -> bool {
    if let Some(since) = last_fresh {
        match transport.probe(url, since).await {
            Ok(ProbeStatus::NotModified) => {
                debug!("{} not modified; skipping download", url);
                return false;
            }
            Ok(ProbeStatus::Modified) => {
                debug!("{} modified", url);
            }
            Err(e) => {
                warn!("freshness probe of {} failed; assuming modified: {}", url, e);
            }
        }
    }

    match download(transport, url, dest).await {
        Ok(size) => {
            debug!("downloaded {} ({} bytes) to {}", url, size, dest.display());
            true
        }
        Err(e) => {
            warn!("error downloading {}: {}", url, e);

            if let Err(e) = remove_if_exists(dest).await {
                warn!("{}", e);
            }

            false
        }
    }
}

#[cfg(test)]
mod test {
    use {
        super::*,
        crate::testutil::{MockResponse, MockTransport},
    };

    const URL: &str = "http://example.com/debian/dists/stable/main/binary-amd64/Packages.gz";

    #[tokio::test]
    async fn download_without_token() -> Result<()> {
        let td = tempfile::tempdir()?;
        let dest = td.path().join("index.gz");
        let url = Url::parse(URL)?;

        let transport = MockTransport::default();
        transport.set_response(URL, MockResponse::Body(b"content".to_vec()));

        assert!(fetch_compressed_index(&transport, &url, &dest, None).await);
        assert_eq!(std::fs::read(&dest)?, b"content");
        assert_eq!(transport.probe_count(), 0);
        assert_eq!(transport.get_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn not_modified_skips_download() -> Result<()> {
        let td = tempfile::tempdir()?;
        let dest = td.path().join("index.gz");
        let url = Url::parse(URL)?;

        let transport = MockTransport::default();
        transport.set_response(URL, MockResponse::Body(b"content".to_vec()));
        transport.set_modified(URL, false);

        assert!(!fetch_compressed_index(&transport, &url, &dest, Some(SystemTime::now())).await);
        assert!(!dest.exists());
        assert_eq!(transport.probe_count(), 1);
        assert_eq!(transport.get_count(), 0);

        transport.set_modified(URL, true);
        assert!(fetch_compressed_index(&transport, &url, &dest, Some(SystemTime::now())).await);
        assert_eq!(transport.probe_count(), 2);
        assert_eq!(transport.get_count(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn probe_failure_assumes_modified() -> Result<()> {
        let td = tempfile::tempdir()?;
        let dest = td.path().join("index.gz");
        let url = Url::parse(URL)?;

        let transport = MockTransport::default();
        transport.set_response(URL, MockResponse::Body(b"content".to_vec()));
        transport.set_probe_failing(URL, true);

        assert!(fetch_compressed_index(&transport, &url, &dest, Some(SystemTime::now())).await);
        assert_eq!(std::fs::read(&dest)?, b"content");

        Ok(())
    }

    #[tokio::test]
    async fn download_failures() -> Result<()> {
        let td = tempfile::tempdir()?;
        let dest = td.path().join("index.gz");
        let url = Url::parse(URL)?;

        let transport = MockTransport::default();

        transport.set_response(URL, MockResponse::Unreachable);
        assert!(!fetch_compressed_index(&transport, &url, &dest, None).await);
        assert!(!dest.exists());

        transport.set_response(URL, MockResponse::Truncated(b"partial".to_vec()));
        assert!(!fetch_compressed_index(&transport, &url, &dest, None).await);
        assert!(!dest.exists());

        Ok(())
    }
}
