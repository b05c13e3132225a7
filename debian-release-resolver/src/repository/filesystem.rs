// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Filesystem based Debian repositories. */

use {
    crate::{
        error::{ResolverError, Result},
        repository::{IndexTransport, ProbeStatus},
    },
    async_trait::async_trait,
    futures::AsyncRead,
    std::{path::PathBuf, pin::Pin, time::SystemTime},
    url::Url,
};

/// [IndexTransport] reading `file://` URLs from the local filesystem.
///
/// Probes compare the file's modification time against the probed time.
#[derive(Clone, Debug, Default)]
pub struct FilesystemTransport {}

fn url_path(url: &Url) -> Result<PathBuf> {
    url.to_file_path().map_err(|_| {
        ResolverError::TransportIo(
            url.to_string(),
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "URL does not refer to a local path",
            ),
        )
    })
}

#[async_trait]
impl IndexTransport for FilesystemTransport {
    async fn probe(&self, url: &Url, modified_since: SystemTime) -> Result<ProbeStatus> {
        let path = url_path(url)?;

        let modified = async_std::fs::metadata(&path)
            .await
            .and_then(|metadata| metadata.modified())
            .map_err(|e| ResolverError::TransportIo(url.to_string(), e))?;

        Ok(if modified > modified_since {
            ProbeStatus::Modified
        } else {
            ProbeStatus::NotModified
        })
    }

    async fn get(&self, url: &Url) -> Result<Pin<Box<dyn AsyncRead + Send>>> {
        let path = url_path(url)?;

        let fh = async_std::fs::File::open(&path)
            .await
            .map_err(|e| ResolverError::TransportIo(url.to_string(), e))?;

        Ok(Box::pin(fh))
    }
}
