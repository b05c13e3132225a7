// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! Debian repository HTTP client.

This module provides functionality for interfacing with HTTP based Debian
repositories.
*/

use {
    crate::{
        error::{ResolverError, Result},
        repository::{IndexTransport, ProbeStatus},
    },
    async_trait::async_trait,
    futures::{stream::TryStreamExt, AsyncRead},
    log::debug,
    reqwest::{header::IF_MODIFIED_SINCE, Client, StatusCode, Url},
    std::{pin::Pin, time::SystemTime},
};

/// Format a point in time as an HTTP date (RFC 7231 IMF-fixdate).
pub fn http_date(time: SystemTime) -> String {
    chrono::DateTime::<chrono::Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// [IndexTransport] speaking HTTP.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Construct an instance using the given [Client].
    pub fn new_client(client: Client) -> Self {
        Self { client }
    }

    /// Construct an instance sending a custom `User-Agent` header.
    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        Ok(Self::new_client(
            Client::builder().user_agent(user_agent).build()?,
        ))
    }
}

#[async_trait]
impl IndexTransport for HttpTransport {
    async fn probe(&self, url: &Url, modified_since: SystemTime) -> Result<ProbeStatus> {
        let res = self
            .client
            .head(url.clone())
            .header(IF_MODIFIED_SINCE, http_date(modified_since))
            .send()
            .await?;

        debug!("HEAD {} -> {}", url, res.status());

        Ok(if res.status() == StatusCode::NOT_MODIFIED {
            ProbeStatus::NotModified
        } else {
            ProbeStatus::Modified
        })
    }

    async fn get(&self, url: &Url) -> Result<Pin<Box<dyn AsyncRead + Send>>> {
        let res = self.client.get(url.clone()).send().await.map_err(|e| {
            ResolverError::TransportIo(
                url.to_string(),
                std::io::Error::new(
                    std::io::ErrorKind::Other,
                    format!("error sending HTTP request: {:?}", e),
                ),
            )
        })?;

        if !res.status().is_success() {
            return Err(ResolverError::TransportStatus(
                url.to_string(),
                res.status().as_u16(),
            ));
        }

        Ok(Box::pin(
            res.bytes_stream()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("{:?}", e)))
                .into_async_read(),
        ))
    }
}
