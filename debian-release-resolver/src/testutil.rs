// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use {
    crate::{
        error::{ResolverError, Result},
        io::{read_compressed, Compression},
        repository::{IndexTransport, ProbeStatus},
    },
    async_trait::async_trait,
    futures::{AsyncRead, AsyncReadExt},
    std::{
        collections::HashMap,
        pin::Pin,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Mutex,
        },
        task::{Context, Poll},
        time::SystemTime,
    },
    url::Url,
};

/// Compress data in memory.
pub async fn compress(data: &[u8], compression: Compression) -> Vec<u8> {
    let mut res = vec![];
    read_compressed(futures::io::Cursor::new(data.to_vec()), compression)
        .read_to_end(&mut res)
        .await
        .unwrap();

    res
}

/// What a [MockTransport] serves for a URL.
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Serve the given bytes.
    Body(Vec<u8>),
    /// Serve the given bytes, then fail mid-stream.
    Truncated(Vec<u8>),
    /// Fail the request before any content is sent.
    Unreachable,
}

struct MockEntry {
    response: MockResponse,
    modified: bool,
    probe_failing: bool,
}

struct ResetReader;

impl AsyncRead for ResetReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut [u8],
    ) -> Poll<std::io::Result<usize>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by peer",
        )))
    }
}

/// An in-memory [IndexTransport] recording how it is used.
///
/// A URL reports modified until its content is successfully fetched and
/// again after its response is replaced.
#[derive(Default)]
pub struct MockTransport {
    entries: Mutex<HashMap<String, MockEntry>>,
    probes: AtomicUsize,
    gets: AtomicUsize,
}

impl MockTransport {
    pub fn set_response(&self, url: &str, response: MockResponse) {
        let mut entries = self.entries.lock().unwrap();

        let probe_failing = entries
            .get(url)
            .map(|entry| entry.probe_failing)
            .unwrap_or_default();

        entries.insert(
            url.to_string(),
            MockEntry {
                response,
                modified: true,
                probe_failing,
            },
        );
    }

    /// Serve `content` compressed with `compression`.
    pub async fn set_content(&self, url: &str, content: &[u8], compression: Compression) {
        self.set_response(url, MockResponse::Body(compress(content, compression).await));
    }

    pub fn set_modified(&self, url: &str, modified: bool) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(url) {
            entry.modified = modified;
        }
    }

    pub fn set_probe_failing(&self, url: &str, failing: bool) {
        if let Some(entry) = self.entries.lock().unwrap().get_mut(url) {
            entry.probe_failing = failing;
        }
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexTransport for MockTransport {
    async fn probe(&self, url: &Url, _modified_since: SystemTime) -> Result<ProbeStatus> {
        self.probes.fetch_add(1, Ordering::SeqCst);

        let entries = self.entries.lock().unwrap();

        match entries.get(url.as_str()) {
            Some(entry) if entry.probe_failing => Err(ResolverError::TransportIo(
                url.to_string(),
                std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out"),
            )),
            Some(entry) if entry.modified => Ok(ProbeStatus::Modified),
            Some(_) => Ok(ProbeStatus::NotModified),
            None => Err(ResolverError::TransportStatus(url.to_string(), 404)),
        }
    }

    async fn get(&self, url: &Url) -> Result<Pin<Box<dyn AsyncRead + Send>>> {
        self.gets.fetch_add(1, Ordering::SeqCst);

        let mut entries = self.entries.lock().unwrap();

        let entry = entries
            .get_mut(url.as_str())
            .ok_or_else(|| ResolverError::TransportStatus(url.to_string(), 404))?;

        match entry.response.clone() {
            MockResponse::Body(data) => {
                entry.modified = false;
                Ok(Box::pin(futures::io::Cursor::new(data)))
            }
            MockResponse::Truncated(data) => {
                Ok(Box::pin(futures::io::Cursor::new(data).chain(ResetReader)))
            }
            MockResponse::Unreachable => Err(ResolverError::TransportIo(
                url.to_string(),
                std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
            )),
        }
    }
}
