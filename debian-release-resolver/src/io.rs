// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

/*! I/O helpers.

This module holds the compression primitives used for `Packages` indices as
well as the small set of filesystem operations the index cache is built on.
*/

use {
    crate::error::{ResolverError, Result},
    async_compression::futures::bufread::{
        BzDecoder, BzEncoder, GzipDecoder, GzipEncoder, LzmaDecoder, LzmaEncoder, XzDecoder,
        XzEncoder,
    },
    futures::{io::BufReader, AsyncBufRead, AsyncRead, AsyncWriteExt},
    std::{
        path::{Path, PathBuf},
        pin::Pin,
        str::FromStr,
        time::SystemTime,
    },
    strum_macros::{AsRefStr, Display, EnumIter, EnumString},
};

/// Compression format of a `Packages` index.
///
/// The string form of each variant is the identifier used in configuration and
/// is also the filename extension of the index (without the leading `.`).
#[derive(
    AsRefStr, Clone, Copy, Debug, Display, EnumIter, EnumString, Eq, Hash, Ord, PartialEq, PartialOrd,
)]
pub enum Compression {
    /// Gzip compression (.gz extension).
    #[strum(to_string = "gz")]
    Gzip,

    /// XZ compression (.xz extension).
    #[strum(to_string = "xz")]
    Xz,

    /// Bzip2 compression (.bz2 extension).
    #[strum(to_string = "bz2")]
    Bzip2,

    /// LZMA compression (.lzma extension).
    #[strum(to_string = "lzma")]
    Lzma,
}

impl Compression {
    /// Resolve an instance from its identifier.
    ///
    /// Unknown identifiers result in [ResolverError::UnsupportedCompression].
    pub fn from_identifier(identifier: &str) -> Result<Self> {
        Self::from_str(identifier)
            .map_err(|_| ResolverError::UnsupportedCompression(identifier.to_string()))
    }

    /// Filename extension for files compressed in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Gzip => ".gz",
            Self::Xz => ".xz",
            Self::Bzip2 => ".bz2",
            Self::Lzma => ".lzma",
        }
    }

    /// The default retrieval preference order.
    ///
    /// Only gzip is attempted unless configured otherwise.
    pub fn default_preferred_order() -> impl Iterator<Item = Compression> {
        [Self::Gzip].into_iter()
    }
}

/// Wrap a reader with transparent decompression.
pub fn read_decompressed<'a>(
    stream: Pin<Box<dyn AsyncBufRead + Send + 'a>>,
    compression: Compression,
) -> Pin<Box<dyn AsyncRead + Send + 'a>> {
    match compression {
        Compression::Gzip => Box::pin(GzipDecoder::new(stream)),
        Compression::Xz => Box::pin(XzDecoder::new(stream)),
        Compression::Bzip2 => Box::pin(BzDecoder::new(stream)),
        Compression::Lzma => Box::pin(LzmaDecoder::new(stream)),
    }
}

/// Wrap a reader with transparent compression.
pub fn read_compressed<'a>(
    stream: impl AsyncBufRead + Send + 'a,
    compression: Compression,
) -> Pin<Box<dyn AsyncRead + Send + 'a>> {
    match compression {
        Compression::Gzip => Box::pin(GzipEncoder::new(stream)),
        Compression::Xz => Box::pin(XzEncoder::new(stream)),
        Compression::Bzip2 => Box::pin(BzEncoder::new(stream)),
        Compression::Lzma => Box::pin(LzmaEncoder::new(stream)),
    }
}

/// Ensure a directory exists, creating it and its parents if needed.
pub async fn ensure_directory(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();

    async_std::fs::create_dir_all(path)
        .await
        .map_err(|e| ResolverError::CacheIoPath(format!("{}", path.display()), e))?;

    Ok(path.to_path_buf())
}

/// Obtain the creation time of a file.
///
/// Returns [None] if the file does not exist. Filesystems not recording a
/// birth time report the modification time instead.
pub async fn creation_time(path: impl AsRef<Path>) -> Result<Option<SystemTime>> {
    let path = path.as_ref();

    match async_std::fs::metadata(path).await {
        Ok(metadata) => Ok(Some(
            metadata
                .created()
                .or_else(|_| metadata.modified())
                .map_err(|e| ResolverError::CacheIoPath(format!("{}", path.display()), e))?,
        )),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(ResolverError::CacheIoPath(format!("{}", path.display()), e)),
    }
}

/// Remove a file, ignoring it not existing.
pub async fn remove_if_exists(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();

    match async_std::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ResolverError::CacheIoPath(format!("{}", path.display()), e)),
    }
}

/// Open a file for buffered async reading.
pub async fn open_read(path: impl AsRef<Path>) -> std::io::Result<impl AsyncBufRead + Send> {
    Ok(BufReader::new(async_std::fs::File::open(path.as_ref()).await?))
}

/// Drain a reader into a newly created file.
///
/// Failures from any stage feeding `reader` surface as the error of this function.
/// Returns the number of bytes written.
pub async fn pipe_to_file(reader: impl AsyncRead, dest: impl AsRef<Path>) -> std::io::Result<u64> {
    let mut fh = async_std::fs::File::create(dest.as_ref()).await?;

    let bytes_written = futures::io::copy(reader, &mut fh).await?;
    fh.flush().await?;

    Ok(bytes_written)
}

/// Path that content is staged to before being moved to `path`.
fn staging_path(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(".partial");
    PathBuf::from(s)
}

/// Decompress a file to another file.
///
/// `compression` is a compression identifier, e.g. `gz`. Identifiers not
/// known to [Compression] fail with [ResolverError::UnsupportedCompression]
/// before any I/O is performed.
///
/// Output is staged next to `dest` and renamed into place, so `dest` is either
/// fully written or left untouched.
pub async fn decompress_file(
    source: impl AsRef<Path>,
    compression: &str,
    dest: impl AsRef<Path>,
) -> Result<u64> {
    let compression = Compression::from_identifier(compression)?;
    let source = source.as_ref();
    let dest = dest.as_ref();

    let extraction_error = |e: std::io::Error| ResolverError::Extraction {
        path: format!("{}", source.display()),
        source: e,
    };

    let reader = read_decompressed(
        Box::pin(open_read(source).await.map_err(extraction_error)?),
        compression,
    );

    let staging = staging_path(dest);

    match pipe_to_file(reader, &staging).await {
        Ok(size) => {
            async_std::fs::rename(&staging, dest)
                .await
                .map_err(|e| ResolverError::CacheIoPath(format!("{}", dest.display()), e))?;

            Ok(size)
        }
        Err(e) => {
            remove_if_exists(&staging).await?;
            Err(extraction_error(e))
        }
    }
}
