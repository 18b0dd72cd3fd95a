//! Archive byte streams handed from the downloader to the extractor

use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use hydrofetch_errors::{Error, NetworkError};
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

/// An open, readable byte source positioned at the start of an archive.
///
/// Consuming the stream (or dropping it) closes the underlying connection.
pub struct ArchiveStream {
    source: String,
    content_length: Option<u64>,
    inner: BoxStream<'static, Result<Bytes, Error>>,
}

impl ArchiveStream {
    /// Wrap the body of an HTTP response
    #[must_use]
    pub fn from_response(response: reqwest::Response) -> Self {
        let source = response.url().to_string();
        let content_length = response.content_length();
        let inner = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| NetworkError::DownloadFailed(e.to_string()).into()))
            .boxed();

        Self {
            source,
            content_length,
            inner,
        }
    }

    /// Wrap an in-memory buffer
    #[must_use]
    pub fn from_bytes(source: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let data: Bytes = data.into();
        Self {
            source: source.into(),
            content_length: Some(data.len() as u64),
            inner: stream::once(async move { Ok(data) }).boxed(),
        }
    }

    /// Where the bytes come from (the final request URL)
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Declared length, if the server sent one
    #[must_use]
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Write the whole stream to `dest`, returning the number of bytes written
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written, or if the
    /// connection fails mid-stream.
    pub async fn spool_to(mut self, dest: &Path) -> Result<u64, Error> {
        let mut file = File::create(dest)
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
        let mut written = 0u64;

        while let Some(chunk) = self.inner.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)
                .await
                .map_err(|e| Error::io_with_path(&e, dest))?;
            written += chunk.len() as u64;
        }

        file.flush()
            .await
            .map_err(|e| Error::io_with_path(&e, dest))?;
        Ok(written)
    }
}

impl std::fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("source", &self.source)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_spool_in_memory_stream() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("bag.zip");

        let stream = ArchiveStream::from_bytes("memory://bag", b"PK\x03\x04data".to_vec());
        assert_eq!(stream.content_length(), Some(8));

        let written = stream.spool_to(&dest).await.unwrap();
        assert_eq!(written, 8);
        assert_eq!(tokio::fs::read(&dest).await.unwrap(), b"PK\x03\x04data");
    }

    #[tokio::test]
    async fn test_spool_to_missing_directory_fails_with_path() {
        let temp = tempfile::tempdir().unwrap();
        let dest = temp.path().join("missing").join("bag.zip");

        let err = ArchiveStream::from_bytes("memory://bag", vec![1u8, 2, 3])
            .spool_to(&dest)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { path: Some(ref p), .. } if p == &dest));
    }
}
