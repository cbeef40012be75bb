use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tokio_util::io::ReaderStream;
use tracing::debug;

/// A captured or picked media file on local storage.
///
/// The handle owns nothing but the path; `delete` consumes it so a deleted
/// file cannot be reopened through a stale handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    path: PathBuf,
}

impl MediaFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Synchronous read handle.
    pub fn open(&self) -> io::Result<File> {
        File::open(&self.path)
    }

    /// Whole contents, read asynchronously.
    pub async fn read_bytes(&self) -> io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }

    /// Chunked async byte stream over the file.
    pub async fn stream(&self) -> io::Result<ReaderStream<tokio::fs::File>> {
        let file = tokio::fs::File::open(&self.path).await?;
        Ok(ReaderStream::new(file))
    }

    pub fn delete(self) -> io::Result<()> {
        debug!(path = %self.path.display(), "deleting media file");
        std::fs::remove_file(&self.path)
    }
}
