use std::io;
use std::path::{Path, PathBuf};

use futures::{Stream, TryStreamExt};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

use crate::error::ApiError;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("failed to create file {}: {source}", .path.display())]
    Create {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to save file {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("attachment stream failed: {0}")]
    Source(#[from] ApiError),
}

/// Recursively creates `path`. Succeeds if it already exists.
pub async fn ensure_dir(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    tracing::debug!(path = %path.display(), "Ensured directory exists");
    Ok(())
}

/// Copies every chunk of `source` into `path`, truncating any existing file.
/// Returns the number of bytes written.
///
/// The file handle is dropped (and closed) on every return path. A stream that
/// fails mid-way leaves the partially written file in place.
pub async fn write_stream<S>(path: &Path, source: S) -> Result<u64, WriteError>
where
    S: Stream<Item = Result<Vec<u8>, ApiError>> + Unpin,
{
    let mut source = source;
    let mut file = File::create(path).await.map_err(|e| WriteError::Create {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut written: u64 = 0;
    while let Some(chunk) = source.try_next().await? {
        file.write_all(&chunk).await.map_err(|e| WriteError::Write {
            path: path.to_path_buf(),
            source: e,
        })?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| WriteError::Write {
        path: path.to_path_buf(),
        source: e,
    })?;

    tracing::debug!(path = %path.display(), bytes = written, "Wrote file");
    Ok(written)
}
