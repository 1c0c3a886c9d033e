//! Asynchronous video file reading
//!
//! Reads an uploaded video into a `data:` URL on a background task, reporting
//! progress through a watch channel. Only the most recently started read is
//! tracked: completing an older one yields nothing.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::AsyncReadExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::content::{ContentError, DataUrl};

/// Default upload limit (10 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

/// Chunk size for reads and progress updates.
const READ_CHUNK_SIZE: usize = 64 * 1024;

/// Media type used when none is given and the extension is unknown.
const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Errors that occur while reading a video file.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("File size {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge { size: u64, limit: u64 },

    #[error("File is empty")]
    Empty,

    #[error("Not a regular file: {}", .path.display())]
    NotAFile { path: PathBuf },

    #[error("Invalid media type: {0}")]
    MediaType(#[from] ContentError),

    #[error("File read was interrupted: {reason}")]
    Interrupted { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Bytes read so far out of the file's total size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl ReadProgress {
    /// Completion percentage in `0.0..=100.0`.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.loaded as f64 / self.total as f64) * 100.0
        }
    }

    /// True once every byte has been read.
    pub fn is_complete(&self) -> bool {
        self.loaded >= self.total
    }
}

/// Handle to a read in flight.
#[derive(Debug)]
pub struct PendingRead {
    generation: u64,
    path: PathBuf,
    progress: watch::Receiver<ReadProgress>,
    task: JoinHandle<Result<DataUrl, ReadError>>,
}

impl PendingRead {
    /// Receiver for progress updates; each clone observes the same read.
    pub fn progress(&self) -> watch::Receiver<ReadProgress> {
        self.progress.clone()
    }

    /// File being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sequence number of this read within its reader.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Stops the background read. Finishing an aborted read reports
    /// `ReadError::Interrupted`.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Starts video file reads and tracks which one is current.
#[derive(Debug, Clone)]
pub struct VideoFileReader {
    max_file_size: u64,
    latest: Arc<AtomicU64>,
}

impl Default for VideoFileReader {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FILE_SIZE)
    }
}

impl VideoFileReader {
    /// Creates a reader that rejects files larger than `max_file_size` bytes.
    pub fn new(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            latest: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Validates the file and starts reading it in the background.
    ///
    /// Size and existence are checked before this returns, so validation
    /// failures never leave a read running. Must be called from within a
    /// tokio runtime.
    ///
    /// # Errors
    ///
    /// - `ReadError::FileTooLarge` - File exceeds the configured limit
    /// - `ReadError::Empty` - File has no content
    /// - `ReadError::NotAFile` - Path is not a regular file
    /// - `ReadError::Io` - File metadata cannot be read
    pub fn start(
        &self,
        path: impl AsRef<Path>,
        media_type: Option<&str>,
    ) -> Result<PendingRead, ReadError> {
        let path = path.as_ref().to_path_buf();
        let metadata = std::fs::metadata(&path)?;

        if !metadata.is_file() {
            return Err(ReadError::NotAFile { path });
        }

        let size = metadata.len();
        if size > self.max_file_size {
            return Err(ReadError::FileTooLarge {
                size,
                limit: self.max_file_size,
            });
        }
        if size == 0 {
            return Err(ReadError::Empty);
        }

        let media_type = media_type
            .map(str::to_string)
            .or_else(|| mime_guess::from_path(&path).first_raw().map(str::to_string))
            .unwrap_or_else(|| FALLBACK_MEDIA_TYPE.to_string());

        let generation = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let (progress_tx, progress_rx) = watch::channel(ReadProgress {
            loaded: 0,
            total: size,
        });

        tracing::debug!(
            "Starting read {generation} of {} ({size} bytes, {media_type})",
            path.display()
        );

        let task_path = path.clone();
        let limit = self.max_file_size;
        let task = tokio::spawn(async move {
            read_to_data_url(task_path, media_type, size, limit, progress_tx).await
        });

        Ok(PendingRead {
            generation,
            path,
            progress: progress_rx,
            task,
        })
    }

    /// Waits for a read to complete.
    ///
    /// Returns `Ok(None)` when a newer read was started after this one; the
    /// result of a superseded read is discarded.
    ///
    /// # Errors
    ///
    /// - `ReadError::Io` - Reading the file failed
    /// - `ReadError::FileTooLarge` - File grew past the limit while being read
    /// - `ReadError::MediaType` - Media type is not of the form `type/subtype`
    /// - `ReadError::Interrupted` - Background task was aborted or panicked
    pub async fn finish(&self, pending: PendingRead) -> Result<Option<DataUrl>, ReadError> {
        let outcome = pending.task.await;

        if self.latest.load(Ordering::SeqCst) != pending.generation {
            tracing::debug!(
                "Discarding superseded read {} of {}",
                pending.generation,
                pending.path.display()
            );
            return Ok(None);
        }

        match outcome {
            Ok(result) => result.map(Some),
            Err(e) => Err(ReadError::Interrupted {
                reason: e.to_string(),
            }),
        }
    }
}

async fn read_to_data_url(
    path: PathBuf,
    media_type: String,
    total: u64,
    limit: u64,
    progress: watch::Sender<ReadProgress>,
) -> Result<DataUrl, ReadError> {
    let mut file = tokio::fs::File::open(&path).await?;
    let mut bytes = Vec::with_capacity(usize::try_from(total).unwrap_or_default());
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];

    loop {
        let read = file.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        bytes.extend_from_slice(&chunk[..read]);

        if bytes.len() as u64 > limit {
            tracing::warn!(
                "{} grew past {limit} bytes while being read",
                path.display()
            );
            return Err(ReadError::FileTooLarge {
                size: bytes.len() as u64,
                limit,
            });
        }

        // Receivers may all be gone; the read still completes.
        let _ = progress.send(ReadProgress {
            loaded: bytes.len() as u64,
            total: total.max(bytes.len() as u64),
        });
    }

    if bytes.is_empty() {
        return Err(ReadError::Empty);
    }

    Ok(DataUrl::encode(&media_type, &bytes)?)
}
