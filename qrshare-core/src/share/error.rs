//! Share workflow errors.

use crate::cache::CacheError;
use crate::content::ContentError;
use crate::reader::ReadError;

/// Errors from the share workflow.
#[derive(Debug, thiserror::Error)]
pub enum ShareError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ContentError),

    #[error("File error: {0}")]
    File(#[from] ReadError),

    #[error("Storage error: {0}")]
    Storage(#[from] CacheError),
}

impl ShareError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            ShareError::Validation(ContentError::EmptyText) => {
                "Please enter some text to share.".to_string()
            }
            ShareError::Validation(ContentError::InvalidUrl { .. }) => {
                "Please enter a valid video URL.".to_string()
            }
            ShareError::Validation(ContentError::InvalidId { .. }) => {
                "Please enter a valid content ID.".to_string()
            }
            ShareError::Validation(e) => e.to_string(),
            ShareError::File(ReadError::FileTooLarge { limit, .. }) => format!(
                "File size exceeds the {} limit. Please choose a smaller file or share a video URL instead.",
                describe_size(*limit)
            ),
            ShareError::File(ReadError::Empty) => "The selected file is empty.".to_string(),
            ShareError::File(ReadError::NotAFile { path }) => {
                format!("{} is not a file.", path.display())
            }
            ShareError::File(_) => "Error reading the file. Please try again.".to_string(),
            ShareError::Storage(e) if e.is_quota_exceeded() => {
                "Local storage is full. Share shorter text or a video URL so the content travels inside the link."
                    .to_string()
            }
            ShareError::Storage(_) => {
                "Could not save the content locally. Share shorter text or a video URL so the content travels inside the link."
                    .to_string()
            }
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        match self {
            ShareError::Validation(_) => true,
            ShareError::File(e) => matches!(
                e,
                ReadError::FileTooLarge { .. }
                    | ReadError::Empty
                    | ReadError::NotAFile { .. }
                    | ReadError::MediaType(_)
            ),
            ShareError::Storage(_) => false,
        }
    }
}

fn describe_size(bytes: u64) -> String {
    const MIB: u64 = 1024 * 1024;
    const KIB: u64 = 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes >= KIB && bytes % KIB == 0 {
        format!("{} KB", bytes / KIB)
    } else {
        format!("{bytes} byte")
    }
}
