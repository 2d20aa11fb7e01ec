use thiserror::Error;

use crate::domain::IssueError;

#[derive(Error, Debug)]
pub enum AppError {
    /// The desk refused the request; the message is user-facing.
    #[error("{0}")]
    Rejected(#[from] IssueError),

    #[error("Invalid employee directory: {0}")]
    Directory(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Export failed: {0}")]
    Export(#[from] anyhow::Error),
}

impl AppError {
    /// True for rejections the operator can fix and resubmit.
    pub fn is_rejection(&self) -> bool {
        matches!(self, AppError::Rejected(_))
    }
}
