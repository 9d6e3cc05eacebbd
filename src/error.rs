//! Error types.
//!
//! - `DatasetError`: library-level failures while loading a dataset
//!   (fetch, CSV shape, empty selection)
//! - `AppError`: what the binary reports, carrying a process exit code
//!
//! Exit codes:
//! - `2`: usage / input problems (bad flags, missing columns, unreadable files)
//! - `3`: valid data but nothing to show for the selection
//! - `4`: runtime failures (network, terminal, serialization)

use thiserror::Error;

/// Failures while acquiring or shaping a dataset.
#[derive(Debug, Clone, Error)]
pub enum DatasetError {
    /// The request could not be made or the file could not be read.
    #[error("failed to fetch dataset `{dataset}`: {message}")]
    Fetch { dataset: String, message: String },

    /// The server answered with a non-success status.
    #[error("dataset `{dataset}` request failed with status {status}")]
    Status { dataset: String, status: u16 },

    /// The CSV header is missing a column the catalog requires.
    #[error("dataset `{dataset}` is missing required column `{column}`")]
    MissingColumn { dataset: String, column: String },

    /// The CSV could not be parsed at all.
    #[error("dataset `{dataset}` is not valid CSV: {message}")]
    Csv { dataset: String, message: String },

    /// No dataset with this id exists in the catalog.
    #[error("unknown dataset `{0}`")]
    UnknownDataset(String),

    /// Fetch succeeded but nothing matches the current selection.
    #[error("no data for this selection")]
    Empty,
}

impl DatasetError {
    /// `true` when the user should see "data unavailable" rather than
    /// "no data for this selection".
    pub fn is_unavailable(&self) -> bool {
        !matches!(self, DatasetError::Empty)
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            DatasetError::Empty => 3,
            DatasetError::MissingColumn { .. } | DatasetError::UnknownDataset(_) => 2,
            DatasetError::Fetch { .. } | DatasetError::Status { .. } | DatasetError::Csv { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<DatasetError> for AppError {
    fn from(err: DatasetError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}
