use thiserror::Error;

use crate::common::error::DroverError::GenericError;

#[derive(Debug, Error)]
pub enum DroverError {
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Submission rejected: {0}")]
    SubmissionRejected(String),
    #[error("Error: {0}")]
    GenericError(String),
}

impl From<bincode::Error> for DroverError {
    fn from(e: bincode::Error) -> Self {
        Self::SerializationError(e.to_string())
    }
}

impl From<anyhow::Error> for DroverError {
    fn from(error: anyhow::Error) -> Self {
        Self::GenericError(error.to_string())
    }
}

impl From<String> for DroverError {
    fn from(e: String) -> Self {
        GenericError(e)
    }
}

pub fn error<T>(message: String) -> crate::Result<T> {
    Err(GenericError(message))
}
