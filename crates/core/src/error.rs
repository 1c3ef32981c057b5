use crate::archive::ExtractError;
use bannershare_files::FilesError;

/// Coarse classification of a failure, used to pick a status code or a user message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    Validation,
    LimitExceeded,
    Archive,
    Transfer,
    NotFound,
    Forbidden,
}

impl ErrorKind {
    /// Wire name, matching the serde representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::LimitExceeded => "limitExceeded",
            ErrorKind::Archive => "archive",
            ErrorKind::Transfer => "transfer",
            ErrorKind::NotFound => "notFound",
            ErrorKind::Forbidden => "forbidden",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        [
            ErrorKind::Validation,
            ErrorKind::LimitExceeded,
            ErrorKind::Archive,
            ErrorKind::Transfer,
            ErrorKind::NotFound,
            ErrorKind::Forbidden,
        ]
        .into_iter()
        .find(|kind| kind.as_str() == name)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    LimitExceeded(String),
    #[error(transparent)]
    Archive(#[from] ExtractError),
    #[error("{0}")]
    Transfer(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("storage error: {0}")]
    Storage(#[source] FilesError),
    #[error("failed to serialize session metadata: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize session metadata: {0}")]
    Deserialization(serde_json::Error),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ReviewError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ReviewError::InvalidInput(_) | ReviewError::Config(_) => ErrorKind::Validation,
            ReviewError::LimitExceeded(_) => ErrorKind::LimitExceeded,
            ReviewError::Archive(err) if err.is_limit() => ErrorKind::LimitExceeded,
            ReviewError::Archive(_) => ErrorKind::Archive,
            ReviewError::NotFound(_) => ErrorKind::NotFound,
            ReviewError::Forbidden(_) => ErrorKind::Forbidden,
            ReviewError::Transfer(_)
            | ReviewError::Storage(_)
            | ReviewError::Serialization(_)
            | ReviewError::Deserialization(_) => ErrorKind::Transfer,
        }
    }

    /// Rebuilds an error reported by a remote server from its kind and message.
    ///
    /// Archive failures never cross the network, so a remote one is treated as invalid input.
    pub fn from_remote(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        match kind {
            ErrorKind::Validation | ErrorKind::Archive => ReviewError::InvalidInput(message),
            ErrorKind::LimitExceeded => ReviewError::LimitExceeded(message),
            ErrorKind::NotFound => ReviewError::NotFound(message),
            ErrorKind::Forbidden => ReviewError::Forbidden(message),
            ErrorKind::Transfer => ReviewError::Transfer(message),
        }
    }

    /// Message safe to show an end user. Internal failures collapse to a generic line.
    pub fn user_message(&self) -> String {
        match self {
            ReviewError::Storage(_)
            | ReviewError::Serialization(_)
            | ReviewError::Deserialization(_) => "Storage is unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<FilesError> for ReviewError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::NotFound(_) => ReviewError::NotFound("Not found".into()),
            FilesError::SignatureExpired => ReviewError::Forbidden("Upload URL has expired".into()),
            FilesError::SignatureMismatch => {
                ReviewError::Forbidden("Upload URL signature is invalid".into())
            }
            other => ReviewError::Storage(other),
        }
    }
}

pub type ReviewResult<T> = std::result::Result<T, ReviewError>;
