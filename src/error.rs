use thiserror::Error;

pub const LIST_LOAD_ERROR: &str = "Failed to load documents.";
pub const DETAIL_LOAD_ERROR: &str = "Failed to load document.";
pub const UPLOAD_ERROR: &str = "Failed to upload the file.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Check your internet connection and try again.")]
    Connect(String),

    #[error("Request timed out.")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid credentials.")]
    InvalidCredentials,

    #[error("Session expired or missing. Log in again.")]
    Unauthenticated,

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Could not read the document id from the server response.")]
    MissingDocumentId,

    #[error("Invalid document id '{0}'.")]
    InvalidDocumentId(String),

    /// Upload refused by the server, with its own explanation.
    #[error("{0}")]
    Rejected(String),

    #[error(transparent)]
    Upload(#[from] UploadError),
}

impl ApiError {
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else if e.is_connect() {
            ApiError::Connect(e.to_string())
        } else if e.is_decode() {
            ApiError::InvalidResponse(e.to_string())
        } else {
            ApiError::Network(e.to_string())
        }
    }

    /// Short text for the user. Errors that already carry a user-facing message keep it;
    /// transport and server failures collapse to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Connect(_)
            | ApiError::InvalidCredentials
            | ApiError::Unauthenticated
            | ApiError::MissingDocumentId
            | ApiError::InvalidDocumentId(_)
            | ApiError::Rejected(_)
            | ApiError::Upload(_) => self.to_string(),
            ApiError::Timeout
            | ApiError::Network(_)
            | ApiError::Status { .. }
            | ApiError::InvalidResponse(_) => fallback.to_string(),
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, ApiError::Unauthenticated)
    }
}

/// Local checks run before a file is sent for analysis.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("File not found.")]
    FileNotFound,

    #[error("File too large (max {max_mb}MB).")]
    TooLarge { max_mb: u64 },

    #[error("Only PDF files can be analysed.")]
    NotPdf,

    #[error("Select a file and a category.")]
    MissingCategory,

    #[error("Unknown category '{0}'.")]
    UnknownCategory(String),

    #[error("Could not read file: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures that end an interactive browse session.
#[derive(Error, Debug)]
pub enum BrowseError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} is not set (add it to .env or the environment)")]
    Missing(&'static str),

    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_failures_use_fallback() {
        let err = ApiError::Status {
            status: 500,
            body: "boom".into(),
        };
        assert_eq!(err.user_message(LIST_LOAD_ERROR), LIST_LOAD_ERROR);
        assert_eq!(ApiError::Timeout.user_message(DETAIL_LOAD_ERROR), DETAIL_LOAD_ERROR);
    }

    #[test]
    fn user_facing_errors_keep_their_text() {
        assert_eq!(
            ApiError::InvalidCredentials.user_message(LIST_LOAD_ERROR),
            "Invalid credentials."
        );
        assert_eq!(
            ApiError::Rejected("Arquivo inválido".into()).user_message(UPLOAD_ERROR),
            "Arquivo inválido"
        );
        assert_eq!(
            ApiError::InvalidDocumentId("../token".into()).user_message(DETAIL_LOAD_ERROR),
            "Invalid document id '../token'."
        );
        let err: ApiError = UploadError::NotPdf.into();
        assert_eq!(err.user_message(UPLOAD_ERROR), "Only PDF files can be analysed.");
    }
}
