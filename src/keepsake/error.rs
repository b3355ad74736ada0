use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeepsakeError {
    #[error("Backend is not configured: {0}")]
    Configuration(String),

    #[error("Repository error: {0}")]
    Repository(String),

    #[error("Local storage is full: writing {needed} bytes to '{key}' exceeds {capacity} bytes")]
    QuotaExceeded {
        key: String,
        needed: usize,
        capacity: usize,
    },

    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("No room code set. Run `keepsake enter <code>` first")]
    NoRoom,

    #[error("{}: {source}", unsynced_prefix(.saved_locally))]
    Unsynced {
        #[source]
        source: Box<KeepsakeError>,
        saved_locally: bool,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<reqwest::Error> for KeepsakeError {
    fn from(err: reqwest::Error) -> Self {
        KeepsakeError::Repository(err.to_string())
    }
}

impl From<url::ParseError> for KeepsakeError {
    fn from(err: url::ParseError) -> Self {
        KeepsakeError::Configuration(format!("invalid backend URL: {}", err))
    }
}

fn unsynced_prefix(saved_locally: &bool) -> &'static str {
    if *saved_locally {
        "Saved locally, but not synced"
    } else {
        "Save failed"
    }
}

/// Problems detected locally, before any network round-trip.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Room code cannot be empty")]
    EmptyRoomCode,

    #[error("'{name}' is not an image")]
    NotAnImage { name: String },

    #[error("Image '{name}' is too large ({size} bytes, max {max} bytes)")]
    TooLarge { name: String, size: usize, max: usize },

    #[error("Photo {index} does not exist (record has {len} photos)")]
    PhotoIndex { index: usize, len: usize },

    #[error("Invalid {what}: '{value}'")]
    Argument { what: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, KeepsakeError>;
