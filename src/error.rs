use thiserror::Error;

/// Errors that can occur while tiling, querying and downloading imagery
#[derive(Error, Debug)]
pub enum NaipTilesError {
    /// Invalid tiling input (non-positive cell size, empty geometry)
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A catalog record is missing a field needed for candidate selection
    #[error("Malformed catalog record at index {index}: {reason}")]
    MalformedRecord { index: usize, reason: String },

    /// Network-related errors while talking to the catalog or downloading files
    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    /// Errors parsing catalog responses or geometry files
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration validation errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Geographic processing errors (buffering, projection)
    #[error("Geographic error: {0}")]
    Geographic(String),

    /// Local file system errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl NaipTilesError {
    /// Whether retrying the failed operation could succeed.
    ///
    /// Only transport failures qualify; tiling and selection errors are
    /// deterministic for a given input.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(NetworkError::Timeout { .. }) => true,
            Self::Network(NetworkError::Connection { .. }) => true,
            Self::Network(NetworkError::HttpError { status }) => *status >= 500,
            _ => false,
        }
    }
}

/// Network-specific errors
#[derive(Error, Debug)]
pub enum NetworkError {
    /// HTTP request failed
    #[error("HTTP request failed: {status}")]
    HttpError { status: u16 },

    /// Request timeout
    #[error("Request timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    /// Connection error
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Invalid URL
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },

    /// The catalog stopped returning items before reaching its reported total
    #[error("Catalog returned an empty page at offset {offset} (expected {total} items)")]
    IncompletePaging { offset: usize, total: usize },
}

pub type Result<T> = std::result::Result<T, NaipTilesError>;
