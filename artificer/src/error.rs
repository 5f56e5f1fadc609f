/// The error type for Artificer operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error reading a configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file is not valid JSON for [`crate::Config`].
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
    /// Compilation failed.
    #[error("query error: {0}")]
    Query(#[from] artificer_query::Error),
}

impl Error {
    /// Taxonomy of the underlying compile error, if this is one.
    pub fn query_kind(&self) -> Option<artificer_query::ErrorKind> {
        match self {
            Error::Query(e) => Some(e.kind()),
            _ => None,
        }
    }
}

/// A specialized Result type for Artificer operations.
pub type Result<T> = std::result::Result<T, Error>;
