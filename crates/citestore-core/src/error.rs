use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    #[error("Embedding provider failed: {0}")]
    Provider(String),

    #[error("Vector index failed: {0}")]
    Index(String),

    #[error("Malformed entry: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid entry: {0}")]
    InvalidEntry(String),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation cancelled")]
    Cancelled,
}

/// Why a single textual record could not be turned into an entry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("record is not wrapped in <entry>...</entry>")]
    NotARecord,

    #[error("missing <content>...</content> segment")]
    MissingContent,

    #[error("missing <metadata>...</metadata> segment")]
    MissingMetadata,

    #[error("metadata is not a JSON object: {0}")]
    InvalidMetadata(String),
}

pub type Result<T> = std::result::Result<T, Error>;
