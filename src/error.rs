use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("primary track has {primary} cue(s) but secondary track has {secondary}")]
pub struct MismatchedTrackLengthError {
    pub primary: usize,
    pub secondary: usize,
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("transcript not found: {0}")]
    NotFound(String),
    #[error("transcript fetch failed: {0}")]
    Network(String),
    #[error("failed to read transcript {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid stored value: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("progress save rejected: {0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
