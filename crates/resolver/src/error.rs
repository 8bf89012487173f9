use thiserror::Error;

pub type Result<T> = std::result::Result<T, ResolverError>;

#[derive(Error, Debug)]
pub enum ResolverError {
    /// No directory means no query can be resolved; fatal to the run.
    #[error("Directory fetch failed: {0}")]
    DirectoryFetch(String),

    #[error("Directory payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
