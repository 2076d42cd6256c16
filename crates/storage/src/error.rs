use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },
}

pub type Result<T> = std::result::Result<T, Error>;
