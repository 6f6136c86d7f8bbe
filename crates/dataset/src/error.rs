use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Only SELECT statements are supported.")]
    UnsupportedStatement,

    #[error("dataset is empty")]
    EmptyDataset,

    #[error("malformed CSV at line {line}: {reason}")]
    MalformedCsv { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
