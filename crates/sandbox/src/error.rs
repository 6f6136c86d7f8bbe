use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Chart data is empty.")]
    EmptyChart,

    /// A failure raised inside the script (syntax error, runtime error,
    /// or a capability that rejected its input).
    #[error("{0}")]
    Eval(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
