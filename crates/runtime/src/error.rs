use thiserror::Error;

/// Hard failures that abort an orchestration run.
///
/// Tool-level problems never appear here; they are soft conditions
/// reported back into the conversation as [`crate::ToolOutcome`] values.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),
}

pub type Result<T> = std::result::Result<T, Error>;
