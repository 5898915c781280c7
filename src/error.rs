use thiserror::Error;

#[derive(Error, Debug)]
pub enum GroupForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Input Error: {0}")]
    Input(String),

    #[error("Result Invalid: {0}")]
    ResultInvalid(String),
}

pub type GfResult<T> = Result<T, GroupForgeError>;
