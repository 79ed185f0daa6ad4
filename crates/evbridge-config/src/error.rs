use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read options file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Options file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Options file must contain a JSON object at the top level")]
    NotAnObject,
}
