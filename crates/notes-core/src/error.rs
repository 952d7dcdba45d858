use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("filename does not match the <id>--<title>__<tags> pattern: {0}")]
    MalformedFilename(String),

    #[error("no header found in {0}")]
    NoHeaderFound(String),

    #[error("failed to parse header: {0}")]
    HeaderParse(String),

    #[error("invalid range: {0}")]
    InvalidRange(String),

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("no valid targets found")]
    EmptyRange,

    #[error("invalid value: {0}")]
    Validation(String),

    #[error("file already exists: {}", .0.display())]
    Conflict(PathBuf),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("control file error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{failed} of {total} items failed")]
    BatchFailed { failed: usize, total: usize },
}

impl From<serde_yaml::Error> for Error {
    fn from(value: serde_yaml::Error) -> Self {
        Self::HeaderParse(value.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
