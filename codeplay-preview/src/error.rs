use thiserror::Error;

pub type PreviewResult<T> = Result<T, PreviewError>;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid bridge message: {0}")]
    InvalidBridgeMessage(String),

    #[error("Unknown bridge channel '{channel}'")]
    UnknownBridgeChannel { channel: String },

    #[error("Unknown editor tab '{tab}'. Expected one of: html, css, js")]
    UnknownTab { tab: String },

    #[error("Snippet index {index} out of range (0..{len})")]
    SnippetOutOfRange { index: usize, len: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Archive error: {0}")]
    Archive(String),
}

impl PreviewError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        PreviewError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}

impl From<serde_json::Error> for PreviewError {
    fn from(err: serde_json::Error) -> Self {
        PreviewError::Serialization(err.to_string())
    }
}

impl From<zip::result::ZipError> for PreviewError {
    fn from(err: zip::result::ZipError) -> Self {
        PreviewError::Archive(err.to_string())
    }
}
