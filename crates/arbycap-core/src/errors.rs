use thiserror::Error;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Configuration invalid: {reason}")]
    ConfigurationInvalid { reason: String },

    #[error("Capture directory unavailable: {reason}")]
    DirectoryUnavailable { reason: String },

    #[error("GIF error: {0}")]
    Gif(#[from] GifError),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of the GIF writer. Callers of the boolean API only see `false`.
#[derive(Error, Debug)]
pub enum GifError {
    #[error("Capture session already started")]
    AlreadyStarted,

    #[error("No capture session started")]
    NotStarted,

    #[error("Frame has {actual} pixels, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
