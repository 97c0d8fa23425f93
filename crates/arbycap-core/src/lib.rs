pub mod config;
pub mod errors;
pub mod types;

pub use config::CaptureConfig;
pub use errors::{CaptureError, GifError};
pub use types::*;
