use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::CaptureError;

/// Environment variable naming a JSON config file.
pub const CONFIG_ENV: &str = "ARBYCAP_CONFIG";

const CAPTURE_DIR_NAME: &str = "ArbyEmulator";
const EEPROM_FILE_NAME: &str = "eeprom.bin";

/// Capture pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Directory receiving the work file and finished captures.
    #[serde(alias = "captureDir")]
    pub capture_dir: PathBuf,
    /// Name of the in-progress recording inside `capture_dir`.
    #[serde(alias = "workFileName")]
    pub work_file_name: String,
    /// `chrono` format string for finished capture names.
    #[serde(alias = "fileNameFormat")]
    pub file_name_format: String,
    /// Emulation ticks per second.
    #[serde(alias = "targetFPS", alias = "targetFps")]
    pub target_fps: u32,
    /// Persistent memory image, loaded before the first tick and saved when
    /// the loop exits.
    #[serde(alias = "eepromFile")]
    pub eeprom_file: PathBuf,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            capture_dir: default_capture_dir(),
            work_file_name: "temp.gif".to_owned(),
            file_name_format: "%Y%m%d%H%M%S.gif".to_owned(),
            target_fps: 60,
            eeprom_file: default_data_dir().join(EEPROM_FILE_NAME),
        }
    }
}

impl CaptureConfig {
    /// Reads a JSON config file. Missing fields take their defaults.
    pub fn load(path: &Path) -> Result<Self, CaptureError> {
        let text = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&text)?;
        cfg.validate()?;
        info!("Loaded capture config from {}", path.display());
        Ok(cfg)
    }

    /// Loads from `$ARBYCAP_CONFIG` when set, defaults otherwise.
    pub fn from_env() -> Result<Self, CaptureError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => {
                debug!("{} not set, using default capture config", CONFIG_ENV);
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.target_fps == 0 {
            return Err(CaptureError::ConfigurationInvalid {
                reason: "target_fps must be at least 1".to_owned(),
            });
        }
        if self.work_file_name.trim().is_empty() {
            return Err(CaptureError::ConfigurationInvalid {
                reason: "work_file_name is empty".to_owned(),
            });
        }
        if self.file_name_format.trim().is_empty() {
            return Err(CaptureError::ConfigurationInvalid {
                reason: "file_name_format is empty".to_owned(),
            });
        }
        Ok(())
    }

    pub fn work_file(&self) -> PathBuf {
        self.capture_dir.join(&self.work_file_name)
    }
}

fn default_capture_dir() -> PathBuf {
    let base = std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join("Pictures"))
        .unwrap_or_else(std::env::temp_dir);
    base.join(CAPTURE_DIR_NAME)
}

fn default_data_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".local/share/arbycap"))
        .unwrap_or_else(|| std::env::temp_dir().join("arbycap"))
}
