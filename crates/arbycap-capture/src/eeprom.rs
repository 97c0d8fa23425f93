//! On-disk image of the handheld's persistent memory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use arbycap_core::{blank_eeprom, EEPROM_SIZE};
use tracing::{debug, info, warn};

/// `eeprom.bin`: exactly [`EEPROM_SIZE`] raw bytes.
#[derive(Debug, Clone)]
pub struct EepromFile {
    path: PathBuf,
}

impl EepromFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the image. A missing or short file yields blank (erased) memory;
    /// bytes past [`EEPROM_SIZE`] are ignored.
    pub fn load(&self) -> Vec<u8> {
        match fs::read(&self.path) {
            Ok(mut data) if data.len() >= EEPROM_SIZE => {
                data.truncate(EEPROM_SIZE);
                debug!("EEPROM loaded from {}", self.path.display());
                data
            }
            Ok(data) => {
                warn!(
                    "EEPROM image {} too short ({} bytes), starting blank",
                    self.path.display(),
                    data.len()
                );
                blank_eeprom()
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No EEPROM image at {}, starting blank", self.path.display());
                blank_eeprom()
            }
            Err(e) => {
                warn!("Cannot read EEPROM image {}: {}", self.path.display(), e);
                blank_eeprom()
            }
        }
    }

    /// Writes the first [`EEPROM_SIZE`] bytes of `data`, creating the parent
    /// directory if needed.
    pub fn save(&self, data: &[u8]) -> io::Result<()> {
        if data.len() < EEPROM_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("EEPROM image is {} bytes, expected {}", data.len(), EEPROM_SIZE),
            ));
        }
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, &data[..EEPROM_SIZE])?;
        info!("EEPROM saved to {}", self.path.display());
        Ok(())
    }
}
