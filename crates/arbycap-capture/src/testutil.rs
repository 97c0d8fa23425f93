//! Shared helpers for the capture tests.

use std::fs;
use std::path::{Path, PathBuf};

/// Unique temp directory, removed on drop.
pub struct ScratchDir(PathBuf);

impl ScratchDir {
    pub fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("arbycap-capture-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("create scratch dir");
        Self(dir)
    }

    pub fn root(&self) -> &Path {
        &self.0
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.0.join(name)
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.0);
    }
}

/// Palette indices of every frame in the GIF at `path`.
pub fn decode_frames(path: &Path) -> Vec<Vec<u8>> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let file = fs::File::open(path).expect("open gif");
    let mut decoder = options.read_info(file).expect("valid gif header");

    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().expect("valid frame") {
        frames.push(frame.buffer.to_vec());
    }
    frames
}
