//! Per-tick routing of produced frames to the GIF writer.

use std::mem;
use std::path::PathBuf;

use arbycap_core::{Argb, Resolution};
use arbycap_gif::{FsStorage, GifWriter, Storage};
use tracing::{info, warn};

use crate::paths::CapturePaths;

/// What happened to a snapshot request on this frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShotOutcome {
    Saved(PathBuf),
    Failed,
}

/// Result of routing one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameOutcome {
    /// Set when a pending snapshot request consumed this frame.
    pub shot: Option<ShotOutcome>,
    /// Set while recording: whether the frame made it into the movie.
    pub recorded: Option<bool>,
}

/// Decides, frame by frame, whether to snapshot, record, both, or neither.
///
/// Owned by the thread producing frames. A snapshot request is consumed by
/// the very next frame; continuous capture records every frame until
/// stopped. Both can apply to the same frame.
pub struct CaptureController<S: Storage = FsStorage> {
    writer: GifWriter<S>,
    paths: CapturePaths,
    one_shot_requested: bool,
    capturing: bool,
}

impl CaptureController<FsStorage> {
    pub fn new(resolution: Resolution, paths: CapturePaths) -> Self {
        Self::with_storage(resolution, paths, FsStorage)
    }
}

impl<S: Storage> CaptureController<S> {
    pub fn with_storage(resolution: Resolution, paths: CapturePaths, storage: S) -> Self {
        Self {
            writer: GifWriter::with_storage(resolution, storage),
            paths,
            one_shot_requested: false,
            capturing: false,
        }
    }

    pub fn paths(&self) -> &CapturePaths {
        &self.paths
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn is_one_shot_pending(&self) -> bool {
        self.one_shot_requested
    }

    /// Arms a snapshot of the next produced frame.
    pub fn request_one_shot(&mut self) {
        self.one_shot_requested = true;
    }

    /// Starts recording into the work file. False if already recording or the
    /// work file cannot be opened.
    pub fn start_capturing(&mut self) -> bool {
        if self.capturing {
            return false;
        }
        self.prepare_dir();
        self.capturing = self.writer.start(self.paths.work_file());
        self.capturing
    }

    /// Stops recording and moves the movie to a freshly named file.
    /// `None` if nothing was being recorded or the file could not be saved.
    pub fn stop_capturing(&mut self) -> Option<PathBuf> {
        if !self.capturing {
            return None;
        }
        self.capturing = false;

        let path = self.paths.next_capture_file();
        if self.writer.finish(&path) {
            info!("Movie saved: {}", path.display());
            Some(path)
        } else {
            None
        }
    }

    /// Routes one produced frame. Call exactly once per emulation tick.
    pub fn on_frame_produced(&mut self, pixels: &[Argb]) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();

        if mem::take(&mut self.one_shot_requested) {
            self.prepare_dir();
            let path = self.paths.next_capture_file();
            outcome.shot = Some(if self.writer.one_shot(&path, pixels) {
                info!("Shot saved: {}", path.display());
                ShotOutcome::Saved(path)
            } else {
                ShotOutcome::Failed
            });
        }

        if self.capturing {
            outcome.recorded = Some(self.writer.add_frame(pixels));
        }

        outcome
    }

    fn prepare_dir(&self) {
        if let Err(e) = self.paths.ensure_dir() {
            warn!("Cannot create capture dir {}: {}", self.paths.dir().display(), e);
        }
    }
}
