//! arbycap-capture — the frame loop around the GIF writer.
//!
//! A [`PixelSource`] renders one frame per tick on the [`EmulationLoop`]
//! thread. Each frame goes through [`CaptureController::on_frame_produced`],
//! which snapshots it, appends it to the open movie, or both. Finished files
//! land in the directory described by [`CapturePaths`].

pub mod controller;
pub mod eeprom;
pub mod emulation;
pub mod pacer;
pub mod paths;
pub mod source;

#[cfg(test)]
mod testutil;

pub use controller::{CaptureController, FrameOutcome, ShotOutcome};
pub use eeprom::EepromFile;
pub use emulation::{EmulationHandle, EmulationLoop, LoopCommand, LoopEvent};
pub use pacer::{FpsCounter, FramePacer};
pub use paths::CapturePaths;
pub use source::{PatternSource, PixelSource};
