//! arbycap-gif — animated GIF capture encoder.
//!
//! ```text
//! &[Argb] ──► quantize ──► 1-bit indices ──► LzwEncoder ──► sub-blocks
//!                                                              │
//!                    GifWriter (header, GCE, descriptors) ◄────┘
//!                              │
//!                        Storage::Sink ──► file
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use arbycap_core::{Resolution, BLACK, WHITE};
//! use arbycap_gif::GifWriter;
//!
//! let mut writer = GifWriter::new(Resolution::ARDUBOY);
//! let frame = vec![BLACK; Resolution::ARDUBOY.total_pixels()];
//! writer.start("temp.gif");
//! writer.add_frame(&frame);
//! writer.finish("capture.gif");
//!
//! writer.one_shot("shot.gif", &vec![WHITE; frame.len()]);
//! ```

pub mod lzw;
pub mod quantize;
pub mod sink;
pub mod writer;

#[cfg(test)]
mod testutil;

pub use lzw::LzwEncoder;
pub use quantize::{quantize, quantize_frame};
pub use sink::{FsStorage, Storage};
pub use writer::{GifWriter, FRAME_DELAY_CS};
