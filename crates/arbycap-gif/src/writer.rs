//! Incremental GIF89a writer.
//!
//! # Document layout
//!
//! ```text
//! "GIF89a"
//! logical screen descriptor   w:u16 h:u16 0x88 bg=0 aspect=0
//! global color table          00 00 00  FF FF FF
//! per frame:
//!   graphic control ext       21 F9 04 00 delay:u16 00 00
//!   image descriptor          2C 0000 0000 w:u16 h:u16 00
//!   LZW data                  02 <sub-blocks> 00
//! trailer                     3B
//! ```
//!
//! The screen descriptor and color table are written lazily with the first
//! frame. Single-frame snapshots ([`GifWriter::one_shot`]) skip the graphic
//! control extension.

use std::io::{self, Write};
use std::mem;
use std::path::{Path, PathBuf};

use arbycap_core::{Argb, GifError, Resolution};
use tracing::{debug, info, warn};

use crate::lzw::LzwEncoder;
use crate::quantize::quantize_frame;
use crate::sink::{FsStorage, Storage};

// ── Constants ─────────────────────────────────────────────────────────────────

pub const SIGNATURE: &[u8; 6] = b"GIF89a";

/// Bits per palette entry index.
pub const COLOR_DEPTH: u8 = 1;
/// Global color table size field; the table holds `2 << PALETTE_SIZE_BITS` entries.
const PALETTE_SIZE_BITS: u8 = 0;

/// Black, white.
pub const GLOBAL_PALETTE: [u8; 6] = [0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF];

/// Frame delay in hundredths of a second.
///
/// NOTE: fixed at 50 fps and not derived from the emulation loop's tick rate.
/// A capture taken at any other rate plays back faster or slower than it ran.
pub const FRAME_DELAY_CS: u16 = 2;

const EXTENSION_INTRODUCER: u8 = 0x21;
const GRAPHIC_CONTROL_LABEL: u8 = 0xF9;
const IMAGE_SEPARATOR: u8 = 0x2C;
const BLOCK_TERMINATOR: u8 = 0x00;
pub const TRAILER: u8 = 0x3B;

// ── Structural blocks ─────────────────────────────────────────────────────────

fn put_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// Logical screen descriptor followed by the global color table.
fn put_screen_header(buf: &mut Vec<u8>, res: Resolution) {
    put_u16(buf, res.width);
    put_u16(buf, res.height);
    buf.push(
        0x80                            // global color table present
            | (COLOR_DEPTH - 1) << 4    // color resolution
            | 0x08                      // table sorted
            | PALETTE_SIZE_BITS,
    );
    buf.push(0); // background color index
    buf.push(0); // pixel aspect ratio: square
    buf.extend_from_slice(&GLOBAL_PALETTE);
}

fn put_graphic_control(buf: &mut Vec<u8>) {
    buf.push(EXTENSION_INTRODUCER);
    buf.push(GRAPHIC_CONTROL_LABEL);
    buf.push(4);
    buf.push(0); // no disposal, no user input, no transparency
    put_u16(buf, FRAME_DELAY_CS);
    buf.push(0); // transparent index (unused)
    buf.push(BLOCK_TERMINATOR);
}

/// Image descriptor plus the compressed pixel data block.
fn put_image(buf: &mut Vec<u8>, res: Resolution, pixels: &[Argb]) -> io::Result<()> {
    buf.push(IMAGE_SEPARATOR);
    put_u16(buf, 0);
    put_u16(buf, 0);
    put_u16(buf, res.width);
    put_u16(buf, res.height);
    buf.push(0); // no local color table

    let indices = quantize_frame(pixels);
    LzwEncoder::new(COLOR_DEPTH).encode(&indices, buf)?;
    buf.push(BLOCK_TERMINATOR);
    Ok(())
}

/// Writes whatever the document still lacks, then flushes. The sink is
/// dropped (closed) on return.
fn close_document<W: Write>(mut sink: W, pending_header: Option<Resolution>) -> io::Result<()> {
    let mut tail = Vec::with_capacity(14);
    if let Some(res) = pending_header {
        put_screen_header(&mut tail, res);
    }
    tail.push(TRAILER);
    sink.write_all(&tail)?;
    sink.flush()
}

// ── Session state ─────────────────────────────────────────────────────────────

enum Session<W> {
    Idle,
    Started(OpenSession<W>),
}

struct OpenSession<W> {
    work_path: PathBuf,
    sink: W,
    /// Bytes of complete blocks on disk; a failed write is cut back to this.
    committed: u64,
    first_frame_pending: bool,
    frames: u64,
}

// ── GifWriter ─────────────────────────────────────────────────────────────────

/// Writes animated captures frame by frame, and single-frame snapshots.
///
/// Not thread-safe: every call is expected from the thread producing frames.
/// Each boolean operation has a `try_*` form returning the underlying
/// [`GifError`]; the boolean form logs the error and returns `false`.
pub struct GifWriter<S: Storage = FsStorage> {
    storage: S,
    resolution: Resolution,
    session: Session<S::Sink>,
}

impl GifWriter<FsStorage> {
    pub fn new(resolution: Resolution) -> Self {
        Self::with_storage(resolution, FsStorage)
    }
}

impl<S: Storage> GifWriter<S> {
    pub fn with_storage(resolution: Resolution, storage: S) -> Self {
        Self { storage, resolution, session: Session::Idle }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn is_started(&self) -> bool {
        matches!(self.session, Session::Started(_))
    }

    /// Frames written to the open session, if any.
    pub fn frames_written(&self) -> Option<u64> {
        match &self.session {
            Session::Started(s) => Some(s.frames),
            Session::Idle => None,
        }
    }

    // ── Incremental capture ──────────────────────────────────────────────────

    pub fn start(&mut self, work_path: impl AsRef<Path>) -> bool {
        let work_path = work_path.as_ref();
        self.try_start(work_path)
            .map_err(|e| warn!("GIF start ({}) failed: {}", work_path.display(), e))
            .is_ok()
    }

    /// Opens `work_path` and writes the signature.
    pub fn try_start(&mut self, work_path: impl AsRef<Path>) -> Result<(), GifError> {
        let work_path = work_path.as_ref();
        if self.is_started() {
            return Err(GifError::AlreadyStarted);
        }

        let mut sink = self.storage.create(work_path)?;
        if let Err(e) = sink.write_all(SIGNATURE).and_then(|()| sink.flush()) {
            drop(sink);
            self.discard(work_path);
            return Err(e.into());
        }

        self.session = Session::Started(OpenSession {
            work_path: work_path.to_path_buf(),
            sink,
            committed: SIGNATURE.len() as u64,
            first_frame_pending: true,
            frames: 0,
        });
        info!("GIF capture started → {}", work_path.display());
        Ok(())
    }

    pub fn add_frame(&mut self, pixels: &[Argb]) -> bool {
        self.try_add_frame(pixels)
            .map_err(|e| warn!("GIF add_frame failed: {}", e))
            .is_ok()
    }

    /// Appends one frame-record. The record is assembled in memory first, so
    /// a rejected frame writes nothing and keeps the session as it was. If
    /// the sink fails part way, the work file is cut back to the previous
    /// record and the session stays open.
    pub fn try_add_frame(&mut self, pixels: &[Argb]) -> Result<(), GifError> {
        let resolution = self.resolution;
        let Session::Started(session) = &mut self.session else {
            return Err(GifError::NotStarted);
        };
        check_size(resolution, pixels)?;

        let mut record = Vec::with_capacity(record_capacity(resolution));
        if session.first_frame_pending {
            put_screen_header(&mut record, resolution);
        }
        put_graphic_control(&mut record);
        put_image(&mut record, resolution, pixels)?;

        let err = match session.sink.write_all(&record).and_then(|()| session.sink.flush()) {
            Ok(()) => {
                session.committed += record.len() as u64;
                session.first_frame_pending = false;
                session.frames += 1;
                debug!("GIF frame {} ({} bytes)", session.frames, record.len());
                return Ok(());
            }
            Err(e) => e,
        };
        self.roll_back();
        Err(err.into())
    }

    /// Drops a partly written record. If the work file cannot be cut back the
    /// capture is abandoned and the work file removed.
    fn roll_back(&mut self) {
        let Session::Started(session) = mem::replace(&mut self.session, Session::Idle) else {
            return;
        };
        let OpenSession { work_path, sink, committed, first_frame_pending, frames } = session;
        match self.storage.truncate(sink, committed) {
            Ok(sink) => {
                debug!("GIF work file rolled back to {} bytes", committed);
                self.session = Session::Started(OpenSession {
                    work_path,
                    sink,
                    committed,
                    first_frame_pending,
                    frames,
                });
            }
            Err(e) => {
                warn!("Cannot roll back {}: {}; capture abandoned", work_path.display(), e);
                self.discard(&work_path);
            }
        }
    }

    pub fn finish(&mut self, final_path: impl AsRef<Path>) -> bool {
        let final_path = final_path.as_ref();
        self.try_finish(final_path)
            .map_err(|e| warn!("GIF finish ({}) failed: {}", final_path.display(), e))
            .is_ok()
    }

    /// Writes the trailer, closes the work file and renames it to
    /// `final_path`. The writer is idle afterwards whatever the outcome; on
    /// failure the work file is deleted.
    pub fn try_finish(&mut self, final_path: impl AsRef<Path>) -> Result<(), GifError> {
        let final_path = final_path.as_ref();
        let OpenSession { work_path, sink, first_frame_pending, frames, .. } =
            match mem::replace(&mut self.session, Session::Idle) {
                Session::Idle => return Err(GifError::NotStarted),
                Session::Started(session) => session,
            };

        let pending_header = first_frame_pending.then_some(self.resolution);
        let closed = close_document(sink, pending_header)
            .and_then(|()| self.storage.rename(&work_path, final_path));

        match closed {
            Ok(()) => {
                info!("GIF capture saved: {} ({} frames)", final_path.display(), frames);
                Ok(())
            }
            Err(e) => {
                self.discard(&work_path);
                Err(e.into())
            }
        }
    }

    // ── Snapshot ─────────────────────────────────────────────────────────────

    pub fn one_shot(&self, path: impl AsRef<Path>, pixels: &[Argb]) -> bool {
        let path = path.as_ref();
        self.try_one_shot(path, pixels)
            .map_err(|e| warn!("GIF snapshot ({}) failed: {}", path.display(), e))
            .is_ok()
    }

    /// Writes a complete single-frame document to `path`. Uses its own sink
    /// and never touches the incremental session.
    pub fn try_one_shot(&self, path: impl AsRef<Path>, pixels: &[Argb]) -> Result<(), GifError> {
        let path = path.as_ref();
        check_size(self.resolution, pixels)?;

        let mut doc = Vec::with_capacity(SIGNATURE.len() + record_capacity(self.resolution));
        doc.extend_from_slice(SIGNATURE);
        put_screen_header(&mut doc, self.resolution);
        put_image(&mut doc, self.resolution, pixels)?;
        doc.push(TRAILER);

        let mut sink = self.storage.create(path)?;
        let written = sink.write_all(&doc).and_then(|()| sink.flush());
        drop(sink);

        if let Err(e) = written {
            self.discard(path);
            return Err(e.into());
        }
        info!("GIF snapshot saved: {}", path.display());
        Ok(())
    }

    fn discard(&self, path: &Path) {
        match self.storage.remove(path) {
            Ok(()) => debug!("Removed partial capture {}", path.display()),
            Err(e) => warn!("Could not remove partial capture {}: {}", path.display(), e),
        }
    }
}

fn check_size(res: Resolution, pixels: &[Argb]) -> Result<(), GifError> {
    let expected = res.total_pixels();
    if pixels.len() != expected {
        return Err(GifError::SizeMismatch { expected, actual: pixels.len() });
    }
    Ok(())
}

/// Rough upper bound for one record; only used to size buffers.
fn record_capacity(res: Resolution) -> usize {
    64 + res.total_pixels() / 4
}

// ── Tests ──────────────────────────────────────────────────────────────────────
