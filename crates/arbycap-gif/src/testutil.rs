//! Shared helpers for the writer tests.

use std::cell::Cell;
use std::fs;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::sink::{FsStorage, Storage};

// ── Scratch directory ─────────────────────────────────────────────────────────

/// Unique temp directory, removed on drop.
pub struct ScratchDir(PathBuf);

impl ScratchDir {
    pub fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("arbycap-gif-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).expect("create scratch dir");
        Self(dir)
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

// ── Fault injection ───────────────────────────────────────────────────────────

/// Filesystem storage whose operations can be made to fail on demand.
/// Clones share their switches, so a test keeps one to flip them while the
/// writer owns another.
#[derive(Clone, Default)]
pub struct FaultyStorage {
    pub fail_create: Rc<Cell<bool>>,
    pub fail_writes: Rc<Cell<bool>>,
    pub fail_rename: Rc<Cell<bool>>,
    pub fail_truncate: Rc<Cell<bool>>,
    /// When set, sinks accept this many more bytes and then fail, leaving a
    /// short write on disk.
    pub write_budget: Rc<Cell<Option<usize>>>,
}

/// Unbuffered, so whatever a write accepted is on disk.
pub struct FaultySink {
    file: fs::File,
    fail: Rc<Cell<bool>>,
    budget: Rc<Cell<Option<usize>>>,
}

fn injected() -> io::Error {
    io::Error::new(io::ErrorKind::Other, "injected failure")
}

impl Write for FaultySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.fail.get() {
            return Err(injected());
        }
        match self.budget.get() {
            None => self.file.write(buf),
            Some(0) => Err(injected()),
            Some(left) => {
                let n = self.file.write(&buf[..left.min(buf.len())])?;
                self.budget.set(Some(left - n));
                Ok(n)
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.fail.get() {
            return Err(injected());
        }
        self.file.flush()
    }
}

impl Storage for FaultyStorage {
    type Sink = FaultySink;

    fn create(&self, path: &Path) -> io::Result<FaultySink> {
        if self.fail_create.get() {
            return Err(injected());
        }
        Ok(FaultySink {
            file: fs::File::create(path)?,
            fail: Rc::clone(&self.fail_writes),
            budget: Rc::clone(&self.write_budget),
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        if self.fail_rename.get() {
            return Err(injected());
        }
        FsStorage.rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        FsStorage.remove(path)
    }

    fn truncate(&self, mut sink: FaultySink, len: u64) -> io::Result<FaultySink> {
        if self.fail_truncate.get() {
            return Err(injected());
        }
        sink.file.set_len(len)?;
        sink.file.seek(SeekFrom::Start(len))?;
        Ok(sink)
    }
}

// ── Structural walk ───────────────────────────────────────────────────────────

/// One frame-record as laid out in the file.
pub struct RecordLayout {
    /// Graphic control extension including introducer and terminator.
    pub gce: Option<Vec<u8>>,
    /// Image descriptor including the separator.
    pub descriptor: Vec<u8>,
}

pub struct GifLayout {
    pub signature: Vec<u8>,
    pub screen: Vec<u8>,
    pub palette: Vec<u8>,
    pub records: Vec<RecordLayout>,
    pub trailer_at_end: bool,
}

/// Skips a run of sub-blocks up to and including the zero terminator.
fn skip_sub_blocks(bytes: &[u8], mut pos: usize) -> usize {
    loop {
        let len = bytes[pos] as usize;
        pos += 1;
        if len == 0 {
            return pos;
        }
        assert!(len <= 255);
        pos += len;
    }
}

pub fn walk(bytes: &[u8]) -> GifLayout {
    let signature = bytes[0..6].to_vec();
    let screen = bytes[6..13].to_vec();
    let palette = bytes[13..19].to_vec();
    let mut records = Vec::new();
    let mut pending_gce = None;
    let mut pos = 19;
    let mut trailer_at_end = false;

    while pos < bytes.len() {
        match bytes[pos] {
            0x21 => {
                let start = pos;
                assert_eq!(bytes[pos + 1], 0xF9, "only graphic control extensions expected");
                pos = skip_sub_blocks(bytes, pos + 2);
                pending_gce = Some(bytes[start..pos].to_vec());
            }
            0x2C => {
                let descriptor = bytes[pos..pos + 10].to_vec();
                // code size byte, then the data sub-blocks
                pos = skip_sub_blocks(bytes, pos + 11);
                records.push(RecordLayout { gce: pending_gce.take(), descriptor });
            }
            0x3B => {
                trailer_at_end = pos == bytes.len() - 1;
                break;
            }
            other => panic!("unexpected block 0x{other:02X} at {pos}"),
        }
    }

    GifLayout { signature, screen, palette, records, trailer_at_end }
}

// ── Conformance decode ────────────────────────────────────────────────────────

pub struct DecodedFrame {
    pub width: u16,
    pub height: u16,
    pub delay: u16,
    pub indices: Vec<u8>,
}

pub struct DecodedGif {
    pub width: u16,
    pub height: u16,
    pub palette: Option<Vec<u8>>,
    pub frames: Vec<DecodedFrame>,
}

/// Decodes a file with the `gif` crate, keeping palette indices.
pub fn decode(path: &Path) -> DecodedGif {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let file = fs::File::open(path).expect("open gif");
    let mut decoder = options.read_info(file).expect("valid gif header");

    let width = decoder.width();
    let height = decoder.height();
    let palette = decoder.global_palette().map(|p| p.to_vec());
    let mut frames = Vec::new();
    while let Some(frame) = decoder.read_next_frame().expect("valid frame") {
        frames.push(DecodedFrame {
            width: frame.width,
            height: frame.height,
            delay: frame.delay,
            indices: frame.buffer.to_vec(),
        });
    }

    DecodedGif { width, height, palette, frames }
}
