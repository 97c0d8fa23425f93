//! Scoped writable byte sinks.
//!
//! [`GifWriter`](crate::GifWriter) never touches the filesystem directly: it
//! asks a [`Storage`] for a sink, and for the rename / delete that ends a
//! session. Dropping a sink releases it.

use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

pub trait Storage {
    type Sink: Write;

    /// Creates (or truncates) `path` for writing.
    fn create(&self, path: &Path) -> io::Result<Self::Sink>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove(&self, path: &Path) -> io::Result<()>;

    /// Cuts the sink's file back to its first `len` bytes, dropping anything
    /// still buffered, and returns a sink positioned at `len`.
    fn truncate(&self, sink: Self::Sink, len: u64) -> io::Result<Self::Sink>;
}

/// Buffered files on the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl Storage for FsStorage {
    type Sink = BufWriter<File>;

    fn create(&self, path: &Path) -> io::Result<Self::Sink> {
        File::create(path).map(BufWriter::new)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn remove(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn truncate(&self, sink: Self::Sink, len: u64) -> io::Result<Self::Sink> {
        let (mut file, _unwritten) = sink.into_parts();
        file.set_len(len)?;
        file.seek(SeekFrom::Start(len))?;
        Ok(BufWriter::new(file))
    }
}
