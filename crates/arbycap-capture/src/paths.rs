//! Capture directory layout and file naming.

use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use arbycap_core::CaptureConfig;
use chrono::{DateTime, Local, TimeZone};
use tracing::warn;

const FALLBACK_FORMAT: &str = "%Y%m%d%H%M%S.gif";

/// Where captures go and what they are called.
#[derive(Debug, Clone)]
pub struct CapturePaths {
    dir: PathBuf,
    work_file_name: String,
    file_name_format: String,
}

impl CapturePaths {
    pub fn new(
        dir: impl Into<PathBuf>,
        work_file_name: impl Into<String>,
        file_name_format: impl Into<String>,
    ) -> Self {
        Self {
            dir: dir.into(),
            work_file_name: work_file_name.into(),
            file_name_format: file_name_format.into(),
        }
    }

    pub fn from_config(config: &CaptureConfig) -> Self {
        Self::new(
            config.capture_dir.clone(),
            config.work_file_name.clone(),
            config.file_name_format.clone(),
        )
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the capture directory if it does not exist yet.
    pub fn ensure_dir(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.dir)
    }

    /// In-progress recording; renamed once the capture finishes.
    pub fn work_file(&self) -> PathBuf {
        self.dir.join(&self.work_file_name)
    }

    /// Fresh name for a finished capture, stamped with the local time.
    pub fn next_capture_file(&self) -> PathBuf {
        self.capture_file_at(&Local::now())
    }

    /// Name for a capture taken at `time`. Never returns an existing path:
    /// `_1`, `_2`, … is appended to the stem on collision.
    pub fn capture_file_at<Tz>(&self, time: &DateTime<Tz>) -> PathBuf
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let mut name = String::new();
        if write!(name, "{}", time.format(&self.file_name_format)).is_err() || name.is_empty() {
            warn!("Invalid capture file name format {:?}, using default", self.file_name_format);
            name.clear();
            let _ = write!(name, "{}", time.format(FALLBACK_FORMAT));
        }
        unique_path(self.dir.join(name))
    }
}

fn unique_path(candidate: PathBuf) -> PathBuf {
    if !candidate.exists() {
        return candidate;
    }

    let stem = candidate
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = candidate.extension().map(|e| e.to_string_lossy().into_owned());

    (1u32..)
        .map(|n| {
            let name = match &ext {
                Some(ext) => format!("{stem}_{n}.{ext}"),
                None => format!("{stem}_{n}"),
            };
            candidate.with_file_name(name)
        })
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::testutil::ScratchDir;

    fn stamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2018, 3, 5, 14, 7, 9).unwrap()
    }

    #[test]
    fn names_follow_format() {
        let dir = ScratchDir::new();
        let paths = CapturePaths::new(dir.root(), "temp.gif", "%Y%m%d%H%M%S.gif");

        assert_eq!(paths.work_file(), dir.path("temp.gif"));
        assert_eq!(paths.capture_file_at(&stamp()), dir.path("20180305140709.gif"));
    }

    #[test]
    fn collisions_get_a_suffix() {
        let dir = ScratchDir::new();
        let paths = CapturePaths::new(dir.root(), "temp.gif", "%Y%m%d%H%M%S.gif");

        std::fs::write(dir.path("20180305140709.gif"), b"x").unwrap();
        assert_eq!(paths.capture_file_at(&stamp()), dir.path("20180305140709_1.gif"));

        std::fs::write(dir.path("20180305140709_1.gif"), b"x").unwrap();
        assert_eq!(paths.capture_file_at(&stamp()), dir.path("20180305140709_2.gif"));
    }

    #[test]
    fn broken_format_falls_back() {
        let dir = ScratchDir::new();
        let paths = CapturePaths::new(dir.root(), "temp.gif", "%Q");
        assert_eq!(paths.capture_file_at(&stamp()), dir.path("20180305140709.gif"));
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let dir = ScratchDir::new();
        let nested = dir.path("a/b/ArbyEmulator");
        let paths = CapturePaths::new(&nested, "temp.gif", "%Y.gif");
        paths.ensure_dir().unwrap();
        assert!(nested.is_dir());
        assert_eq!(paths.dir(), nested.as_path());
    }
}
