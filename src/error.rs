//! Error types for each stage of a conversion.
//!
//! Only [`UsageError`] is fatal for a run. The others describe why a single
//! pair was skipped or degraded; the orchestrator logs them and moves on.

use std::path::PathBuf;
use thiserror::Error;

/// A photo/video pair that fails the extension or existence checks.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Photo does not exist: {}", .0.display())]
    PhotoMissing(PathBuf),

    #[error("Video does not exist: {}", .0.display())]
    VideoMissing(PathBuf),

    #[error("Photo is not in JPEG format: {}", .0.display())]
    PhotoNotJpeg(PathBuf),

    #[error("Video is not in MOV or MP4 format: {}", .0.display())]
    VideoNotSupported(PathBuf),
}

/// Failure while concatenating a photo and a video.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Photo path has no file name: {}", .0.display())]
    NoFileName(PathBuf),

    #[error("Output {} would overwrite its own source", .0.display())]
    OverwritesSource(PathBuf),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl MergeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Failure while writing the GCamera motion tags.
#[derive(Debug, Error)]
pub enum TagError {
    #[error("Failed to launch {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("ExifTool exited with {status}: {stderr}")]
    ToolFailed { status: String, stderr: String },

    #[error("Failed to write ExifTool config: {0}")]
    Config(#[source] std::io::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JPEG in {}: {reason}", path.display())]
    InvalidJpeg { path: PathBuf, reason: String },

    #[error("XMP packet for {} is {len} bytes, more than one JPEG segment holds", path.display())]
    XmpTooLarge { path: PathBuf, len: usize },

    #[error("Video offset {offset} exceeds file length {len}")]
    OffsetOutOfRange { offset: u64, len: u64 },
}

/// Bad command-line combination or an unusable `--dir`. Aborts the run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("Path does not exist: {}", .0.display())]
    DirNotFound(PathBuf),

    #[error("Path is not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    #[error("Must provide both --photo and --video.")]
    IncompletePair,

    #[error("Need to provide --dir or both --photo and --video.")]
    NoInput,
}
