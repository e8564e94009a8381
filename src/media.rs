use std::path::{Path, PathBuf};

use crate::error::ValidationError;

/// Photo extensions accepted as the still part of a motion photo.
pub const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg"];

/// Video extensions accepted as the embedded clip.
pub const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4"];

/// The role a file can play in a motion photo, determined by its extension.
///
/// Only the extension is inspected; file signatures are never read.
///
/// # Example
///
/// ```rust
/// use motion_photo::media::MediaKind;
/// use std::path::Path;
///
/// assert_eq!(MediaKind::from_path(Path::new("IMG_1.JPG")), Some(MediaKind::Photo));
/// assert_eq!(MediaKind::from_path(Path::new("IMG_1.mov")), Some(MediaKind::Video));
/// assert_eq!(MediaKind::from_path(Path::new("IMG_1.png")), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// JPEG still (`.jpg`, `.jpeg`)
    Photo,
    /// QuickTime or MPEG-4 clip (`.mov`, `.mp4`)
    Video,
}

impl MediaKind {
    /// Determine the media kind from a file path extension (case-insensitive).
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        if PHOTO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Photo)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// A still photo and the clip that should be embedded into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPair {
    pub photo: PathBuf,
    pub video: PathBuf,
}

impl MediaPair {
    pub fn new(photo: impl Into<PathBuf>, video: impl Into<PathBuf>) -> Self {
        Self {
            photo: photo.into(),
            video: video.into(),
        }
    }
}

pub fn is_photo(path: &Path) -> bool {
    MediaKind::from_path(path) == Some(MediaKind::Photo)
}

pub fn is_video(path: &Path) -> bool {
    MediaKind::from_path(path) == Some(MediaKind::Video)
}

/// Check that a photo/video pair can be merged.
///
/// Checks run in a fixed order and stop at the first failure: photo exists,
/// video exists, photo is a JPEG, video is MOV or MP4.
pub fn check(photo: &Path, video: &Path) -> Result<(), ValidationError> {
    if !photo.exists() {
        return Err(ValidationError::PhotoMissing(photo.to_path_buf()));
    }
    if !video.exists() {
        return Err(ValidationError::VideoMissing(video.to_path_buf()));
    }
    if !is_photo(photo) {
        return Err(ValidationError::PhotoNotJpeg(photo.to_path_buf()));
    }
    if !is_video(video) {
        return Err(ValidationError::VideoNotSupported(video.to_path_buf()));
    }
    Ok(())
}

/// Like [`check`], but logs the failed check and returns a plain flag.
pub fn validate(photo: &Path, video: &Path) -> bool {
    match check(photo, video) {
        Ok(()) => true,
        Err(e) => {
            log::error!("{e}");
            false
        }
    }
}
