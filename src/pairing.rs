use std::ffi::OsString;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::media::{self, MediaPair};

/// Suffixes probed, in order, when looking for a photo's clip.
const VIDEO_SUFFIXES: &[&str] = &[".mov", ".mp4", ".MOV", ".MP4"];

/// Collect every regular file under `root`, depth-first.
///
/// Entries are sorted by file name within each directory so that the result is
/// stable across runs. Unreadable entries are logged and skipped.
pub fn collect_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                log::warn!("Skipping unreadable entry under {}: {e}", root.display());
                None
            }
        })
        .map(|entry| entry.into_path())
        .filter(|path| path.is_file())
        .collect()
}

/// Find the clip that belongs to `photo`.
///
/// The photo's extension is stripped and `.mov`, `.mp4`, `.MOV`, `.MP4` are
/// tried in that order; the first candidate that exists wins.
///
/// # Example
///
/// ```rust,no_run
/// use motion_photo::pairing::matching_video;
/// use std::path::Path;
///
/// if let Some(video) = matching_video(Path::new("trip/IMG_1.jpg")) {
///     println!("paired with {}", video.display());
/// }
/// ```
pub fn matching_video(photo: &Path) -> Option<PathBuf> {
    let stem = photo.with_extension("");
    log::info!("Looking for a video with the same name: {}", stem.display());

    VIDEO_SUFFIXES.iter().find_map(|suffix| {
        let mut candidate = OsString::from(stem.as_os_str());
        candidate.push(suffix);
        let candidate = PathBuf::from(candidate);
        candidate.exists().then_some(candidate)
    })
}

/// Walk `root` recursively and pair every JPEG with its same-stem clip.
///
/// Photos without a clip are left out. Pairs come back in walk order.
pub fn find_pairs(root: &Path) -> Vec<MediaPair> {
    log::info!("Processing directory: {}", root.display());

    let pairs: Vec<MediaPair> = collect_files(root)
        .into_iter()
        .filter(|path| media::is_photo(path))
        .filter_map(|photo| matching_video(&photo).map(|video| MediaPair::new(photo, video)))
        .collect();

    log::info!("Found {} pairs of files.", pairs.len());
    for pair in pairs.iter().take(9) {
        log::debug!("  {} + {}", pair.photo.display(), pair.video.display());
    }

    pairs
}
