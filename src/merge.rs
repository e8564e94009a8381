use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::MergeError;

/// A merged motion photo and where its clip starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeResult {
    pub output_path: PathBuf,
    /// Byte count, measured back from the end of `output_path`, at which the
    /// clip begins. Always equal to the clip's own length.
    pub offset_bytes: u64,
}

/// Append `video` to `photo` and write the result to `output_dir`.
///
/// The output is named after the photo. Bytes are copied verbatim, photo first,
/// with nothing in between. An existing file of the same name is replaced.
///
/// # Example
///
/// ```rust,no_run
/// use motion_photo::merge::merge;
/// use std::path::Path;
///
/// let merged = merge(
///     Path::new("trip/IMG_1.jpg"),
///     Path::new("trip/IMG_1.mov"),
///     Path::new("output"),
/// )?;
/// println!("{} (video at -{} bytes)", merged.output_path.display(), merged.offset_bytes);
/// # Ok::<(), motion_photo::error::MergeError>(())
/// ```
pub fn merge(photo: &Path, video: &Path, output_dir: &Path) -> Result<MergeResult, MergeError> {
    log::info!("Merging {} and {}.", photo.display(), video.display());

    let file_name = photo
        .file_name()
        .ok_or_else(|| MergeError::NoFileName(photo.to_path_buf()))?;
    let output_path = output_dir.join(file_name);

    if let Some(parent) = output_path.parent() {
        fs::create_dir_all(parent).map_err(|e| MergeError::io(parent, e))?;
    }

    if same_file(&output_path, photo) || same_file(&output_path, video) {
        return Err(MergeError::OverwritesSource(output_path));
    }

    let mut photo_file = File::open(photo).map_err(|e| MergeError::io(photo, e))?;
    let mut video_file = File::open(video).map_err(|e| MergeError::io(video, e))?;
    let out = File::create(&output_path).map_err(|e| MergeError::io(&output_path, e))?;

    let mut writer = BufWriter::new(out);
    io::copy(&mut photo_file, &mut writer).map_err(|e| MergeError::io(photo, e))?;
    io::copy(&mut video_file, &mut writer).map_err(|e| MergeError::io(video, e))?;
    writer.flush().map_err(|e| MergeError::io(&output_path, e))?;
    drop(writer);

    let photo_size = file_size(photo)?;
    let merged_size = file_size(&output_path)?;

    // Offset counts from the end of the file: merged - photo == video length.
    let offset_bytes = merged_size.saturating_sub(photo_size);

    log::info!("Photo and video merged.");
    Ok(MergeResult {
        output_path,
        offset_bytes,
    })
}

fn file_size(path: &Path) -> Result<u64, MergeError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|e| MergeError::io(path, e))
}

/// True when both paths resolve to the same existing file.
pub(crate) fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
