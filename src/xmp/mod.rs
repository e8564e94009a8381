//! GCamera motion-photo XMP tags: writing and reading.
//!
//! Writers implement [`MotionTagger`]:
//!
//! - [`ExifTool`]: runs the external `exiftool` binary with a temporary config
//!   that declares the `GCamera` namespace
//! - [`NativeXmp`]: edits the JPEG's XMP APP1 segment in-process
//!
//! [`read_motion_tags`] reads the values back from a finished file.

mod exiftool;
mod native;
mod reader;

pub use exiftool::{EXIFTOOL_CONFIG, ExifTool};
pub use native::NativeXmp;
pub use reader::{MotionMetadata, read_motion_tags};

use std::path::Path;

use crate::config::{MetadataConfig, WriterKind};
use crate::error::TagError;

/// XML namespace of the Google Camera properties.
pub const GCAMERA_NS: &str = "http://ns.google.com/photos/1.0/camera/";

/// Where viewers show the still frame, in microseconds into the clip.
///
/// Fixed rather than derived from the clip's duration.
pub const PRESENTATION_TIMESTAMP_US: i64 = 1_500_000;

/// The four GCamera values written into every motion photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionTags {
    pub micro_video: u32,
    pub micro_video_version: u32,
    pub micro_video_offset: u64,
    pub presentation_timestamp_us: i64,
}

impl MotionTags {
    pub fn for_offset(offset: u64) -> Self {
        Self {
            micro_video: 1,
            micro_video_version: 1,
            micro_video_offset: offset,
            presentation_timestamp_us: PRESENTATION_TIMESTAMP_US,
        }
    }

    /// `(property, value)` pairs in write order.
    pub fn properties(&self) -> [(&'static str, String); 4] {
        [
            ("MicroVideo", self.micro_video.to_string()),
            ("MicroVideoVersion", self.micro_video_version.to_string()),
            ("MicroVideoOffset", self.micro_video_offset.to_string()),
            (
                "MicroVideoPresentationTimestampUs",
                self.presentation_timestamp_us.to_string(),
            ),
        ]
    }
}

/// Something that can stamp the motion-photo tags onto a merged file.
///
/// The library ships [`ExifTool`] and [`NativeXmp`]. Tests substitute a fake
/// that records the arguments it receives.
pub trait MotionTagger {
    /// Display name used in logs (e.g. `"ExifTool"`).
    fn name(&self) -> &str;

    /// Write the GCamera tags for a clip that starts `offset` bytes before
    /// the end of `path`. The file is modified in place.
    fn apply_motion_tags(&self, path: &Path, offset: u64) -> Result<(), TagError>;
}

/// Build the configured tag writer.
pub fn build_tagger(config: &MetadataConfig) -> Box<dyn MotionTagger> {
    match config.writer {
        WriterKind::Exiftool => {
            let tool = ExifTool::locate(config.exiftool_path.as_deref())
                .with_leading_args(config.exiftool_args.iter().cloned());
            log::info!("ExifTool path: {}", tool.program().display());
            Box::new(tool)
        }
        WriterKind::Native => Box::new(NativeXmp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_fixed_except_offset() {
        let tags = MotionTags::for_offset(5000);
        assert_eq!(
            tags.properties(),
            [
                ("MicroVideo", "1".to_string()),
                ("MicroVideoVersion", "1".to_string()),
                ("MicroVideoOffset", "5000".to_string()),
                ("MicroVideoPresentationTimestampUs", "1500000".to_string()),
            ]
        );
    }

    #[test]
    fn build_tagger_follows_config() {
        let mut config = MetadataConfig::default();
        assert_eq!(build_tagger(&config).name(), "ExifTool");

        config.writer = WriterKind::Native;
        assert_eq!(build_tagger(&config).name(), "native XMP");
    }
}
