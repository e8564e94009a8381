use serde::Serialize;
use std::path::Path;

use crate::error::TagError;

const XMP_OPEN: &[u8] = b"<x:xmpmeta";
const XMP_CLOSE: &[u8] = b"</x:xmpmeta>";

/// GCamera values found in a file. Each is `None` when absent or unparsable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MotionMetadata {
    pub micro_video: Option<u32>,
    pub micro_video_version: Option<u32>,
    pub micro_video_offset: Option<u64>,
    pub presentation_timestamp_us: Option<i64>,
}

impl MotionMetadata {
    /// True when the file declares itself a motion photo with a usable offset.
    pub fn is_motion_photo(&self) -> bool {
        self.micro_video == Some(1) && self.micro_video_offset.is_some_and(|o| o > 0)
    }
}

/// Read the GCamera properties from the first XMP packet in `path`.
///
/// Both attribute (`GCamera:MicroVideoOffset="5000"`, either quote style) and
/// element (`<GCamera:MicroVideoOffset>5000</GCamera:MicroVideoOffset>`) forms
/// are understood. Returns `Ok(None)` when the file has no XMP packet or the
/// packet carries none of the properties.
pub fn read_motion_tags(path: &Path) -> Result<Option<MotionMetadata>, TagError> {
    let bytes = std::fs::read(path).map_err(|source| TagError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let Some(start) = find(&bytes, XMP_OPEN) else {
        log::debug!("No XMP packet in {}", path.display());
        return Ok(None);
    };
    let end = find(&bytes[start..], XMP_CLOSE)
        .map(|rel| start + rel + XMP_CLOSE.len())
        .unwrap_or(bytes.len());
    let packet = String::from_utf8_lossy(&bytes[start..end]);

    let meta = MotionMetadata {
        micro_video: property(&packet, "MicroVideo").and_then(|v| v.parse().ok()),
        micro_video_version: property(&packet, "MicroVideoVersion").and_then(|v| v.parse().ok()),
        micro_video_offset: property(&packet, "MicroVideoOffset").and_then(|v| v.parse().ok()),
        presentation_timestamp_us: property(&packet, "MicroVideoPresentationTimestampUs")
            .and_then(|v| v.parse().ok()),
    };

    if meta == MotionMetadata::default() {
        return Ok(None);
    }
    Ok(Some(meta))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Value of `GCamera:<name>` in attribute or element form.
fn property<'a>(xml: &'a str, name: &str) -> Option<&'a str> {
    let attr = format!("GCamera:{name}=");
    let mut from = 0;
    while let Some(rel) = xml[from..].find(&attr) {
        let start = from + rel;
        let value_start = start + attr.len();
        let whole_name = xml[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        if let (true, Some(q @ ('"' | '\''))) = (whole_name, xml[value_start..].chars().next()) {
            let rest = &xml[value_start + 1..];
            return rest.find(q).map(|end| rest[..end].trim());
        }
        from = value_start;
    }

    let open = format!("<GCamera:{name}>");
    let close = format!("</GCamera:{name}>");
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(xml[start..end].trim())
}
