use img_parts::Bytes;
use img_parts::jpeg::{Jpeg, JpegSegment};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use super::{GCAMERA_NS, MotionTagger, MotionTags};
use crate::error::TagError;

const XMP_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";
const APP1: u8 = 0xE1;
const EXIF_PREFIX: &[u8] = b"Exif\0\0";
/// Largest segment payload: the 16-bit length field counts itself.
const MAX_SEGMENT_CONTENTS: usize = u16::MAX as usize - 2;

/// Writes the motion tags into the JPEG's XMP APP1 segment without any
/// external program.
///
/// The merged file is split at `len - offset`: only the photo part is
/// re-encoded and the clip bytes are appended back unchanged, so the offset
/// stays valid however much the XMP segment grows.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeXmp;

impl MotionTagger for NativeXmp {
    fn name(&self) -> &str {
        "native XMP"
    }

    fn apply_motion_tags(&self, path: &Path, offset: u64) -> Result<(), TagError> {
        let io_err = |source| TagError::Io {
            path: path.to_path_buf(),
            source,
        };

        let file_bytes = fs::read(path).map_err(io_err)?;
        let len = file_bytes.len() as u64;
        if offset > len {
            return Err(TagError::OffsetOutOfRange { offset, len });
        }

        let split = (len - offset) as usize;
        let mut file_bytes = Bytes::from(file_bytes);
        let video = file_bytes.split_off(split);

        let mut jpeg = Jpeg::from_bytes(file_bytes).map_err(|e| TagError::InvalidJpeg {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        set_motion_xmp(&mut jpeg, &MotionTags::for_offset(offset)).map_err(|len| {
            TagError::XmpTooLarge {
                path: path.to_path_buf(),
                len,
            }
        })?;

        let photo = jpeg.encoder().bytes();
        let mut output = Vec::with_capacity(photo.len() + video.len());
        output.extend_from_slice(&photo);
        output.extend_from_slice(&video);

        // Write next to the target, then swap it in. The temp file is removed
        // on any error before `persist`.
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(io_err)?;
        tmp.write_all(&output).map_err(io_err)?;
        let permissions = fs::metadata(path).map_err(io_err)?.permissions();
        fs::set_permissions(tmp.path(), permissions).map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;

        log::info!("XMP metadata added to {}.", path.display());
        Ok(())
    }
}

fn find_xmp_segment_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(XMP_HEADER))
}

fn find_exif_segment_pos(segments: &[JpegSegment]) -> Option<usize> {
    segments
        .iter()
        .position(|s| s.marker() == APP1 && s.contents().starts_with(EXIF_PREFIX))
}

/// Replace or create the XMP APP1 segment with one carrying `tags`.
///
/// Fails with the payload size when the packet no longer fits in one segment.
/// The JPEG is left untouched in that case.
fn set_motion_xmp(jpeg: &mut Jpeg, tags: &MotionTags) -> Result<(), usize> {
    let xmp_pos = find_xmp_segment_pos(jpeg.segments());
    let existing = xmp_pos.map(|pos| {
        let contents = jpeg.segments()[pos].contents();
        String::from_utf8_lossy(&contents[XMP_HEADER.len()..]).to_string()
    });

    let xmp = match existing {
        Some(xmp) => inject_into_existing_xmp(&xmp, tags).unwrap_or_else(|| {
            log::warn!("Existing XMP packet has no rdf:Description; replacing it");
            build_xmp(tags)
        }),
        None => build_xmp(tags),
    };

    let mut contents = Vec::with_capacity(XMP_HEADER.len() + xmp.len());
    contents.extend_from_slice(XMP_HEADER);
    contents.extend_from_slice(xmp.as_bytes());
    if contents.len() > MAX_SEGMENT_CONTENTS {
        return Err(contents.len());
    }
    let segment = JpegSegment::new_with_contents(APP1, Bytes::from(contents));

    let segments = jpeg.segments_mut();
    match xmp_pos {
        Some(pos) => segments[pos] = segment,
        None => {
            // After EXIF if present, otherwise right after APP0.
            let pos = find_exif_segment_pos(segments)
                .map(|p| p + 1)
                .unwrap_or(1)
                .min(segments.len());
            segments.insert(pos, segment);
        }
    }
    Ok(())
}

fn gcamera_attributes(tags: &MotionTags) -> String {
    tags.properties()
        .iter()
        .map(|(name, value)| format!("\n    GCamera:{name}=\"{value}\""))
        .collect()
}

/// A fresh XMP packet holding only the GCamera properties.
pub(super) fn build_xmp(tags: &MotionTags) -> String {
    let mut xmp = String::new();
    xmp.push_str("<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n");
    xmp.push_str("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n");
    xmp.push_str("<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n");
    xmp.push_str("<rdf:Description rdf:about=\"\"\n");
    xmp.push_str(&format!("    xmlns:GCamera=\"{GCAMERA_NS}\""));
    xmp.push_str(&gcamera_attributes(tags));
    xmp.push_str("/>\n");
    xmp.push_str("</rdf:RDF>\n");
    xmp.push_str("</x:xmpmeta>\n");
    xmp.push_str("<?xpacket end=\"w\"?>");
    xmp
}

/// Add the GCamera properties to an existing packet, keeping everything else.
///
/// Previous GCamera properties, in attribute or element form, are dropped
/// first. Returns `None` when the packet has no `rdf:Description` to extend.
pub(super) fn inject_into_existing_xmp(xmp: &str, tags: &MotionTags) -> Option<String> {
    let mut result = xmp.to_string();
    for (name, _) in tags.properties() {
        remove_gcamera_property(&mut result, name);
    }

    let start = result.find("<rdf:Description")?;
    let open_end = start + result[start..].find('>')?;
    // `<rdf:Description .../>` vs `<rdf:Description ...>`
    let insert_at = if result[..open_end].ends_with('/') {
        open_end - 1
    } else {
        open_end
    };

    let mut attrs = String::new();
    if !result[start..open_end].contains("xmlns:GCamera=") {
        attrs.push_str(&format!("\n    xmlns:GCamera=\"{GCAMERA_NS}\""));
    }
    attrs.push_str(&gcamera_attributes(tags));
    result.insert_str(insert_at, &attrs);
    Some(result)
}

/// Drop `GCamera:<name>="..."` attributes and `<GCamera:name>...</GCamera:name>` elements.
fn remove_gcamera_property(xml: &mut String, name: &str) {
    let element_open = format!("<GCamera:{name}");
    let element_close = format!("</GCamera:{name}>");
    let mut search_from = 0;
    while let Some(rel) = xml[search_from..].find(&element_open) {
        let start = search_from + rel;
        let after_name = start + element_open.len();
        // `<GCamera:MicroVideo` must not match `<GCamera:MicroVideoOffset`.
        let whole_name = xml[after_name..]
            .chars()
            .next()
            .is_some_and(|c| c == '>' || c == '/' || c.is_whitespace());
        if !whole_name {
            search_from = after_name;
            continue;
        }
        let Some(rel_tag_end) = xml[after_name..].find('>') else {
            break;
        };
        let tag_end = after_name + rel_tag_end + 1;
        let end = if xml[..tag_end].ends_with("/>") {
            tag_end
        } else {
            match xml[tag_end..].find(&element_close) {
                Some(rel_close) => tag_end + rel_close + element_close.len(),
                None => break,
            }
        };
        xml.replace_range(start..end, "");
        search_from = start;
    }

    let attr = format!("GCamera:{name}=");
    let mut search_from = 0;
    while let Some(rel) = xml[search_from..].find(&attr) {
        let start = search_from + rel;
        // Whole attribute names only.
        let preceded_ok = xml[..start]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);
        let value_start = start + attr.len();
        let quote = xml[value_start..].chars().next();
        let (true, Some(q @ ('"' | '\''))) = (preceded_ok, quote) else {
            search_from = value_start;
            continue;
        };
        let Some(rel_close) = xml[value_start + 1..].find(q) else {
            break;
        };
        let end = value_start + 1 + rel_close + 1;
        // Take the leading whitespace with it.
        let ws_start = xml[..start].trim_end().len();
        xml.replace_range(ws_start..end, "");
        search_from = ws_start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmp::read_motion_tags;
    use tempfile::TempDir;

    /// Smallest byte stream img-parts accepts as a JPEG: SOI, APP0, SOS with a
    /// couple of entropy bytes, EOI.
    fn tiny_jpeg() -> Vec<u8> {
        let mut b = vec![0xFF, 0xD8];
        b.extend_from_slice(&[
            0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01,
            0x00, 0x01, 0x00, 0x00,
        ]);
        b.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
        b.extend_from_slice(&[0x12, 0x34]);
        b.extend_from_slice(&[0xFF, 0xD9]);
        b
    }

    #[test]
    fn build_xmp_contains_all_tags() {
        let xmp = build_xmp(&MotionTags::for_offset(5000));
        assert!(xmp.contains("xmlns:GCamera=\"http://ns.google.com/photos/1.0/camera/\""));
        assert!(xmp.contains("GCamera:MicroVideo=\"1\""));
        assert!(xmp.contains("GCamera:MicroVideoVersion=\"1\""));
        assert!(xmp.contains("GCamera:MicroVideoOffset=\"5000\""));
        assert!(xmp.contains("GCamera:MicroVideoPresentationTimestampUs=\"1500000\""));
    }

    #[test]
    fn inject_keeps_other_properties() {
        let existing = "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF>\
            <rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
            <dc:title>Trip</dc:title></rdf:Description></rdf:RDF></x:xmpmeta>";
        let out = inject_into_existing_xmp(existing, &MotionTags::for_offset(7)).unwrap();
        assert!(out.contains("<dc:title>Trip</dc:title>"));
        assert!(out.contains("GCamera:MicroVideoOffset=\"7\""));
        assert!(out.contains("xmlns:GCamera="));
    }

    #[test]
    fn inject_replaces_previous_gcamera_values() {
        let existing = "<rdf:Description rdf:about=''\n    xmlns:GCamera='http://ns.google.com/photos/1.0/camera/'\n    \
            GCamera:MicroVideo='1'\n    GCamera:MicroVideoOffset='999'/>\n\
            <rdf:Description><GCamera:MicroVideoVersion>1</GCamera:MicroVideoVersion></rdf:Description>";
        let out = inject_into_existing_xmp(existing, &MotionTags::for_offset(12)).unwrap();
        assert!(!out.contains("999"));
        assert!(!out.contains("<GCamera:MicroVideoVersion>"));
        assert_eq!(out.matches("GCamera:MicroVideoOffset=").count(), 1);
        assert_eq!(out.matches("xmlns:GCamera=").count(), 1);
        assert!(out.contains("GCamera:MicroVideoOffset=\"12\""));
    }

    #[test]
    fn inject_drops_elements_with_attributes() {
        let existing = "<rdf:Description rdf:about=\"\">\
            <GCamera:MicroVideoOffset rdf:datatype=\"xsd:integer\">999</GCamera:MicroVideoOffset>\
            <GCamera:MicroVideo\n>1</GCamera:MicroVideo>\
            <GCamera:MicroVideoVersion/>\
            </rdf:Description>";
        let out = inject_into_existing_xmp(existing, &MotionTags::for_offset(12)).unwrap();
        assert!(!out.contains("999"));
        assert!(!out.contains("<GCamera:"));
        assert_eq!(out.matches("GCamera:MicroVideoOffset=").count(), 1);
        assert_eq!(out.matches("GCamera:MicroVideo=").count(), 1);
        assert!(out.ends_with("</rdf:Description>"));
    }

    #[test]
    fn inject_without_description_is_none() {
        assert!(inject_into_existing_xmp("<x:xmpmeta/>", &MotionTags::for_offset(1)).is_none());
    }

    #[test]
    fn writes_tags_and_keeps_video_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_1.jpg");
        let video: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let mut merged = tiny_jpeg();
        merged.extend_from_slice(&video);
        fs::write(&path, &merged).unwrap();

        NativeXmp.apply_motion_tags(&path, video.len() as u64).unwrap();

        let written = fs::read(&path).unwrap();
        assert!(written.len() > merged.len());
        assert_eq!(&written[written.len() - video.len()..], video.as_slice());
        assert_eq!(&written[..2], &[0xFF, 0xD8]);

        let tags = read_motion_tags(&path).unwrap().unwrap();
        assert_eq!(tags.micro_video, Some(1));
        assert_eq!(tags.micro_video_offset, Some(video.len() as u64));
        assert_eq!(tags.presentation_timestamp_us, Some(1_500_000));
    }

    #[test]
    fn rewriting_does_not_duplicate_tags() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_1.jpg");
        let mut merged = tiny_jpeg();
        merged.extend_from_slice(b"clip-bytes");
        fs::write(&path, &merged).unwrap();

        NativeXmp.apply_motion_tags(&path, 10).unwrap();
        NativeXmp.apply_motion_tags(&path, 10).unwrap();

        let written = fs::read(&path).unwrap();
        let text = String::from_utf8_lossy(&written);
        assert_eq!(text.matches("GCamera:MicroVideoOffset=").count(), 1);
        assert!(written.ends_with(b"clip-bytes"));
    }

    /// `tiny_jpeg` with an XMP APP1 segment whose payload is exactly `contents_len` bytes.
    fn jpeg_with_xmp_payload(contents_len: usize) -> Vec<u8> {
        let head = "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\"><rdf:RDF>\
            <rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\
            <dc:title>";
        let tail = "</dc:title></rdf:Description></rdf:RDF></x:xmpmeta>";
        let pad = contents_len - XMP_HEADER.len() - head.len() - tail.len();
        let mut contents = XMP_HEADER.to_vec();
        contents.extend_from_slice(head.as_bytes());
        contents.extend(std::iter::repeat_n(b'x', pad));
        contents.extend_from_slice(tail.as_bytes());
        assert_eq!(contents.len(), contents_len);

        let jpeg = tiny_jpeg();
        let seg_len = (contents.len() + 2) as u16;
        let mut out = jpeg[..20].to_vec();
        out.extend_from_slice(&[0xFF, APP1]);
        out.extend_from_slice(&seg_len.to_be_bytes());
        out.extend_from_slice(&contents);
        out.extend_from_slice(&jpeg[20..]);
        out
    }

    #[test]
    fn oversized_xmp_is_an_error_not_a_panic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_1.jpg");
        let mut merged = jpeg_with_xmp_payload(MAX_SEGMENT_CONTENTS - 50);
        merged.extend_from_slice(b"clip");
        fs::write(&path, &merged).unwrap();

        let err = NativeXmp.apply_motion_tags(&path, 4).unwrap_err();
        match err {
            TagError::XmpTooLarge { len, .. } => assert!(len > MAX_SEGMENT_CONTENTS),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read(&path).unwrap(), merged);
    }

    #[test]
    fn large_xmp_that_still_fits_is_written() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_1.jpg");
        let mut merged = jpeg_with_xmp_payload(60_000);
        merged.extend_from_slice(b"clip");
        fs::write(&path, &merged).unwrap();

        NativeXmp.apply_motion_tags(&path, 4).unwrap();
        let tags = read_motion_tags(&path).unwrap().unwrap();
        assert_eq!(tags.micro_video_offset, Some(4));
    }

    #[test]
    fn leaves_no_temporary_files_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("IMG_1.jpg");
        let mut merged = tiny_jpeg();
        merged.extend_from_slice(b"clip");
        fs::write(&path, &merged).unwrap();

        NativeXmp.apply_motion_tags(&path, 4).unwrap();
        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["IMG_1.jpg".to_string()]);
    }

    #[test]
    fn offset_larger_than_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, tiny_jpeg()).unwrap();

        let err = NativeXmp.apply_motion_tags(&path, 1_000_000).unwrap_err();
        assert!(matches!(err, TagError::OffsetOutOfRange { .. }));
    }

    #[test]
    fn non_jpeg_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"definitely not a jpeg, followed by clip").unwrap();

        let err = NativeXmp.apply_motion_tags(&path, 4).unwrap_err();
        assert!(matches!(err, TagError::InvalidJpeg { .. }));
    }
}
