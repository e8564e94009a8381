use assert_cmd::Command;
use predicates::str::contains;
use std::error::Error;
use std::fs;
use std::path::Path;
use tempfile::{TempDir, tempdir};

fn motion_photo_cmd(workdir: &TempDir) -> Command {
    let mut cmd =
        Command::cargo_bin("motion-photo-cli").expect("Failed to find motion-photo-cli binary");
    // Keep runs independent of any config.json sitting next to the binary.
    cmd.current_dir(workdir.path())
        .arg("--config")
        .arg(workdir.path().join("config.json"));
    cmd
}

/// Smallest JPEG the native writer accepts: SOI, JFIF APP0, SOS, two bytes of scan data, EOI.
fn tiny_jpeg() -> Vec<u8> {
    let mut b = vec![0xFF, 0xD8];
    b.extend_from_slice(&[
        0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00, 0x01, 0x00,
        0x01, 0x00, 0x00,
    ]);
    b.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x08, 0x01, 0x01, 0x00, 0x00, 0x3F, 0x00]);
    b.extend_from_slice(&[0x12, 0x34]);
    b.extend_from_slice(&[0xFF, 0xD9]);
    b
}

fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

#[test]
fn photo_without_video_is_a_usage_error() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;
    write(&work.path().join("a.jpg"), &tiny_jpeg());

    motion_photo_cmd(&work)
        .arg("--photo")
        .arg("a.jpg")
        .assert()
        .failure()
        .stderr(contains("Must provide both --photo and --video"));

    assert!(!work.path().join("output").exists());
    Ok(())
}

#[test]
fn no_input_is_a_usage_error() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;

    motion_photo_cmd(&work)
        .assert()
        .failure()
        .stderr(contains("Need to provide --dir or both --photo and --video"));

    assert!(!work.path().join("output").exists());
    Ok(())
}

#[test]
fn missing_directory_fails() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;

    motion_photo_cmd(&work)
        .arg("--dir")
        .arg("does-not-exist")
        .assert()
        .failure()
        .stderr(contains("Path does not exist"));
    Ok(())
}

#[test]
fn file_as_directory_fails() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;
    write(&work.path().join("plain.txt"), b"hello");

    motion_photo_cmd(&work)
        .arg("--dir")
        .arg("plain.txt")
        .assert()
        .failure()
        .stderr(contains("Path is not a directory"));
    Ok(())
}

#[test]
fn missing_exiftool_still_leaves_merged_file() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;
    write(&work.path().join("trip/IMG_1.jpg"), &[0xAB; 100]);
    write(&work.path().join("trip/IMG_1.mov"), &[0xCD; 5000]);

    motion_photo_cmd(&work)
        .arg("--dir")
        .arg("trip")
        .arg("--output")
        .arg("out")
        .arg("--exiftool")
        .arg(work.path().join("no-such-exiftool"))
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"status\": \"metadata_failed\""))
        .stdout(contains("\"offset_bytes\": 5000"));

    let merged = fs::read(work.path().join("out/IMG_1.jpg"))?;
    assert_eq!(merged.len(), 5100);
    assert_eq!(&merged[..100], &[0xAB; 100][..]);
    assert_eq!(&merged[100..], &[0xCD; 5000][..]);
    Ok(())
}

#[test]
fn native_writer_produces_tagged_motion_photo() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;
    let video = vec![0x5A; 3000];
    write(&work.path().join("trip/IMG_2.jpg"), &tiny_jpeg());
    write(&work.path().join("trip/IMG_2.mp4"), &video);

    motion_photo_cmd(&work)
        .arg("--dir")
        .arg("trip")
        .arg("--output")
        .arg("out")
        .arg("--native")
        .assert()
        .success();

    let merged = fs::read(work.path().join("out/IMG_2.jpg"))?;
    assert!(merged.ends_with(&video));
    assert_eq!(&merged[..2], &[0xFF, 0xD8]);

    motion_photo_cmd(&work)
        .arg("--inspect")
        .arg("out/IMG_2.jpg")
        .assert()
        .success()
        .stdout(contains("MicroVideoOffset"))
        .stdout(contains("3000"))
        .stdout(contains("Motion photo: video starts at byte"));

    motion_photo_cmd(&work)
        .arg("--inspect")
        .arg("out/IMG_2.jpg")
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"micro_video_offset\": 3000"))
        .stdout(contains("\"motion_photo\": true"));

    motion_photo_cmd(&work)
        .arg("--inspect")
        .arg("trip/IMG_2.mp4")
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"metadata\": null"))
        .stdout(contains("\"motion_photo\": false"));
    Ok(())
}

#[test]
fn single_pair_mode() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;
    write(&work.path().join("a.jpg"), &tiny_jpeg());
    write(&work.path().join("b.mov"), &[1, 2, 3, 4]);

    motion_photo_cmd(&work)
        .arg("--photo")
        .arg("a.jpg")
        .arg("--video")
        .arg("b.mov")
        .arg("--native")
        .assert()
        .success();

    let merged = fs::read(work.path().join("output/a.jpg"))?;
    assert!(merged.ends_with(&[1, 2, 3, 4]));
    Ok(())
}

#[test]
fn invalid_pair_exits_successfully() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;
    write(&work.path().join("a.png"), b"png");
    write(&work.path().join("b.mov"), b"mov");

    motion_photo_cmd(&work)
        .arg("--photo")
        .arg("a.png")
        .arg("--video")
        .arg("b.mov")
        .arg("--native")
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"status\": \"invalid\""));

    assert!(!work.path().join("output/a.png").exists());
    Ok(())
}

#[test]
fn copyall_copies_leftovers() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;
    write(&work.path().join("trip/IMG_1.jpg"), &tiny_jpeg());
    write(&work.path().join("trip/IMG_1.mov"), &[7; 64]);
    write(&work.path().join("trip/notes.txt"), b"remember the ferry");
    write(&work.path().join("trip/IMG_9.jpg"), &tiny_jpeg());

    motion_photo_cmd(&work)
        .arg("--dir")
        .arg("trip")
        .arg("--output")
        .arg("out")
        .arg("--native")
        .arg("--copyall")
        .assert()
        .success();

    let out = work.path().join("out");
    assert_eq!(fs::read(out.join("notes.txt"))?, b"remember the ferry");
    assert_eq!(fs::read(out.join("IMG_9.jpg"))?, tiny_jpeg());
    assert!(out.join("IMG_1.jpg").exists());
    assert!(!out.join("IMG_1.mov").exists());
    Ok(())
}

#[test]
fn init_writes_default_config() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;

    motion_photo_cmd(&work)
        .arg("--init")
        .assert()
        .success()
        .stdout(contains("Default config written to"));

    let written = fs::read_to_string(work.path().join("config.json"))?;
    assert!(written.contains("\"writer\": \"exiftool\""));
    assert!(written.contains("\"dir\": \"output\""));
    Ok(())
}

#[test]
fn config_file_selects_writer_and_output() -> Result<(), Box<dyn Error>> {
    let work = tempdir()?;
    write(
        &work.path().join("config.json"),
        br#"{ "output": { "dir": "from-config" }, "metadata": { "writer": "native" } }"#,
    );
    write(&work.path().join("trip/IMG_3.jpg"), &tiny_jpeg());
    write(&work.path().join("trip/IMG_3.MOV"), &[9; 10]);

    motion_photo_cmd(&work)
        .arg("--dir")
        .arg("trip")
        .arg("--json")
        .assert()
        .success()
        .stdout(contains("\"status\": \"converted\""));

    assert!(work.path().join("from-config/IMG_3.jpg").exists());
    Ok(())
}
