use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::NamedTempFile;

use super::{MotionTagger, MotionTags};
use crate::error::TagError;

/// ExifTool user-defined tag table for the `XMP-GCamera` group.
///
/// ExifTool does not know the Google Camera namespace, so each invocation is
/// given this file through `-config`.
pub const EXIFTOOL_CONFIG: &str = r#"
%Image::ExifTool::UserDefined = (
    'Image::ExifTool::XMP::Main' => {
        GCamera => {
            SubDirectory => {
                TagTable => 'Image::ExifTool::UserDefined::GCamera',
            },
        },
    },
);

%Image::ExifTool::UserDefined::GCamera = (
    GROUPS => { 0 => 'XMP', 1 => 'XMP-GCamera', 2 => 'Image' },
    NAMESPACE   => { 'GCamera' => 'http://ns.google.com/photos/1.0/camera/' },
    WRITABLE    => 'string',
    MicroVideo  => { Writable => 'integer' },
    MicroVideoVersion => { Writable => 'integer' },
    MicroVideoOffset => { Writable => 'integer' },
    MicroVideoPresentationTimestampUs => { Writable => 'integer' },
);

1;
"#;

#[cfg(windows)]
const BUNDLED_EXIFTOOL: &str = "exiftool/exiftool.exe";
#[cfg(not(windows))]
const BUNDLED_EXIFTOOL: &str = "exiftool/exiftool";

/// Writes the motion tags by running the external `exiftool` program.
#[derive(Debug, Clone)]
pub struct ExifTool {
    program: PathBuf,
    leading_args: Vec<OsString>,
}

impl ExifTool {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            leading_args: Vec::new(),
        }
    }

    /// Pick the tool location: `explicit` if given, else the copy bundled next
    /// to the executable, else whatever `exiftool` resolves to on `PATH`.
    pub fn locate(explicit: Option<&Path>) -> Self {
        if let Some(path) = explicit {
            return Self::new(path);
        }
        match Self::bundled_path() {
            Some(path) if path.is_file() => Self::new(path),
            _ => Self::new("exiftool"),
        }
    }

    /// `exiftool/exiftool[.exe]` inside the executable's directory.
    pub fn bundled_path() -> Option<PathBuf> {
        let exe = std::env::current_exe().ok()?;
        Some(exe.parent()?.join(BUNDLED_EXIFTOOL))
    }

    /// Arguments passed before `-config`, e.g. the script when running
    /// ExifTool through `perl`.
    pub fn with_leading_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.leading_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Full argument list for one invocation, excluding the program itself.
    pub fn command_args(&self, config_path: &Path, target: &Path, offset: u64) -> Vec<OsString> {
        let mut args = self.leading_args.clone();
        args.push("-config".into());
        args.push(config_path.into());
        for (name, value) in MotionTags::for_offset(offset).properties() {
            args.push(format!("-XMP-GCamera:{name}={value}").into());
        }
        args.push("-overwrite_original".into());
        args.push(target.into());
        args
    }
}

/// Materialize [`EXIFTOOL_CONFIG`] into a fresh temporary file.
///
/// The file is removed when the returned handle is dropped or closed.
fn write_config() -> Result<NamedTempFile, TagError> {
    let mut file = tempfile::Builder::new()
        .prefix("motion-photo-")
        .suffix(".config")
        .tempfile()
        .map_err(TagError::Config)?;
    file.write_all(EXIFTOOL_CONFIG.as_bytes())
        .map_err(TagError::Config)?;
    file.flush().map_err(TagError::Config)?;
    Ok(file)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).trim().to_string()
}

impl MotionTagger for ExifTool {
    fn name(&self) -> &str {
        "ExifTool"
    }

    fn apply_motion_tags(&self, path: &Path, offset: u64) -> Result<(), TagError> {
        let config = write_config()?;
        log::info!("Config file path: {}", config.path().display());

        let args = self.command_args(config.path(), path, offset);
        log::debug!(
            "Running {} {}",
            self.program.display(),
            args.iter()
                .map(|a| a.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        let output = Command::new(&self.program).args(&args).output();

        // Remove the config whatever the outcome.
        let config_path = config.path().to_path_buf();
        if let Err(e) = config.close() {
            log::warn!("Failed to remove {}: {e}", config_path.display());
        }

        let output = output.map_err(|source| TagError::Launch {
            program: self.program.clone(),
            source,
        })?;

        let stdout = lossy(&output.stdout);
        if !stdout.is_empty() {
            log::info!("ExifTool output: {stdout}");
        }
        let stderr = lossy(&output.stderr);

        if !output.status.success() {
            log::error!("Failed to add XMP metadata to {}: {}", path.display(), output.status);
            log::error!("ExifTool error output: {stderr}");
            return Err(TagError::ToolFailed {
                status: output.status.to_string(),
                stderr,
            });
        }

        // Warnings such as "Unknown trailer" still exit 0.
        if !stderr.is_empty() {
            log::warn!("ExifTool warnings for {}: {stderr}", path.display());
        }
        log::info!("XMP metadata added to {}.", path.display());
        Ok(())
    }
}
