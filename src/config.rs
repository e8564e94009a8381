use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration for the motion-photo converter.
///
/// Every field has a default, so a config file only needs the keys it wants
/// to change. Command-line flags override whatever is loaded here.
///
/// # Loading
///
/// ```rust,no_run
/// use motion_photo::config::{Config, WriterKind};
///
/// // From a JSON file
/// let config = Config::load(Some("config.json".as_ref())).unwrap();
///
/// // Or use defaults and customize
/// let mut config = Config::default();
/// config.metadata.writer = WriterKind::Native;
/// config.output.copy_remaining = true;
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where results go and whether unmatched files follow them.
    pub output: OutputConfig,
    /// How the GCamera tags are written.
    pub metadata: MetadataConfig,
}

/// Output behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory that receives merged photos (and copied leftovers).
    pub dir: PathBuf,
    /// Copy files that were not part of any pair into `dir` (directory mode only).
    pub copy_remaining: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            copy_remaining: false,
        }
    }
}

/// Which writer stamps the motion-photo tags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriterKind {
    /// External `exiftool` process.
    #[default]
    Exiftool,
    /// Built-in XMP segment writer.
    Native,
}

/// Metadata writer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub writer: WriterKind,
    /// Explicit `exiftool` location. When unset, the bundled copy next to the
    /// executable is used, then `exiftool` from `PATH`.
    pub exiftool_path: Option<PathBuf>,
    /// Arguments placed before the tag assignments, e.g. the script path when
    /// `exiftool_path` points at `perl`.
    pub exiftool_args: Vec<String>,
}

impl Config {
    /// Resolve the config file path: `config.json` next to the executable.
    pub fn config_path() -> Result<PathBuf> {
        let exe_path = std::env::current_exe().context("Failed to get executable path")?;
        let exe_dir = exe_path
            .parent()
            .context("Failed to get executable directory")?;
        Ok(exe_dir.join("config.json"))
    }

    /// Load config from the given path, or from the default location.
    ///
    /// A missing file yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            log::info!(
                "Config file not found at {}. Using defaults.",
                config_path.display()
            );
            return Ok(Self::default());
        }

        let contents =
            std::fs::read_to_string(&config_path).context("Failed to read config file")?;
        let config: Config =
            serde_json::from_str(&contents).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Save config to the given path, or to the default location.
    pub fn save(&self, path: Option<&Path>) -> Result<()> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(&config_path, contents).context("Failed to write config file")?;
        log::info!("Config saved to {}", config_path.display());
        Ok(())
    }
}
