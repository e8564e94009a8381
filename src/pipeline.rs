use serde::Serialize;
use std::collections::HashSet;
use std::fs::{self, File, FileTimes};
use std::path::{Path, PathBuf};

use crate::error::UsageError;
use crate::media::{self, MediaPair};
use crate::merge::{self, MergeResult};
use crate::pairing;
use crate::xmp::MotionTagger;

/// What a run was asked to do, resolved from the command-line inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Job {
    /// Pair and convert everything under a directory.
    Directory(PathBuf),
    /// Convert one explicitly named photo/video pair.
    Single(MediaPair),
}

/// Decide between directory and single-pair mode.
///
/// `dir` takes precedence. Without it, both `photo` and `video` are required.
/// Nothing on disk is touched here.
///
/// # Example
///
/// ```rust
/// use motion_photo::error::UsageError;
/// use motion_photo::pipeline::{resolve_job, Job};
/// use std::path::Path;
///
/// let job = resolve_job(None, Some(Path::new("a.jpg")), Some(Path::new("a.mov"))).unwrap();
/// assert!(matches!(job, Job::Single(_)));
///
/// let err = resolve_job(None, Some(Path::new("a.jpg")), None).unwrap_err();
/// assert_eq!(err, UsageError::IncompletePair);
/// ```
pub fn resolve_job(
    dir: Option<&Path>,
    photo: Option<&Path>,
    video: Option<&Path>,
) -> Result<Job, UsageError> {
    if let Some(dir) = dir {
        return Ok(Job::Directory(dir.to_path_buf()));
    }
    match (photo, video) {
        (Some(photo), Some(video)) => Ok(Job::Single(MediaPair::new(photo, video))),
        (None, None) => Err(UsageError::NoInput),
        _ => Err(UsageError::IncompletePair),
    }
}

/// Check that `dir` exists and is a directory.
pub fn validate_directory(dir: &Path) -> Result<(), UsageError> {
    if !dir.exists() {
        return Err(UsageError::DirNotFound(dir.to_path_buf()));
    }
    if !dir.is_dir() {
        return Err(UsageError::NotADirectory(dir.to_path_buf()));
    }
    Ok(())
}

/// Source files already consumed by a pair during the current run.
///
/// Paths are stored in absolute form so that lookups do not depend on how the
/// root directory was spelled.
#[derive(Debug, Default)]
pub struct ProcessedSet(HashSet<PathBuf>);

impl ProcessedSet {
    pub fn insert(&mut self, path: &Path) -> bool {
        self.0.insert(absolute(path))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(&absolute(path))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// How far a pair got.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PairStatus {
    /// Merged and tagged.
    Converted,
    /// Merged, but the tags could not be written. The output is still on disk.
    MetadataFailed { error: String },
    /// Failed validation; nothing was written.
    Invalid { error: String },
    /// Validation passed but the merge failed.
    MergeFailed { error: String },
}

/// The result of running a single pair through validate, merge and tag.
#[derive(Debug, Clone, Serialize)]
pub struct PairOutcome {
    pub photo: PathBuf,
    pub video: PathBuf,
    pub output: Option<PathBuf>,
    pub offset_bytes: Option<u64>,
    #[serde(flatten)]
    pub status: PairStatus,
}

impl PairOutcome {
    fn new(pair: &MediaPair, status: PairStatus) -> Self {
        Self {
            photo: pair.photo.clone(),
            video: pair.video.clone(),
            output: None,
            offset_bytes: None,
            status,
        }
    }

    fn merged(pair: &MediaPair, merged: MergeResult, status: PairStatus) -> Self {
        Self {
            output: Some(merged.output_path),
            offset_bytes: Some(merged.offset_bytes),
            ..Self::new(pair, status)
        }
    }

    /// True when the merged file exists, tagged or not.
    pub fn is_merged(&self) -> bool {
        self.output.is_some()
    }
}

/// A leftover file copied into the output directory.
#[derive(Debug, Clone, Serialize)]
pub struct CopyOutcome {
    pub source: PathBuf,
    pub destination: PathBuf,
    pub error: Option<String>,
}

/// Everything a run did, in processing order.
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub pairs: Vec<PairOutcome>,
    pub copied: Vec<CopyOutcome>,
}

impl BatchReport {
    pub fn converted(&self) -> usize {
        self.count(|s| matches!(s, PairStatus::Converted))
    }

    /// Merged without motion metadata.
    pub fn degraded(&self) -> usize {
        self.count(|s| matches!(s, PairStatus::MetadataFailed { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| {
            matches!(s, PairStatus::Invalid { .. } | PairStatus::MergeFailed { .. })
        })
    }

    pub fn copy_failures(&self) -> usize {
        self.copied.iter().filter(|c| c.error.is_some()).count()
    }

    fn count(&self, pred: impl Fn(&PairStatus) -> bool) -> usize {
        self.pairs.iter().filter(|p| pred(&p.status)).count()
    }
}

/// Drives validation, merging and tagging over one pair or a whole tree.
///
/// Pairs are independent: a failure is recorded in the [`BatchReport`] and
/// logged, and the next pair is processed regardless.
///
/// # Example
///
/// ```rust,no_run
/// use motion_photo::pipeline::Orchestrator;
/// use motion_photo::xmp::ExifTool;
/// use std::path::Path;
///
/// let tool = ExifTool::locate(None);
/// let mut orchestrator = Orchestrator::new("output", &tool);
/// let report = orchestrator.run_directory(Path::new("photos"), true)?;
/// println!("{} converted", report.converted());
/// # Ok::<(), motion_photo::error::UsageError>(())
/// ```
pub struct Orchestrator<'a> {
    output_dir: PathBuf,
    tagger: &'a dyn MotionTagger,
    processed: ProcessedSet,
}

impl<'a> Orchestrator<'a> {
    pub fn new(output_dir: impl Into<PathBuf>, tagger: &'a dyn MotionTagger) -> Self {
        Self {
            output_dir: output_dir.into(),
            tagger,
            processed: ProcessedSet::default(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    /// Run whichever mode `job` selects.
    pub fn run(&mut self, job: &Job, copy_remaining: bool) -> Result<BatchReport, UsageError> {
        match job {
            Job::Directory(root) => self.run_directory(root, copy_remaining),
            Job::Single(pair) => Ok(self.run_single(pair)),
        }
    }

    /// Convert one explicitly named pair.
    pub fn run_single(&mut self, pair: &MediaPair) -> BatchReport {
        let outcome = self.process_pair(pair);
        BatchReport {
            pairs: vec![outcome],
            copied: Vec::new(),
        }
    }

    /// Convert every pair under `root`, then optionally copy the leftovers.
    pub fn run_directory(
        &mut self,
        root: &Path,
        copy_remaining: bool,
    ) -> Result<BatchReport, UsageError> {
        validate_directory(root)?;

        let pairs = pairing::find_pairs(root);
        let total = pairs.len();
        let mut report = BatchReport::default();

        for (i, pair) in pairs.iter().enumerate() {
            log::info!("[{}/{}] Processing: {}", i + 1, total, pair.photo.display());
            report.pairs.push(self.process_pair(pair));
        }

        if copy_remaining {
            report.copied = self.copy_remaining(root);
        }

        Ok(report)
    }

    /// Convert `pair` and, once merged, mark both sources as processed.
    fn process_pair(&mut self, pair: &MediaPair) -> PairOutcome {
        let outcome = self.convert(pair);
        if outcome.is_merged() {
            self.processed.insert(&pair.photo);
            self.processed.insert(&pair.video);
        }
        outcome
    }

    /// Validate, merge and tag a single pair. No bookkeeping.
    pub fn convert(&self, pair: &MediaPair) -> PairOutcome {
        if let Err(e) = media::check(&pair.photo, &pair.video) {
            log::error!("{e}");
            return PairOutcome::new(pair, PairStatus::Invalid { error: e.to_string() });
        }

        let merged = match merge::merge(&pair.photo, &pair.video, &self.output_dir) {
            Ok(merged) => merged,
            Err(e) => {
                log::error!(
                    "Failed to merge {} and {}: {e}",
                    pair.photo.display(),
                    pair.video.display()
                );
                return PairOutcome::new(pair, PairStatus::MergeFailed { error: e.to_string() });
            }
        };

        log::info!(
            "Writing motion tags with {} (offset {})",
            self.tagger.name(),
            merged.offset_bytes
        );
        let status = match self
            .tagger
            .apply_motion_tags(&merged.output_path, merged.offset_bytes)
        {
            Ok(()) => PairStatus::Converted,
            Err(e) => {
                log::error!(
                    "Failed to add XMP metadata to {}: {e}",
                    merged.output_path.display()
                );
                PairStatus::MetadataFailed { error: e.to_string() }
            }
        };

        PairOutcome::merged(pair, merged, status)
    }

    /// Copy every file under `root` that no pair consumed into the output
    /// directory, keeping its basename and timestamps.
    ///
    /// Files that already live inside the output directory are left alone.
    pub fn copy_remaining(&self, root: &Path) -> Vec<CopyOutcome> {
        let output_dir = absolute(&self.output_dir);
        let remaining: Vec<PathBuf> = pairing::collect_files(root)
            .into_iter()
            .filter(|path| !self.processed.contains(path))
            .filter(|path| !absolute(path).starts_with(&output_dir))
            .collect();

        log::info!("Found {} remaining files to be copied.", remaining.len());
        if remaining.is_empty() {
            return Vec::new();
        }

        if let Err(e) = fs::create_dir_all(&self.output_dir) {
            log::error!(
                "Failed to create output directory {}: {e}",
                self.output_dir.display()
            );
            let error = e.to_string();
            return remaining
                .into_iter()
                .map(|source| CopyOutcome {
                    destination: self.destination_for(&source),
                    source,
                    error: Some(error.clone()),
                })
                .collect();
        }

        remaining
            .into_iter()
            .map(|source| {
                let destination = self.destination_for(&source);
                let error = copy_preserving_times(&source, &destination).err().map(|e| {
                    log::error!(
                        "Failed to copy {} to {}: {e}",
                        source.display(),
                        destination.display()
                    );
                    e.to_string()
                });
                CopyOutcome {
                    source,
                    destination,
                    error,
                }
            })
            .collect()
    }

    fn destination_for(&self, source: &Path) -> PathBuf {
        match source.file_name() {
            Some(name) => self.output_dir.join(name),
            None => self.output_dir.clone(),
        }
    }
}

/// Copy `src` to `dst`, then carry over access and modification times.
///
/// Timestamp failures are logged, not returned: the content copy is what
/// matters.
fn copy_preserving_times(src: &Path, dst: &Path) -> std::io::Result<()> {
    if merge::same_file(src, dst) {
        log::debug!("{} is already in place", src.display());
        return Ok(());
    }
    fs::copy(src, dst)?;

    let meta = fs::metadata(src)?;
    let mut times = FileTimes::new();
    if let Ok(modified) = meta.modified() {
        times = times.set_modified(modified);
    }
    if let Ok(accessed) = meta.accessed() {
        times = times.set_accessed(accessed);
    }

    // Read-only copies cannot be opened for writing; a plain handle is enough on Unix.
    let result = File::options()
        .write(true)
        .open(dst)
        .or_else(|_| File::open(dst))
        .and_then(|file| file.set_times(times));
    if let Err(e) = result {
        log::warn!("Failed to preserve timestamps on {}: {e}", dst.display());
    }
    Ok(())
}
