use anyhow::Result;
use clap::Parser;
use std::path::{Path, PathBuf};

use motion_photo::config::{self, WriterKind};
use motion_photo::pipeline::{self, Job, Orchestrator, PairStatus};
use motion_photo::xmp;

#[derive(Parser, Debug)]
#[command(
    name = "motion-photo",
    version,
    about = "Merge a photo and a video into a Google Camera motion photo"
)]
struct Cli {
    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Directory with photos and videos to pair. Takes precedence over --photo/--video
    #[arg(short, long, value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Photo (JPEG) to merge
    #[arg(short, long, value_name = "FILE")]
    photo: Option<PathBuf>,

    /// Video (MOV/MP4) to merge
    #[arg(short = 'm', long, value_name = "FILE")]
    video: Option<PathBuf>,

    /// Output directory (default: from config, else "output")
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Copy files that were not paired into the output directory (--dir only)
    #[arg(short, long)]
    copyall: bool,

    /// Path to config file (default: config.json next to binary)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Initialize a default config.json and exit
    #[arg(long)]
    init: bool,

    /// Output results as JSON
    #[arg(long)]
    json: bool,

    /// Write the XMP segment directly instead of running exiftool
    #[arg(long)]
    native: bool,

    /// Path to the exiftool program
    #[arg(long, value_name = "FILE", conflicts_with = "native")]
    exiftool: Option<PathBuf>,

    /// Display the motion-photo tags of a file and exit
    #[arg(long, value_name = "FILE")]
    inspect: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "info" } else { "error" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();
    log::info!("Detailed logging enabled");

    // Handle --init
    if cli.init {
        let config = config::Config::default();
        let path = cli.config.as_deref();
        config.save(path)?;
        let save_path = match path {
            Some(p) => p.to_path_buf(),
            None => config::Config::config_path()?,
        };
        println!("Default config written to {}", save_path.display());
        return Ok(());
    }

    // Handle --inspect
    if !cli.inspect.is_empty() {
        if cli.json {
            let mut entries = Vec::new();
            for path in &cli.inspect {
                let meta = xmp::read_motion_tags(path)?;
                let len = std::fs::metadata(path)?.len();
                entries.push(serde_json::json!({
                    "path": path.display().to_string(),
                    "file_size": len,
                    "motion_photo": meta.as_ref().is_some_and(|m| m.is_motion_photo()),
                    "metadata": meta,
                }));
            }
            println!("{}", serde_json::to_string_pretty(&entries)?);
        } else {
            for path in &cli.inspect {
                print_motion_tags(path)?;
            }
        }
        return Ok(());
    }

    // Usage problems abort before anything on disk is touched.
    let job = pipeline::resolve_job(cli.dir.as_deref(), cli.photo.as_deref(), cli.video.as_deref())?;

    // Load config, then let flags override it
    let mut config = config::Config::load(cli.config.as_deref())?;
    if let Some(output) = cli.output {
        config.output.dir = output;
    }
    if cli.copyall {
        config.output.copy_remaining = true;
    }
    if cli.native {
        config.metadata.writer = WriterKind::Native;
    }
    if let Some(path) = cli.exiftool {
        config.metadata.exiftool_path = Some(path);
    }

    if matches!(job, Job::Single(_)) && cli.copyall {
        log::warn!("--copyall only applies with --dir; ignoring");
    }

    let tagger = xmp::build_tagger(&config.metadata);
    log::info!("Tag writer: {}", tagger.name());

    let mut orchestrator = Orchestrator::new(&config.output.dir, tagger.as_ref());
    log::info!("Output directory: {}", orchestrator.output_dir().display());
    let report = orchestrator.run(&job, config.output.copy_remaining)?;

    for pair in &report.pairs {
        match &pair.status {
            PairStatus::Converted => {
                if let Some(ref output) = pair.output {
                    log::info!("  Motion photo: {}", output.display());
                }
            }
            PairStatus::MetadataFailed { .. } => {
                if let Some(ref output) = pair.output {
                    log::warn!("  Merged without motion tags: {}", output.display());
                }
            }
            PairStatus::Invalid { .. } | PairStatus::MergeFailed { .. } => {}
        }
    }

    // JSON output
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }

    // Summary
    log::info!(
        "Done: {} converted, {} without motion tags, {} failed out of {} pairs",
        report.converted(),
        report.degraded(),
        report.failed(),
        report.pairs.len()
    );
    if !report.copied.is_empty() {
        log::info!(
            "Copied {} remaining file(s), {} failed",
            report.copied.len() - report.copy_failures(),
            report.copy_failures()
        );
    }

    Ok(())
}

// ANSI color codes
const GREEN: &str = "\x1b[32m";
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

/// Print the GCamera tags of a file and whether the offset fits its size.
fn print_motion_tags(path: &Path) -> Result<()> {
    let meta = xmp::read_motion_tags(path)?;
    let len = std::fs::metadata(path)?.len();

    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "═".repeat(72));

    let Some(meta) = meta else {
        println!("  {DIM}(no motion-photo metadata found){RESET}");
        println!();
        return Ok(());
    };

    print_row("MicroVideo", meta.micro_video.map(|v| v.to_string()));
    print_row("MicroVideoVersion", meta.micro_video_version.map(|v| v.to_string()));
    print_row("MicroVideoOffset", meta.micro_video_offset.map(|v| v.to_string()));
    print_row(
        "PresentationTimestampUs",
        meta.presentation_timestamp_us.map(|v| v.to_string()),
    );
    print_row("FileSize", Some(len.to_string()));
    println!("  {DIM}{}{RESET}", "─".repeat(70));

    match meta.micro_video_offset {
        Some(offset) if meta.is_motion_photo() && offset < len => {
            println!(
                "  {GREEN}Motion photo: video starts at byte {}{RESET}",
                len - offset
            );
        }
        Some(offset) if offset >= len => {
            println!("  {DIM}Offset {offset} does not fit a {len}-byte file{RESET}");
        }
        _ => println!("  {DIM}Not a motion photo{RESET}"),
    }
    println!();
    Ok(())
}

/// Print a single row in the tag table.
fn print_row(tag: &str, val: Option<String>) {
    let tag_col = format!("{:<24}", tag);
    match val {
        Some(v) => println!("  {tag_col} : {v}"),
        None => println!("  {DIM}{tag_col} : (absent){RESET}"),
    }
}
