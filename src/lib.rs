//! # motion-photo
//!
//! Merge a still photo and a short clip into a single Google Camera "motion
//! photo": a JPEG with the video bytes appended and GCamera XMP metadata
//! (`MicroVideo`, `MicroVideoVersion`, `MicroVideoOffset`,
//! `MicroVideoPresentationTimestampUs`) pointing at where the clip starts.
//!
//! ## Quick Start
//!
//! The [`pipeline`] module runs the whole pair → validate → merge → tag flow:
//!
//! ```rust,no_run
//! use motion_photo::config::Config;
//! use motion_photo::pipeline::Orchestrator;
//! use motion_photo::xmp::build_tagger;
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load(Some("config.json".as_ref()))?;
//!     let tagger = build_tagger(&config.metadata);
//!
//!     let mut orchestrator = Orchestrator::new(&config.output.dir, tagger.as_ref());
//!     let report = orchestrator.run_directory(Path::new("./camera-roll"), true)?;
//!
//!     for pair in &report.pairs {
//!         println!("{} -> {:?}", pair.photo.display(), pair.status);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Lower-Level Usage
//!
//! ```rust,no_run
//! use motion_photo::{media, merge, xmp::{MotionTagger, NativeXmp}};
//! use std::path::Path;
//!
//! fn main() -> anyhow::Result<()> {
//!     let photo = Path::new("IMG_1.jpg");
//!     let video = Path::new("IMG_1.mov");
//!
//!     media::check(photo, video)?;
//!     let merged = merge::merge(photo, video, Path::new("output"))?;
//!     NativeXmp.apply_motion_tags(&merged.output_path, merged.offset_bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## File Layout
//!
//! | Offset | Content |
//! |--------|---------|
//! | `0` | original JPEG bytes (XMP segment added by the tagger) |
//! | `len - MicroVideoOffset` | original MOV/MP4 bytes, unchanged |
//!
//! ## Modules
//!
//! - [`config`] - Configuration types and loading/saving
//! - [`error`] - Error types for validation, merging, tagging and usage
//! - [`media`] - Extension checks and the photo/video pair type
//! - [`merge`] - Byte-exact concatenation and offset computation
//! - [`pairing`] - Directory walk and same-stem pairing
//! - [`pipeline`] - Single-pair and directory runs, leftover copying, reports
//! - [`xmp`] - GCamera tag writers (ExifTool, native) and reader

pub mod config;
pub mod error;
pub mod media;
pub mod merge;
pub mod pairing;
pub mod pipeline;
pub mod xmp;
