//! # pose-kinematics: Kinematic Features and Adaptive Histograms for Pose Data
//!
//! Turns per-subject 3-D landmark trajectories into seven per-frame kinematic
//! signals, then summarizes each signal as per-subject normalized histograms
//! over a bin support shared by the whole cohort, averaged per experimental
//! group.
//!
//! ## Design Principles
//!
//! - **Shared support**: bin edges are chosen once per variable from the pooled
//!   cohort, so every subject's histogram is directly comparable
//! - **Robust ranges**: edges span the 1st-99th percentile, never min/max
//! - **Soft degeneracy**: empty, constant or non-finite samples fall back to
//!   documented defaults instead of failing the batch
//! - **Loud schema errors**: a missing landmark column aborts the run
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use pose_kinematics::config::Settings;
//! use pose_kinematics::pipeline::Pipeline;
//!
//! let mut settings = Settings::load("configs/config.yaml".as_ref())?;
//! settings.resolve_paths(&std::env::current_dir()?)?;
//!
//! let reports = Pipeline::new(settings).run(&["compute_scalars", "build_histograms"])?;
//! for report in reports {
//!     println!("{}: {:?}", report.step, report.outcome);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod binning;
pub mod config;
pub mod error;
pub mod features;
pub mod histogram;
pub mod pipeline;
pub mod storage;

pub use error::{Error, Result};
