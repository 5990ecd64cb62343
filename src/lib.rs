//! Photo Mover - copy a media folder into a dated library
//!
//! This library provides the classify-and-copy engine behind the
//! `photo-mover` CLI:
//! - Classification of files into photos, movies and others
//! - EXIF capture dates with modification time fallback
//! - Rotation-tolerant perceptual matching of photos
//! - Collision-safe destination naming
//! - Parallel copying with Rayon and cooperative stop
//! - A report tree with per-folder status rollup

pub mod classify;
pub mod cli;
pub mod config;
pub mod destination;
pub mod error;
pub mod hash;
pub mod process;
pub mod session;
pub mod similarity;
pub mod state;
pub mod time;
pub mod tree;
pub mod walk;

#[cfg(test)]
mod fixtures;

pub use classify::{Category, classify};
pub use cli::Cli;
pub use config::{Config, ConfigError};
pub use destination::{DestinationResolver, make_unique};
pub use error::{Error, Result};
pub use process::{CopyOutcome, CopyStatus, Processor, RunSummary, StatusSink};
pub use session::{RunEvent, RunState, Session, SessionHandle, start_run, stop};
pub use similarity::{ImageMatcher, same_image};
pub use state::LastLocations;
pub use time::resolve_date;
pub use tree::{NodeId, NodeStatus, ReportTree};
pub use walk::{Walker, is_hidden};
