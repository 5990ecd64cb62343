//! Copy orchestration with a bounded Rayon worker pool
//!
//! Workers place each classified file into the destination library and send
//! a [`CopyOutcome`] back over a channel. The calling thread is the single
//! aggregator: it counts outcomes, records them in the report tree and
//! forwards them to a [`StatusSink`] in arrival order.

use crate::classify::Category;
use crate::config::Config;
use crate::destination::{DestinationResolver, make_unique};
use crate::error::{Error, Result};
use crate::session::{ClassifiedItem, RunEvent, RunState, Session};
use crate::similarity::ImageMatcher;
use crate::time::{CaptureTime, resolve_date};
use crate::tree::{NodeId, NodeStatus};
use crate::walk::WalkWarning;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use tracing::{Level, debug, error, info, span};

/// Result status of one copy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyStatus {
    /// Copied under its own name, or already present under another name
    Copied,
    /// Copied under a `_N` suffixed name
    Renamed,
    /// Same picture already present at the destination
    Duplicate,
    /// Failed
    Error,
}

impl CopyStatus {
    /// Status shown on the report tree leaf
    pub fn node_status(&self) -> NodeStatus {
        match self {
            CopyStatus::Copied => NodeStatus::Copied,
            CopyStatus::Renamed => NodeStatus::Renamed,
            CopyStatus::Duplicate => NodeStatus::Duplicate,
            CopyStatus::Error => NodeStatus::Pending,
        }
    }
}

/// Result of processing a single file
#[derive(Debug, Clone)]
pub struct CopyOutcome {
    /// Source file path
    pub source: PathBuf,
    /// Where the file now lives in the library (if successful)
    pub destination: Option<PathBuf>,
    /// Report tree leaf of the source file
    pub report: NodeId,
    pub category: Category,
    pub status: CopyStatus,
    /// Capture time used for date bucketing (photos only)
    pub time_info: Option<CaptureTime>,
    /// Error message (if failed)
    pub error: Option<String>,
}

/// Progress after an outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    pub current: PathBuf,
}

/// Final counts of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub state: RunState,
    pub total: usize,
    pub processed: usize,
    pub copied: usize,
    pub renamed: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Items skipped because a stop was requested
    pub not_started: usize,
}

/// Run statistics
#[derive(Debug, Default)]
pub struct RunStats {
    pub total_files: AtomicUsize,
    pub processed: AtomicUsize,
    pub copied: AtomicUsize,
    pub renamed: AtomicUsize,
    pub duplicates: AtomicUsize,
    pub failed: AtomicUsize,
    pub not_started: AtomicUsize,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one outcome
    pub fn record(&self, status: CopyStatus) {
        self.processed.fetch_add(1, Ordering::Relaxed);
        let counter = match status {
            CopyStatus::Copied => &self.copied,
            CopyStatus::Renamed => &self.renamed,
            CopyStatus::Duplicate => &self.duplicates,
            CopyStatus::Error => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, state: RunState) -> RunSummary {
        RunSummary {
            state,
            total: self.total_files.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            copied: self.copied.load(Ordering::Relaxed),
            renamed: self.renamed.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            not_started: self.not_started.load(Ordering::Relaxed),
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "Total: {}, Processed: {}, Copied: {}, Renamed: {}, Duplicates: {}, Failed: {}, Not started: {}",
            self.total_files.load(Ordering::Relaxed),
            self.processed.load(Ordering::Relaxed),
            self.copied.load(Ordering::Relaxed),
            self.renamed.load(Ordering::Relaxed),
            self.duplicates.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.not_started.load(Ordering::Relaxed)
        )
    }
}

/// Receives run notifications on the aggregating thread
pub trait StatusSink {
    fn on_outcome(&mut self, outcome: &CopyOutcome);

    fn on_progress(&mut self, _progress: &Progress) {}

    fn on_warning(&mut self, _warning: &WalkWarning) {}

    fn on_finished(&mut self, _summary: &RunSummary) {}
}

impl StatusSink for Vec<CopyOutcome> {
    fn on_outcome(&mut self, outcome: &CopyOutcome) {
        self.push(outcome.clone());
    }
}

// A closed receiver only means nobody is listening any more
impl StatusSink for mpsc::Sender<RunEvent> {
    fn on_outcome(&mut self, outcome: &CopyOutcome) {
        let _ = self.send(RunEvent::Outcome(outcome.clone()));
    }

    fn on_progress(&mut self, progress: &Progress) {
        let _ = self.send(RunEvent::Progress(progress.clone()));
    }

    fn on_warning(&mut self, warning: &WalkWarning) {
        let _ = self.send(RunEvent::Warning(warning.clone()));
    }

    fn on_finished(&mut self, summary: &RunSummary) {
        let _ = self.send(RunEvent::Finished(summary.clone()));
    }
}

/// Where a file ended up
struct Placement {
    destination: PathBuf,
    status: CopyStatus,
    capture: Option<CaptureTime>,
}

/// Copies the files of a session into the destination library
pub struct Processor {
    pool: ThreadPool,
    matcher: ImageMatcher,
}

impl Processor {
    /// Create a processor with its own worker pool
    pub fn new(config: &Config) -> Result<Self> {
        let workers = config.effective_workers();
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("copy-worker-{}", i))
            .build()?;

        debug!(workers, threshold = config.similarity_threshold, "Created processor");

        Ok(Self {
            pool,
            matcher: ImageMatcher::new(config.similarity_threshold),
        })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Copy every item of `session`, reporting to `sink`
    ///
    /// Blocks until all started items have an outcome. A session can only
    /// be run once.
    pub fn run(&self, session: &Session, sink: &mut dyn StatusSink) -> Result<RunSummary> {
        let _span = span!(Level::INFO, "processor_run", source = ?session.source()).entered();
        session.begin()?;

        for warning in session.warnings() {
            sink.on_warning(warning);
        }

        let total = session.total_files();
        let stats = RunStats::new();
        stats.total_files.store(total, Ordering::Relaxed);
        let resolver = DestinationResolver::new(session.destination());

        info!(total, workers = self.workers(), "Copying files...");

        // Bounded so workers cannot run far ahead of a stop request
        let (tx, rx) = mpsc::sync_channel::<CopyOutcome>(self.workers());

        thread::scope(|scope| {
            let stats = &stats;
            let resolver = &resolver;

            scope.spawn(move || {
                self.pool.install(|| {
                    session
                        .items()
                        .par_iter()
                        .for_each_with(tx, |tx, item| {
                            if session.is_cancelled() {
                                stats.not_started.fetch_add(1, Ordering::Relaxed);
                                return;
                            }
                            let _ = tx.send(self.process_item(item, resolver));
                        });
                });
            });

            for outcome in rx {
                let processed = session.record_processed();
                stats.record(outcome.status);
                session
                    .tree()
                    .record(outcome.report, outcome.status.node_status());

                match outcome.status {
                    CopyStatus::Error => error!(
                        source = ?outcome.source,
                        error = outcome.error.as_deref().unwrap_or_default(),
                        "Failed to copy file"
                    ),
                    status => info!(
                        source = ?outcome.source,
                        destination = ?outcome.destination,
                        ?status,
                        "Processed file"
                    ),
                }

                sink.on_outcome(&outcome);
                sink.on_progress(&Progress {
                    processed,
                    total,
                    current: outcome.source.clone(),
                });
            }
        });

        // Stopped only when a worker actually skipped an item
        let state = if stats.not_started.load(Ordering::Relaxed) > 0 {
            RunState::Stopped
        } else {
            RunState::Completed
        };
        session.finish(state);
        session.tree().rollup();

        info!(?state, "{}", stats.summary());

        let summary = stats.snapshot(state);
        sink.on_finished(&summary);
        Ok(summary)
    }

    fn process_item(&self, item: &ClassifiedItem, resolver: &DestinationResolver) -> CopyOutcome {
        let source = item.path();
        let _file_span = span!(Level::DEBUG, "process_file", ?source).entered();

        let placed = match item.category {
            Category::Photo => self.place_photo(source, resolver),
            category => place_fixed(category, source, resolver),
        };

        match placed {
            Ok(placement) => CopyOutcome {
                source: source.to_path_buf(),
                destination: Some(placement.destination),
                report: item.report,
                category: item.category,
                status: placement.status,
                time_info: placement.capture,
                error: None,
            },
            Err(e) => CopyOutcome {
                source: source.to_path_buf(),
                destination: None,
                report: item.report,
                category: item.category,
                status: CopyStatus::Error,
                time_info: None,
                error: Some(e.to_string()),
            },
        }
    }

    fn place_photo(&self, source: &Path, resolver: &DestinationResolver) -> Result<Placement> {
        let capture = resolve_date(source);
        let dest = resolver.resolve(Category::Photo, source, Some(&capture.timestamp))?;

        if !dest.exists() {
            copy_file(source, &dest)?;
            return Ok(Placement {
                destination: dest,
                status: CopyStatus::Copied,
                capture: Some(capture),
            });
        }

        if self.matcher.same_image(source, &dest) {
            let status = if dest.file_name() == source.file_name() {
                debug!(?source, ?dest, "Photo already in library");
                CopyStatus::Duplicate
            } else {
                CopyStatus::Copied
            };
            return Ok(Placement {
                destination: dest,
                status,
                capture: Some(capture),
            });
        }

        let unique = make_unique(&dest);
        copy_file(source, &unique)?;
        Ok(Placement {
            destination: unique,
            status: CopyStatus::Renamed,
            capture: Some(capture),
        })
    }
}

/// Place a movie or other file into its fixed folder
fn place_fixed(
    category: Category,
    source: &Path,
    resolver: &DestinationResolver,
) -> Result<Placement> {
    let dest = resolver.resolve(category, source, None)?;

    let (destination, status) = if dest.exists() {
        (make_unique(&dest), CopyStatus::Renamed)
    } else {
        (dest, CopyStatus::Copied)
    };

    copy_file(source, &destination)?;
    Ok(Placement {
        destination,
        status,
        capture: None,
    })
}

/// Copy file with buffered I/O, keeping access and modification times
///
/// Never overwrites: a file appearing at `dest` after it was chosen makes
/// the copy fail. A failed copy leaves nothing behind at `dest`.
fn copy_file(source: &Path, dest: &Path) -> Result<()> {
    let wrap = |e: std::io::Error| Error::Copy {
        from: source.to_path_buf(),
        to: dest.to_path_buf(),
        source: e,
    };

    let src_file = File::open(source).map_err(wrap)?;
    let dest_file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(dest)
        .map_err(wrap)?;

    if let Err(e) = copy_contents(src_file, dest_file) {
        if let Err(remove) = fs::remove_file(dest) {
            error!(?dest, error = %remove, "Could not remove partial copy");
        }
        return Err(wrap(e));
    }

    if let Ok(metadata) = fs::metadata(source) {
        let atime = filetime::FileTime::from_last_access_time(&metadata);
        let mtime = filetime::FileTime::from_last_modification_time(&metadata);
        if let Err(e) = filetime::set_file_times(dest, atime, mtime) {
            debug!(?dest, error = %e, "Could not preserve file times");
        }
    }

    Ok(())
}

fn copy_contents(source: File, dest: File) -> std::io::Result<()> {
    let mut reader = BufReader::with_capacity(256 * 1024, source);
    let mut writer = BufWriter::with_capacity(256 * 1024, dest);

    let mut buffer = vec![0u8; 256 * 1024];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        writer.write_all(&buffer[..bytes_read])?;
    }
    writer.flush()
}
