//! Processing sessions
//!
//! A [`Session`] is created by [`Session::prepare`], which validates the
//! selected folders, walks the source tree into a [`ReportTree`] and
//! classifies every visible file. It is then run once by a
//! [`Processor`](crate::process::Processor). [`start_run`] does both and
//! hands back a [`SessionHandle`] while the copy runs in the background.

use crate::classify::{Category, classify};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::process::{CopyOutcome, Processor, Progress, RunSummary};
use crate::tree::{NodeId, ReportTree};
use crate::walk::{Entry, EntryKind, WalkEvent, WalkWarning, Walker};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Completed,
    Stopped,
}

/// A discovered file together with its category and report node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedItem {
    pub entry: Entry,
    pub category: Category,
    pub report: NodeId,
}

impl ClassifiedItem {
    pub fn path(&self) -> &Path {
        &self.entry.path
    }
}

/// One run over a source folder
#[derive(Debug)]
pub struct Session {
    source: PathBuf,
    destination: PathBuf,
    tree: ReportTree,
    items: Vec<ClassifiedItem>,
    warnings: Vec<WalkWarning>,
    cancel: AtomicBool,
    processed: AtomicUsize,
    state: Mutex<RunState>,
}

impl Session {
    /// Validate the selected folders and discover the files to copy
    pub fn prepare(config: &Config) -> Result<Self> {
        let source = config.source_dir.as_deref().ok_or(Error::NoSelection)?;
        if !source.is_dir() {
            return Err(Error::InvalidSelection {
                path: source.to_path_buf(),
            });
        }
        let source = source.canonicalize()?;

        let destination = config.dest_dir.as_deref().ok_or(Error::NoDestination)?;
        let destination = resolve_destination(destination)?;

        if destination.starts_with(&source) {
            return Err(Error::DestinationInsideSource {
                destination,
                source_dir: source,
            });
        }

        let tree = ReportTree::new(&source);
        let mut parents: HashMap<PathBuf, NodeId> = HashMap::new();
        parents.insert(source.clone(), tree.root());

        let mut items = Vec::new();
        let mut warnings = Vec::new();

        for event in Walker::new().walk(&source) {
            match event {
                WalkEvent::Entry(entry) => {
                    let parent = parents.get(&entry.parent).copied().unwrap_or(tree.root());
                    let node = tree.insert_if_absent(parent, &entry.name, &entry.path, entry.kind);

                    match entry.kind {
                        EntryKind::Directory => {
                            parents.insert(entry.path.clone(), node);
                        }
                        EntryKind::File => {
                            let category = classify(&entry.name);
                            debug!(path = ?entry.path, ?category, "Classified file");
                            items.push(ClassifiedItem {
                                entry,
                                category,
                                report: node,
                            });
                        }
                    }
                }
                WalkEvent::Warning(warning) => warnings.push(warning),
            }
        }

        if items.is_empty() {
            return Err(Error::NoFiles { path: source });
        }

        fs::create_dir_all(&destination)?;

        info!(
            ?source,
            ?destination,
            files = items.len(),
            warnings = warnings.len(),
            "Prepared session"
        );

        Ok(Self {
            source,
            destination,
            tree,
            items,
            warnings,
            cancel: AtomicBool::new(false),
            processed: AtomicUsize::new(0),
            state: Mutex::new(RunState::Idle),
        })
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn tree(&self) -> &ReportTree {
        &self.tree
    }

    pub fn items(&self) -> &[ClassifiedItem] {
        &self.items
    }

    /// Subtrees skipped during discovery
    pub fn warnings(&self) -> &[WalkWarning] {
        &self.warnings
    }

    pub fn total_files(&self) -> usize {
        self.items.len()
    }

    /// Number of items with an outcome so far
    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }

    /// Ask workers not to start any further items
    pub fn cancel(&self) {
        if !self.cancel.swap(true, Ordering::SeqCst) {
            info!(source = ?self.source, "Stop requested");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> RunState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Move from `Idle` to `Running`; a session runs at most once
    pub(crate) fn begin(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if *state != RunState::Idle {
            return Err(Error::SessionStarted);
        }
        *state = RunState::Running;
        Ok(())
    }

    pub(crate) fn finish(&self, final_state: RunState) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = final_state;
    }

    /// Count one more outcome, returning the new total
    pub(crate) fn record_processed(&self) -> usize {
        self.processed.fetch_add(1, Ordering::SeqCst) + 1
    }
}

/// Canonical form of a destination that may not exist yet
///
/// The deepest existing ancestor is canonicalized and the missing
/// components are appended again.
fn resolve_destination(path: &Path) -> std::io::Result<PathBuf> {
    let absolute = std::path::absolute(path)?;
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();

    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return Ok(absolute.clone()),
        }
    }

    let mut resolved = existing.canonicalize()?;
    for name in missing.iter().rev() {
        resolved.push(name);
    }
    Ok(resolved)
}

/// Event streamed from a background run
#[derive(Debug, Clone)]
pub enum RunEvent {
    Warning(WalkWarning),
    Outcome(CopyOutcome),
    Progress(Progress),
    Finished(RunSummary),
}

/// Handle to a session running on a background thread
pub struct SessionHandle {
    session: Arc<Session>,
    events: Receiver<RunEvent>,
    join: JoinHandle<Result<RunSummary>>,
}

impl SessionHandle {
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Request a cooperative stop; copies already in flight finish
    pub fn stop(&self) {
        self.session.cancel();
    }

    /// Events in the order the aggregator produced them
    ///
    /// The stream ends once the run has finished.
    pub fn events(&self) -> &Receiver<RunEvent> {
        &self.events
    }

    pub fn processed(&self) -> usize {
        self.session.processed()
    }

    pub fn state(&self) -> RunState {
        self.session.state()
    }

    /// Wait for the run to end
    pub fn wait(self) -> Result<RunSummary> {
        match self.join.join() {
            Ok(result) => result,
            Err(_) => Err(Error::Io(std::io::Error::other("copy thread panicked"))),
        }
    }
}

/// Prepare a session and start copying in the background
///
/// Pre-flight errors are returned synchronously; per-file problems show up
/// as outcomes on the event stream.
pub fn start_run(config: Config) -> Result<SessionHandle> {
    let session = Arc::new(Session::prepare(&config)?);
    let processor = Processor::new(&config)?;
    let (tx, events) = mpsc::channel();

    let worker_session = Arc::clone(&session);
    let join = thread::Builder::new()
        .name("copy-dispatch".to_string())
        .spawn(move || {
            let mut sink = tx;
            processor.run(&worker_session, &mut sink)
        })?;

    Ok(SessionHandle {
        session,
        events,
        join,
    })
}

/// Request a cooperative stop of a running session
pub fn stop(handle: &SessionHandle) {
    handle.stop();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::CopyStatus;
    use crate::tree::NodeStatus;

    fn config(source: &Path, dest: &Path) -> Config {
        Config {
            source_dir: Some(source.to_path_buf()),
            dest_dir: Some(dest.to_path_buf()),
            workers: 2,
            ..Config::default()
        }
    }

    fn sample_source() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("album/empty")).unwrap();
        fs::create_dir_all(root.join(".thumbs")).unwrap();
        fs::write(root.join("album/clip.MOV"), b"movie").unwrap();
        fs::write(root.join("notes.txt"), b"notes").unwrap();
        fs::write(root.join(".thumbs/t.jpg"), b"thumb").unwrap();
        dir
    }

    #[test]
    fn test_prepare_requires_source() {
        let dest = tempfile::tempdir().unwrap();
        let config = Config {
            dest_dir: Some(dest.path().to_path_buf()),
            ..Config::default()
        };
        assert!(matches!(Session::prepare(&config), Err(Error::NoSelection)));
    }

    #[test]
    fn test_prepare_rejects_file_as_source() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("a.txt");
        fs::write(&file, b"a").unwrap();

        let result = Session::prepare(&config(&file, &dir.path().join("out")));
        assert!(matches!(result, Err(Error::InvalidSelection { .. })));
    }

    #[test]
    fn test_prepare_requires_destination() {
        let source = sample_source();
        let config = Config {
            source_dir: Some(source.path().to_path_buf()),
            ..Config::default()
        };
        assert!(matches!(Session::prepare(&config), Err(Error::NoDestination)));
    }

    #[test]
    fn test_prepare_rejects_destination_inside_source() {
        let source = sample_source();
        let result = Session::prepare(&config(source.path(), &source.path().join("library")));

        assert!(matches!(result, Err(Error::DestinationInsideSource { .. })));
        assert!(!source.path().join("library").exists());
    }

    #[test]
    fn test_prepare_reports_no_files() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        fs::create_dir_all(source.path().join("empty")).unwrap();
        fs::write(source.path().join(".hidden.jpg"), b"h").unwrap();

        let err = Session::prepare(&config(source.path(), dest.path())).unwrap_err();
        assert!(matches!(err, Error::NoFiles { .. }));
        assert!(err.is_preflight());
    }

    #[test]
    fn test_prepare_mirrors_tree_and_classifies() {
        let source = sample_source();
        let dest = tempfile::tempdir().unwrap();
        let session = Session::prepare(&config(source.path(), &dest.path().join("lib"))).unwrap();

        assert_eq!(session.state(), RunState::Idle);
        assert_eq!(session.total_files(), 2);
        assert!(dest.path().join("lib").is_dir());

        let categories: Vec<(String, Category)> = session
            .items()
            .iter()
            .map(|i| (i.entry.name.clone(), i.category))
            .collect();
        assert_eq!(
            categories,
            vec![
                ("clip.MOV".to_string(), Category::Movie),
                ("notes.txt".to_string(), Category::Other),
            ]
        );

        let tree = session.tree();
        let album = tree.child(tree.root(), "album").unwrap();
        assert!(tree.child(album, "empty").is_some());
        assert_eq!(tree.child(album, "clip.MOV"), Some(session.items()[0].report));
        assert!(tree.child(tree.root(), ".thumbs").is_none());
    }

    #[test]
    fn test_session_runs_once() {
        let source = sample_source();
        let dest = tempfile::tempdir().unwrap();
        let config = config(source.path(), dest.path());
        let session = Session::prepare(&config).unwrap();
        let processor = Processor::new(&config).unwrap();

        let mut outcomes: Vec<CopyOutcome> = Vec::new();
        processor.run(&session, &mut outcomes).unwrap();
        assert_eq!(session.state(), RunState::Completed);

        assert!(matches!(
            processor.run(&session, &mut outcomes),
            Err(Error::SessionStarted)
        ));
        assert_eq!(outcomes.len(), 2);
    }

    #[test]
    fn test_start_run_streams_events() {
        let source = sample_source();
        let dest = tempfile::tempdir().unwrap();
        let handle = start_run(config(source.path(), dest.path())).unwrap();

        let events: Vec<RunEvent> = handle.events().iter().collect();
        let summary = handle.wait().unwrap();

        let outcomes: Vec<&CopyOutcome> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Outcome(o) => Some(o),
                _ => None,
            })
            .collect();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| o.status == CopyStatus::Copied));

        let progress: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                RunEvent::Progress(p) => Some(p.processed),
                _ => None,
            })
            .collect();
        assert_eq!(progress, vec![1, 2]);

        assert!(matches!(events.last(), Some(RunEvent::Finished(_))));
        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(summary.processed, 2);
        assert!(dest.path().join("Movies/clip.MOV").is_file());
        assert!(dest.path().join("Other/notes.txt").is_file());
    }

    #[test]
    fn test_stop_before_dispatch_starts_nothing() {
        let source = sample_source();
        let dest = tempfile::tempdir().unwrap();
        let config = config(source.path(), dest.path());
        let session = Session::prepare(&config).unwrap();
        session.cancel();

        let mut outcomes: Vec<CopyOutcome> = Vec::new();
        let summary = Processor::new(&config)
            .unwrap()
            .run(&session, &mut outcomes)
            .unwrap();

        assert_eq!(summary.state, RunState::Stopped);
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.not_started, 2);
        assert!(outcomes.is_empty());
        assert_eq!(session.tree().status(session.tree().root()), None);
        assert!(!dest.path().join("Other").exists());
    }

    /// Stops the session as soon as the first outcome arrives
    struct StopOnFirst<'a> {
        session: &'a Session,
        outcomes: Vec<CopyOutcome>,
    }

    impl crate::process::StatusSink for StopOnFirst<'_> {
        fn on_outcome(&mut self, outcome: &CopyOutcome) {
            self.session.cancel();
            self.outcomes.push(outcome.clone());
        }
    }

    #[test]
    fn test_stop_during_run() {
        let source = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        for i in 0..20 {
            fs::write(source.path().join(format!("file{:02}.txt", i)), b"x").unwrap();
        }

        let mut config = config(source.path(), dest.path());
        config.workers = 1;
        let session = Session::prepare(&config).unwrap();
        let mut sink = StopOnFirst {
            session: &session,
            outcomes: Vec::new(),
        };

        let summary = Processor::new(&config)
            .unwrap()
            .run(&session, &mut sink)
            .unwrap();

        assert_eq!(summary.state, RunState::Stopped);
        assert_eq!(session.state(), RunState::Stopped);
        assert!(summary.processed >= 1);
        // The bounded outcome channel keeps the worker close behind
        assert!(summary.processed <= 3);
        assert!(summary.not_started > 0);
        assert_eq!(summary.processed, sink.outcomes.len());
        assert_eq!(summary.processed + summary.not_started, 20);
        assert_eq!(session.processed(), summary.processed);

        // Every recorded outcome is a finished copy
        for outcome in &sink.outcomes {
            assert_eq!(
                session.tree().status(outcome.report),
                Some(NodeStatus::Copied)
            );
        }
    }

    /// Stops the session once every item has an outcome
    struct StopOnLast<'a> {
        session: &'a Session,
        seen: usize,
    }

    impl crate::process::StatusSink for StopOnLast<'_> {
        fn on_outcome(&mut self, _outcome: &CopyOutcome) {
            self.seen += 1;
            if self.seen == self.session.total_files() {
                self.session.cancel();
            }
        }
    }

    #[test]
    fn test_stop_after_last_item_still_completes() {
        let source = sample_source();
        let dest = tempfile::tempdir().unwrap();
        let config = config(source.path(), dest.path());
        let session = Session::prepare(&config).unwrap();
        let mut sink = StopOnLast {
            session: &session,
            seen: 0,
        };

        let summary = Processor::new(&config)
            .unwrap()
            .run(&session, &mut sink)
            .unwrap();

        assert!(session.is_cancelled());
        assert_eq!(summary.not_started, 0);
        assert_eq!(summary.state, RunState::Completed);
        assert_eq!(session.state(), RunState::Completed);
    }
}
