//! Reactive recompilation of documents as they are added or edited.
//!
//! The loop receives add/change events from [`FileWatcher`], keeps only
//! documents, and hands each one to a [`Dispatcher`] without waiting for the
//! compilation to finish. The dispatcher runs at most one compilation per
//! path at a time: an event for a path already in flight is coalesced into a
//! single follow-up run once the current one completes. A semaphore bounds
//! how many compilations run at once across all paths.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{Notify, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::CompilerConfig;
use crate::error::{CompilerError, Result};
use crate::file_watcher::{FileEvent, FileEventType, FileWatcher};
use crate::pipeline::{Pipeline, PipelineOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    Idle,
    Watching,
    Stopped,
}

#[derive(Debug, Clone)]
pub struct WatchOptions {
    /// Extension (without the dot) of documents to compile
    pub document_extension: String,
    /// Compilations allowed to run at once
    pub max_concurrent: usize,
    /// Compile documents already present when watching starts
    pub initial_scan: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            document_extension: crate::config::DOCUMENT_EXTENSION.to_string(),
            max_concurrent: crate::config::DEFAULT_MAX_CONCURRENT,
            initial_scan: true,
        }
    }
}

impl From<&CompilerConfig> for WatchOptions {
    fn from(config: &CompilerConfig) -> Self {
        Self {
            document_extension: config.document_extension.clone(),
            max_concurrent: config.max_concurrent,
            initial_scan: true,
        }
    }
}

/// What happened to a path handed to the dispatcher
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// A new compilation was spawned
    Started,
    /// The path was already compiling; one more run is queued behind it
    Coalesced,
}

struct DispatchInner {
    pipeline: Arc<Pipeline>,
    // path -> whether another run was requested while this one was in flight
    in_flight: Mutex<HashMap<PathBuf, bool>>,
    permits: Semaphore,
    idle: Notify,
    outcomes: Option<UnboundedSender<PipelineOutcome>>,
}

/// In-flight registry plus bounded task spawning
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatchInner>,
}

impl Dispatcher {
    pub fn new(
        pipeline: Arc<Pipeline>,
        max_concurrent: usize,
        outcomes: Option<UnboundedSender<PipelineOutcome>>,
    ) -> Self {
        Self {
            inner: Arc::new(DispatchInner {
                pipeline,
                in_flight: Mutex::new(HashMap::new()),
                permits: Semaphore::new(max_concurrent.max(1)),
                idle: Notify::new(),
                outcomes,
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<PathBuf, bool>> {
        self.inner.in_flight.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Schedule a compilation of `path` and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, path: PathBuf) -> DispatchStatus {
        {
            let mut registry = self.registry();
            if let Some(rerun) = registry.get_mut(&path) {
                *rerun = true;
                debug!(path = %path.display(), "Compilation already in flight, queued one more run");
                return DispatchStatus::Coalesced;
            }
            registry.insert(path.clone(), false);
        }

        let dispatcher = self.clone();
        tokio::spawn(async move { dispatcher.run(path).await });
        DispatchStatus::Started
    }

    async fn run(&self, path: PathBuf) {
        loop {
            match self.inner.permits.acquire().await {
                Ok(_permit) => {
                    let outcome = self.inner.pipeline.process_document(&path).await;
                    if let Some(outcomes) = &self.inner.outcomes {
                        let _ = outcomes.send(outcome);
                    }
                }
                Err(e) => error!(path = %path.display(), "Could not schedule compilation: {}", e),
            }

            let mut registry = self.registry();
            let rerun = registry.get_mut(&path).map(std::mem::take).unwrap_or(false);
            if !rerun {
                registry.remove(&path);
                if registry.is_empty() {
                    self.inner.idle.notify_waiters();
                }
                return;
            }
        }
    }

    pub fn in_flight(&self) -> usize {
        self.registry().len()
    }

    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.registry().contains_key(path)
    }

    /// Wait until no compilation is running or queued.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            if self.registry().is_empty() {
                return;
            }
            notified.await;
        }
    }
}

/// True when `path` ends in `.{extension}`.
pub fn is_document(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy() == extension)
        .unwrap_or(false)
}

/// Recursively collect documents under `root`, sorted for stable ordering.
///
/// Directories and entries that cannot be read are logged and skipped; the
/// documents found elsewhere are still returned.
///
/// # Arguments
///
/// * `root` - Directory to scan
/// * `extension` - Document extension without the dot
///
/// # Returns
///
/// Every readable document path under `root`
pub fn scan_documents(root: &Path, extension: &str) -> Vec<PathBuf> {
    let mut found = Vec::new();
    scan_dir(root, extension, &mut found);
    found.sort();
    found
}

fn scan_dir(current: &Path, extension: &str, found: &mut Vec<PathBuf>) {
    let entries = match fs::read_dir(current) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Skipping unreadable directory {}: {}", current.display(), e);
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", current.display(), e);
                continue;
            }
        };
        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        if file_type.is_dir() {
            scan_dir(&path, extension, found);
        } else if file_type.is_file() && is_document(&path, extension) {
            found.push(path);
        }
    }
}

/// Route one raw event: filter by extension, absolutize, dispatch.
fn handle_event(root: &Path, extension: &str, dispatcher: &Dispatcher, event: FileEvent) -> Option<DispatchStatus> {
    if !is_document(&event.path, extension) {
        return None;
    }

    let absolute = if event.path.is_absolute() {
        event.path
    } else {
        root.join(event.path)
    };
    info!("File {}: {}", event.event_type.as_str(), absolute.display());
    Some(dispatcher.dispatch(absolute))
}

async fn event_loop(
    root: PathBuf,
    extension: String,
    dispatcher: Dispatcher,
    mut events: UnboundedReceiver<FileEvent>,
) {
    while let Some(event) = events.recv().await {
        handle_event(&root, &extension, &dispatcher, event);
    }
    debug!("Event channel closed");
}

/// Watches a directory tree and recompiles documents on add/change.
///
/// `Idle -> Watching -> Stopped`; a stopped loop cannot be restarted.
pub struct WatchLoop {
    options: WatchOptions,
    dispatcher: Dispatcher,
    state: WatchState,
    watcher: Option<FileWatcher>,
    event_task: Option<JoinHandle<()>>,
}

impl WatchLoop {
    pub fn new(pipeline: Arc<Pipeline>, options: WatchOptions) -> Self {
        Self::with_outcomes(pipeline, options, None)
    }

    /// Like [`WatchLoop::new`], additionally reporting every finished
    /// compilation on `outcomes`.
    pub fn with_outcomes(
        pipeline: Arc<Pipeline>,
        options: WatchOptions,
        outcomes: Option<UnboundedSender<PipelineOutcome>>,
    ) -> Self {
        let dispatcher = Dispatcher::new(pipeline, options.max_concurrent, outcomes);
        Self {
            options,
            dispatcher,
            state: WatchState::Idle,
            watcher: None,
            event_task: None,
        }
    }

    pub fn state(&self) -> WatchState {
        self.state
    }

    /// Begin watching `root`. Must be called from within a tokio runtime.
    pub fn start<P: AsRef<Path>>(&mut self, root: P) -> Result<()> {
        if self.state != WatchState::Idle {
            return Err(CompilerError::InvalidState(format!(
                "watch loop cannot start from {:?}",
                self.state
            )));
        }

        let root = fs::canonicalize(root.as_ref())
            .map_err(|e| CompilerError::Watch(format!("{}: {}", root.as_ref().display(), e)))?;
        info!("Watching for .{} files in: {}", self.options.document_extension, root.display());

        let (tx, rx) = unbounded_channel();
        let mut watcher = FileWatcher::new(tx.clone())?;
        watcher.watch(&root)?;

        if self.options.initial_scan {
            for path in scan_documents(&root, &self.options.document_extension) {
                let _ = tx.send(FileEvent::new(path, FileEventType::Added));
            }
        }
        drop(tx);

        self.event_task = Some(tokio::spawn(event_loop(
            root,
            self.options.document_extension.clone(),
            self.dispatcher.clone(),
            rx,
        )));
        self.watcher = Some(watcher);
        self.state = WatchState::Watching;
        info!("GPT Compiler is running. Press Ctrl+C to stop.");
        Ok(())
    }

    /// Stop accepting events. In-flight compilations keep running.
    pub fn stop(&mut self) {
        if self.state == WatchState::Stopped {
            return;
        }
        let was_watching = self.state == WatchState::Watching;
        self.watcher = None;
        if let Some(task) = self.event_task.take() {
            task.abort();
        }
        self.state = WatchState::Stopped;
        if was_watching {
            info!("GPT Compiler stopped");
        }
    }

    /// Wait for every in-flight compilation to finish.
    pub async fn wait_idle(&self) {
        self.dispatcher.wait_idle().await;
    }
}

impl Drop for WatchLoop {
    fn drop(&mut self) {
        if let Some(task) = self.event_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn offline_pipeline() -> Arc<Pipeline> {
        let config = CompilerConfig::new("sk-test").with_api_endpoint("http://127.0.0.1:9/unused");
        Arc::new(Pipeline::new(&config).unwrap())
    }

    #[test]
    fn test_is_document() {
        assert!(is_document(Path::new("a/b.gpt"), "gpt"));
        assert!(!is_document(Path::new("a/b.gpt.bak"), "gpt"));
        assert!(!is_document(Path::new("a/b"), "gpt"));
    }

    #[test]
    fn test_scan_documents_recurses() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join("a.gpt"), "x").unwrap();
        fs::write(dir.path().join("nested/deeper/b.gpt"), "x").unwrap();
        fs::write(dir.path().join("nested/notes.txt"), "x").unwrap();

        let found = scan_documents(dir.path(), "gpt");
        assert_eq!(found, vec![dir.path().join("a.gpt"), dir.path().join("nested/deeper/b.gpt")]);
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let dir = tempdir().unwrap();
        assert!(scan_documents(&dir.path().join("missing"), "gpt").is_empty());
    }

    #[test]
    fn test_scan_dir_keeps_found_after_unreadable_directory() {
        let dir = tempdir().unwrap();
        let mut found = vec![dir.path().join("earlier.gpt")];
        scan_dir(&dir.path().join("vanished"), "gpt", &mut found);
        assert_eq!(found, vec![dir.path().join("earlier.gpt")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_scan_skips_unreadable_subdirectory() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.gpt"), "x").unwrap();
        fs::write(dir.path().join("a.gpt"), "x").unwrap();
        fs::write(dir.path().join("z.gpt"), "x").unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        let found = scan_documents(dir.path(), "gpt");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        // Root bypasses the permission bits, so the locked document may or may not appear
        assert!(found.contains(&dir.path().join("a.gpt")));
        assert!(found.contains(&dir.path().join("z.gpt")));
    }

    #[tokio::test]
    async fn test_handle_event_filters_and_absolutizes() {
        let dispatcher = Dispatcher::new(offline_pipeline(), 1, None);
        let root = Path::new("/nonexistent-root");

        let ignored = handle_event(root, "gpt", &dispatcher, FileEvent::new("notes.md", FileEventType::Changed));
        assert_eq!(ignored, None);
        assert_eq!(dispatcher.in_flight(), 0);

        let started = handle_event(root, "gpt", &dispatcher, FileEvent::new("docs/a.gpt", FileEventType::Added));
        assert_eq!(started, Some(DispatchStatus::Started));
        assert!(dispatcher.is_in_flight(&root.join("docs/a.gpt")));

        dispatcher.wait_idle().await;
        assert_eq!(dispatcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_same_path_is_coalesced() {
        let (tx, mut rx) = unbounded_channel();
        let dispatcher = Dispatcher::new(offline_pipeline(), 4, Some(tx));
        let path = PathBuf::from("/nonexistent-root/a.gpt");

        assert_eq!(dispatcher.dispatch(path.clone()), DispatchStatus::Started);
        assert_eq!(dispatcher.dispatch(path.clone()), DispatchStatus::Coalesced);
        assert_eq!(dispatcher.dispatch(path.clone()), DispatchStatus::Coalesced);
        assert_eq!(dispatcher.in_flight(), 1);

        dispatcher.wait_idle().await;

        let mut outcomes = Vec::new();
        while let Ok(outcome) = rx.try_recv() {
            outcomes.push(outcome);
        }
        // One run plus a single coalesced follow-up
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|o| !o.is_success()));
    }

    #[tokio::test]
    async fn test_state_machine() {
        let dir = tempdir().unwrap();
        let mut watch_loop = WatchLoop::new(
            offline_pipeline(),
            WatchOptions { initial_scan: false, ..WatchOptions::default() },
        );
        assert_eq!(watch_loop.state(), WatchState::Idle);

        watch_loop.start(dir.path()).unwrap();
        assert_eq!(watch_loop.state(), WatchState::Watching);
        assert!(matches!(watch_loop.start(dir.path()), Err(CompilerError::InvalidState(_))));

        watch_loop.stop();
        assert_eq!(watch_loop.state(), WatchState::Stopped);
        watch_loop.stop();
        assert_eq!(watch_loop.state(), WatchState::Stopped);
        assert!(matches!(watch_loop.start(dir.path()), Err(CompilerError::InvalidState(_))));
    }

    #[tokio::test]
    async fn test_start_on_missing_root_fails() {
        let dir = tempdir().unwrap();
        let mut watch_loop = WatchLoop::new(offline_pipeline(), WatchOptions::default());
        let err = watch_loop.start(dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, CompilerError::Watch(_)));
        assert_eq!(watch_loop.state(), WatchState::Idle);
    }
}
