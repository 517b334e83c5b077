//! File watcher module for monitoring file system changes
//!
//! Wraps a notify watcher and reduces its raw events to the two kinds the
//! compiler reacts to: a file appearing and a file's contents changing.

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::error::Result;

/// Types of file events that can be detected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEventType {
    /// File was created
    Added,
    /// File contents were modified
    Changed,
}

impl FileEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileEventType::Added => "add",
            FileEventType::Changed => "change",
        }
    }
}

/// Represents a file system event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Path of the file that triggered the event
    pub path: PathBuf,
    /// Type of event that occurred
    pub event_type: FileEventType,
}

impl FileEvent {
    pub fn new(path: impl Into<PathBuf>, event_type: FileEventType) -> Self {
        Self { path: path.into(), event_type }
    }
}

/// Watches directories and forwards add/change events to a channel
pub struct FileWatcher {
    watcher: RecommendedWatcher,
}

impl FileWatcher {
    /// Create a new file watcher
    ///
    /// # Arguments
    ///
    /// * `sender` - Channel that receives every add/change event
    ///
    /// # Returns
    ///
    /// The watcher, or a `Watch` error if the platform backend fails to start
    pub fn new(sender: UnboundedSender<FileEvent>) -> Result<Self> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for file_event in convert_event(event) {
                    // Receiver gone means the loop has stopped
                    if sender.send(file_event).is_err() {
                        break;
                    }
                }
            }
            Err(e) => warn!("Watcher error: {}", e),
        })?;

        Ok(FileWatcher { watcher })
    }

    /// Watch a directory tree for changes
    ///
    /// # Arguments
    ///
    /// * `path` - Directory to watch recursively
    ///
    /// # Returns
    ///
    /// Ok if the directory is now watched, otherwise a `Watch` error
    pub fn watch<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        self.watcher.watch(path.as_ref(), RecursiveMode::Recursive)?;
        Ok(())
    }
}

/// Convert a notify event into zero or more add/change events.
///
/// Removals, renames, metadata-only changes and access events are dropped.
pub fn convert_event(event: Event) -> Vec<FileEvent> {
    let event_type = match event.kind {
        EventKind::Create(_) => FileEventType::Added,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => FileEventType::Changed,
        _ => return Vec::new(),
    };

    event
        .paths
        .into_iter()
        .map(|path| FileEvent { path, event_type })
        .collect()
}
