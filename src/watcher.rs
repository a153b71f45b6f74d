//! OS change notifications using the notify crate.

use crate::error::{Error, Result};
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc;

/// Events and errors forwarded from the notify callback.
pub(crate) type WatchEvents = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Watches the parent directory of every registered file and forwards the
/// events that touch one of those files.
///
/// Watching the directory rather than the file keeps notifications flowing
/// after the file is renamed away and a new one is created in its place.
pub(crate) struct FileWatcher {
    watcher: RecommendedWatcher,
    targets: Arc<Mutex<HashSet<OsString>>>,
    directories: HashSet<PathBuf>,
}

impl FileWatcher {
    /// Creates the OS watch facility. Nothing is watched until [`FileWatcher::add`].
    pub(crate) fn new() -> Result<(Self, WatchEvents)> {
        let (tx, rx) = mpsc::unbounded_channel();
        let targets = Arc::new(Mutex::new(HashSet::new()));

        let filter = Arc::clone(&targets);
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let forward = match &res {
                    Ok(event) => {
                        let targets = filter.lock().unwrap_or_else(PoisonError::into_inner);
                        is_event_relevant(event, &targets)
                    }
                    Err(_) => true,
                };
                if forward {
                    let _ = tx.send(res);
                }
            },
            Config::default(),
        )?;

        Ok((
            Self {
                watcher,
                targets,
                directories: HashSet::new(),
            },
            rx,
        ))
    }

    /// Starts forwarding events for `path`. Directories already watched are
    /// not registered twice.
    ///
    /// A symlink is registered twice: its own directory catches a file being
    /// recreated at the link, the target's directory catches the writes.
    pub(crate) fn add(&mut self, path: &Path) -> Result<()> {
        self.register(path)?;
        if let Some(target) = resolve_symlink(path) {
            self.register(&target)?;
        }
        Ok(())
    }

    fn register(&mut self, path: &Path) -> Result<()> {
        let file_name = path.file_name().ok_or_else(|| Error::InvalidPath {
            message: format!("{} has no file name", path.display()),
        })?;

        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(file_name.to_os_string());

        let directory = watch_directory(path);
        if !self.directories.contains(&directory) {
            self.watcher.watch(&directory, RecursiveMode::NonRecursive)?;
            self.directories.insert(directory);
        }
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn directory_count(&self) -> usize {
        self.directories.len()
    }
}

fn watch_directory(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Returns the fully resolved target when the last component of `path` is a symlink.
fn resolve_symlink(path: &Path) -> Option<PathBuf> {
    let metadata = std::fs::symlink_metadata(path).ok()?;
    if !metadata.file_type().is_symlink() {
        return None;
    }
    std::fs::canonicalize(path).ok()
}

/// Check if a notify event touches one of the target file names.
///
/// Access events are dropped: reading the file would otherwise wake its own reader.
pub(crate) fn is_event_relevant(event: &Event, targets: &HashSet<OsString>) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|path| {
        path.file_name()
            .map(|name| targets.contains(name))
            .unwrap_or(false)
    })
}
