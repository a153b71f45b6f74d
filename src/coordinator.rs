//! Merges OS change notifications and a polling timer into one wake signal.

use crate::config::TailOptions;
use crate::error::{Error, Result};
use crate::watcher::{FileWatcher, WatchEvents};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Notify, watch};
use tracing::{debug, trace, warn};

/// A wake waiting to be consumed.
#[derive(Debug)]
enum Wake {
    Changed,
    Failed(notify::Error),
}

impl Wake {
    /// Folds an incoming wake into the held one. The first error wins.
    fn merge(held: Option<Wake>, incoming: Wake) -> Wake {
        match held {
            Some(failed @ Wake::Failed(_)) => failed,
            _ => incoming,
        }
    }

    fn into_result(self) -> Result<()> {
        match self {
            Wake::Changed => Ok(()),
            Wake::Failed(err) => Err(Error::Watcher(err)),
        }
    }
}

/// Single-slot debounce buffer.
#[derive(Default)]
struct WakeSlot {
    pending: Mutex<Option<Wake>>,
    notify: Notify,
}

impl WakeSlot {
    fn wake(&self, incoming: Wake) {
        {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            let held = pending.take();
            *pending = Some(Wake::merge(held, incoming));
        }
        self.notify.notify_one();
    }

    fn take(&self) -> Option<Wake> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Decides when a reader parked at end of file should look again.
///
/// Starts in polling-only mode. [`NotificationCoordinator::add`] upgrades it
/// to OS notifications, after which the polling timer only guards against
/// missed events. [`NotificationCoordinator::close`] releases every current
/// and future waiter.
pub(crate) struct NotificationCoordinator {
    slot: Arc<WakeSlot>,
    watcher: Mutex<Option<FileWatcher>>,
    shutdown: watch::Sender<bool>,
    closed: AtomicBool,
    options: TailOptions,
}

impl NotificationCoordinator {
    pub(crate) fn new(options: TailOptions) -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            slot: Arc::new(WakeSlot::default()),
            watcher: Mutex::new(None),
            shutdown,
            closed: AtomicBool::new(false),
            options,
        }
    }

    /// Requests change notifications for `path`.
    ///
    /// The first successful call creates the OS watch facility and spawns the
    /// merge loop onto the current Tokio runtime. Later calls reuse it. On
    /// failure the coordinator stays in polling-only mode.
    pub(crate) fn add(&self, path: &Path) -> Result<()> {
        let mut guard = self.watcher.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_closed() {
            return Err(Error::Closed);
        }
        if let Some(watcher) = guard.as_mut() {
            return watcher.add(path);
        }

        let (mut watcher, events) = FileWatcher::new()?;
        watcher.add(path)?;
        tokio::spawn(merge_loop(
            events,
            Arc::clone(&self.slot),
            self.shutdown.subscribe(),
        ));
        *guard = Some(watcher);
        debug!(path = %path.display(), "change notifications enabled");
        Ok(())
    }

    /// Waits for a change notification, the polling interval, or shutdown.
    ///
    /// Returns `Ok(())` on a notification or timeout, the first pending watcher
    /// error if one was captured, and [`Error::Closed`] once closed.
    pub(crate) async fn wait(&self) -> Result<()> {
        let mut shutdown = self.shutdown.subscribe();
        let timeout = tokio::time::sleep(self.poll_interval());
        tokio::pin!(timeout);

        loop {
            if *shutdown.borrow_and_update() {
                return Err(Error::Closed);
            }
            if let Some(wake) = self.slot.take() {
                trace!(?wake, "woken by change notification");
                return wake.into_result();
            }

            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        return Err(Error::Closed);
                    }
                }
                _ = self.slot.notify.notified() => {}
                _ = &mut timeout => {
                    trace!("poll interval elapsed");
                    return Ok(());
                }
            }
        }
    }

    /// Stops notifications and releases all waiters. Calling it again is a no-op.
    pub(crate) fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let watcher = self
            .watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let watching = watcher.is_some();
        drop(watcher);

        self.shutdown.send_replace(true);
        debug!(watching, "notification coordinator closed");
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub(crate) fn is_watching(&self) -> bool {
        self.watcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    #[cfg(test)]
    pub(crate) fn inject_failure(&self, message: &str) {
        self.slot.wake(Wake::Failed(notify::Error::generic(message)));
    }

    fn poll_interval(&self) -> Duration {
        if self.is_watching() {
            self.options.watch_poll_interval
        } else {
            self.options.poll_interval
        }
    }
}

impl Drop for NotificationCoordinator {
    fn drop(&mut self) {
        self.close();
    }
}

/// Drains watcher output into the wake slot until shutdown.
async fn merge_loop(
    mut events: WatchEvents,
    slot: Arc<WakeSlot>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            _ = shutdown.wait_for(|closed| *closed) => break,
            event = events.recv() => match event {
                Some(Ok(event)) => {
                    trace!(kind = ?event.kind, "change notification");
                    slot.wake(Wake::Changed);
                }
                Some(Err(err)) => {
                    warn!(error = %err, "file watcher reported an error");
                    slot.wake(Wake::Failed(err));
                }
                None => break,
            },
        }
    }
    debug!("notification merge loop stopped");
}
