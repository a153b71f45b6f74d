//! Polling configuration.

use std::time::Duration;

/// Wake interval used when no OS change notifications are active.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Safety-net wake interval used while OS change notifications are active.
pub const DEFAULT_WATCH_POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Options controlling how long a blocked read sleeps between checks.
///
/// A read waiting at end of file wakes on a change notification or when the
/// polling interval elapses, whichever comes first. Without a watch the
/// timer is the only wake source, so `poll_interval` should stay short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TailOptions {
    /// Interval used in polling-only mode.
    pub poll_interval: Duration,
    /// Interval used once [`TailingFile::watch`](crate::TailingFile::watch) succeeded.
    pub watch_poll_interval: Duration,
}

impl Default for TailOptions {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            watch_poll_interval: DEFAULT_WATCH_POLL_INTERVAL,
        }
    }
}

impl TailOptions {
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_watch_poll_interval(mut self, interval: Duration) -> Self {
        self.watch_poll_interval = interval;
        self
    }
}
