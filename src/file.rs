//! A file handle whose reads wait at end of file instead of returning zero.

use crate::config::TailOptions;
use crate::coordinator::NotificationCoordinator;
use crate::error::{Error, Result};
use crate::identity::Snapshot;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// A file opened for following, like `tail -f`.
///
/// Differs from a plain [`File`] in two ways. At end of file, [`read`](Self::read)
/// waits for more data to be appended instead of returning `0`. And if the file
/// is truncated or replaced at its path (log rotation), `read` returns
/// [`Error::Rotated`] so the caller can reopen.
///
/// All methods take `&self`. Share the handle through an `Arc` to call
/// [`close`](Self::close) from another task while a read is waiting; the read
/// returns [`Error::Closed`] right away.
pub struct TailingFile {
    handle: Mutex<Handle>,
    snapshot: Snapshot,
    path: PathBuf,
    coordinator: NotificationCoordinator,
}

/// State guarded by the handle lock. The lock is never held while waiting.
struct Handle {
    file: Option<File>,
    position: u64,
}

impl Handle {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let file = self.file.as_mut().ok_or(Error::Closed)?;
        let n = file.read(buf).await?;
        self.position += n as u64;
        Ok(n)
    }
}

/// Outcome of comparing the path's current state with the open file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    Fresh,
    Truncated,
    Replaced,
}

impl TailingFile {
    /// Opens `path` for following with default polling intervals.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with(path, TailOptions::default()).await
    }

    /// Opens `path` for following.
    ///
    /// Fails if the file cannot be opened or its metadata cannot be read.
    /// Change notifications stay off until [`watch`](Self::watch) is called.
    pub async fn open_with<P: AsRef<Path>>(path: P, options: TailOptions) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await?;
        let metadata = file.metadata().await.map_err(|source| Error::Stat {
            path: path.clone(),
            source,
        })?;
        let snapshot = Snapshot::from_metadata(&metadata);

        debug!(path = %path.display(), size = snapshot.size(), "opened file for tailing");
        Ok(Self {
            handle: Mutex::new(Handle {
                file: Some(file),
                position: 0,
            }),
            snapshot,
            path,
            coordinator: NotificationCoordinator::new(options),
        })
    }

    /// Reads up to `buf.len()` bytes.
    ///
    /// At end of file this waits for more data. It returns [`Error::Rotated`]
    /// once the file has been truncated below the read position or replaced by
    /// a non-empty file, [`Error::Closed`] if the handle is closed meanwhile,
    /// and [`Error::Watcher`] if change notifications fail.
    ///
    /// Never returns `Ok(0)` unless `buf` is empty.
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            let (n, position) = self.read_raw(buf).await?;
            if n > 0 {
                return Ok(n);
            }

            match self.freshness(position).await {
                Freshness::Fresh => self.coordinator.wait().await?,
                reason => {
                    info!(path = %self.path.display(), ?reason, "rotation detected");
                    // Bytes flushed to the old file before rotation are still returned.
                    let (n, _) = self.read_raw(buf).await?;
                    if n > 0 {
                        return Ok(n);
                    }
                    return Err(Error::Rotated {
                        path: self.path.clone(),
                    });
                }
            }
        }
    }

    /// Seeks the underlying file and returns the new position.
    pub async fn seek(&self, pos: SeekFrom) -> Result<u64> {
        let mut handle = self.handle.lock().await;
        let file = handle.file.as_mut().ok_or(Error::Closed)?;
        let position = file.seek(pos).await?;
        handle.position = position;
        Ok(position)
    }

    /// Requests change notifications from the filesystem.
    ///
    /// Best effort: on failure, reads keep working by polling. Calling it
    /// again reuses the existing watch.
    pub async fn watch(&self) -> Result<()> {
        self.coordinator.add(&self.path).inspect_err(|err| {
            warn!(path = %self.path.display(), error = %err, "change notifications unavailable, polling");
        })
    }

    /// Closes the file. Pending and future reads return [`Error::Closed`].
    ///
    /// Closing twice is a no-op. The descriptor is released by dropping it, and
    /// `std` discards errors from that final `close(2)`, so none are reported
    /// here; for a read-only handle there is no buffered data they could affect.
    pub async fn close(&self) -> Result<()> {
        let file = self.handle.lock().await.file.take();
        if let Some(file) = file {
            // Waits out any blocking-pool operation left by a cancelled read.
            drop(file.into_std().await);
            debug!(path = %self.path.display(), "closed file");
        }
        self.coordinator.close();
        Ok(())
    }

    /// The path this file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The current read position.
    pub async fn position(&self) -> u64 {
        self.handle.lock().await.position
    }

    /// Identity and size captured when the file was opened.
    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Whether filesystem notifications are active for this file.
    pub fn is_watching(&self) -> bool {
        self.coordinator.is_watching()
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.coordinator.is_closed()
    }

    async fn read_raw(&self, buf: &mut [u8]) -> Result<(usize, u64)> {
        let mut handle = self.handle.lock().await;
        let n = handle.read(buf).await?;
        Ok((n, handle.position))
    }

    async fn freshness(&self, position: u64) -> Freshness {
        let live = match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => Some(Snapshot::from_metadata(&metadata)),
            Err(err) => {
                debug!(path = %self.path.display(), error = %err, "re-stat failed, assuming fresh");
                None
            }
        };
        check_freshness(&self.snapshot, live.as_ref(), position)
    }
}

impl std::fmt::Debug for TailingFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TailingFile")
            .field("path", &self.path)
            .field("snapshot", &self.snapshot)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Compare the path's current state with the snapshot taken at open.
///
/// Ambiguous cases count as fresh. A live size of zero never signals rotation:
/// a truncating writer may be about to write again, and a replacement file
/// has not received its first write yet.
fn check_freshness(original: &Snapshot, live: Option<&Snapshot>, position: u64) -> Freshness {
    let Some(live) = live else {
        return Freshness::Fresh;
    };
    if live.size() == 0 {
        return Freshness::Fresh;
    }
    if live.size() < position {
        return Freshness::Truncated;
    }
    if !original.same_identity(live) {
        return Freshness::Replaced;
    }
    Freshness::Fresh
}
