//! Follow a growing file the way `tail -f` does.
//!
//! [`TailingFile`] is a read-only file handle with two differences from a
//! plain file: a read at end of file waits for new data instead of returning
//! zero, and truncation or replacement of the file (log rotation) is reported
//! as [`Error::Rotated`] so the caller knows to reopen the path.
//!
//! Waiting reads wake on filesystem notifications when [`TailingFile::watch`]
//! succeeded, and on a polling timer otherwise. [`TailingFile::close`] releases
//! a waiting read from another task.
//!
//! # Example
//!
//! ```rust,no_run
//! use tail_file::Error;
//! use std::io::SeekFrom;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let file = tail_file::follow("app.log").await?;
//!     file.seek(SeekFrom::End(0)).await?;
//!
//!     let mut buf = [0u8; 4096];
//!     loop {
//!         match file.read(&mut buf).await {
//!             Ok(n) => print!("{}", String::from_utf8_lossy(&buf[..n])),
//!             Err(Error::Rotated { .. }) => break,
//!             Err(e) => return Err(e.into()),
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

mod config;
mod coordinator;
mod error;
mod file;
mod identity;
mod watcher;

#[cfg(test)]
mod test_helpers;

// Public API exports
pub use config::{DEFAULT_POLL_INTERVAL, DEFAULT_WATCH_POLL_INTERVAL, TailOptions};
pub use error::{Error, Result};
pub use file::TailingFile;
pub use identity::{FileIdentity, Snapshot};

use std::path::Path;

/// Opens a file for following and enables filesystem notifications.
///
/// If notifications cannot be set up, the file is still returned and waiting
/// reads fall back to polling.
///
/// # Example
///
/// ```rust,no_run
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let file = tail_file::follow("app.log").await?;
///
///     let mut buf = [0u8; 4096];
///     let n = file.read(&mut buf).await?;
///     println!("{} bytes", n);
///
///     Ok(())
/// }
/// ```
pub async fn follow<P: AsRef<Path>>(path: P) -> Result<TailingFile> {
    let file = TailingFile::open(path).await?;
    // Failure is already logged; polling still works.
    let _ = file.watch().await;
    Ok(file)
}
