//! File identity and the stat snapshot taken when a file is opened.

use std::fs::Metadata;

/// Distinguishes "same file" from "different file at the same path".
///
/// Device and inode on Unix. Other platforms report no identity, which turns
/// replacement detection off and leaves only size-based truncation detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileIdentity {
    dev: u64,
    ino: u64,
}

impl FileIdentity {
    #[cfg(unix)]
    pub fn from_metadata(metadata: &Metadata) -> Option<Self> {
        use std::os::unix::fs::MetadataExt;
        Some(Self {
            dev: metadata.dev(),
            ino: metadata.ino(),
        })
    }

    #[cfg(not(unix))]
    pub fn from_metadata(_metadata: &Metadata) -> Option<Self> {
        None
    }

    #[cfg(test)]
    pub(crate) fn new(dev: u64, ino: u64) -> Self {
        Self { dev, ino }
    }
}

/// Identity and size of a file at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snapshot {
    identity: Option<FileIdentity>,
    size: u64,
}

impl Snapshot {
    pub fn from_metadata(metadata: &Metadata) -> Self {
        Self {
            identity: FileIdentity::from_metadata(metadata),
            size: metadata.len(),
        }
    }

    #[cfg(test)]
    pub(crate) fn new(identity: Option<FileIdentity>, size: u64) -> Self {
        Self { identity, size }
    }

    pub fn identity(&self) -> Option<FileIdentity> {
        self.identity
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns false only when both identities are known and differ.
    pub fn same_identity(&self, other: &Snapshot) -> bool {
        match (self.identity, other.identity) {
            (Some(ours), Some(theirs)) => ours == theirs,
            _ => true,
        }
    }
}
