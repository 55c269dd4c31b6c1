//! Byte-level persistence for the encoded event log.
//!
//! A [`Storage`] only moves bytes; encoding lives in
//! [`crate::event::codec`] and replay in [`crate::store`].

mod file;

pub use file::{FileStorage, LOCK_FILE};

use std::fmt;
use std::io;

use crate::error::ErrorCode;
use crate::lock::LockError;

/// The storage operation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageOp {
    Load,
    Save,
    Quarantine,
}

impl fmt::Display for StorageOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Load => "load",
            Self::Save => "save",
            Self::Quarantine => "quarantine",
        })
    }
}

/// Errors raised by a [`Storage`] backend.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// Reading, writing or renaming the log failed.
    #[error("{op} failed: {source}")]
    Io {
        op: StorageOp,
        #[source]
        source: io::Error,
    },

    /// The writer lock could not be acquired.
    #[error("lock error: {0}")]
    Lock(#[from] LockError),
}

impl PersistenceError {
    pub(crate) const fn io(op: StorageOp, source: io::Error) -> Self {
        Self::Io { op, source }
    }

    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io {
                op: StorageOp::Load,
                ..
            } => ErrorCode::StorageReadFailed,
            Self::Io { .. } => ErrorCode::StorageWriteFailed,
            Self::Lock(err) => err.code(),
        }
    }
}

/// Where the encoded log lives between runs.
pub trait Storage {
    /// The stored bytes, or `None` if nothing was ever saved.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the bytes exist but cannot be read.
    fn load(&self) -> Result<Option<Vec<u8>>, PersistenceError>;

    /// Replace the stored bytes.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] on failure; the previous bytes must
    /// then still be loadable.
    fn save(&mut self, bytes: &[u8]) -> Result<(), PersistenceError>;

    /// Move the stored bytes aside so a fresh log can be started without
    /// destroying them.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if the bytes cannot be moved.
    fn quarantine(&mut self) -> Result<(), PersistenceError>;
}

impl<S: Storage + ?Sized> Storage for Box<S> {
    fn load(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        (**self).load()
    }

    fn save(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        (**self).save(bytes)
    }

    fn quarantine(&mut self) -> Result<(), PersistenceError> {
        (**self).quarantine()
    }
}

/// In-memory storage, mainly for tests and embedding without a disk.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    bytes: Option<Vec<u8>>,
    quarantined: Vec<Vec<u8>>,
    fail_loads: bool,
    fail_saves: bool,
    saves: usize,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that already holds `bytes`, as if saved by an earlier run.
    #[must_use]
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Some(bytes.into()),
            ..Self::default()
        }
    }

    /// Make every subsequent `load` fail.
    pub const fn fail_loads(&mut self, fail: bool) {
        self.fail_loads = fail;
    }

    /// Make every subsequent `save` fail.
    pub const fn fail_saves(&mut self, fail: bool) {
        self.fail_saves = fail;
    }

    #[must_use]
    pub fn bytes(&self) -> Option<&[u8]> {
        self.bytes.as_deref()
    }

    #[must_use]
    pub fn quarantined(&self) -> &[Vec<u8>] {
        &self.quarantined
    }

    /// Number of successful saves.
    #[must_use]
    pub const fn save_count(&self) -> usize {
        self.saves
    }
}

impl Storage for MemoryStorage {
    fn load(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        if self.fail_loads {
            return Err(PersistenceError::io(
                StorageOp::Load,
                io::Error::other("simulated read failure"),
            ));
        }
        Ok(self.bytes.clone())
    }

    fn save(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        if self.fail_saves {
            return Err(PersistenceError::io(
                StorageOp::Save,
                io::Error::other("simulated write failure"),
            ));
        }
        self.bytes = Some(bytes.to_vec());
        self.saves += 1;
        Ok(())
    }

    fn quarantine(&mut self) -> Result<(), PersistenceError> {
        if let Some(bytes) = self.bytes.take() {
            self.quarantined.push(bytes);
        }
        Ok(())
    }
}
