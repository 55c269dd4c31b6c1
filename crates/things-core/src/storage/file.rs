use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::{PersistenceError, Storage, StorageOp};
use crate::config::StorageConfig;
use crate::lock::StoreLock;

/// Name of the advisory lock file inside the data directory.
pub const LOCK_FILE: &str = "lock";

/// Event log stored as a single file in a data directory.
///
/// The exclusive lock on `<dir>/lock` is taken by [`FileStorage::open`] and held
/// until the storage is dropped, so one `Store` at a time owns the directory.
/// Saves write `<file>.tmp` and rename it over `<file>`, so a reader sees
/// either the old log or the new one.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    durable: bool,
    lock: StoreLock,
}

impl FileStorage {
    /// Create `dir` if needed and take its lock.
    ///
    /// # Errors
    ///
    /// [`PersistenceError::Lock`] if another holder keeps the lock past the
    /// configured timeout, [`PersistenceError::Io`] if `dir` cannot be created.
    pub fn open(dir: impl Into<PathBuf>, config: &StorageConfig) -> Result<Self, PersistenceError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| PersistenceError::io(StorageOp::Load, err))?;
        let lock = StoreLock::acquire(&dir.join(LOCK_FILE), config.lock_timeout())?;
        debug!(dir = %dir.display(), "opened event log directory");
        Ok(Self {
            path: dir.join(&config.file),
            durable: config.durable,
            lock,
        })
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where [`Storage::quarantine`] moves an unreadable log.
    #[must_use]
    pub fn corrupt_path(&self) -> PathBuf {
        sibling(&self.path, ".corrupt")
    }

    /// Path of the lock file held for this storage's lifetime.
    #[must_use]
    pub fn lock_path(&self) -> &Path {
        self.lock.path()
    }

    fn write_temp(&self, tmp: &Path, bytes: &[u8]) -> io::Result<()> {
        let mut file = File::create(tmp)?;
        file.write_all(bytes)?;
        file.flush()?;
        if self.durable {
            file.sync_data()?;
        }
        Ok(())
    }
}

impl Storage for FileStorage {
    fn load(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(PersistenceError::io(StorageOp::Load, err)),
        }
    }

    fn save(&mut self, bytes: &[u8]) -> Result<(), PersistenceError> {
        let tmp = sibling(&self.path, ".tmp");

        let written = self
            .write_temp(&tmp, bytes)
            .and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(err) = written {
            let _ = fs::remove_file(&tmp);
            return Err(PersistenceError::io(StorageOp::Save, err));
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "saved event log");
        Ok(())
    }

    fn quarantine(&mut self) -> Result<(), PersistenceError> {
        let target = self.corrupt_path();
        match fs::rename(&self.path, &target) {
            Ok(()) => {
                warn!(
                    from = %self.path.display(),
                    to = %target.display(),
                    "quarantined unreadable event log"
                );
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(PersistenceError::io(StorageOp::Quarantine, err)),
        }
    }
}

/// `events.log` + `.tmp` -> `events.log.tmp`.
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(OsString::new, ToOwned::to_owned);
    name.push(suffix);
    path.with_file_name(name)
}
