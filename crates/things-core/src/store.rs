//! Engine plus storage: restore on startup, persist after commands.
//!
//! ```
//! use things_core::config::PersistenceConfig;
//! use things_core::storage::MemoryStorage;
//! use things_core::{Id, Store};
//!
//! let mut store = Store::open(MemoryStorage::new(), &PersistenceConfig::default())?;
//! store.execute(|engine| engine.create_task(Id::new("task:1"), "Buy milk"))?;
//! assert_eq!(store.storage().save_count(), 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use tracing::{info, warn};

use crate::command::CommandError;
use crate::config::PersistenceConfig;
use crate::engine::{Emitted, Engine};
use crate::error::ErrorCode;
use crate::event::codec::{self, DecodeError, EncodeError};
use crate::observe::{Change, SubscriptionId};
use crate::state::State;
use crate::storage::{PersistenceError, Storage};
use crate::validate::ValidationError;

/// The stored log cannot be replayed, or another holder keeps it.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The storage is locked by someone else. Nothing about the log is known.
    #[error("stored event log is unavailable: {0}")]
    Unavailable(PersistenceError),

    #[error("stored event log is corrupt: {0}")]
    Corrupt(#[from] DecodeError),

    #[error("stored event log is inconsistent: {0}")]
    Inconsistent(#[from] ValidationError),
}

impl LoadError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Unavailable(err) => err.code(),
            Self::Corrupt(err) => err.code(),
            Self::Inconsistent(err) => err.code(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("failed to persist event log: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("failed to encode event log: {0}")]
    Encode(#[from] EncodeError),
}

impl StoreError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Command(err) => err.code(),
            Self::Persistence(err) => err.code(),
            Self::Encode(_) => ErrorCode::InternalUnexpected,
        }
    }
}

/// How the initial state was obtained.
#[derive(Debug)]
pub enum LoadSource {
    /// Nothing was stored yet.
    Empty,
    /// The stored log was replayed.
    Restored,
    /// The storage could not be read; started empty. The unreadable log is
    /// quarantined before the first save.
    Fallback(PersistenceError),
    /// The stored log was unusable, moved aside, and a fresh log started.
    Discarded(LoadError),
}

#[derive(Debug)]
pub struct LoadReport {
    pub source: LoadSource,
    /// Events replayed from storage.
    pub events: usize,
}

/// An [`Engine`] bound to a [`Storage`].
#[derive(Debug)]
pub struct Store<S> {
    engine: Engine,
    storage: S,
    persistence: PersistenceConfig,
    report: LoadReport,
    dirty: bool,
    quarantine_pending: bool,
}

impl<S: Storage> Store<S> {
    /// Restore from `storage`.
    ///
    /// A storage that cannot be read is not fatal: the store starts empty
    /// and [`LoadSource::Fallback`] records why. The unreadable log is moved
    /// aside before anything overwrites it.
    ///
    /// # Errors
    ///
    /// [`LoadError::Unavailable`] if the storage is locked by another holder.
    /// [`LoadError::Corrupt`] or [`LoadError::Inconsistent`] if the stored
    /// bytes do not decode, or decode to a log the command layer could not
    /// have written. Nothing is modified; see [`Store::open_discarding_corrupt`].
    pub fn open(storage: S, persistence: &PersistenceConfig) -> Result<Self, LoadError> {
        let (engine, source) = restore(&storage)?;
        Ok(Self::assemble(engine, storage, persistence, source))
    }

    /// Like [`Store::open`], but a corrupt or inconsistent log is quarantined
    /// and the store starts empty.
    ///
    /// # Errors
    ///
    /// [`PersistenceError`] if the storage is locked by another holder, or the
    /// unusable log cannot be moved aside.
    pub fn open_discarding_corrupt(
        mut storage: S,
        persistence: &PersistenceConfig,
    ) -> Result<Self, PersistenceError> {
        let (engine, source) = match restore(&storage) {
            Ok(restored) => restored,
            Err(LoadError::Unavailable(err)) => return Err(err),
            Err(err) => {
                storage.quarantine()?;
                warn!(code = %err.code(), error = %err, "discarded unusable event log");
                (Engine::new(), LoadSource::Discarded(err))
            }
        };
        Ok(Self::assemble(engine, storage, persistence, source))
    }

    fn assemble(
        engine: Engine,
        storage: S,
        persistence: &PersistenceConfig,
        source: LoadSource,
    ) -> Self {
        let events = engine.log().len();
        let quarantine_pending = matches!(source, LoadSource::Fallback(_));
        Self {
            engine,
            storage,
            persistence: persistence.clone(),
            report: LoadReport { source, events },
            dirty: false,
            quarantine_pending,
        }
    }

    /// Run one command and, with autosave on, persist the log.
    ///
    /// # Errors
    ///
    /// [`StoreError::Command`] if the command was rejected; nothing changed.
    /// [`StoreError::Persistence`] if the save failed; the command stays
    /// applied in memory and the next successful save persists it.
    pub fn execute<F>(&mut self, command: F) -> Result<Emitted, StoreError>
    where
        F: FnOnce(&mut Engine) -> Result<Emitted, CommandError>,
    {
        let events = command(&mut self.engine)?;
        if !events.is_empty() {
            self.dirty = true;
        }
        if self.persistence.autosave && self.dirty {
            self.save()?;
        }
        Ok(events)
    }

    /// Encode the full log and hand it to storage.
    ///
    /// After a [`LoadSource::Fallback`] the unreadable log is quarantined
    /// first; if that fails nothing is written.
    ///
    /// # Errors
    ///
    /// [`StoreError::Encode`] or [`StoreError::Persistence`].
    pub fn save(&mut self) -> Result<(), StoreError> {
        let bytes = codec::encode(self.engine.log().all(), self.persistence.format)?;
        if self.quarantine_pending {
            self.storage.quarantine()?;
            self.quarantine_pending = false;
            warn!("moved unreadable event log aside before first save");
        }
        self.storage.save(&bytes)?;
        self.dirty = false;
        info!(
            events = self.engine.log().len(),
            bytes = bytes.len(),
            "saved event log"
        );
        Ok(())
    }

    /// Whether the log holds events not yet saved.
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    #[must_use]
    pub const fn state(&self) -> &State {
        self.engine.state()
    }

    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    #[must_use]
    pub const fn load_report(&self) -> &LoadReport {
        &self.report
    }

    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&State, &Change<'_>) + 'static,
    ) -> SubscriptionId {
        self.engine.subscribe(callback)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.engine.unsubscribe(id)
    }

    #[must_use]
    pub fn into_parts(self) -> (Engine, S) {
        (self.engine, self.storage)
    }
}

fn restore<S: Storage>(storage: &S) -> Result<(Engine, LoadSource), LoadError> {
    let bytes = match storage.load() {
        Ok(Some(bytes)) => bytes,
        Ok(None) => return Ok((Engine::new(), LoadSource::Empty)),
        Err(err @ PersistenceError::Lock(_)) => return Err(LoadError::Unavailable(err)),
        Err(err) => {
            warn!(code = %err.code(), error = %err, "event log unreadable, starting empty");
            return Ok((Engine::new(), LoadSource::Fallback(err)));
        }
    };
    let events = codec::decode(&bytes)?;
    let engine = Engine::replay(events)?;
    Ok((engine, LoadSource::Restored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Event;
    use crate::event::codec::{LogFormat, encode};
    use crate::lock::LockError;
    use crate::model::id::Id;
    use crate::storage::MemoryStorage;
    use std::path::PathBuf;
    use std::time::Duration;

    fn id(s: &str) -> Id {
        Id::new(s)
    }

    fn defaults() -> PersistenceConfig {
        PersistenceConfig::default()
    }

    fn saved(events: &[Event]) -> MemoryStorage {
        MemoryStorage::with_bytes(encode(events, LogFormat::Lines).unwrap())
    }

    /// Storage whose lock is always held elsewhere.
    #[derive(Debug)]
    struct Contended;

    impl Storage for Contended {
        fn load(&self) -> Result<Option<Vec<u8>>, PersistenceError> {
            Err(PersistenceError::Lock(LockError::Timeout {
                path: PathBuf::from("lock"),
                waited: Duration::from_millis(50),
            }))
        }

        fn save(&mut self, _bytes: &[u8]) -> Result<(), PersistenceError> {
            unreachable!("save while locked out")
        }

        fn quarantine(&mut self) -> Result<(), PersistenceError> {
            unreachable!("quarantine while locked out")
        }
    }

    #[test]
    fn empty_storage_opens_empty() {
        let store = Store::open(MemoryStorage::new(), &defaults()).unwrap();
        assert!(store.state().is_empty());
        assert!(matches!(store.load_report().source, LoadSource::Empty));
        assert_eq!(store.load_report().events, 0);
    }

    #[test]
    fn autosave_persists_each_command() {
        let mut store = Store::open(MemoryStorage::new(), &defaults()).unwrap();
        store
            .execute(|e| e.create_context(id("c1"), "Home"))
            .unwrap();
        store.execute(|e| e.create_task(id("t1"), "Milk")).unwrap();
        assert_eq!(store.storage().save_count(), 2);
        assert!(!store.is_dirty());

        let (_, storage) = store.into_parts();
        let reopened = Store::open(storage, &defaults()).unwrap();
        assert!(matches!(reopened.load_report().source, LoadSource::Restored));
        assert_eq!(reopened.load_report().events, 2);
        assert_eq!(reopened.state().tasks["t1"].name, "Milk");
    }

    #[test]
    fn rejected_command_does_not_save() {
        let mut store = Store::open(MemoryStorage::new(), &defaults()).unwrap();
        let err = store.execute(|e| e.check_task(&id("nope"), true)).unwrap_err();
        assert!(matches!(err, StoreError::Command(_)));
        assert_eq!(err.code(), ErrorCode::TaskNotFound);
        assert_eq!(store.storage().save_count(), 0);
    }

    #[test]
    fn manual_save_when_autosave_off() {
        let config = PersistenceConfig {
            autosave: false,
            ..defaults()
        };
        let mut store = Store::open(MemoryStorage::new(), &config).unwrap();
        store.execute(|e| e.create_task(id("t1"), "Milk")).unwrap();
        assert!(store.is_dirty());
        assert_eq!(store.storage().save_count(), 0);

        store.save().unwrap();
        assert!(!store.is_dirty());
        assert_eq!(store.storage().save_count(), 1);
    }

    #[test]
    fn save_failure_keeps_command_applied() {
        let mut storage = MemoryStorage::new();
        storage.fail_saves(true);
        let mut store = Store::open(storage, &defaults()).unwrap();

        let err = store
            .execute(|e| e.create_task(id("t1"), "Milk"))
            .unwrap_err();
        assert!(matches!(err, StoreError::Persistence(_)));
        assert_eq!(err.code(), ErrorCode::StorageWriteFailed);
        assert!(store.state().task(&id("t1")).is_some());
        assert!(store.is_dirty());
    }

    #[test]
    fn unreadable_storage_falls_back_to_empty() {
        let mut storage = saved(&[Event::TaskCreated {
            task_id: id("t1"),
            name: "Milk".into(),
        }]);
        storage.fail_loads(true);

        let store = Store::open(storage, &defaults()).unwrap();
        assert!(store.state().is_empty());
        match &store.load_report().source {
            LoadSource::Fallback(err) => assert_eq!(err.code(), ErrorCode::StorageReadFailed),
            other => panic!("expected fallback, got {other:?}"),
        }
    }

    #[test]
    fn fallback_moves_old_log_aside_before_first_save() {
        let old = encode(
            &[Event::TaskCreated {
                task_id: id("t1"),
                name: "Milk".into(),
            }],
            LogFormat::Lines,
        )
        .unwrap();
        let mut storage = MemoryStorage::with_bytes(old.clone());
        storage.fail_loads(true);

        let mut store = Store::open(storage, &defaults()).unwrap();
        store.execute(|e| e.create_task(id("t2"), "Eggs")).unwrap();
        store.execute(|e| e.create_task(id("t3"), "Jam")).unwrap();

        assert_eq!(store.storage().quarantined(), &[old]);
        let current = codec::decode(store.storage().bytes().unwrap()).unwrap();
        assert_eq!(current.len(), 2);
    }

    #[test]
    fn locked_storage_is_fatal_even_when_discarding() {
        let err = Store::open(Contended, &defaults()).unwrap_err();
        assert!(matches!(err, LoadError::Unavailable(_)));
        assert_eq!(err.code(), ErrorCode::LockContention);

        let err = Store::open_discarding_corrupt(Contended, &defaults()).unwrap_err();
        assert!(matches!(err, PersistenceError::Lock(_)));
    }

    #[test]
    fn corrupt_log_is_fatal_then_discardable() {
        let storage = MemoryStorage::with_bytes("task_created\tnot json\tblake3:00\n");
        let err = Store::open(storage.clone(), &defaults()).unwrap_err();
        assert!(matches!(err, LoadError::Corrupt(_)));
        assert_eq!(err.code(), ErrorCode::CorruptLog);

        let store = Store::open_discarding_corrupt(storage, &defaults()).unwrap();
        assert!(store.state().is_empty());
        assert!(matches!(
            store.load_report().source,
            LoadSource::Discarded(LoadError::Corrupt(_))
        ));
        assert_eq!(store.storage().quarantined().len(), 1);
        assert_eq!(store.storage().bytes(), None);
    }

    #[test]
    fn inconsistent_log_is_fatal() {
        let storage = saved(&[Event::TaskRenamed {
            task_id: id("ghost"),
            name: "Boo".into(),
        }]);
        let err = Store::open(storage, &defaults()).unwrap_err();
        assert!(matches!(err, LoadError::Inconsistent(_)));
        assert_eq!(err.code(), ErrorCode::InconsistentLog);
    }

    #[test]
    fn legacy_json_is_rewritten_in_configured_format() {
        let storage = MemoryStorage::with_bytes(
            r#"[{"type":"task_created","id":"t1","name":"Milk"}]"#,
        );
        let mut store = Store::open(storage, &defaults()).unwrap();
        store.execute(|e| e.check_task(&id("t1"), true)).unwrap();

        let bytes = store.storage().bytes().unwrap();
        assert!(bytes.starts_with(codec::LOG_HEADER.as_bytes()));
        assert_eq!(codec::decode(bytes).unwrap().len(), 2);
    }

    #[test]
    fn subscribers_fire_through_store() {
        use std::cell::Cell;
        use std::rc::Rc;

        let hits = Rc::new(Cell::new(0));
        let mut store = Store::open(MemoryStorage::new(), &defaults()).unwrap();
        let counter = Rc::clone(&hits);
        store.subscribe(move |_, _| counter.set(counter.get() + 1));
        store.execute(|e| e.create_task(id("t1"), "Milk")).unwrap();
        assert_eq!(hits.get(), 1);
    }
}
