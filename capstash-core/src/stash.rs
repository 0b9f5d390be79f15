use std::path::Path;
use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::StashConfig;
use crate::domain::{Millis, Recording};
use crate::error::{ExportError, RegistryError, Result, StoreError, SweepError};
use crate::export::{ExportOutcome, Reassembler};
use crate::fragments::FragmentStore;
use crate::locks::KeyedLocks;
use crate::naming::FileNaming;
use crate::registry::Registry;
use crate::retention::{SweepReport, Sweeper};
use crate::stats::Stats;
use crate::storage::{Backend, CompactStats, Database, FileBackend, MemoryBackend};

/// Recording store: registry rows, their fragments, export and retention
/// behind one handle. Mutations of a given recording id are serialised.
pub struct Stash {
    db: Arc<Database>,
    registry: Registry,
    fragments: FragmentStore,
    reassembler: Reassembler,
    sweeper: Sweeper,
    locks: Arc<KeyedLocks>,
    clock: Arc<dyn Clock>,
    config: StashConfig,
}

impl Stash {
    /// Open (or create) a store directory and run the startup sweep if enabled.
    pub fn open(dir: &Path, config: StashConfig) -> Result<Self> {
        config.validate()?;
        let backend = FileBackend::open(dir, config.sync_on_commit)?;
        let stash = Self::with_backend(Box::new(backend), config, Arc::new(SystemClock));
        tracing::debug!(dir = %dir.display(), backend = stash.db.backend_name()?, "opened stash");
        if stash.config.sweep_on_open {
            match stash.sweep(stash.config.retention_days) {
                Ok(report) => tracing::debug!(?report, "startup sweep"),
                Err(e) => tracing::warn!(error = %e, "startup sweep incomplete"),
            }
        }
        Ok(stash)
    }

    pub fn in_memory(config: StashConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_backend(Box::new(MemoryBackend::new()), config, clock)
    }

    pub fn with_backend(backend: Box<dyn Backend>, config: StashConfig, clock: Arc<dyn Clock>) -> Self {
        let db = Arc::new(Database::new(backend, config.min_gain));
        let locks = Arc::new(KeyedLocks::new());
        let registry = Registry::new(db.clone(), clock.clone());
        let fragments = FragmentStore::new(db.clone());
        let reassembler = Reassembler::new(
            registry.clone(),
            fragments.clone(),
            FileNaming::from_config(&config),
        );
        let sweeper = Sweeper::new(db.clone(), fragments.clone(), locks.clone(), clock.clone());
        Self {
            db,
            registry,
            fragments,
            reassembler,
            sweeper,
            locks,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &StashConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn fragments(&self) -> &FragmentStore {
        &self.fragments
    }

    pub fn create(&self, id: &str) -> std::result::Result<Recording, RegistryError> {
        let rec = self.locks.with(id, || self.registry.create(id))?;
        tracing::info!(recording = id, "created recording");
        Ok(rec)
    }

    /// Store one captured chunk and bump the recording's size and finish
    /// time in the same transaction. Empty chunks are ignored.
    pub fn append(&self, id: &str, payload: &[u8]) -> std::result::Result<Recording, RegistryError> {
        self.locks.with(id, || {
            let now = self.clock.now_ms();
            self.db.transaction(|tx| {
                let rec = tx
                    .recording(id)
                    .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
                if payload.is_empty() {
                    return Ok(rec);
                }
                FragmentStore::stage_append(tx, id, payload)?;
                Registry::stage_fragment_written(tx, id, rec.size + payload.len() as u64, now)
            })
        })
    }

    pub fn get(&self, id: &str) -> std::result::Result<Option<Recording>, RegistryError> {
        self.registry.get(id)
    }

    pub fn list(&self) -> std::result::Result<Vec<Recording>, RegistryError> {
        self.registry.list()
    }

    pub fn concatenate(&self, id: &str) -> std::result::Result<Vec<u8>, StoreError> {
        self.fragments.concatenate(id)
    }

    pub fn export(&self, id: &str) -> std::result::Result<ExportOutcome, ExportError> {
        self.locks.with(id, || self.reassembler.export(id))
    }

    pub fn export_strict(&self, id: &str) -> std::result::Result<ExportOutcome, ExportError> {
        self.locks.with(id, || self.reassembler.export_strict(id))
    }

    /// Remove a recording and all of its fragments atomically. Deleting an
    /// unknown id succeeds.
    pub fn delete(&self, id: &str) -> std::result::Result<(), StoreError> {
        self.locks.with(id, || {
            self.db.transaction(|tx| {
                FragmentStore::stage_delete_all(tx, id);
                if tx.recording(id).is_some() {
                    tx.drop_recording(id);
                }
                Ok::<_, StoreError>(())
            })
        })?;
        tracing::info!(recording = id, "deleted recording");
        Ok(())
    }

    pub fn sweep(&self, retention_days: u32) -> std::result::Result<SweepReport, SweepError> {
        self.sweeper.sweep(retention_days)
    }

    pub fn sweep_at(&self, cutoff: Millis) -> std::result::Result<SweepReport, SweepError> {
        self.sweeper.sweep_at(cutoff)
    }

    pub fn compact(&self) -> std::result::Result<CompactStats, StoreError> {
        self.db.compact()
    }

    pub fn stats(&self) -> std::result::Result<Stats, StoreError> {
        self.db.read(|t| t.stats())
    }
}
