use std::sync::Arc;

use crate::clock::Clock;
use crate::domain::{Millis, Recording};
use crate::error::RegistryError;
use crate::storage::{Database, Transaction};

/// One summary row per recording.
#[derive(Clone)]
pub struct Registry {
    db: Arc<Database>,
    clock: Arc<dyn Clock>,
}

impl Registry {
    pub fn new(db: Arc<Database>, clock: Arc<dyn Clock>) -> Self {
        Self { db, clock }
    }

    pub fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    pub fn create(&self, id: &str) -> Result<Recording, RegistryError> {
        let now = self.now();
        self.db.transaction(|tx| {
            if tx.recording(id).is_some() {
                return Err(RegistryError::DuplicateId(id.to_string()));
            }
            let rec = Recording::new(id, now);
            tx.put_recording(rec.clone());
            Ok(rec)
        })
    }

    pub fn get(&self, id: &str) -> Result<Option<Recording>, RegistryError> {
        Ok(self.db.read(|t| t.recordings.get(id).cloned())?)
    }

    pub fn record_fragment_written(&self, id: &str, new_total_size: u64) -> Result<Recording, RegistryError> {
        let now = self.now();
        self.db
            .transaction(|tx| Self::stage_fragment_written(tx, id, new_total_size, now))
    }

    pub fn stage_fragment_written(
        tx: &mut Transaction<'_>,
        id: &str,
        new_total_size: u64,
        now: Millis,
    ) -> Result<Recording, RegistryError> {
        let mut rec = tx
            .recording(id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;
        rec.size = new_total_size;
        rec.finish_at = Some(now);
        tx.put_recording(rec.clone());
        Ok(rec)
    }

    /// Stamp `save_at` on first export. Returns whether anything changed;
    /// an already-saved or missing recording is left alone.
    pub fn mark_saved(&self, id: &str) -> Result<bool, RegistryError> {
        let now = self.now();
        self.db.transaction(|tx| {
            let Some(mut rec) = tx.recording(id) else {
                return Ok(false);
            };
            if rec.save_at.is_some() {
                return Ok(false);
            }
            rec.save_at = Some(now);
            tx.put_recording(rec);
            Ok(true)
        })
    }

    /// Newest `finish_at` first; recordings never written to sort last.
    pub fn list(&self) -> Result<Vec<Recording>, RegistryError> {
        Ok(self.db.read(|t| t.newest_first())?)
    }

    pub fn delete(&self, id: &str) -> Result<(), RegistryError> {
        self.db.transaction(|tx| {
            if tx.recording(id).is_some() {
                tx.drop_recording(id);
            }
            Ok(())
        })
    }

    /// Recordings with `finish_at <= cutoff`.
    pub fn find_expired(&self, cutoff: Millis) -> Result<Vec<Recording>, RegistryError> {
        Ok(self.db.read(|t| t.finished_before(cutoff))?)
    }
}
