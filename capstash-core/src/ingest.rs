use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread::JoinHandle;

use crate::error::{RegistryError, StoreError};
use crate::stash::Stash;

type ChunkSender = Sender<Vec<u8>>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestTotals {
    pub chunks: u64,
    pub bytes: u64,
    /// Recording size after the last append.
    pub size: u64,
}

/// Channel in front of one recording: producers push chunks, a single
/// worker appends them in arrival order. The first failed append stops the
/// worker so no later chunk lands after a gap.
pub struct Ingestor {
    recording_id: String,
    tx: Option<ChunkSender>,
    worker: Option<JoinHandle<Result<IngestTotals, RegistryError>>>,
}

impl Ingestor {
    pub fn spawn(stash: Arc<Stash>, recording_id: &str) -> Result<Self, StoreError> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let id = recording_id.to_string();
        let worker = std::thread::Builder::new()
            .name(format!("ingest-{recording_id}"))
            .spawn(move || {
                let mut totals = IngestTotals::default();
                for chunk in rx {
                    if chunk.is_empty() {
                        continue;
                    }
                    let rec = stash.append(&id, &chunk)?;
                    totals.chunks += 1;
                    totals.bytes += chunk.len() as u64;
                    totals.size = rec.size;
                }
                Ok(totals)
            })?;
        Ok(Self {
            recording_id: recording_id.to_string(),
            tx: Some(tx),
            worker: Some(worker),
        })
    }

    pub fn push(&self, chunk: Vec<u8>) -> Result<(), StoreError> {
        match &self.tx {
            Some(tx) => tx.send(chunk).map_err(|_| StoreError::Closed),
            None => Err(StoreError::Closed),
        }
    }

    /// Close the channel, wait for the backlog to drain, and report totals
    /// or the append failure that stopped the worker.
    pub fn finish(mut self) -> Result<IngestTotals, RegistryError> {
        self.tx.take();
        let worker = self.worker.take().ok_or(StoreError::Closed)?;
        let totals = worker.join().map_err(|_| StoreError::Closed)??;
        tracing::info!(
            recording = %self.recording_id,
            chunks = totals.chunks,
            bytes = totals.bytes,
            "ingest finished"
        );
        Ok(totals)
    }
}

impl Drop for Ingestor {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}
