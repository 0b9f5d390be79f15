//! Storage adapter: typed tables, a frame area for payloads and an atomic
//! batch commit, with a unit-of-work wrapper on top.

use std::sync::{Mutex, MutexGuard};

use crate::codec;
use crate::domain::{BlobRef, FragmentRow, Recording};
use crate::error::StoreError;

pub mod file;
pub mod frames;
pub mod journal;
pub mod memory;
pub mod tables;

pub use file::FileBackend;
pub use memory::{FaultSwitch, MemoryBackend};
pub use tables::{Op, Tables};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactStats {
    pub fragments: u64,
    pub reclaimed_bytes: u64,
}

pub trait Backend: Send {
    fn name(&self) -> &'static str;

    fn tables(&self) -> &Tables;

    /// Persist raw payload bytes; returns `(offset, len)` for [`Backend::read_frame`].
    /// Frames written by a transaction that never commits are garbage until compaction.
    fn write_frame(&mut self, bytes: &[u8]) -> Result<(u64, u64), StoreError>;

    fn read_frame(&self, off: u64, len: u64) -> Result<Vec<u8>, StoreError>;

    /// Durably apply every op or none of them.
    fn commit(&mut self, ops: Vec<Op>) -> Result<(), StoreError>;

    /// Drop unreferenced frames.
    fn compact(&mut self) -> Result<CompactStats, StoreError>;
}

pub struct Database {
    backend: Mutex<Box<dyn Backend>>,
    min_gain: f32,
}

impl Database {
    pub fn new(backend: Box<dyn Backend>, min_gain: f32) -> Self {
        Self {
            backend: Mutex::new(backend),
            min_gain,
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Box<dyn Backend>>, StoreError> {
        self.backend
            .lock()
            .map_err(|e| StoreError::Io(std::io::Error::other(e.to_string())))
    }

    pub fn backend_name(&self) -> Result<&'static str, StoreError> {
        Ok(self.lock()?.name())
    }

    pub fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, StoreError> {
        let guard = self.lock()?;
        Ok(f(guard.tables()))
    }

    /// Run `f` as one unit of work. Ops staged through the transaction are
    /// committed together when `f` returns `Ok`, and discarded when it
    /// returns `Err`.
    pub fn transaction<T, E>(
        &self,
        f: impl FnOnce(&mut Transaction<'_>) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<StoreError>,
    {
        let mut guard = self.lock()?;
        let mut tx = Transaction::new(&mut guard, self.min_gain);
        let out = f(&mut tx)?;
        let staged = tx.into_staged();
        if !staged.is_empty() {
            let n = staged.len();
            guard.commit(staged)?;
            tracing::debug!(ops = n, "committed batch");
        }
        Ok(out)
    }

    /// Every payload of `recording_id` joined in write order. Rows are
    /// resolved and their frames read under one lock, so a compaction
    /// cannot relocate frames in between.
    pub fn read_payloads(&self, recording_id: &str) -> Result<Vec<u8>, StoreError> {
        let guard = self.lock()?;
        let backend: &dyn Backend = &**guard;
        let rows: Vec<&FragmentRow> = backend.tables().fragments_of(recording_id).collect();
        let total: u64 = rows.iter().map(|r| r.blob.plain_len).sum();
        let mut out = Vec::with_capacity(total as usize);
        for row in rows {
            out.extend_from_slice(&load_payload(backend, row)?);
        }
        Ok(out)
    }

    /// Payload of fragment `seq` at its current location; `None` once the
    /// fragment has been deleted.
    pub fn read_fragment(&self, seq: u64) -> Result<Option<Vec<u8>>, StoreError> {
        let guard = self.lock()?;
        let backend: &dyn Backend = &**guard;
        match backend.tables().fragments.get(&seq) {
            Some(row) => load_payload(backend, row).map(Some),
            None => Ok(None),
        }
    }

    pub fn compact(&self) -> Result<CompactStats, StoreError> {
        self.lock()?.compact()
    }
}

/// Load, decode and verify one fragment payload.
fn load_payload(backend: &dyn Backend, row: &FragmentRow) -> Result<Vec<u8>, StoreError> {
    let stored = backend.read_frame(row.blob.off, row.blob.len)?;
    let plain = codec::decode_payload(row.blob.codec, &stored, row.blob.plain_len)?;
    if plain.len() as u64 != row.blob.plain_len || *blake3::hash(&plain).as_bytes() != row.blob.blake3 {
        return Err(StoreError::Corrupt(format!(
            "fragment {} of {} failed checksum",
            row.seq, row.recording_id
        )));
    }
    Ok(plain)
}

/// Write-ahead staging buffer over a locked backend.
pub struct Transaction<'a> {
    backend: &'a mut Box<dyn Backend>,
    staged: Vec<Op>,
    next_seq: u64,
    min_gain: f32,
}

impl<'a> Transaction<'a> {
    fn new(backend: &'a mut Box<dyn Backend>, min_gain: f32) -> Self {
        let next_seq = backend.tables().next_seq;
        Self {
            backend,
            staged: Vec::new(),
            next_seq,
            min_gain,
        }
    }

    fn into_staged(self) -> Vec<Op> {
        self.staged
    }

    pub fn tables(&self) -> &Tables {
        self.backend.tables()
    }

    /// Current row for `id`, including writes staged in this transaction.
    pub fn recording(&self, id: &str) -> Option<Recording> {
        for op in self.staged.iter().rev() {
            match op {
                Op::PutRecording(r) if r.id == id => return Some(r.clone()),
                Op::DropRecording { id: gone } if gone == id => return None,
                _ => {}
            }
        }
        self.tables().recordings.get(id).cloned()
    }

    pub fn put_recording(&mut self, rec: Recording) {
        self.staged.push(Op::PutRecording(rec));
    }

    pub fn drop_recording(&mut self, id: &str) {
        self.staged.push(Op::DropRecording { id: id.to_string() });
    }

    /// Write the payload to the frame area now and stage its row.
    pub fn add_fragment(&mut self, recording_id: &str, payload: &[u8]) -> Result<FragmentRow, StoreError> {
        let (codec, stored) = codec::encode_payload(payload, self.min_gain)?;
        let (off, len) = self.backend.write_frame(&stored)?;
        let row = FragmentRow {
            seq: self.next_seq,
            recording_id: recording_id.to_string(),
            blob: BlobRef {
                off,
                len,
                plain_len: payload.len() as u64,
                codec,
                blake3: *blake3::hash(payload).as_bytes(),
            },
        };
        self.next_seq += 1;
        self.staged.push(Op::PutFragment(row.clone()));
        Ok(row)
    }

    pub fn drop_fragments(&mut self, recording_id: &str) {
        self.staged.push(Op::DropFragments {
            recording_id: recording_id.to_string(),
        });
    }
}
