use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::StoreError;
use crate::storage::tables::{Op, Tables};
use crate::storage::{Backend, CompactStats};

/// Trips every subsequent frame write or commit of a [`MemoryBackend`].
#[derive(Clone, Debug, Default)]
pub struct FaultSwitch(Arc<AtomicBool>);

impl FaultSwitch {
    pub fn trip(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), StoreError> {
        if self.0.load(Ordering::SeqCst) {
            return Err(StoreError::WriteFailed(std::io::Error::other("injected write fault")));
        }
        Ok(())
    }
}

/// Volatile backend: tables plus one byte arena for frames.
#[derive(Default)]
pub struct MemoryBackend {
    tables: Tables,
    arena: Vec<u8>,
    faults: FaultSwitch,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_faults() -> (Self, FaultSwitch) {
        let faults = FaultSwitch::default();
        let backend = Self {
            faults: faults.clone(),
            ..Default::default()
        };
        (backend, faults)
    }
}

impl Backend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn tables(&self) -> &Tables {
        &self.tables
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(u64, u64), StoreError> {
        self.faults.check()?;
        let off = self.arena.len() as u64;
        self.arena.extend_from_slice(bytes);
        Ok((off, bytes.len() as u64))
    }

    fn read_frame(&self, off: u64, len: u64) -> Result<Vec<u8>, StoreError> {
        let start = off as usize;
        let end = start.saturating_add(len as usize);
        self.arena
            .get(start..end)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| StoreError::Corrupt(format!("frame {off}+{len} beyond arena")))
    }

    fn commit(&mut self, ops: Vec<Op>) -> Result<(), StoreError> {
        self.faults.check()?;
        for op in &ops {
            self.tables.apply(op);
        }
        Ok(())
    }

    fn compact(&mut self) -> Result<CompactStats, StoreError> {
        let before = self.arena.len() as u64;
        let mut arena = Vec::with_capacity(self.arena.len());
        let mut tables = Tables::default();
        for op in self.tables.snapshot_ops() {
            let op = match op {
                Op::PutFragment(mut row) => {
                    let bytes = self.read_frame(row.blob.off, row.blob.len)?;
                    row.blob.off = arena.len() as u64;
                    arena.extend_from_slice(&bytes);
                    Op::PutFragment(row)
                }
                other => other,
            };
            tables.apply(&op);
        }
        tables.next_seq = tables.next_seq.max(self.tables.next_seq);
        let stats = CompactStats {
            fragments: tables.fragments.len() as u64,
            reclaimed_bytes: before - arena.len() as u64,
        };
        self.tables = tables;
        self.arena = arena;
        Ok(stats)
    }
}
