use std::io::{Cursor, Read};
use std::sync::Arc;

use crate::domain::FragmentRow;
use crate::error::StoreError;
use crate::storage::{Database, Transaction};

/// Append-only fragment lists keyed by recording id.
#[derive(Clone)]
pub struct FragmentStore {
    db: Arc<Database>,
}

impl FragmentStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Append one fragment in its own transaction.
    pub fn append(&self, recording_id: &str, payload: &[u8]) -> Result<FragmentRow, StoreError> {
        self.db.transaction(|tx| Self::stage_append(tx, recording_id, payload))
    }

    /// Append as part of a wider unit of work.
    pub fn stage_append(
        tx: &mut Transaction<'_>,
        recording_id: &str,
        payload: &[u8],
    ) -> Result<FragmentRow, StoreError> {
        let row = tx.add_fragment(recording_id, payload)?;
        tracing::debug!(
            recording = recording_id,
            seq = row.seq,
            len = payload.len(),
            codec = ?row.blob.codec,
            "staged fragment"
        );
        Ok(row)
    }

    /// Fragment rows of `recording_id` in write order.
    pub fn fragments(&self, recording_id: &str) -> Result<Vec<FragmentRow>, StoreError> {
        self.db.read(|t| t.fragments_of(recording_id).cloned().collect())
    }

    /// All payloads joined in write order; empty when there are none.
    pub fn concatenate(&self, recording_id: &str) -> Result<Vec<u8>, StoreError> {
        self.db.read_payloads(recording_id)
    }

    /// Stream the recording fragment by fragment.
    pub fn open_reader(&self, recording_id: &str) -> Result<FragmentReader, StoreError> {
        Ok(FragmentReader {
            db: self.db.clone(),
            rows: self.fragments(recording_id)?,
            cur: 0,
            cur_buf: None,
        })
    }

    /// Remove every fragment of `recording_id`; succeeds when there are none.
    pub fn delete_all(&self, recording_id: &str) -> Result<(), StoreError> {
        self.db.transaction(|tx| {
            Self::stage_delete_all(tx, recording_id);
            Ok(())
        })
    }

    pub fn stage_delete_all(tx: &mut Transaction<'_>, recording_id: &str) {
        tx.drop_fragments(recording_id);
    }

    /// Recording ids whose fragments outlived their registry row.
    pub fn orphans(&self) -> Result<Vec<String>, StoreError> {
        self.db.read(|t| t.orphan_ids())
    }
}

/// Chains fragment payloads lazily, one decoded frame in memory at a time.
pub struct FragmentReader {
    db: Arc<Database>,
    rows: Vec<FragmentRow>,
    cur: usize,
    cur_buf: Option<Cursor<Vec<u8>>>,
}

impl FragmentReader {
    pub fn len(&self) -> u64 {
        self.rows.iter().map(|r| r.blob.plain_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn load_next(&mut self) -> std::io::Result<bool> {
        let Some(row) = self.rows.get(self.cur) else {
            return Ok(false);
        };
        // Frames may have moved since the rows were listed; look the row up again.
        let plain = self
            .db
            .read_fragment(row.seq)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("fragment {} of {} was deleted", row.seq, row.recording_id),
                )
            })?;
        self.cur += 1;
        self.cur_buf = Some(Cursor::new(plain));
        Ok(true)
    }
}

impl Read for FragmentReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        loop {
            if let Some(ref mut cur) = self.cur_buf {
                let n = cur.read(buf)?;
                if n > 0 || buf.is_empty() {
                    return Ok(n);
                }
                self.cur_buf = None;
            }
            if !self.load_next()? {
                return Ok(0);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryBackend;

    fn store() -> FragmentStore {
        FragmentStore::new(Arc::new(Database::new(Box::new(MemoryBackend::new()), 0.05)))
    }

    #[test]
    fn rows_keep_write_order() {
        let fs = store();
        for part in [b"one", b"two", b"six"] {
            fs.append("r", part).unwrap();
        }
        let seqs: Vec<_> = fs.fragments("r").unwrap().iter().map(|r| r.seq).collect();
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(fs.concatenate("r").unwrap(), b"onetwosix");
    }

    #[test]
    fn delete_all_clears_only_that_recording() {
        let fs = store();
        fs.append("a", b"x").unwrap();
        fs.append("b", b"y").unwrap();
        fs.delete_all("a").unwrap();
        fs.delete_all("a").unwrap();
        assert!(fs.fragments("a").unwrap().is_empty());
        assert_eq!(fs.concatenate("b").unwrap(), b"y");
    }

    #[test]
    fn staged_append_then_delete_in_one_transaction() {
        let fs = store();
        fs.db
            .transaction(|tx| {
                FragmentStore::stage_append(tx, "r", b"gone")?;
                FragmentStore::stage_delete_all(tx, "r");
                Ok::<_, StoreError>(())
            })
            .unwrap();
        assert!(fs.fragments("r").unwrap().is_empty());
    }

    #[test]
    fn fragments_without_a_row_are_orphans() {
        let fs = store();
        fs.db
            .transaction(|tx| {
                tx.put_recording(crate::domain::Recording::new("kept", 1));
                FragmentStore::stage_append(tx, "kept", b"a")?;
                FragmentStore::stage_append(tx, "ghost", b"b")
            })
            .unwrap();
        assert_eq!(fs.orphans().unwrap(), vec!["ghost".to_string()]);
        fs.delete_all("ghost").unwrap();
        assert!(fs.orphans().unwrap().is_empty());
    }
}
