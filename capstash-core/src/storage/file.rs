use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::storage::frames::FrameFile;
use crate::storage::journal::{self, Journal, LogRecord};
use crate::storage::tables::{Op, Tables};
use crate::storage::{Backend, CompactStats};

pub const JOURNAL_FILE: &str = "stash.log";

fn frames_name(generation: u64) -> String {
    format!("stash.{generation}.frames")
}

fn parse_frames_name(name: &str) -> Option<u64> {
    name.strip_prefix("stash.")?.strip_suffix(".frames")?.parse().ok()
}

/// Directory-backed store: the journal holds table mutations, the current
/// frame generation holds payload bytes.
pub struct FileBackend {
    dir: PathBuf,
    journal: Journal,
    frames: FrameFile,
    generation: u64,
    tables: Tables,
    sync: bool,
}

impl FileBackend {
    pub fn open(dir: &Path, sync: bool) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir)?;
        let mut journal = Journal::open(&dir.join(JOURNAL_FILE), sync)?;

        let mut tables = Tables::default();
        let mut generation = 0u64;
        let mut seq_floor = 0u64;
        let mut batches = 0usize;
        for rec in journal.replay()? {
            match rec {
                LogRecord::Frames {
                    generation: g,
                    next_seq,
                } => {
                    generation = g;
                    seq_floor = seq_floor.max(next_seq);
                }
                LogRecord::Batch(ops) => {
                    batches += 1;
                    for op in &ops {
                        tables.apply(op);
                    }
                }
            }
        }
        tables.next_seq = tables.next_seq.max(seq_floor);

        let frames = FrameFile::open(&dir.join(frames_name(generation)), sync)?;
        remove_stale_generations(dir, generation)?;

        let beyond = tables
            .fragments
            .values()
            .filter(|r| r.blob.off + r.blob.len > frames.next_off)
            .count();
        if beyond > 0 {
            tracing::warn!(dir = %dir.display(), fragments = beyond, "fragments point past end of frame file");
        }
        tracing::debug!(
            dir = %dir.display(),
            batches,
            recordings = tables.recordings.len(),
            fragments = tables.fragments.len(),
            generation,
            "opened file store"
        );

        Ok(Self {
            dir: dir.to_path_buf(),
            journal,
            frames,
            generation,
            tables,
            sync,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

fn remove_stale_generations(dir: &Path, current: u64) -> Result<(), StoreError> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(g) = name.to_str().and_then(parse_frames_name) else {
            continue;
        };
        if g != current {
            tracing::debug!(file = ?name, "removing stale frame generation");
            std::fs::remove_file(entry.path())?;
        }
    }
    Ok(())
}

impl Backend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    fn tables(&self) -> &Tables {
        &self.tables
    }

    fn write_frame(&mut self, bytes: &[u8]) -> Result<(u64, u64), StoreError> {
        self.frames.append_frame(bytes)
    }

    fn read_frame(&self, off: u64, len: u64) -> Result<Vec<u8>, StoreError> {
        self.frames.read_frame(off, len)
    }

    fn commit(&mut self, ops: Vec<Op>) -> Result<(), StoreError> {
        // Frames must be durable before the batch that references them.
        self.frames.sync()?;
        let rec = LogRecord::Batch(ops);
        self.journal.append(&rec)?;
        if let LogRecord::Batch(ops) = rec {
            for op in &ops {
                self.tables.apply(op);
            }
        }
        Ok(())
    }

    fn compact(&mut self) -> Result<CompactStats, StoreError> {
        let before = self.frames.next_off;
        let next_gen = self.generation + 1;
        let new_frames_path = self.dir.join(frames_name(next_gen));
        let mut frames = FrameFile::create(&new_frames_path, self.sync)?;

        let mut ops = Vec::with_capacity(self.tables.recordings.len() + self.tables.fragments.len());
        for op in self.tables.snapshot_ops() {
            ops.push(match op {
                Op::PutFragment(mut row) => {
                    let bytes = self.frames.read_frame(row.blob.off, row.blob.len)?;
                    let (off, _) = frames.append_frame(&bytes)?;
                    row.blob.off = off;
                    Op::PutFragment(row)
                }
                other => other,
            });
        }
        frames.force_sync()?;

        // Swap the journal in with one rename; the old generation stays valid
        // until then.
        let next_seq = self.tables.next_seq;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        {
            use std::io::Write;
            let w = tmp.as_file_mut();
            journal::write_header(&mut *w)?;
            w.write_all(&journal::encode_record(&LogRecord::Frames {
                generation: next_gen,
                next_seq,
            })?)?;
            w.write_all(&journal::encode_record(&LogRecord::Batch(ops.clone()))?)?;
            w.sync_all()?;
        }
        let journal_path = self.dir.join(JOURNAL_FILE);
        tmp.persist(&journal_path).map_err(|e| StoreError::Io(e.error))?;

        let old_frames = std::mem::replace(&mut self.frames, frames);
        self.journal = Journal::open(&journal_path, self.sync)?;
        self.generation = next_gen;
        std::fs::remove_file(&old_frames.path)?;

        let mut tables = Tables::default();
        for op in &ops {
            tables.apply(op);
        }
        tables.next_seq = tables.next_seq.max(next_seq);
        self.tables = tables;

        let after = self.frames.next_off;
        tracing::info!(
            dir = %self.dir.display(),
            generation = next_gen,
            reclaimed = before.saturating_sub(after),
            "compacted store"
        );
        Ok(CompactStats {
            fragments: self.tables.fragments.len() as u64,
            reclaimed_bytes: before.saturating_sub(after),
        })
    }
}
