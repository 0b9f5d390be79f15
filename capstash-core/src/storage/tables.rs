use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::domain::{FragmentRow, Millis, Recording};
use crate::stats::Stats;

/// One mutation of the logical tables. A committed batch of these is the
/// unit persisted by every backend.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub enum Op {
    PutRecording(Recording),
    DropRecording { id: String },
    PutFragment(FragmentRow),
    DropFragments { recording_id: String },
}

/// `recordings` (pk id, index finish_at) and `recording_fragments`
/// (pk seq, index recording_id), materialised in memory.
#[derive(Clone, Debug, Default)]
pub struct Tables {
    pub recordings: BTreeMap<String, Recording>,
    pub by_finish: BTreeSet<(Millis, String)>,
    pub fragments: BTreeMap<u64, FragmentRow>,
    pub by_recording: HashMap<String, BTreeSet<u64>>,
    pub next_seq: u64,
}

impl Tables {
    pub fn apply(&mut self, op: &Op) {
        match op {
            Op::PutRecording(rec) => {
                if let Some(old) = self.recordings.insert(rec.id.clone(), rec.clone()) {
                    if let Some(at) = old.finish_at {
                        self.by_finish.remove(&(at, old.id));
                    }
                }
                if let Some(at) = rec.finish_at {
                    self.by_finish.insert((at, rec.id.clone()));
                }
            }
            Op::DropRecording { id } => {
                if let Some(old) = self.recordings.remove(id) {
                    if let Some(at) = old.finish_at {
                        self.by_finish.remove(&(at, old.id));
                    }
                }
            }
            Op::PutFragment(row) => {
                self.by_recording
                    .entry(row.recording_id.clone())
                    .or_default()
                    .insert(row.seq);
                self.next_seq = self.next_seq.max(row.seq + 1);
                self.fragments.insert(row.seq, row.clone());
            }
            Op::DropFragments { recording_id } => {
                if let Some(seqs) = self.by_recording.remove(recording_id) {
                    for seq in seqs {
                        self.fragments.remove(&seq);
                    }
                }
            }
        }
    }

    /// Fragments of one recording in write order.
    pub fn fragments_of<'a>(&'a self, recording_id: &str) -> impl Iterator<Item = &'a FragmentRow> + 'a {
        self.by_recording
            .get(recording_id)
            .into_iter()
            .flat_map(|seqs| seqs.iter())
            .filter_map(|seq| self.fragments.get(seq))
    }

    /// Recordings with `finish_at <= cutoff`, oldest first.
    pub fn finished_before(&self, cutoff: Millis) -> Vec<Recording> {
        self.by_finish
            .iter()
            .take_while(|(at, _)| *at <= cutoff)
            .filter_map(|(_, id)| self.recordings.get(id).cloned())
            .collect()
    }

    /// Newest `finish_at` first; rows never written to come last.
    pub fn newest_first(&self) -> Vec<Recording> {
        let mut out: Vec<Recording> = self
            .by_finish
            .iter()
            .rev()
            .filter_map(|(_, id)| self.recordings.get(id).cloned())
            .collect();
        let mut unfinished: Vec<Recording> = self
            .recordings
            .values()
            .filter(|r| r.finish_at.is_none())
            .cloned()
            .collect();
        unfinished.sort_by(|a, b| b.id.cmp(&a.id));
        out.extend(unfinished);
        out
    }

    /// Recording ids that still own fragments but have no registry row.
    pub fn orphan_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .by_recording
            .iter()
            .filter(|(id, seqs)| !seqs.is_empty() && !self.recordings.contains_key(*id))
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    /// Every live row, as a single batch that rebuilds these tables.
    pub fn snapshot_ops(&self) -> Vec<Op> {
        let mut ops: Vec<Op> = self
            .recordings
            .values()
            .cloned()
            .map(Op::PutRecording)
            .collect();
        ops.extend(self.fragments.values().cloned().map(Op::PutFragment));
        ops
    }

    pub fn stats(&self) -> Stats {
        let mut stats = Stats {
            recordings: self.recordings.len() as u64,
            fragments: self.fragments.len() as u64,
            ..Default::default()
        };
        for row in self.fragments.values() {
            stats.logical_bytes += row.blob.plain_len;
            stats.stored_bytes += row.blob.len;
        }
        stats.orphaned_recordings = self.orphan_ids().len() as u64;
        stats
    }
}
