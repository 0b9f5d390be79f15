use std::sync::Arc;

use crate::clock::Clock;
use crate::domain::Millis;
use crate::error::{StoreError, SweepError, SweepFailure};
use crate::fragments::FragmentStore;
use crate::locks::KeyedLocks;
use crate::storage::Database;

pub const MS_PER_DAY: Millis = 86_400_000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub deleted: usize,
    pub orphans_reclaimed: usize,
}

/// Deletes recordings whose last write is older than the retention window.
#[derive(Clone)]
pub struct Sweeper {
    db: Arc<Database>,
    fragments: FragmentStore,
    locks: Arc<KeyedLocks>,
    clock: Arc<dyn Clock>,
}

pub fn cutoff_for(now: Millis, retention_days: u32) -> Millis {
    now - retention_days as Millis * MS_PER_DAY
}

impl Sweeper {
    pub fn new(
        db: Arc<Database>,
        fragments: FragmentStore,
        locks: Arc<KeyedLocks>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            fragments,
            locks,
            clock,
        }
    }

    pub fn sweep(&self, retention_days: u32) -> Result<SweepReport, SweepError> {
        self.sweep_at(cutoff_for(self.clock.now_ms(), retention_days))
    }

    /// Remove every recording with `finish_at <= cutoff`, fragments first,
    /// then reclaim fragments that have no recording row. Per-recording
    /// failures are collected and do not stop the sweep.
    pub fn sweep_at(&self, cutoff: Millis) -> Result<SweepReport, SweepError> {
        let mut report = SweepReport::default();
        let mut failures = Vec::new();

        let expired = match self.db.read(|t| t.finished_before(cutoff)) {
            Ok(v) => v,
            Err(error) => {
                return Err(SweepError {
                    deleted: 0,
                    orphans_reclaimed: 0,
                    failures: vec![SweepFailure {
                        recording_id: String::new(),
                        error,
                    }],
                });
            }
        };

        for rec in expired {
            let res = self.locks.with(&rec.id, || {
                self.db.transaction(|tx| {
                    // Re-check under the lock: an append may have moved finish_at.
                    match tx.recording(&rec.id) {
                        Some(cur) if cur.finish_at.is_some_and(|at| at <= cutoff) => {
                            FragmentStore::stage_delete_all(tx, &rec.id);
                            tx.drop_recording(&rec.id);
                            Ok::<_, StoreError>(true)
                        }
                        _ => Ok(false),
                    }
                })
            });
            match res {
                Ok(true) => report.deleted += 1,
                Ok(false) => {}
                Err(error) => {
                    tracing::warn!(recording = %rec.id, %error, "sweep could not delete recording");
                    failures.push(SweepFailure {
                        recording_id: rec.id,
                        error,
                    });
                }
            }
        }

        let orphans = match self.fragments.orphans() {
            Ok(ids) => ids,
            Err(error) => {
                failures.push(SweepFailure {
                    recording_id: String::new(),
                    error,
                });
                Vec::new()
            }
        };
        for id in orphans {
            let res = self.locks.with(&id, || {
                self.db.transaction(|tx| {
                    if tx.recording(&id).is_none() {
                        FragmentStore::stage_delete_all(tx, &id);
                    }
                    Ok::<_, StoreError>(())
                })
            });
            match res {
                Ok(()) => report.orphans_reclaimed += 1,
                Err(error) => {
                    tracing::warn!(recording = %id, %error, "sweep could not reclaim orphaned fragments");
                    failures.push(SweepFailure {
                        recording_id: id,
                        error,
                    });
                }
            }
        }

        if report.deleted > 0 || report.orphans_reclaimed > 0 {
            tracing::info!(
                deleted = report.deleted,
                orphans = report.orphans_reclaimed,
                cutoff,
                "swept expired recordings"
            );
        }

        if failures.is_empty() {
            Ok(report)
        } else {
            Err(SweepError {
                deleted: report.deleted,
                orphans_reclaimed: report.orphans_reclaimed,
                failures,
            })
        }
    }
}
