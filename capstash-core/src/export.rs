use crate::container::{self, Repaired};
use crate::error::{ExportError, RepairError};
use crate::fragments::FragmentStore;
use crate::naming::FileNaming;
use crate::registry::Registry;

/// Whether the exported bytes carry rewritten metadata.
#[derive(Debug, Clone, PartialEq)]
pub enum Seekability {
    Repaired { duration_ms: f64, cues: usize },
    /// Plain concatenation: playable, but without duration or cues.
    Degraded,
}

#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub recording_id: String,
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub seekable: Seekability,
    /// Why repair was skipped, when it was.
    pub repair_error: Option<RepairError>,
}

impl ExportOutcome {
    pub fn is_degraded(&self) -> bool {
        self.seekable == Seekability::Degraded
    }
}

#[derive(Clone)]
pub struct Reassembler {
    registry: Registry,
    fragments: FragmentStore,
    naming: FileNaming,
}

impl Reassembler {
    pub fn new(registry: Registry, fragments: FragmentStore, naming: FileNaming) -> Self {
        Self {
            registry,
            fragments,
            naming,
        }
    }

    /// Concatenate and repair. A repair failure degrades the export to the
    /// raw concatenation instead of failing it.
    pub fn export(&self, recording_id: &str) -> Result<ExportOutcome, ExportError> {
        self.run(recording_id, false)
    }

    /// Like [`Reassembler::export`], but a repair failure is an error.
    pub fn export_strict(&self, recording_id: &str) -> Result<ExportOutcome, ExportError> {
        self.run(recording_id, true)
    }

    fn run(&self, recording_id: &str, strict: bool) -> Result<ExportOutcome, ExportError> {
        let rec = self
            .registry
            .get(recording_id)?
            .ok_or_else(|| ExportError::NotFound(recording_id.to_string()))?;
        let raw = self.fragments.concatenate(recording_id)?;

        let (bytes, seekable, repair_error) = match container::make_seekable(&raw) {
            Ok(Repaired {
                bytes,
                duration_ms,
                cues,
                ..
            }) => (bytes, Seekability::Repaired { duration_ms, cues }, None),
            Err(e) if strict => return Err(ExportError::RepairFailed(e)),
            Err(e) => {
                tracing::warn!(
                    recording = recording_id,
                    error = %e,
                    "metadata repair failed; exporting unrepaired bytes"
                );
                (raw, Seekability::Degraded, Some(e))
            }
        };

        if let Err(e) = self.registry.mark_saved(recording_id) {
            tracing::warn!(recording = recording_id, error = %e, "could not stamp save time");
        }

        let file_name = self.naming.file_name(&rec);
        tracing::info!(
            recording = recording_id,
            file = %file_name,
            bytes = bytes.len(),
            degraded = repair_error.is_some(),
            "exported recording"
        );
        Ok(ExportOutcome {
            recording_id: recording_id.to_string(),
            bytes,
            file_name,
            seekable,
            repair_error,
        })
    }
}
