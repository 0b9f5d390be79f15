use thiserror::Error;

/// Faults raised by the storage layer (journal, frame file, payload codec).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("fragment write failed: {0}")]
    WriteFailed(#[source] std::io::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt store: {0}")]
    Corrupt(String),

    #[error("record codec: {0}")]
    Codec(String),

    #[error("store closed")]
    Closed,
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("recording already exists: {0}")]
    DuplicateId(String),

    #[error("recording not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepairError {
    #[error("malformed container at byte {offset}: {reason}")]
    MalformedContainer { offset: usize, reason: String },
}

impl RepairError {
    pub(crate) fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        RepairError::MalformedContainer {
            offset,
            reason: reason.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("recording not found: {0}")]
    NotFound(String),

    #[error("metadata repair failed: {0}")]
    RepairFailed(#[from] RepairError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<RegistryError> for ExportError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::NotFound(id) => ExportError::NotFound(id),
            RegistryError::DuplicateId(id) => {
                ExportError::Store(StoreError::Corrupt(format!("duplicate recording row {id}")))
            }
            RegistryError::Store(s) => ExportError::Store(s),
        }
    }
}

/// One recording the sweeper could not remove.
#[derive(Debug)]
pub struct SweepFailure {
    pub recording_id: String,
    pub error: StoreError,
}

/// Aggregate of per-recording failures; the sweep itself ran to completion.
#[derive(Error, Debug)]
#[error("sweep finished with {} failure(s) after deleting {deleted} recording(s)", failures.len())]
pub struct SweepError {
    pub deleted: usize,
    pub orphans_reclaimed: usize,
    pub failures: Vec<SweepFailure>,
}

#[derive(Error, Debug)]
pub enum CapError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Repair(#[from] RepairError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Sweep(#[from] SweepError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, CapError>;
