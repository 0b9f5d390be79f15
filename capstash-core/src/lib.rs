#![forbid(unsafe_code)]

pub mod error;

pub mod util {
    pub mod varint;
}

pub mod clock;
pub mod codec;
pub mod config;
pub mod container;
pub mod domain;
pub mod stats;
pub mod storage;

pub mod fragments;
pub mod locks;
pub mod registry;

pub mod export;
pub mod naming;
pub mod retention;

pub mod ingest;
pub mod stash;

// Re-exports: stable API surface
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::StashConfig;
pub use domain::{FragmentRow, Millis, Recording};
pub use error::{CapError, ExportError, RegistryError, RepairError, Result, StoreError, SweepError};
pub use export::{ExportOutcome, Seekability};
pub use ingest::{IngestTotals, Ingestor};
pub use retention::SweepReport;
pub use stash::Stash;
pub use stats::Stats;
