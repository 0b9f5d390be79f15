//! WebM/Matroska (EBML) parsing and metadata repair for live captures.
//!
//! Live muxers write the Segment and every Cluster with unknown size and
//! never come back to fill in Duration or Cues. [`make_seekable`] rebuilds
//! the metadata block in front of the untouched cluster bytes.

pub mod decode;
pub mod encode;
pub mod repair;
pub mod scan;
pub mod schema;
pub mod vint;

pub use repair::{Repaired, inspect, make_seekable};
pub use scan::{ContainerSummary, Track, TrackKind};
