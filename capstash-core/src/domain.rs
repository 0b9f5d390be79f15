use serde::{Deserialize, Serialize};

use crate::codec::CodecId;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

/// Summary row for one capture session.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Recording {
    pub id: String,
    pub start_at: Option<Millis>,
    pub finish_at: Option<Millis>,
    pub save_at: Option<Millis>,
    /// Sum of the plaintext lengths of every fragment of this recording.
    pub size: u64,
}

impl Recording {
    pub fn new(id: &str, now: Millis) -> Self {
        Self {
            id: id.to_string(),
            start_at: Some(now),
            finish_at: None,
            save_at: None,
            size: 0,
        }
    }
}

/// Where a fragment payload lives in the frame area and how to decode it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct BlobRef {
    pub off: u64,
    pub len: u64,
    pub plain_len: u64,
    pub codec: CodecId,
    pub blake3: [u8; 32],
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FragmentRow {
    /// Store-wide write sequence; also the concatenation order.
    pub seq: u64,
    pub recording_id: String,
    pub blob: BlobRef,
}
