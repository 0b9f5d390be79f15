use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stats {
    pub recordings: u64,
    pub fragments: u64,
    /// Plaintext bytes across all fragments.
    pub logical_bytes: u64,
    /// Bytes occupied in the frame area after codec.
    pub stored_bytes: u64,
    pub orphaned_recordings: u64,
}
