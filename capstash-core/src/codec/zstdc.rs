use super::{CodecId, PayloadCodec};
use crate::error::StoreError;

pub struct Zstd {
    pub level: i32,
}

impl PayloadCodec for Zstd {
    fn id(&self) -> CodecId {
        CodecId::Zstd
    }

    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>, StoreError> {
        Ok(zstd::bulk::compress(plain, self.level.max(1))?)
    }

    /// Output is capped at `plain_len`; a frame that inflates past it is corrupt.
    fn decode(&self, stored: &[u8], plain_len: u64) -> Result<Vec<u8>, StoreError> {
        let cap = usize::try_from(plain_len)
            .map_err(|_| StoreError::Corrupt(format!("plain length {plain_len} too large")))?;
        zstd::bulk::decompress(stored, cap).map_err(|e| StoreError::Corrupt(format!("zstd frame: {e}")))
    }
}
