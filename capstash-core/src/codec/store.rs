use super::{CodecId, PayloadCodec};
use crate::error::StoreError;

/// Payload kept byte for byte.
pub struct Store;

impl PayloadCodec for Store {
    fn id(&self) -> CodecId {
        CodecId::Store
    }

    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>, StoreError> {
        Ok(plain.to_vec())
    }

    fn decode(&self, stored: &[u8], plain_len: u64) -> Result<Vec<u8>, StoreError> {
        if stored.len() as u64 != plain_len {
            return Err(StoreError::Corrupt(format!(
                "stored frame is {} bytes, row says {plain_len}",
                stored.len()
            )));
        }
        Ok(stored.to_vec())
    }
}
