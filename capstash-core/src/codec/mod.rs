//! Per-fragment payload encoding.

use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub mod store;
pub mod zstdc;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CodecId {
    Store = 0,
    Zstd = 1,
}

pub trait PayloadCodec: Send + Sync {
    fn id(&self) -> CodecId;
    fn encode(&self, plain: &[u8]) -> Result<Vec<u8>, StoreError>;
    fn decode(&self, stored: &[u8], plain_len: u64) -> Result<Vec<u8>, StoreError>;
}

const ZSTD: zstdc::Zstd = zstdc::Zstd { level: 3 };

/// Payloads shorter than this are never worth a zstd frame header.
const MIN_COMPRESS_LEN: usize = 64;

pub fn codec_for(id: CodecId) -> &'static dyn PayloadCodec {
    match id {
        CodecId::Store => &store::Store,
        CodecId::Zstd => &ZSTD,
    }
}

/// Pick the cheapest encoding for a fragment payload.
///
/// Zstd is kept only if it is at least `min_gain` smaller than the raw bytes;
/// encoded media rarely compresses, so most fragments stay `Store`.
pub fn encode_payload(plain: &[u8], min_gain: f32) -> Result<(CodecId, Vec<u8>), StoreError> {
    if plain.len() < MIN_COMPRESS_LEN {
        return Ok((store::Store.id(), store::Store.encode(plain)?));
    }
    let packed = ZSTD.encode(plain)?;
    let limit = (plain.len() as f64) * (1.0 - min_gain as f64);
    if (packed.len() as f64) <= limit {
        Ok((ZSTD.id(), packed))
    } else {
        Ok((store::Store.id(), store::Store.encode(plain)?))
    }
}

pub fn decode_payload(codec: CodecId, stored: &[u8], plain_len: u64) -> Result<Vec<u8>, StoreError> {
    codec_for(codec).decode(stored, plain_len)
}
