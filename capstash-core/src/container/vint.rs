//! EBML variable-size integers.
//!
//! The count of leading zero bits in the first byte gives the total width
//! (1..=8). Element ids keep their marker bit; sizes drop it. A size whose
//! value bits are all ones means "unknown", as written by live muxers.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VintError {
    /// Ran out of bytes.
    Truncated,
    /// Leading byte 0x00, or an id wider than four bytes.
    Invalid,
}

pub const MAX_ID_LEN: usize = 4;
pub const MAX_SIZE_LEN: usize = 8;

/// Largest size encodable in `len` bytes without colliding with "unknown".
#[inline]
fn max_known(len: usize) -> u64 {
    (1u64 << (7 * len)) - 2
}

#[inline]
pub fn width(first: u8) -> Option<usize> {
    if first == 0 {
        None
    } else {
        Some(first.leading_zeros() as usize + 1)
    }
}

pub fn read_id(buf: &[u8]) -> Result<(u32, usize), VintError> {
    let first = *buf.first().ok_or(VintError::Truncated)?;
    let len = width(first).ok_or(VintError::Invalid)?;
    if len > MAX_ID_LEN {
        return Err(VintError::Invalid);
    }
    let bytes = buf.get(..len).ok_or(VintError::Truncated)?;
    let id = bytes.iter().fold(0u32, |acc, &b| (acc << 8) | b as u32);
    Ok((id, len))
}

/// `Ok((None, len))` for the unknown-size marker.
pub fn read_size(buf: &[u8]) -> Result<(Option<u64>, usize), VintError> {
    let first = *buf.first().ok_or(VintError::Truncated)?;
    let len = width(first).ok_or(VintError::Invalid)?;
    let bytes = buf.get(..len).ok_or(VintError::Truncated)?;
    let mut value = (first as u64) & (0xFFu64 >> len);
    for &b in &bytes[1..] {
        value = (value << 8) | b as u64;
    }
    let all_ones = (1u64 << (7 * len)) - 1;
    if value == all_ones {
        Ok((None, len))
    } else {
        Ok((Some(value), len))
    }
}

/// Unsigned vint without marker semantics, as used for block track numbers.
pub fn read_uint(buf: &[u8]) -> Result<(u64, usize), VintError> {
    match read_size(buf)? {
        (Some(v), len) => Ok((v, len)),
        (None, len) => Ok(((1u64 << (7 * len)) - 1, len)),
    }
}

pub fn id_len(id: u32) -> usize {
    match id {
        0..=0xFF => 1,
        0x100..=0xFFFF => 2,
        0x1_0000..=0xFF_FFFF => 3,
        _ => 4,
    }
}

pub fn write_id(out: &mut Vec<u8>, id: u32) {
    let len = id_len(id);
    out.extend_from_slice(&id.to_be_bytes()[4 - len..]);
}

pub fn size_len(size: u64) -> usize {
    (1..=MAX_SIZE_LEN).find(|&l| size <= max_known(l)).unwrap_or(MAX_SIZE_LEN)
}

pub fn write_size(out: &mut Vec<u8>, size: u64) {
    write_size_fixed(out, size, size_len(size));
}

/// Sizes wider than the minimum are legal and let callers reserve space.
pub fn write_size_fixed(out: &mut Vec<u8>, size: u64, len: usize) {
    let len = len.clamp(size_len(size), MAX_SIZE_LEN);
    let marked = size | (1u64 << (7 * len));
    out.extend_from_slice(&marked.to_be_bytes()[8 - len..]);
}

pub fn write_unknown_size(out: &mut Vec<u8>) {
    out.extend_from_slice(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
}
