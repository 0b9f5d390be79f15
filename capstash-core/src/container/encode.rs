//! Element writers. Sizes are minimal unless a fixed width is asked for.

use super::vint;

pub fn put_element(out: &mut Vec<u8>, id: u32, data: &[u8]) {
    vint::write_id(out, id);
    vint::write_size(out, data.len() as u64);
    out.extend_from_slice(data);
}

pub fn put_uint(out: &mut Vec<u8>, id: u32, v: u64) {
    let bytes = v.to_be_bytes();
    let skip = (v.leading_zeros() / 8).min(7) as usize;
    put_element(out, id, &bytes[skip..]);
}

/// Unsigned value padded to `width` bytes, so its encoded length does not
/// depend on the value.
pub fn put_uint_fixed(out: &mut Vec<u8>, id: u32, v: u64, width: usize) {
    let width = width.clamp(1, 8);
    put_element(out, id, &v.to_be_bytes()[8 - width..]);
}

pub fn put_int(out: &mut Vec<u8>, id: u32, v: i64) {
    let bytes = v.to_be_bytes();
    let mut skip = 0;
    while skip < 7 {
        let (b, next) = (bytes[skip], bytes[skip + 1]);
        let redundant = (b == 0x00 && next & 0x80 == 0) || (b == 0xFF && next & 0x80 != 0);
        if !redundant {
            break;
        }
        skip += 1;
    }
    put_element(out, id, &bytes[skip..]);
}

pub fn put_float(out: &mut Vec<u8>, id: u32, v: f64) {
    put_element(out, id, &v.to_be_bytes());
}

pub fn put_str(out: &mut Vec<u8>, id: u32, s: &str) {
    put_element(out, id, s.as_bytes());
}

pub fn put_master(out: &mut Vec<u8>, id: u32, body: impl FnOnce(&mut Vec<u8>)) {
    let mut inner = Vec::new();
    body(&mut inner);
    put_element(out, id, &inner);
}

/// Header of a master whose end is implied by the next sibling.
pub fn put_unknown_master(out: &mut Vec<u8>, id: u32) {
    vint::write_id(out, id);
    vint::write_unknown_size(out);
}

/// Payload of a SimpleBlock carrying one unlaced frame.
pub fn simple_block(track: u64, timecode: i16, keyframe: bool, frame: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(frame.len() + 4);
    vint::write_size(&mut out, track);
    out.extend_from_slice(&timecode.to_be_bytes());
    out.push(if keyframe { 0x80 } else { 0x00 });
    out.extend_from_slice(frame);
    out
}
