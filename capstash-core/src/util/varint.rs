//! LEB128-style unsigned varints used to length-delimit journal records and frames.

pub fn put_uvarint(out: &mut Vec<u8>, mut x: u64) {
    while x >= 0x80 {
        out.push((x as u8) | 0x80);
        x >>= 7;
    }
    out.push(x as u8);
}

/// Decode a varint from the front of `buf`; `None` if the bytes run out first
/// or the encoding exceeds ten bytes.
pub fn get_uvarint(buf: &[u8]) -> Option<(u64, usize)> {
    let mut x: u64 = 0;
    let mut s: u32 = 0;
    for (i, &byte) in buf.iter().take(10).enumerate() {
        if byte < 0x80 {
            x |= (byte as u64) << s;
            return Some((x, i + 1));
        }
        x |= ((byte & 0x7f) as u64) << s;
        s += 7;
    }
    None
}

pub fn uvarint_len(mut x: u64) -> usize {
    let mut n = 1;
    while x >= 0x80 {
        x >>= 7;
        n += 1;
    }
    n
}
