use super::schema::{self, ElementSpec, Kind, Parent};
use super::vint::{self, VintError};
use crate::error::RepairError;

/// One element header located in a buffer. Masters and leaves share the flat
/// list; `depth` recovers the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element {
    pub id: u32,
    pub offset: usize,
    pub header_len: usize,
    /// Declared payload size; `None` for unknown-size masters.
    pub size: Option<u64>,
    pub depth: usize,
    /// Exclusive end. For unknown-size masters, where the first element that
    /// cannot be a child starts (or the buffer end).
    pub end: usize,
    pub master: bool,
}

impl Element {
    pub fn data_start(&self) -> usize {
        self.offset + self.header_len
    }

    pub fn data<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.data_start()..self.end]
    }

    /// Header and payload, exactly as they appear in the buffer.
    pub fn raw<'a>(&self, buf: &'a [u8]) -> &'a [u8] {
        &buf[self.offset..self.end]
    }

    pub fn name(&self) -> &'static str {
        schema::name(self.id)
    }
}

fn vint_err(offset: usize, what: &str, e: VintError) -> RepairError {
    let why = match e {
        VintError::Truncated => "truncated",
        VintError::Invalid => "invalid",
    };
    RepairError::malformed(offset, format!("{why} {what}"))
}

fn accepts(parent_id: u32, spec: Option<&ElementSpec>) -> bool {
    match spec.map(|s| s.parent) {
        None | Some(Parent::Any) => true,
        Some(Parent::Element(p)) => p == parent_id,
        Some(Parent::Root) => false,
    }
}

/// Split `buf` into elements using the streaming grammar: known sizes bound
/// their children, unknown sizes run until a non-child id appears.
pub fn decode(buf: &[u8]) -> Result<Vec<Element>, RepairError> {
    let mut elems: Vec<Element> = Vec::new();
    let mut stack: Vec<usize> = Vec::new();
    let mut pos = 0usize;

    while pos < buf.len() {
        while let Some(&top) = stack.last() {
            let e = &elems[top];
            if e.size.is_some() && pos >= e.end {
                stack.pop();
            } else {
                break;
            }
        }

        let (id, id_len) = vint::read_id(&buf[pos..]).map_err(|e| vint_err(pos, "element id", e))?;
        let (size, size_len) = vint::read_size(&buf[pos + id_len..])
            .map_err(|e| vint_err(pos + id_len, "element size", e))?;
        let spec = schema::lookup(id);

        while let Some(&top) = stack.last() {
            let e = &elems[top];
            if e.size.is_none() && !accepts(e.id, spec) {
                elems[top].end = pos;
                stack.pop();
            } else {
                break;
            }
        }

        let header_len = id_len + size_len;
        let data_start = pos + header_len;
        let master = matches!(spec, Some(ElementSpec { kind: Kind::Master, .. }));
        let end = match size {
            None if master => buf.len(),
            None => {
                return Err(RepairError::malformed(
                    pos,
                    format!("{} with unknown size", schema::name(id)),
                ));
            }
            Some(n) => usize::try_from(n)
                .ok()
                .and_then(|n| data_start.checked_add(n))
                .filter(|&end| end <= buf.len())
                .ok_or_else(|| {
                    RepairError::malformed(
                        pos,
                        format!(
                            "{} of {n} bytes runs past end of buffer ({} left)",
                            schema::name(id),
                            buf.len().saturating_sub(data_start)
                        ),
                    )
                })?,
        };

        if let Some(&top) = stack.last() {
            let parent = &elems[top];
            if parent.size.is_some() && end > parent.end {
                return Err(RepairError::malformed(
                    pos,
                    format!("{} overruns parent {}", schema::name(id), parent.name()),
                ));
            }
        }

        elems.push(Element {
            id,
            offset: pos,
            header_len,
            size,
            depth: stack.len(),
            end,
            master,
        });
        if master {
            stack.push(elems.len() - 1);
            pos = data_start;
        } else {
            pos = end;
        }
    }
    Ok(elems)
}

/// Indices of the direct children of `elems[parent]`.
pub fn children(elems: &[Element], parent: usize) -> impl Iterator<Item = usize> + '_ {
    let p = elems[parent];
    elems
        .iter()
        .enumerate()
        .skip(parent + 1)
        .take_while(move |(_, e)| e.offset < p.end && e.depth > p.depth)
        .filter(move |(_, e)| e.depth == p.depth + 1)
        .map(|(i, _)| i)
}

pub fn read_uint(e: &Element, buf: &[u8]) -> Result<u64, RepairError> {
    let data = e.data(buf);
    if data.len() > 8 {
        return Err(RepairError::malformed(
            e.offset,
            format!("{} is {} bytes wide", e.name(), data.len()),
        ));
    }
    Ok(data.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64))
}

pub fn read_float(e: &Element, buf: &[u8]) -> Result<f64, RepairError> {
    let data = e.data(buf);
    match data.len() {
        0 => Ok(0.0),
        4 => Ok(f32::from_be_bytes([data[0], data[1], data[2], data[3]]) as f64),
        8 => {
            let mut b = [0u8; 8];
            b.copy_from_slice(data);
            Ok(f64::from_be_bytes(b))
        }
        n => Err(RepairError::malformed(
            e.offset,
            format!("{} float of {n} bytes", e.name()),
        )),
    }
}

pub fn read_string(e: &Element, buf: &[u8]) -> String {
    let data = e.data(buf);
    let trimmed = data.split(|&b| b == 0).next().unwrap_or_default();
    String::from_utf8_lossy(trimmed).into_owned()
}

/// Track, relative timecode and flags at the front of a (Simple)Block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    pub track: u64,
    pub timecode: i16,
    pub flags: u8,
}

impl BlockHeader {
    pub const KEYFRAME: u8 = 0x80;

    pub fn parse(e: &Element, buf: &[u8]) -> Result<Self, RepairError> {
        let data = e.data(buf);
        let (track, n) = vint::read_uint(data).map_err(|err| vint_err(e.data_start(), "block track", err))?;
        let rest = data.get(n..n + 3).ok_or_else(|| {
            RepairError::malformed(e.offset, format!("{} shorter than its header", e.name()))
        })?;
        Ok(Self {
            track,
            timecode: i16::from_be_bytes([rest[0], rest[1]]),
            flags: rest[2],
        })
    }

    pub fn keyframe(&self) -> bool {
        self.flags & Self::KEYFRAME != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::encode::*;
    use crate::container::schema::ids;

    #[test]
    fn unknown_size_cluster_ends_at_next_cluster() {
        let mut buf = Vec::new();
        put_unknown_master(&mut buf, ids::SEGMENT);
        put_unknown_master(&mut buf, ids::CLUSTER);
        put_uint(&mut buf, ids::TIMECODE, 0);
        let second = buf.len();
        put_unknown_master(&mut buf, ids::CLUSTER);
        put_uint(&mut buf, ids::TIMECODE, 40);

        let elems = decode(&buf).unwrap();
        let clusters: Vec<&Element> = elems.iter().filter(|e| e.id == ids::CLUSTER).collect();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].end, second);
        assert_eq!(clusters[1].end, buf.len());
        assert!(clusters.iter().all(|c| c.depth == 1));
    }

    #[test]
    fn unknown_size_leaf_is_malformed() {
        let mut buf = Vec::new();
        vint::write_id(&mut buf, ids::SIMPLE_BLOCK);
        vint::write_unknown_size(&mut buf);
        assert!(matches!(
            decode(&buf),
            Err(RepairError::MalformedContainer { offset: 0, .. })
        ));
    }

    #[test]
    fn oversized_leaf_is_malformed() {
        let mut buf = Vec::new();
        vint::write_id(&mut buf, ids::TIMECODE);
        vint::write_size(&mut buf, 10);
        buf.push(1);
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn child_may_not_overrun_known_parent() {
        let mut buf = Vec::new();
        vint::write_id(&mut buf, ids::INFO);
        vint::write_size(&mut buf, 3);
        vint::write_id(&mut buf, ids::DURATION);
        vint::write_size(&mut buf, 8);
        buf.extend_from_slice(&[0u8; 8]);
        assert!(decode(&buf).is_err());
    }

    #[test]
    fn block_header_parses() {
        let mut buf = Vec::new();
        put_element(&mut buf, ids::SIMPLE_BLOCK, &simple_block(1, -5, true, b"xy"));
        let elems = decode(&buf).unwrap();
        let h = BlockHeader::parse(&elems[0], &buf).unwrap();
        assert_eq!(h.track, 1);
        assert_eq!(h.timecode, -5);
        assert!(h.keyframe());
    }
}
