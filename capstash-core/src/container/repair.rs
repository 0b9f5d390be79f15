use super::decode::{self, Element};
use super::encode::{put_element, put_float, put_master, put_uint, put_uint_fixed};
use super::scan::{self, ContainerSummary, CuePoint, DEFAULT_TIMECODE_SCALE, Layout};
use super::schema::ids;
use super::vint;
use crate::error::RepairError;

/// Width used for every position value we write, so the metadata length can
/// be fixed before the positions are known.
const POSITION_WIDTH: usize = 8;

#[derive(Debug, Clone)]
pub struct Repaired {
    pub bytes: Vec<u8>,
    /// Length of the rewritten metadata; the payload starts here.
    pub metadata_len: usize,
    /// Where the payload started in the input.
    pub original_metadata_len: usize,
    pub duration_ms: f64,
    pub cues: usize,
}

impl Repaired {
    pub fn payload(&self) -> &[u8] {
        &self.bytes[self.metadata_len..]
    }
}

/// Decode and summarise a capture without rewriting it.
pub fn inspect(buf: &[u8]) -> Result<ContainerSummary, RepairError> {
    let elems = decode::decode(buf)?;
    let layout = scan::scan(buf, &elems)?;
    Ok(ContainerSummary::from(&layout))
}

/// Rewrite the leading metadata of a live capture so it declares its
/// duration and carries a cue index. Payload bytes are copied verbatim.
pub fn make_seekable(buf: &[u8]) -> Result<Repaired, RepairError> {
    let elems = decode::decode(buf)?;
    let layout = scan::scan(buf, &elems)?;

    let header = elems[layout.ebml_header].raw(buf);
    let info = build_info(buf, &elems, &layout);
    let tracks = layout
        .tracks_elem
        .map(|i| elems[i].raw(buf))
        .unwrap_or_default();
    let kept: Vec<u8> = layout
        .keep
        .iter()
        .flat_map(|&i| elems[i].raw(buf).iter().copied())
        .collect();

    // Every length below is independent of the position values.
    let has_tracks = !tracks.is_empty();
    let has_cues = !layout.cues.is_empty();
    let seek_head_len = build_seek_head(&[
        Some((ids::INFO, 0)),
        has_tracks.then_some((ids::TRACKS, 0)),
        has_cues.then_some((ids::CUES, 0)),
    ])
    .len();
    let cues_len = if has_cues { build_cues(&layout.cues, 0).len() } else { 0 };

    let info_pos = seek_head_len;
    let tracks_pos = info_pos + info.len();
    let cues_pos = tracks_pos + tracks.len() + kept.len();
    let content_len = cues_pos + cues_len;

    let seek_head = build_seek_head(&[
        Some((ids::INFO, info_pos as u64)),
        has_tracks.then_some((ids::TRACKS, tracks_pos as u64)),
        has_cues.then_some((ids::CUES, cues_pos as u64)),
    ]);
    debug_assert_eq!(seek_head.len(), seek_head_len);

    let body = &buf[layout.metadata_size..];
    let mut out = Vec::with_capacity(header.len() + 12 + content_len + body.len());
    out.extend_from_slice(header);
    vint::write_id(&mut out, ids::SEGMENT);
    vint::write_unknown_size(&mut out);
    out.extend_from_slice(&seek_head);
    out.extend_from_slice(&info);
    out.extend_from_slice(tracks);
    out.extend_from_slice(&kept);
    if has_cues {
        let cues = build_cues(&layout.cues, content_len as u64);
        debug_assert_eq!(cues.len(), cues_len);
        out.extend_from_slice(&cues);
    }
    let metadata_len = out.len();
    out.extend_from_slice(body);

    tracing::debug!(
        before = layout.metadata_size,
        after = metadata_len,
        duration_ms = layout.duration_ms(),
        cues = layout.cues.len(),
        "rewrote container metadata"
    );

    Ok(Repaired {
        bytes: out,
        metadata_len,
        original_metadata_len: layout.metadata_size,
        duration_ms: layout.duration_ms(),
        cues: layout.cues.len(),
    })
}

/// Info with the stale Duration (and any checksum over it) replaced.
fn build_info(buf: &[u8], elems: &[Element], layout: &Layout) -> Vec<u8> {
    let mut out = Vec::new();
    put_master(&mut out, ids::INFO, |body| {
        match layout.info {
            Some(info) => {
                for c in decode::children(elems, info) {
                    let e = &elems[c];
                    if !matches!(e.id, ids::DURATION | ids::CRC32 | ids::VOID) {
                        body.extend_from_slice(e.raw(buf));
                    }
                }
            }
            None => put_uint(body, ids::TIMECODE_SCALE, DEFAULT_TIMECODE_SCALE),
        }
        put_float(body, ids::DURATION, layout.duration_ticks());
    });
    out
}

fn build_seek_head(targets: &[Option<(u32, u64)>]) -> Vec<u8> {
    let mut out = Vec::new();
    put_master(&mut out, ids::SEEK_HEAD, |body| {
        for &(id, pos) in targets.iter().flatten() {
            put_master(body, ids::SEEK, |seek| {
                let mut id_bytes = Vec::with_capacity(4);
                vint::write_id(&mut id_bytes, id);
                put_element(seek, ids::SEEK_ID, &id_bytes);
                put_uint_fixed(seek, ids::SEEK_POSITION, pos, POSITION_WIDTH);
            });
        }
    });
    out
}

/// `base` is the distance from the Segment payload start to the first body byte.
fn build_cues(cues: &[CuePoint], base: u64) -> Vec<u8> {
    let mut out = Vec::new();
    put_master(&mut out, ids::CUES, |body| {
        for cue in cues {
            put_master(body, ids::CUE_POINT, |point| {
                put_uint(point, ids::CUE_TIME, cue.time);
                put_master(point, ids::CUE_TRACK_POSITIONS, |pos| {
                    put_uint(pos, ids::CUE_TRACK, cue.track);
                    put_uint_fixed(pos, ids::CUE_CLUSTER_POSITION, base + cue.body_offset, POSITION_WIDTH);
                });
            });
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::encode::{put_str, put_unknown_master, simple_block};

    fn capture(clusters: &[(u64, &[(i16, bool)])]) -> Vec<u8> {
        let mut out = Vec::new();
        put_master(&mut out, ids::EBML, |b| {
            put_uint(b, ids::EBML_VERSION, 1);
            put_str(b, ids::DOC_TYPE, "webm");
        });
        put_unknown_master(&mut out, ids::SEGMENT);
        put_master(&mut out, ids::INFO, |b| {
            put_uint(b, ids::TIMECODE_SCALE, 1_000_000);
            put_str(b, ids::MUXING_APP, "live");
        });
        put_master(&mut out, ids::TRACKS, |b| {
            put_master(b, ids::TRACK_ENTRY, |t| {
                put_uint(t, ids::TRACK_NUMBER, 1);
                put_uint(t, ids::TRACK_TYPE, 1);
                put_str(t, ids::CODEC_ID, "V_VP8");
            });
        });
        for &(tc, blocks) in clusters {
            put_unknown_master(&mut out, ids::CLUSTER);
            put_uint(&mut out, ids::TIMECODE, tc);
            for &(rel, key) in blocks {
                put_element(&mut out, ids::SIMPLE_BLOCK, &simple_block(1, rel, key, &[0x5A; 24]));
            }
        }
        out
    }

    fn three_clusters() -> Vec<u8> {
        let blocks: &[(i16, bool)] = &[(0, true), (500, false)];
        capture(&[(0, blocks), (1000, blocks), (2000, blocks)])
    }

    fn first(elems: &[Element], id: u32) -> Element {
        *elems.iter().find(|e| e.id == id).unwrap()
    }

    #[test]
    fn payload_is_untouched() {
        let raw = three_clusters();
        let fixed = make_seekable(&raw).unwrap();
        assert_eq!(fixed.payload(), &raw[fixed.original_metadata_len..]);
        assert_eq!(&fixed.payload()[..4], &[0x1F, 0x43, 0xB6, 0x75]);
        assert_eq!(fixed.cues, 3);
        assert_eq!(fixed.duration_ms, 2500.0);
    }

    #[test]
    fn positions_point_at_their_targets() {
        let fixed = make_seekable(&three_clusters()).unwrap();
        let buf = &fixed.bytes;
        let elems = decode::decode(buf).unwrap();
        let base = first(&elems, ids::SEGMENT).data_start();

        let cluster_positions: Vec<u64> = elems
            .iter()
            .filter(|e| e.id == ids::CUE_CLUSTER_POSITION)
            .map(|e| decode::read_uint(e, buf).unwrap())
            .collect();
        assert_eq!(cluster_positions.len(), 3);
        for pos in cluster_positions {
            let at = base + pos as usize;
            assert_eq!(&buf[at..at + 4], &[0x1F, 0x43, 0xB6, 0x75]);
        }

        let seek_positions: Vec<u64> = elems
            .iter()
            .filter(|e| e.id == ids::SEEK_POSITION)
            .map(|e| decode::read_uint(e, buf).unwrap())
            .collect();
        let info_at = base + seek_positions[0] as usize;
        assert_eq!(&buf[info_at..info_at + 4], &[0x15, 0x49, 0xA9, 0x66]);

        let duration = first(&elems, ids::DURATION);
        assert_eq!(decode::read_float(&duration, buf).unwrap(), 2500.0);
    }

    #[test]
    fn repairing_twice_is_stable() {
        let once = make_seekable(&three_clusters()).unwrap();
        let twice = make_seekable(&once.bytes).unwrap();
        assert_eq!(once.bytes, twice.bytes);
        assert!(inspect(&once.bytes).unwrap().seekable);
    }

    #[test]
    fn no_clusters_means_no_cues() {
        let raw = capture(&[]);
        let fixed = make_seekable(&raw).unwrap();
        assert_eq!(fixed.cues, 0);
        assert_eq!(fixed.duration_ms, 0.0);
        assert!(fixed.payload().is_empty());
        let elems = decode::decode(&fixed.bytes).unwrap();
        assert!(elems.iter().all(|e| e.id != ids::CUES));
    }

    #[test]
    fn only_keyframes_open_cues() {
        let raw = capture(&[(0, &[(0, false), (40, true)]), (1000, &[(0, false)])]);
        let summary = inspect(&raw).unwrap();
        assert_eq!(summary.cue_points, 1);
        assert_eq!(summary.clusters, 2);
        assert_eq!(summary.blocks, 3);
        assert!(!summary.seekable);
    }

    #[test]
    fn rejects_garbage() {
        let err = make_seekable(&[0u8; 35]).unwrap_err();
        assert!(matches!(err, RepairError::MalformedContainer { offset: 0, .. }));
    }

    #[test]
    fn truncated_block_is_reported_with_offset() {
        let raw = three_clusters();
        let cut = &raw[..raw.len() - 10];
        match make_seekable(cut) {
            Err(RepairError::MalformedContainer { offset, .. }) => assert!(offset > 0 && offset < cut.len()),
            Ok(_) => panic!("truncated capture repaired"),
        }
    }

    #[test]
    fn cluster_timecode_beyond_i64_is_malformed() {
        let raw = capture(&[(u64::MAX, &[(0, true)])]);
        assert!(matches!(
            make_seekable(&raw),
            Err(RepairError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn block_timestamp_overflow_is_malformed() {
        let raw = capture(&[(i64::MAX as u64, &[(5, true)])]);
        assert!(matches!(inspect(&raw), Err(RepairError::MalformedContainer { .. })));
    }

    #[test]
    fn timestamp_span_overflow_is_malformed() {
        let raw = capture(&[(0, &[(-5, true)]), (i64::MAX as u64, &[(0, true)])]);
        assert!(matches!(
            make_seekable(&raw),
            Err(RepairError::MalformedContainer { .. })
        ));
    }

    #[test]
    fn largest_cluster_timecode_still_repairs() {
        let raw = capture(&[(i64::MAX as u64, &[(-10, true), (0, false)])]);
        let fixed = make_seekable(&raw).unwrap();
        assert_eq!(fixed.cues, 1);
        assert_eq!(fixed.duration_ms, 10.0);
    }
}
