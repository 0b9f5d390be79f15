use super::decode::{self, BlockHeader, Element};
use super::schema::ids;
use crate::error::RepairError;

pub const DEFAULT_TIMECODE_SCALE: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackKind {
    Video,
    Audio,
    Other(u64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub number: u64,
    pub kind: TrackKind,
    pub codec: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuePoint {
    /// Presentation time in timecode ticks.
    pub time: u64,
    pub track: u64,
    /// Cluster start, counted from the first byte after the metadata.
    pub body_offset: u64,
}

/// What a single pass over the decoded elements learns about a capture.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub ebml_header: usize,
    pub segment: usize,
    pub info: Option<usize>,
    pub tracks_elem: Option<usize>,
    /// Other pre-cluster Segment children carried over untouched.
    pub keep: Vec<usize>,
    /// Bytes before the first Cluster; everything after is payload.
    pub metadata_size: usize,
    pub timecode_scale: u64,
    pub tracks: Vec<Track>,
    pub first_ts: Option<i64>,
    pub last_ts: Option<i64>,
    pub cues: Vec<CuePoint>,
    pub clusters: usize,
    pub blocks: usize,
    pub had_duration: bool,
    pub had_cues: bool,
}

impl Layout {
    pub fn duration_ticks(&self) -> f64 {
        match (self.first_ts, self.last_ts) {
            (Some(first), Some(last)) => last.saturating_sub(first) as f64,
            _ => 0.0,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration_ticks() * self.timecode_scale as f64 / 1_000_000.0
    }
}

/// Summary reported by `inspect`.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerSummary {
    pub metadata_size: usize,
    pub timecode_scale: u64,
    pub duration_ms: f64,
    pub tracks: Vec<Track>,
    pub clusters: usize,
    pub blocks: usize,
    pub cue_points: usize,
    /// Whether the metadata already declared a duration and a cue index.
    pub seekable: bool,
}

impl From<&Layout> for ContainerSummary {
    fn from(l: &Layout) -> Self {
        Self {
            metadata_size: l.metadata_size,
            timecode_scale: l.timecode_scale,
            duration_ms: l.duration_ms(),
            tracks: l.tracks.clone(),
            clusters: l.clusters,
            blocks: l.blocks,
            cue_points: l.cues.len(),
            seekable: l.had_duration && l.had_cues,
        }
    }
}

struct PendingGroup {
    depth: usize,
    block: Option<(i64, u64)>,
    referenced: bool,
}

struct Walker {
    cue_track: Option<u64>,
    cluster_off: usize,
    cluster_tc: i64,
    cue_taken: bool,
}

pub fn scan(buf: &[u8], elems: &[Element]) -> Result<Layout, RepairError> {
    let mut layout = Layout {
        timecode_scale: DEFAULT_TIMECODE_SCALE,
        ..Default::default()
    };

    match elems.first() {
        Some(e) if e.id == ids::EBML && e.depth == 0 => layout.ebml_header = 0,
        _ => return Err(RepairError::malformed(0, "missing EBML header")),
    }
    layout.segment = elems
        .iter()
        .position(|e| e.id == ids::SEGMENT && e.depth == 0)
        .ok_or_else(|| RepairError::malformed(elems[0].end, "no Segment element"))?;
    let segment = elems[layout.segment];

    let mut first_cluster = None;
    for c in decode::children(elems, layout.segment) {
        let e = elems[c];
        match e.id {
            ids::CLUSTER => {
                if first_cluster.is_none() {
                    first_cluster = Some(c);
                }
            }
            ids::CUES => layout.had_cues = true,
            _ if first_cluster.is_some() => {}
            ids::INFO => layout.info = Some(c),
            ids::TRACKS => layout.tracks_elem = Some(c),
            ids::SEEK_HEAD | ids::VOID | ids::CRC32 => {}
            _ => layout.keep.push(c),
        }
    }
    layout.metadata_size = match first_cluster {
        Some(c) => elems[c].offset,
        None => segment.end,
    };

    if let Some(info) = layout.info {
        for c in decode::children(elems, info) {
            match elems[c].id {
                ids::TIMECODE_SCALE => {
                    let scale = decode::read_uint(&elems[c], buf)?;
                    if scale > 0 {
                        layout.timecode_scale = scale;
                    }
                }
                ids::DURATION => layout.had_duration = true,
                _ => {}
            }
        }
    }
    if let Some(tracks) = layout.tracks_elem {
        for entry in decode::children(elems, tracks).filter(|&i| elems[i].id == ids::TRACK_ENTRY) {
            layout.tracks.push(read_track(buf, elems, entry)?);
        }
    }

    let Some(start) = first_cluster else {
        return Ok(layout);
    };

    let mut w = Walker {
        cue_track: layout
            .tracks
            .iter()
            .find(|t| t.kind == TrackKind::Video)
            .or(layout.tracks.first())
            .map(|t| t.number),
        cluster_off: elems[start].offset,
        cluster_tc: 0,
        cue_taken: false,
    };
    let mut group: Option<PendingGroup> = None;
    let mut cluster_depth = elems[start].depth;

    for e in elems[start..].iter().take_while(|e| e.offset < segment.end) {
        if let Some(g) = group.take_if(|g| e.depth <= g.depth) {
            if let Some((ts, track)) = g.block {
                note_block(&mut layout, &mut w, ts, track, !g.referenced);
            }
        }
        match e.id {
            ids::CLUSTER => {
                layout.clusters += 1;
                cluster_depth = e.depth;
                w.cluster_off = e.offset;
                w.cluster_tc = 0;
                w.cue_taken = false;
            }
            ids::TIMECODE if e.depth == cluster_depth + 1 => {
                w.cluster_tc = i64::try_from(decode::read_uint(e, buf)?)
                    .map_err(|_| RepairError::malformed(e.offset, "cluster timecode out of range"))?;
            }
            ids::SIMPLE_BLOCK => {
                let h = BlockHeader::parse(e, buf)?;
                let ts = block_time(&w, e, h.timecode)?;
                note_block(&mut layout, &mut w, ts, h.track, h.keyframe());
            }
            ids::BLOCK_GROUP => {
                group = Some(PendingGroup {
                    depth: e.depth,
                    block: None,
                    referenced: false,
                });
            }
            ids::BLOCK => {
                let h = BlockHeader::parse(e, buf)?;
                if let Some(g) = group.as_mut() {
                    g.block = Some((block_time(&w, e, h.timecode)?, h.track));
                }
            }
            ids::REFERENCE_BLOCK => {
                if let Some(g) = group.as_mut() {
                    g.referenced = true;
                }
            }
            _ => {}
        }
    }
    if let Some(PendingGroup {
        block: Some((ts, track)),
        referenced,
        ..
    }) = group
    {
        note_block(&mut layout, &mut w, ts, track, !referenced);
    }
    if let (Some(first), Some(last)) = (layout.first_ts, layout.last_ts) {
        if last.checked_sub(first).is_none() {
            return Err(RepairError::malformed(elems[start].offset, "timestamp span out of range"));
        }
    }

    Ok(layout)
}

fn block_time(w: &Walker, e: &Element, relative: i16) -> Result<i64, RepairError> {
    w.cluster_tc
        .checked_add(i64::from(relative))
        .ok_or_else(|| RepairError::malformed(e.offset, "block timestamp out of range"))
}

fn note_block(layout: &mut Layout, w: &mut Walker, ts: i64, track: u64, keyframe: bool) {
    layout.blocks += 1;
    layout.first_ts = Some(layout.first_ts.map_or(ts, |f| f.min(ts)));
    layout.last_ts = Some(layout.last_ts.map_or(ts, |l| l.max(ts)));

    if !keyframe || w.cue_taken {
        return;
    }
    let cue_track = *w.cue_track.get_or_insert(track);
    if track != cue_track {
        return;
    }
    layout.cues.push(CuePoint {
        time: ts.max(0) as u64,
        track,
        body_offset: (w.cluster_off - layout.metadata_size) as u64,
    });
    w.cue_taken = true;
}

fn read_track(buf: &[u8], elems: &[Element], entry: usize) -> Result<Track, RepairError> {
    let mut track = Track {
        number: 0,
        kind: TrackKind::Other(0),
        codec: String::new(),
    };
    for c in decode::children(elems, entry) {
        let e = &elems[c];
        match e.id {
            ids::TRACK_NUMBER => track.number = decode::read_uint(e, buf)?,
            ids::TRACK_TYPE => {
                track.kind = match decode::read_uint(e, buf)? {
                    1 => TrackKind::Video,
                    2 => TrackKind::Audio,
                    n => TrackKind::Other(n),
                }
            }
            ids::CODEC_ID => track.codec = decode::read_string(e, buf),
            _ => {}
        }
    }
    Ok(track)
}
