#![allow(dead_code)]

use std::sync::Arc;

use capstash_core::container::encode::{
    put_element, put_master, put_str, put_uint, put_unknown_master, simple_block,
};
use capstash_core::container::schema::ids;
use capstash_core::{ManualClock, Stash, StashConfig};

pub const CLUSTER_ID: [u8; 4] = [0x1F, 0x43, 0xB6, 0x75];

/// Live-muxer style capture: unknown-size Segment and Clusters, no Duration,
/// no Cues. Each cluster holds a keyframe at +0 and a delta frame at +500.
pub fn live_webm(clusters: u64) -> Vec<u8> {
    let mut out = Vec::new();
    put_master(&mut out, ids::EBML, |b| {
        put_uint(b, ids::EBML_VERSION, 1);
        put_str(b, ids::DOC_TYPE, "webm");
    });
    put_unknown_master(&mut out, ids::SEGMENT);
    put_master(&mut out, ids::INFO, |b| {
        put_uint(b, ids::TIMECODE_SCALE, 1_000_000);
        put_str(b, ids::WRITING_APP, "capture");
    });
    put_master(&mut out, ids::TRACKS, |b| {
        put_master(b, ids::TRACK_ENTRY, |t| {
            put_uint(t, ids::TRACK_NUMBER, 1);
            put_uint(t, ids::TRACK_TYPE, 1);
            put_str(t, ids::CODEC_ID, "V_VP9");
        });
    });
    for i in 0..clusters {
        put_unknown_master(&mut out, ids::CLUSTER);
        put_uint(&mut out, ids::TIMECODE, i * 1000);
        put_element(&mut out, ids::SIMPLE_BLOCK, &simple_block(1, 0, true, &[i as u8; 300]));
        put_element(&mut out, ids::SIMPLE_BLOCK, &simple_block(1, 500, false, &[0x11; 120]));
    }
    out
}

/// Split like a recorder's timeslice callback would.
pub fn chunks(bytes: &[u8], size: usize) -> Vec<Vec<u8>> {
    bytes.chunks(size).map(<[u8]>::to_vec).collect()
}

pub fn memory_stash(now: i64) -> (Stash, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(now));
    let cfg = StashConfig {
        sweep_on_open: false,
        ..StashConfig::default()
    };
    (Stash::in_memory(cfg, clock.clone()), clock)
}
