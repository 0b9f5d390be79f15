mod common;

use capstash_core::container::encode::{put_element, put_uint, put_unknown_master, simple_block};
use capstash_core::container::{self, decode, schema::ids};
use capstash_core::{ExportError, Seekability};

#[test]
fn export_repairs_live_capture() {
    let (stash, clock) = common::memory_stash(1_700_000_000_000);
    stash.create("rec").unwrap();
    let webm = common::live_webm(5);
    for chunk in common::chunks(&webm, 256) {
        clock.advance(100);
        stash.append("rec", &chunk).unwrap();
    }

    let out = stash.export("rec").unwrap();
    assert!(!out.is_degraded());
    assert_eq!(out.seekable, Seekability::Repaired { duration_ms: 4500.0, cues: 5 });

    let summary = container::inspect(&webm).unwrap();
    assert!(out.bytes.ends_with(&webm[summary.metadata_size..]));

    let elems = decode::decode(&out.bytes).unwrap();
    let segment = elems.iter().find(|e| e.id == ids::SEGMENT).unwrap();
    let base = segment.data_start();
    let positions: Vec<usize> = elems
        .iter()
        .filter(|e| e.id == ids::CUE_CLUSTER_POSITION)
        .map(|e| decode::read_uint(e, &out.bytes).unwrap() as usize)
        .collect();
    assert_eq!(positions.len(), 5);
    for pos in positions {
        assert_eq!(&out.bytes[base + pos..base + pos + 4], &common::CLUSTER_ID[..]);
    }
    assert!(elems.iter().any(|e| e.id == ids::DURATION));

    let rec = stash.get("rec").unwrap().unwrap();
    assert!(rec.save_at.is_some());
}

#[test]
fn export_does_not_modify_stored_fragments() {
    let (stash, _) = common::memory_stash(1_000);
    stash.create("rec").unwrap();
    let webm = common::live_webm(2);
    stash.append("rec", &webm).unwrap();
    stash.export("rec").unwrap();
    assert_eq!(stash.concatenate("rec").unwrap(), webm);
}

#[test]
fn unparseable_recording_exports_degraded() {
    let (stash, clock) = common::memory_stash(1_000);
    stash.create("1000--abc").unwrap();
    for len in [10usize, 20, 5] {
        clock.advance(1);
        stash.append("1000--abc", &vec![0u8; len]).unwrap();
    }
    let rec = stash.get("1000--abc").unwrap().unwrap();
    assert_eq!(rec.size, 35);
    assert_eq!(rec.finish_at, Some(1_003));

    let out = stash.export("1000--abc").unwrap();
    assert!(out.is_degraded());
    assert_eq!(out.bytes, vec![0u8; 35]);
    assert!(out.repair_error.is_some());

    assert!(matches!(
        stash.export_strict("1000--abc"),
        Err(ExportError::RepairFailed(_))
    ));
}

#[test]
fn overflowing_timestamps_export_degraded() {
    let (stash, _) = common::memory_stash(1_000);
    let mut webm = common::live_webm(1);
    put_unknown_master(&mut webm, ids::CLUSTER);
    put_uint(&mut webm, ids::TIMECODE, i64::MAX as u64);
    put_element(&mut webm, ids::SIMPLE_BLOCK, &simple_block(1, 5, true, &[0x22; 40]));
    stash.create("rec").unwrap();
    for chunk in common::chunks(&webm, 128) {
        stash.append("rec", &chunk).unwrap();
    }

    let out = stash.export("rec").unwrap();
    assert!(out.is_degraded());
    assert_eq!(out.bytes, webm);
    assert!(matches!(stash.export_strict("rec"), Err(ExportError::RepairFailed(_))));
}

#[test]
fn export_of_unknown_recording_fails() {
    let (stash, _) = common::memory_stash(1_000);
    assert!(matches!(stash.export("missing"), Err(ExportError::NotFound(id)) if id == "missing"));
}

#[test]
fn save_time_is_stamped_once() {
    let (stash, clock) = common::memory_stash(1_000);
    stash.create("rec").unwrap();
    stash.append("rec", &common::live_webm(1)).unwrap();
    clock.set(2_000);
    stash.export("rec").unwrap();
    clock.set(3_000);
    stash.export("rec").unwrap();
    assert_eq!(stash.get("rec").unwrap().unwrap().save_at, Some(2_000));
}

#[test]
fn file_name_follows_pattern() {
    // 2024-03-05 14:07 UTC
    let (stash, _) = common::memory_stash(1_709_647_620_000);
    stash.create("rec").unwrap();
    stash.append("rec", &common::live_webm(1)).unwrap();
    let out = stash.export("rec").unwrap();
    assert_eq!(out.file_name, "202403050207_sample.webm");
}

#[test]
fn list_is_newest_first() {
    let (stash, clock) = common::memory_stash(0);
    for (id, at) in [("b", 200), ("a", 100), ("c", 300)] {
        stash.create(id).unwrap();
        clock.set(at);
        stash.append(id, b"x").unwrap();
    }
    stash.create("fresh").unwrap();
    let ids: Vec<_> = stash.list().unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(ids, ["c", "b", "a", "fresh"]);
}
