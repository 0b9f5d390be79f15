mod common;

use std::io::Read;

use capstash_core::storage::{Database, MemoryBackend};
use capstash_core::{ManualClock, RegistryError, Stash, StashConfig, StoreError};
use std::sync::Arc;

#[test]
fn concatenation_preserves_write_order() {
    let (stash, _) = common::memory_stash(1_000);
    stash.create("none").unwrap();
    assert!(stash.concatenate("none").unwrap().is_empty());

    stash.create("one").unwrap();
    stash.append("one", b"solo").unwrap();
    assert_eq!(stash.concatenate("one").unwrap(), b"solo");

    stash.create("many").unwrap();
    for part in [&b"alpha-"[..], b"beta-", b"gamma-", b"delta"] {
        stash.append("many", part).unwrap();
    }
    assert_eq!(stash.concatenate("many").unwrap(), b"alpha-beta-gamma-delta");
}

#[test]
fn interleaved_recordings_do_not_mix() {
    let (stash, _) = common::memory_stash(1_000);
    stash.create("a").unwrap();
    stash.create("b").unwrap();
    for i in 0..10u8 {
        stash.append("a", &[b'a', i]).unwrap();
        stash.append("b", &[b'b', i]).unwrap();
    }
    let a = stash.concatenate("a").unwrap();
    assert_eq!(a.len(), 20);
    assert!(a.chunks(2).enumerate().all(|(i, c)| c == [b'a', i as u8]));
}

#[test]
fn size_tracks_appended_bytes() {
    let (stash, clock) = common::memory_stash(5_000);
    stash.create("rec").unwrap();
    let mut total = 0u64;
    for len in [10usize, 0, 4096, 1, 300] {
        clock.advance(250);
        let payload = vec![0x42; len];
        let rec = stash.append("rec", &payload).unwrap();
        total += len as u64;
        assert_eq!(rec.size, total);
        assert_eq!(stash.concatenate("rec").unwrap().len() as u64, rec.size);
    }
    let rec = stash.get("rec").unwrap().unwrap();
    assert_eq!(rec.size, total);
    assert_eq!(rec.finish_at, Some(6_250));
}

#[test]
fn empty_chunk_leaves_recording_untouched() {
    let (stash, clock) = common::memory_stash(100);
    stash.create("rec").unwrap();
    clock.advance(10);
    let rec = stash.append("rec", b"").unwrap();
    assert_eq!(rec.finish_at, None);
    assert!(stash.fragments().fragments("rec").unwrap().is_empty());
}

#[test]
fn append_to_unknown_recording_stores_nothing() {
    let (stash, _) = common::memory_stash(100);
    let err = stash.append("ghost", b"data").unwrap_err();
    assert!(matches!(err, RegistryError::NotFound(id) if id == "ghost"));
    assert_eq!(stash.stats().unwrap().fragments, 0);
}

#[test]
fn compressible_payloads_round_trip() {
    let (stash, _) = common::memory_stash(100);
    stash.create("rec").unwrap();
    let text = b"the quick brown fox jumps over the lazy dog ".repeat(200);
    stash.append("rec", &text).unwrap();
    let stats = stash.stats().unwrap();
    assert!(stats.stored_bytes < stats.logical_bytes);
    assert_eq!(stash.concatenate("rec").unwrap(), text);
}

#[test]
fn reader_streams_every_fragment() {
    let (stash, _) = common::memory_stash(100);
    stash.create("rec").unwrap();
    let webm = common::live_webm(4);
    for chunk in common::chunks(&webm, 97) {
        stash.append("rec", &chunk).unwrap();
    }
    let mut reader = stash.fragments().open_reader("rec").unwrap();
    assert_eq!(reader.len(), webm.len() as u64);
    let mut out = Vec::new();
    reader.read_to_end(&mut out).unwrap();
    assert_eq!(out, webm);
}

#[test]
fn delete_is_idempotent() {
    let (stash, _) = common::memory_stash(100);
    stash.create("rec").unwrap();
    stash.append("rec", b"bytes").unwrap();
    stash.delete("rec").unwrap();
    stash.delete("rec").unwrap();
    stash.delete("never-existed").unwrap();
    assert!(stash.get("rec").unwrap().is_none());
    assert!(stash.concatenate("rec").unwrap().is_empty());
    assert_eq!(stash.stats().unwrap().fragments, 0);
}

#[test]
fn duplicate_create_is_rejected() {
    let (stash, _) = common::memory_stash(100);
    stash.create("rec").unwrap();
    assert!(matches!(stash.create("rec"), Err(RegistryError::DuplicateId(_))));
}

#[test]
fn failed_write_leaves_no_trace() {
    let (backend, faults) = MemoryBackend::with_faults();
    let clock = Arc::new(ManualClock::new(1_000));
    let stash = Stash::with_backend(Box::new(backend), StashConfig::default(), clock);
    stash.create("rec").unwrap();
    stash.append("rec", b"kept").unwrap();

    faults.trip();
    let err = stash.append("rec", b"lost").unwrap_err();
    assert!(matches!(err, RegistryError::Store(StoreError::WriteFailed(_))));
    faults.reset();

    let rec = stash.get("rec").unwrap().unwrap();
    assert_eq!(rec.size, 4);
    assert_eq!(stash.concatenate("rec").unwrap(), b"kept");

    stash.append("rec", b"-more").unwrap();
    assert_eq!(stash.concatenate("rec").unwrap(), b"kept-more");
}

#[test]
fn rolled_back_transaction_stages_nothing() {
    let db = Database::new(Box::new(MemoryBackend::new()), 0.05);
    let res: Result<(), StoreError> = db.transaction(|tx| {
        tx.add_fragment("rec", b"staged")?;
        Err(StoreError::Closed)
    });
    assert!(res.is_err());
    assert_eq!(db.read(|t| t.fragments.len()).unwrap(), 0);
}
