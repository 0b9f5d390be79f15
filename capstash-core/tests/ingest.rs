mod common;

use std::sync::Arc;

use capstash_core::{Ingestor, RegistryError, StoreError};

#[test]
fn chunks_land_in_push_order() {
    let (stash, _) = common::memory_stash(1_000);
    let stash = Arc::new(stash);
    stash.create("live").unwrap();

    let webm = common::live_webm(6);
    let ingest = Ingestor::spawn(stash.clone(), "live").unwrap();
    for chunk in common::chunks(&webm, 64) {
        ingest.push(chunk).unwrap();
    }
    ingest.push(Vec::new()).unwrap();
    let totals = ingest.finish().unwrap();

    assert_eq!(totals.chunks, webm.len().div_ceil(64) as u64);
    assert_eq!(totals.bytes, webm.len() as u64);
    assert_eq!(totals.size, webm.len() as u64);
    assert_eq!(stash.concatenate("live").unwrap(), webm);
    assert!(!stash.export("live").unwrap().is_degraded());
}

#[test]
fn pushes_from_another_thread_reach_the_worker() {
    let (stash, _) = common::memory_stash(1_000);
    let stash = Arc::new(stash);
    stash.create("live").unwrap();

    let ingest = Ingestor::spawn(stash.clone(), "live").unwrap();
    std::thread::scope(|s| {
        s.spawn(|| {
            for i in 0..50u8 {
                ingest.push(vec![i]).unwrap();
            }
        });
    });
    let totals = ingest.finish().unwrap();
    assert_eq!(totals.chunks, 50);
    assert_eq!(stash.concatenate("live").unwrap(), (0..50u8).collect::<Vec<_>>());
}

#[test]
fn missing_recording_stops_the_worker() {
    let (stash, _) = common::memory_stash(1_000);
    let ingest = Ingestor::spawn(Arc::new(stash), "nobody").unwrap();
    ingest.push(b"first".to_vec()).unwrap();

    // Once the worker has failed, pushes are refused.
    let mut closed = false;
    for _ in 0..1000 {
        if let Err(StoreError::Closed) = ingest.push(b"more".to_vec()) {
            closed = true;
            break;
        }
        std::thread::sleep(std::time::Duration::from_millis(1));
    }
    assert!(closed);
    assert!(matches!(ingest.finish(), Err(RegistryError::NotFound(_))));
}
