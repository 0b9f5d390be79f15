mod common;

use capstash_core::retention::{MS_PER_DAY, cutoff_for};
use capstash_core::SweepReport;

const NOW: i64 = 1_750_000_000_000;

#[test]
fn cutoff_boundary_is_inclusive() {
    let (stash, clock) = common::memory_stash(0);
    let cutoff = 10_000;
    for (id, at) in [("before", cutoff - 1), ("at", cutoff), ("after", cutoff + 1)] {
        stash.create(id).unwrap();
        clock.set(at);
        stash.append(id, b"payload").unwrap();
    }

    let report = stash.sweep_at(cutoff).unwrap();
    assert_eq!(report, SweepReport { deleted: 2, orphans_reclaimed: 0 });

    let left: Vec<_> = stash.list().unwrap().into_iter().map(|r| r.id).collect();
    assert_eq!(left, ["after"]);
    assert!(stash.concatenate("before").unwrap().is_empty());
    assert!(stash.concatenate("at").unwrap().is_empty());
    assert_eq!(stash.concatenate("after").unwrap(), b"payload");
}

#[test]
fn thirty_day_window() {
    let (stash, clock) = common::memory_stash(0);
    for (id, age_days) in [("old", 31), ("edge", 30), ("recent", 29)] {
        stash.create(id).unwrap();
        clock.set(NOW - age_days * MS_PER_DAY);
        stash.append(id, b"frame").unwrap();
    }
    clock.set(NOW);

    let report = stash.sweep(30).unwrap();
    assert_eq!(report.deleted, 2);
    assert!(stash.get("old").unwrap().is_none());
    assert!(stash.get("edge").unwrap().is_none());
    assert!(stash.get("recent").unwrap().is_some());
    assert_eq!(stash.stats().unwrap().fragments, 1);
}

#[test]
fn unfinished_recordings_are_never_swept() {
    let (stash, clock) = common::memory_stash(0);
    stash.create("idle").unwrap();
    clock.set(NOW);
    assert_eq!(stash.sweep(0).unwrap().deleted, 0);
    assert!(stash.get("idle").unwrap().is_some());
}

#[test]
fn orphaned_fragments_are_reclaimed() {
    let (stash, _) = common::memory_stash(NOW);
    stash.fragments().append("ghost", b"left behind").unwrap();
    assert_eq!(stash.stats().unwrap().orphaned_recordings, 1);

    let report = stash.sweep(30).unwrap();
    assert_eq!(report.orphans_reclaimed, 1);
    let stats = stash.stats().unwrap();
    assert_eq!(stats.fragments, 0);
    assert_eq!(stats.orphaned_recordings, 0);
}

#[test]
fn sweeping_twice_finds_nothing_new() {
    let (stash, clock) = common::memory_stash(0);
    stash.create("rec").unwrap();
    clock.set(1);
    stash.append("rec", b"x").unwrap();
    clock.set(NOW);
    assert_eq!(stash.sweep(1).unwrap().deleted, 1);
    assert_eq!(stash.sweep(1).unwrap(), SweepReport::default());
}

#[test]
fn cutoff_counts_whole_days() {
    assert_eq!(cutoff_for(NOW, 30), NOW - 30 * 86_400_000);
    assert_eq!(cutoff_for(NOW, 0), NOW);
}
