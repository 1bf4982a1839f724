//! Several connections hammering one database file, the way separate
//! server processes would.

use std::collections::BTreeSet;
use std::path::Path;
use std::thread;

use dream_core::{Config, DreamEngine, DreamText, Quadrant};
use dream_store::Store;

fn submit_until_stored(db: &Path, user: &str, text: &str) {
    let store = Store::open(db).unwrap();
    let engine = DreamEngine::new(&Config::default(), store).unwrap();
    let dream = DreamText::new(text).unwrap();
    loop {
        match engine.submit(user, &dream) {
            Ok(_) => return,
            Err(e) if e.is_conflict() => continue,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}

#[test]
fn concurrent_connections_lose_no_updates() {
    const THREADS: usize = 4;
    const PER_THREAD: usize = 10;

    let tmp = tempfile::tempdir().unwrap();
    let db = tmp.path().join("dreams.db");
    // Create the schema up front so threads do not race on it.
    Store::open(&db).unwrap();

    thread::scope(|s| {
        for t in 0..THREADS {
            let db = db.as_path();
            s.spawn(move || {
                let text = if t % 2 == 0 {
                    "flying joyfully over a bright city"
                } else {
                    "sat frozen in a dark empty room"
                };
                for _ in 0..PER_THREAD {
                    // One connection per operation.
                    submit_until_stored(db, "shared", text);
                }
            });
        }
    });

    let total = (THREADS * PER_THREAD) as u64;
    let store = Store::open(&db).unwrap();
    let agg = store.load_aggregate("shared").unwrap().unwrap();
    agg.validate().unwrap();
    assert_eq!(agg.dream_count, total);
    assert_eq!(agg.version, total);
    assert_eq!(agg.quadrant_counts.count(Quadrant::UpperDynamic), total / 2);
    assert_eq!(agg.quadrant_counts.count(Quadrant::DownerStatic), total / 2);

    let sequences: BTreeSet<u64> = store
        .user_dreams("shared", None)
        .unwrap()
        .iter()
        .map(|r| r.sequence)
        .collect();
    assert_eq!(sequences, (1..=total).collect());
}

#[test]
fn reopened_store_keeps_state() {
    let tmp = tempfile::tempdir().unwrap();
    let db = tmp.path().join("dreams.db");
    submit_until_stored(&db, "u", "running through the rain");
    submit_until_stored(&db, "u", "sitting very still");

    let engine = DreamEngine::new(&Config::default(), Store::open(&db).unwrap()).unwrap();
    let stats = engine.stats("u").unwrap();
    assert_eq!(stats.total_dreams, 2);
    assert_eq!(engine.store().user_dreams("u", None).unwrap().len(), 2);
}

#[test]
fn snapshot_reads_ignore_concurrent_commits() {
    let tmp = tempfile::tempdir().unwrap();
    let db = tmp.path().join("dreams.db");
    submit_until_stored(&db, "u", "flying joyfully over a bright city");

    let reader = Store::open(&db).unwrap();
    let (count, latest) = reader
        .read_snapshot(|| {
            let agg = reader.load_aggregate("u")?.unwrap();
            // Another connection commits dream #2 between the two reads.
            submit_until_stored(&db, "u", "sat frozen in a dark empty room");
            let latest = reader.latest_dream("u")?.unwrap();
            Ok::<_, dream_store::StoreError>((agg.dream_count, latest))
        })
        .unwrap();
    assert_eq!(count, 1);
    assert_eq!(latest.sequence, 1);

    // Outside the snapshot the new dream is visible.
    assert_eq!(reader.latest_dream("u").unwrap().unwrap().sequence, 2);
}
