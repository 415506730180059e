use loc_core::location::{ClosureEntry, Location};
use loc_storage::{CreateLocationRequest, MoveLocationRequest, SqliteStore, StoreError};
use rusqlite::{Connection, params};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

fn temp_dir(test_name: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let nonce = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let dir = base.join(format!("loc_storage_{test_name}_{pid}_{nonce}"));
    std::fs::create_dir_all(&dir).expect("create temp dir");
    dir
}

fn create(store: &mut SqliteStore, number: &str, parent: Option<&Location>) -> Location {
    store
        .create_location(CreateLocationRequest {
            building: "C".to_string(),
            name: format!("Location {number}"),
            number: number.to_string(),
            area: 5.5,
            parent_id: parent.map(|location| location.id.clone()),
        })
        .expect("create location")
}

fn closure_rows(store: &SqliteStore) -> usize {
    let conn = Connection::open(store.db_path()).expect("open db");
    conn.query_row("SELECT COUNT(*) FROM location_closure", [], |row| {
        row.get::<_, i64>(0)
    })
    .expect("count closure rows") as usize
}

fn closure_dump(store: &SqliteStore) -> Vec<(String, String, i64)> {
    let conn = Connection::open(store.db_path()).expect("open db");
    let mut stmt = conn
        .prepare(
            "SELECT ancestor_id, descendant_id, depth FROM location_closure \
             ORDER BY ancestor_id, descendant_id",
        )
        .expect("prepare closure dump");
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .expect("dump closure")
        .collect::<Result<Vec<_>, _>>()
        .expect("decode closure")
}

#[test]
fn closure_stays_consistent_through_ordinary_operations() {
    let mut store = SqliteStore::open(temp_dir("consistent")).expect("open store");
    let a = create(&mut store, "C", None);
    let b = create(&mut store, "C-1", Some(&a));
    let c = create(&mut store, "C-1-1", Some(&b));
    let d = create(&mut store, "C-2", Some(&a));
    store
        .move_location(MoveLocationRequest {
            id: b.id.clone(),
            new_parent_id: Some(d.id.clone()),
        })
        .expect("move C-1 under C-2");
    store
        .move_location(MoveLocationRequest {
            id: c.id.clone(),
            new_parent_id: None,
        })
        .expect("detach C-1-1");

    let report = store.verify_closure().expect("verify");
    assert!(report.is_consistent(), "{report:?}");
    assert_eq!(report.nodes, 4);
    // C->C-2, C->C-1, C-2->C-1
    assert_eq!(report.entries, 3);
}

#[test]
fn drift_is_reported_and_repaired_by_rebuild() {
    let mut store = SqliteStore::open(temp_dir("drift")).expect("open store");
    let a = create(&mut store, "C", None);
    let b = create(&mut store, "C-1", Some(&a));
    let c = create(&mut store, "C-1-1", Some(&b));
    let other = create(&mut store, "D", None);

    {
        let conn = Connection::open(store.db_path()).expect("open db");
        conn.execute(
            "DELETE FROM location_closure WHERE ancestor_id=?1 AND descendant_id=?2",
            params![a.id, c.id],
        )
        .expect("drop a closure row");
        conn.execute(
            "INSERT INTO location_closure(ancestor_id, descendant_id, depth) VALUES (?1, ?2, 1)",
            params![other.id, c.id],
        )
        .expect("insert a stale closure row");
    }

    let report = store.verify_closure().expect("verify");
    assert!(!report.is_consistent());
    assert_eq!(
        report.missing,
        vec![ClosureEntry {
            ancestor_id: a.id.clone(),
            descendant_id: c.id.clone(),
            depth: 2,
        }]
    );
    assert_eq!(
        report.stale,
        vec![ClosureEntry {
            ancestor_id: other.id.clone(),
            descendant_id: c.id.clone(),
            depth: 1,
        }]
    );
    assert!(
        !store
            .is_ancestor(&a.id, &c.id)
            .expect("lookup through drifted index")
    );

    let rebuilt = store
        .rebuild_closure(&AtomicBool::new(false))
        .expect("rebuild");
    assert_eq!(rebuilt.nodes, 4);
    assert_eq!(rebuilt.entries, 3);
    assert!(store.verify_closure().expect("verify again").is_consistent());
    assert!(store.is_ancestor(&a.id, &c.id).expect("lookup after rebuild"));
    assert!(!store.is_ancestor(&other.id, &c.id).expect("stale row gone"));
}

#[test]
fn cancelled_rebuild_keeps_previous_closure() {
    let mut store = SqliteStore::open(temp_dir("cancelled")).expect("open store");
    let a = create(&mut store, "C", None);
    let b = create(&mut store, "C-1", Some(&a));
    create(&mut store, "C-1-1", Some(&b));
    let before = closure_rows(&store);

    let cancel = AtomicBool::new(true);
    let err = store.rebuild_closure(&cancel).expect_err("rebuild must stop");
    assert!(matches!(err, StoreError::Cancelled));

    assert_eq!(closure_rows(&store), before);
    assert!(store.verify_closure().expect("verify").is_consistent());
}

#[test]
fn rebuild_cancelled_midway_rolls_back_partial_rewrite() {
    let mut store = SqliteStore::open(temp_dir("cancel_midway")).expect("open store");
    let a = create(&mut store, "C", None);
    let b = create(&mut store, "C-1", Some(&a));
    let c = create(&mut store, "C-1-1", Some(&b));
    create(&mut store, "C-1-1-1", Some(&c));
    create(&mut store, "C-2", Some(&a));
    let d = create(&mut store, "D", None);
    create(&mut store, "D-1", Some(&d));
    let before = closure_dump(&store);

    let cancel = AtomicBool::new(false);
    let mut seen = 0usize;
    let err = store
        .rebuild_closure_with_progress(&cancel, |relinked| {
            seen = relinked;
            if relinked == 3 {
                cancel.store(true, Ordering::Relaxed);
            }
        })
        .expect_err("rebuild must stop once cancelled");
    assert!(matches!(err, StoreError::Cancelled));
    assert_eq!(seen, 3, "three locations were relinked before the flag was seen");

    assert_eq!(closure_dump(&store), before);
    assert!(store.verify_closure().expect("verify").is_consistent());

    cancel.store(false, Ordering::Relaxed);
    let mut total = 0usize;
    let report = store
        .rebuild_closure_with_progress(&cancel, |relinked| total = relinked)
        .expect("rerun after cancel");
    assert_eq!(total, 7);
    assert_eq!(report.nodes, 7);
    assert_eq!(closure_dump(&store), before);
}

#[test]
fn parent_cycle_written_behind_the_store_is_corruption() {
    let mut store = SqliteStore::open(temp_dir("cycle")).expect("open store");
    let a = create(&mut store, "C", None);
    let b = create(&mut store, "C-1", Some(&a));
    create(&mut store, "D", None);

    {
        let conn = Connection::open(store.db_path()).expect("open db");
        conn.execute(
            "UPDATE locations SET parent_id=?1 WHERE id=?2",
            params![b.id, a.id],
        )
        .expect("close the loop");
    }

    let err = store.verify_closure().expect_err("verify must detect the cycle");
    assert_eq!(err.code(), "CORRUPT_HIERARCHY");

    let err = store
        .rebuild_closure(&AtomicBool::new(false))
        .expect_err("rebuild must refuse a cyclic hierarchy");
    assert!(matches!(err, StoreError::CorruptHierarchy(_)));
    assert!(store.is_ancestor(&a.id, &b.id).expect("old closure kept"));
}
