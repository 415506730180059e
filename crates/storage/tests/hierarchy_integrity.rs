use loc_core::location::{Location, ParentChange};
use loc_storage::{
    CreateLocationRequest, DeleteLocationRequest, MoveLocationRequest, SqliteStore, StoreError,
    UpdateLocationRequest,
};
use std::path::PathBuf;

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
            building: "A".to_string(),
            name: format!("Location {number}"),
            number: number.to_string(),
            area: 10.0,
            parent_id: parent.map(|location| location.id.clone()),
        })
        .expect("create location")
}

fn move_to(
    store: &mut SqliteStore,
    location: &Location,
    parent: Option<&Location>,
) -> Result<Location, StoreError> {
    store.move_location(MoveLocationRequest {
        id: location.id.clone(),
        new_parent_id: parent.map(|location| location.id.clone()),
    })
}

fn chain_ids(store: &SqliteStore, location: &Location) -> Vec<String> {
    store
        .ancestor_chain(&location.id)
        .expect("ancestor chain")
        .into_iter()
        .map(|ancestor| ancestor.id)
        .collect()
}

/// A -> B -> C
fn abc(store: &mut SqliteStore) -> (Location, Location, Location) {
    let a = create(store, "A", None);
    let b = create(store, "A-01", Some(&a));
    let c = create(store, "A-01-01", Some(&b));
    (a, b, c)
}

#[test]
fn ancestor_chain_cycle_guard_and_shortening_move() {
    let mut store = SqliteStore::open(temp_dir("scenario_abc")).expect("open store");
    let (a, b, c) = abc(&mut store);

    assert_eq!(chain_ids(&store, &c), vec![b.id.clone(), a.id.clone()]);

    let err = move_to(&mut store, &a, Some(&c)).expect_err("moving A under C must fail");
    assert!(matches!(err, StoreError::CircularReference), "got {err:?}");
    assert!(chain_ids(&store, &a).is_empty(), "failed move must not reparent A");

    let moved = move_to(&mut store, &c, Some(&a)).expect("moving C up to A is legal");
    assert_eq!(moved.parent_id.as_deref(), Some(a.id.as_str()));
    assert_eq!(chain_ids(&store, &c), vec![a.id.clone()]);

    let b_subtree = store.subtree(&b.id).expect("subtree of B");
    assert!(!b_subtree.contains(&c.id), "B must no longer contain C");
    assert_eq!(b_subtree.size(), 1);
    assert_eq!(
        store.ancestors_of(&c.id).expect("ancestors of C"),
        vec![(a.id.clone(), 1)]
    );
}

#[test]
fn delete_is_refused_while_children_exist() {
    let mut store = SqliteStore::open(temp_dir("scenario_delete")).expect("open store");
    let (a, b, c) = abc(&mut store);

    let err = store
        .delete_location(DeleteLocationRequest { id: b.id.clone() })
        .expect_err("deleting B with child C must fail");
    assert_eq!(err.code(), "HAS_CHILDREN");

    move_to(&mut store, &c, Some(&a)).expect("move C to A");
    store
        .delete_location(DeleteLocationRequest { id: b.id.clone() })
        .expect("B is a leaf now");

    let err = store.location_get(&b.id).expect_err("B is gone");
    assert!(matches!(err, StoreError::NodeNotFound));
    let descendants: Vec<String> = store
        .descendants_of(&a.id)
        .expect("descendants of A")
        .into_iter()
        .map(|(id, _)| id)
        .collect();
    assert_eq!(descendants, vec![c.id.clone()]);
}

#[test]
fn delete_removes_node_from_every_ancestor() {
    let mut store = SqliteStore::open(temp_dir("delete_leaf")).expect("open store");
    let (a, b, c) = abc(&mut store);

    store
        .delete_location(DeleteLocationRequest { id: c.id.clone() })
        .expect("C is a leaf");
    for ancestor in [&a, &b] {
        let descendants = store
            .descendants_of(&ancestor.id)
            .expect("descendants");
        assert!(descendants.iter().all(|(id, _)| id != &c.id));
    }

    let err = store
        .delete_location(DeleteLocationRequest { id: c.id.clone() })
        .expect_err("second delete must fail");
    assert!(matches!(err, StoreError::NodeNotFound));
}

#[test]
fn self_parent_is_always_refused() {
    let mut store = SqliteStore::open(temp_dir("self_parent")).expect("open store");
    let (a, b, _) = abc(&mut store);

    for location in [&a, &b] {
        let err = move_to(&mut store, location, Some(location)).expect_err("self parent");
        assert!(matches!(err, StoreError::SelfParent), "got {err:?}");
    }

    let err = store
        .update_location(UpdateLocationRequest {
            id: b.id.clone(),
            parent: ParentChange::Set(b.id.to_uppercase()),
            ..UpdateLocationRequest::default()
        })
        .expect_err("self parent through update");
    assert!(matches!(err, StoreError::SelfParent), "got {err:?}");
}

#[test]
fn missing_nodes_and_parents_are_reported_distinctly() {
    let mut store = SqliteStore::open(temp_dir("missing")).expect("open store");
    let a = create(&mut store, "A", None);
    let ghost = "00000000-0000-4000-8000-000000000000".to_string();

    let err = store
        .create_location(CreateLocationRequest {
            building: "A".to_string(),
            name: "Orphan".to_string(),
            number: "A-99".to_string(),
            area: 1.0,
            parent_id: Some(ghost.clone()),
        })
        .expect_err("unknown parent");
    assert!(matches!(err, StoreError::ParentNotFound));

    let err = store
        .move_location(MoveLocationRequest {
            id: ghost.clone(),
            new_parent_id: Some(a.id.clone()),
        })
        .expect_err("unknown node");
    assert!(matches!(err, StoreError::NodeNotFound));

    let err = store
        .move_location(MoveLocationRequest {
            id: a.id.clone(),
            new_parent_id: Some(ghost.clone()),
        })
        .expect_err("unknown new parent");
    assert!(matches!(err, StoreError::ParentNotFound));

    let err = store.subtree(&ghost).expect_err("unknown subtree root");
    assert!(matches!(err, StoreError::NodeNotFound));

    let err = store.ancestors_of(&ghost).expect_err("ancestors of unknown");
    assert!(matches!(err, StoreError::NodeNotFound));
    let err = store.descendants_of(&ghost).expect_err("descendants of unknown");
    assert!(matches!(err, StoreError::NodeNotFound));
    let err = store.is_ancestor(&a.id, &ghost).expect_err("unknown descendant");
    assert!(matches!(err, StoreError::NodeNotFound));
    let err = store.is_ancestor(&ghost, &a.id).expect_err("unknown ancestor");
    assert!(matches!(err, StoreError::NodeNotFound));

    let err = store.ancestor_chain("not-a-uuid").expect_err("malformed id");
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn duplicate_location_number_is_a_conflict() {
    let mut store = SqliteStore::open(temp_dir("duplicate")).expect("open store");
    let a = create(&mut store, "A", None);
    let b = create(&mut store, "B", None);

    let err = store
        .create_location(CreateLocationRequest {
            building: "A".to_string(),
            name: "Clash".to_string(),
            number: "A".to_string(),
            area: 1.0,
            parent_id: None,
        })
        .expect_err("duplicate number on create");
    assert!(matches!(err, StoreError::DuplicateKey));

    let err = store
        .update_location(UpdateLocationRequest {
            id: b.id.clone(),
            number: Some(a.attributes.number.clone()),
            ..UpdateLocationRequest::default()
        })
        .expect_err("duplicate number on update");
    assert!(matches!(err, StoreError::DuplicateKey));
}

#[test]
fn move_rebuilds_depths_for_the_whole_subtree() {
    let mut store = SqliteStore::open(temp_dir("deep_move")).expect("open store");
    let (a, b, c) = abc(&mut store);
    let d = create(&mut store, "A-01-01-01", Some(&c));
    let x = create(&mut store, "X", None);
    let y = create(&mut store, "X-01", Some(&x));

    move_to(&mut store, &b, Some(&y)).expect("move B under Y");

    let expected_b = {
        let mut out = vec![(y.id.clone(), 1)];
        out.extend(
            store
                .ancestors_of(&y.id)
                .expect("ancestors of Y")
                .into_iter()
                .map(|(id, depth)| (id, depth + 1)),
        );
        out
    };
    assert_eq!(store.ancestors_of(&b.id).expect("ancestors of B"), expected_b);
    assert_eq!(
        store.ancestors_of(&d.id).expect("ancestors of D"),
        vec![
            (c.id.clone(), 1),
            (b.id.clone(), 2),
            (y.id.clone(), 3),
            (x.id.clone(), 4),
        ]
    );
    assert!(!store.is_ancestor(&a.id, &d.id).expect("closure lookup"));
    assert!(store.descendants_of(&a.id).expect("descendants of A").is_empty());

    for location in [&a, &b, &c, &d, &x, &y] {
        assert!(
            !store
                .is_ancestor(&location.id, &location.id)
                .expect("closure lookup"),
            "no location is its own ancestor"
        );
    }
}

#[test]
fn circular_reference_iff_new_parent_is_a_descendant() {
    let mut store = SqliteStore::open(temp_dir("cycle_iff")).expect("open store");
    let (a, b, c) = abc(&mut store);
    let d = create(&mut store, "A-02", Some(&a));
    let all = [a.clone(), b.clone(), c.clone(), d.clone()];

    for node in &all {
        for target in &all {
            if node.id == target.id {
                continue;
            }
            let descendants: Vec<String> = store
                .descendants_of(&node.id)
                .expect("descendants")
                .into_iter()
                .map(|(id, _)| id)
                .collect();
            let previous_parent = store
                .location_get(&node.id)
                .expect("current node")
                .location
                .parent_id;

            let result = move_to(&mut store, node, Some(target));
            if descendants.contains(&target.id) {
                assert!(
                    matches!(result, Err(StoreError::CircularReference)),
                    "moving under a descendant must fail"
                );
                continue;
            }
            result.expect("moving under a non-descendant must succeed");
            store
                .move_location(MoveLocationRequest {
                    id: node.id.clone(),
                    new_parent_id: previous_parent,
                })
                .expect("restore previous parent");
        }
    }

    assert_eq!(chain_ids(&store, &c), vec![b.id.clone(), a.id.clone()]);
    assert_eq!(chain_ids(&store, &d), vec![a.id.clone()]);
}

#[test]
fn detach_makes_a_new_root_with_its_subtree() {
    let mut store = SqliteStore::open(temp_dir("detach")).expect("open store");
    let (a, b, c) = abc(&mut store);

    let detached = move_to(&mut store, &b, None).expect("detach B");
    assert!(detached.is_root());
    assert_eq!(chain_ids(&store, &c), vec![b.id.clone()]);

    let forest = store.forest().expect("forest");
    let roots: Vec<&str> = forest.iter().map(|tree| tree.id()).collect();
    assert_eq!(roots, vec![a.id.as_str(), b.id.as_str()]);
    assert_eq!(forest[1].flatten_ids(), vec![b.id.clone(), c.id.clone()]);
}

#[test]
fn update_changes_attributes_and_parent_together() {
    let mut store = SqliteStore::open(temp_dir("update")).expect("open store");
    let (a, b, c) = abc(&mut store);

    let updated = store
        .update_location(UpdateLocationRequest {
            id: c.id.clone(),
            name: Some("Meeting Room".to_string()),
            area: Some(42.5),
            parent: ParentChange::Set(a.id.clone()),
            ..UpdateLocationRequest::default()
        })
        .expect("update C");
    assert_eq!(updated.attributes.name, "Meeting Room");
    assert_eq!(updated.attributes.area, 42.5);
    assert_eq!(updated.attributes.number, "A-01-01");
    assert_eq!(chain_ids(&store, &c), vec![a.id.clone()]);
    assert!(updated.updated_at_ms >= c.updated_at_ms);

    let err = store
        .update_location(UpdateLocationRequest {
            id: a.id.clone(),
            name: Some("Renamed".to_string()),
            parent: ParentChange::Set(b.id.clone()),
            ..UpdateLocationRequest::default()
        })
        .expect_err("A cannot move under B");
    assert!(matches!(err, StoreError::CircularReference));
    let a_now = store.location_get(&a.id).expect("A").location;
    assert_eq!(
        a_now.attributes.name, a.attributes.name,
        "a failed parent change must not leak the attribute patch"
    );

    let err = store
        .update_location(UpdateLocationRequest {
            id: a.id.clone(),
            area: Some(-1.0),
            ..UpdateLocationRequest::default()
        })
        .expect_err("negative area");
    assert_eq!(err.code(), "INVALID_INPUT");
}

#[test]
fn create_rejects_invalid_attributes() {
    let mut store = SqliteStore::open(temp_dir("invalid_attrs")).expect("open store");
    let err = store
        .create_location(CreateLocationRequest {
            building: "A".to_string(),
            name: " ".to_string(),
            number: "A-01".to_string(),
            area: 1.0,
            parent_id: None,
        })
        .expect_err("empty name");
    match err {
        StoreError::InvalidInput(message) => {
            assert_eq!(message, "location name must not be empty");
        }
        other => panic!("expected InvalidInput error, got {other:?}"),
    }
    assert!(store.forest().expect("forest").is_empty());
}
