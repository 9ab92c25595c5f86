//! Integration tests for moving local state onto a newly created copy.

use storesync_core::{
    CausalVersion, ContentHash, DeletionCause, DependencyFetcher, DeviceId, KIndex, MetaDatabase,
    ObjectAttributes, ObjectFlags, ObjectId, ObjectType, Socid, Sockid, Soid, Sokid,
    StoreHierarchy, Tick, VersionStore,
};
use storesync_migration::{ledger, ImmigrantTickRow};
use storesync_testkit::prelude::*;

fn device(n: u8) -> DeviceId {
    DeviceId::from_bytes([n; 16])
}

#[test]
fn fetched_copy_takes_over_local_file() {
    let world = World::new();
    let (_, a) = world.add_store(world.root, "a");
    let (b, b_idx) = world.add_store(world.root, "b");
    let d1 = device(1);
    let o = world.add_file(
        a,
        ObjectId::ROOT,
        "thesis.tex",
        &[Branch::new(b"\\section{Intro}", d1, 5)],
    );
    world
        .peer
        .publish(b, o.oid, RemoteObject::new(ObjectType::File, "thesis.tex"));

    let dest = o.in_store(b_idx);
    world
        .peer
        .fetch(Socid::meta(dest), world.peer_device, None)
        .unwrap();

    let moved = world.attributes(dest);
    assert_eq!(moved.branches.len(), 1);
    assert_eq!(
        moved.branches[&KIndex::MASTER].hash,
        ContentHash::of(b"\\section{Intro}")
    );
    assert_eq!(
        world
            .versions
            .local_version(Sockid::content(dest, KIndex::MASTER))
            .unwrap(),
        CausalVersion::new().with(d1, Tick::new(5))
    );
    assert_eq!(
        world.physical.content(Sokid::new(dest, KIndex::MASTER)),
        Some(b"\\section{Intro}".to_vec())
    );
    assert_eq!(world.physical.content(Sokid::new(o, KIndex::MASTER)), None);
    assert_eq!(
        world.meta.deletions(),
        vec![(o, DeletionCause::Emigrated { target: b })]
    );

    let rows = world.migrator.ledger().rows_for(Socid::content(dest));
    assert_eq!(
        rows,
        vec![ImmigrantTickRow {
            socid: Socid::content(dest),
            origin_device: d1,
            origin_tick: Tick::new(5),
            immigrant_device: world.device,
            immigrant_tick: Tick::new(1),
        }]
    );

    // The row reached the log on commit.
    let scanned = ledger::scan(&world.ledger_log.data()).unwrap();
    assert_eq!(scanned.rows, rows);
    assert_eq!(scanned.torn_bytes, 0);
}

#[test]
fn every_branch_moves_and_kml_shrinks() {
    let world = World::new();
    let (_, a) = world.add_store(world.root, "a");
    let (b, b_idx) = world.add_store(world.root, "b");
    let (d1, d2, d3) = (device(1), device(2), device(3));
    let o = world.add_file(
        a,
        ObjectId::ROOT,
        "draft.md",
        &[
            Branch::new(b"mine", d1, 2),
            Branch::new(b"theirs", d2, 4),
            Branch::new(b"later", d1, 7),
        ],
    );
    let dest = o.in_store(b_idx);
    world.versions.set_kml(
        Socid::content(dest),
        CausalVersion::new()
            .with(d1, Tick::new(9))
            .with(d2, Tick::new(3))
            .with(d3, Tick::new(1)),
    );
    world
        .peer
        .publish(b, o.oid, RemoteObject::new(ObjectType::File, "draft.md"));

    world
        .peer
        .fetch(Socid::meta(dest), world.peer_device, None)
        .unwrap();

    assert_eq!(world.meta.branch_creations(), 3);
    let moved = world.attributes(dest);
    assert_eq!(moved.branches.len(), 3);
    for kidx in 0..3 {
        let kidx = KIndex::new(kidx);
        assert!(world.physical.content(Sokid::new(dest, kidx)).is_some());
        assert!(world.physical.content(Sokid::new(o, kidx)).is_none());
    }

    // d2:3 is now covered by the moved branches; d1:9 and d3:1 are not.
    assert_eq!(
        world.versions.kml_version(Socid::content(dest)).unwrap(),
        CausalVersion::new()
            .with(d1, Tick::new(9))
            .with(d3, Tick::new(1))
    );

    let ledger = world.migrator.ledger();
    assert_eq!(
        ledger.immigrant_version(Socid::content(dest)),
        CausalVersion::new().with(world.device, Tick::new(2))
    );
    assert_eq!(ledger.last_tick(b_idx), Tick::new(2));
    assert!(world.attributes(o).branches.is_empty());
}

#[test]
fn anchor_immigration_moves_child_store() {
    let world = World::new();
    let (_, a) = world.add_store(world.root, "a");
    let (b, b_idx) = world.add_store(world.root, "b");
    let (s, s_idx) = world.add_store(a, "shared");
    let inner = world.add_file(
        s_idx,
        ObjectId::ROOT,
        "inside.txt",
        &[Branch::new(b"inside", world.device, 1)],
    );
    world.peer.publish(
        b,
        s.anchor_oid(),
        RemoteObject::new(ObjectType::Anchor, "shared"),
    );

    let from = Soid::new(a, s.anchor_oid());
    let to = Soid::new(b_idx, s.anchor_oid());
    world
        .peer
        .fetch(Socid::meta(to), world.peer_device, None)
        .unwrap();

    assert_eq!(world.stores.parent_of(s_idx).unwrap(), Some(b_idx));
    assert_eq!(world.stores.sidx_of(s).unwrap(), Some(s_idx));
    assert!(world.physical.has_anchor_root(to));
    assert!(!world.physical.has_anchor_root(from));
    assert!(world.attributes(from).is_expelled());

    // Content inside the child store does not move.
    assert_eq!(world.meta.branch_creations(), 0);
    assert_eq!(world.attributes(inner).branches.len(), 1);
    assert_eq!(
        world.physical.content(Sokid::new(inner, KIndex::MASTER)),
        Some(b"inside".to_vec())
    );
    assert!(world.migrator.ledger().is_empty());
}

#[test]
fn independent_objects_are_not_immigrants() {
    let world = World::new();
    let (_, b) = world.add_store(world.root, "b");
    let fresh = ObjectAttributes::new(
        Soid::new(b, ObjectId::generate()),
        ObjectType::File,
        ObjectId::ROOT,
        "new.txt",
        ObjectFlags::NONE,
    );
    let dir = ObjectAttributes::new(
        Soid::new(b, ObjectId::generate()),
        ObjectType::Dir,
        ObjectId::ROOT,
        "new",
        ObjectFlags::NONE,
    );

    let mut txn = world.tm.begin();
    assert!(!world.migrator.maybe_immigrate(&mut txn, &fresh).unwrap());
    assert!(!world.migrator.maybe_immigrate(&mut txn, &dir).unwrap());
    assert_eq!(txn.change_count(), 0);
    txn.commit().unwrap();
}

#[test]
fn expelled_sources_are_ignored() {
    let world = World::new();
    let (_, a) = world.add_store(world.root, "a");
    let (_, b) = world.add_store(world.root, "b");
    let o = world.add_file(a, ObjectId::ROOT, "gone.txt", &[]);
    world.add_file_at(
        o,
        ObjectId::TRASH,
        &o.oid.to_text(),
        ObjectFlags::EXPELLED_ORIGINAL,
        &[],
    );
    let dest = ObjectAttributes::new(
        o.in_store(b),
        ObjectType::File,
        ObjectId::ROOT,
        "gone.txt",
        ObjectFlags::NONE,
    );

    let mut txn = world.tm.begin();
    assert!(!world.migrator.maybe_immigrate(&mut txn, &dest).unwrap());
}

#[test]
fn broken_destinations_are_invariant_violations() {
    let world = World::new();
    let (_, a) = world.add_store(world.root, "a");
    let (_, b) = world.add_store(world.root, "b");
    let (s, _) = world.add_store(b, "mounted");
    let o = world.add_file(a, ObjectId::ROOT, "x.txt", &[]);

    let expelled = ObjectAttributes::new(
        o.in_store(b),
        ObjectType::File,
        ObjectId::TRASH,
        "x.txt",
        ObjectFlags::EXPELLED_INHERITED,
    );
    let mut with_branch = ObjectAttributes::new(
        o.in_store(b),
        ObjectType::File,
        ObjectId::ROOT,
        "x.txt",
        ObjectFlags::NONE,
    );
    with_branch
        .branches
        .insert(KIndex::MASTER, Branch::new(b"x", world.device, 1).attributes());
    let already_mounted = ObjectAttributes::new(
        Soid::new(b, s.anchor_oid()),
        ObjectType::Anchor,
        ObjectId::ROOT,
        "mounted",
        ObjectFlags::NONE,
    );

    for to in [expelled, with_branch, already_mounted] {
        let mut txn = world.tm.begin();
        let err = world.migrator.maybe_immigrate(&mut txn, &to).unwrap_err();
        assert!(err.is_fatal(), "{} should be rejected", to.soid);
    }
    assert!(world.meta.deletions().is_empty());
}

#[test]
fn type_change_is_an_invariant_violation() {
    let world = World::new();
    let (_, a) = world.add_store(world.root, "a");
    let (_, b) = world.add_store(world.root, "b");
    let dir = world.add_dir(a, ObjectId::ROOT, "was-a-dir");
    let to = ObjectAttributes::new(
        dir.in_store(b),
        ObjectType::File,
        ObjectId::ROOT,
        "was-a-dir",
        ObjectFlags::NONE,
    );

    let mut txn = world.tm.begin();
    let err = world.migrator.maybe_immigrate(&mut txn, &to).unwrap_err();
    assert!(err.is_fatal());
    assert!(!err.is_retryable());
}

#[test]
fn failed_move_rolls_everything_back() {
    let world = World::new();
    let (_, a) = world.add_store(world.root, "a");
    let (b, b_idx) = world.add_store(world.root, "b");
    let d1 = device(1);
    let o = world.add_file(
        a,
        ObjectId::ROOT,
        "data.bin",
        &[Branch::new(b"payload", d1, 3)],
    );
    world
        .peer
        .publish(b, o.oid, RemoteObject::new(ObjectType::File, "data.bin"));
    let dest = o.in_store(b_idx);

    world.physical.fail_moves(true);
    let err = world
        .peer
        .fetch(Socid::meta(dest), world.peer_device, None)
        .unwrap_err();
    assert!(err.is_retryable());

    assert_eq!(world.meta.attributes(dest).unwrap(), None);
    assert_eq!(world.attributes(o).branches.len(), 1);
    assert!(!world.attributes(o).is_expelled());
    assert_eq!(world.meta.branch_creations(), 0);
    assert!(world.meta.deletions().is_empty());
    assert!(world
        .versions
        .local_version(Sockid::content(dest, KIndex::MASTER))
        .unwrap()
        .is_zero());
    assert!(world.migrator.ledger().is_empty());
    assert!(world.ledger_log.data().is_empty());
    assert_eq!(world.tm.rolled_back_count(), 1);

    // The whole attempt can be repeated.
    world.physical.fail_moves(false);
    world
        .peer
        .fetch(Socid::meta(dest), world.peer_device, None)
        .unwrap();
    assert_eq!(world.attributes(dest).branches.len(), 1);
    assert_eq!(world.migrator.ledger().len(), 1);
    assert_eq!(world.migrator.ledger().last_tick(b_idx), Tick::new(1));
}

#[test]
fn second_admitted_copy_is_rejected() {
    let world = World::new();
    let (_, a) = world.add_store(world.root, "a");
    let (b, b_idx) = world.add_store(world.root, "b");
    let (_, c) = world.add_store(world.root, "c");
    let o = world.add_file(a, ObjectId::ROOT, "twin.txt", &[]);
    world.add_file_at(o.in_store(c), ObjectId::ROOT, "twin.txt", ObjectFlags::NONE, &[]);
    world
        .peer
        .publish(b, o.oid, RemoteObject::new(ObjectType::File, "twin.txt"));

    let err = world
        .peer
        .fetch(Socid::meta(o.in_store(b_idx)), world.peer_device, None)
        .unwrap_err();
    assert!(err.is_invariant_violation());
    assert!(!world.attributes(o).is_expelled());
}
