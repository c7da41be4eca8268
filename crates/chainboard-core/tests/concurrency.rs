use chainboard_core::error::ErrorCode;
use chainboard_core::{Actor, Board, ChainKind, ContainerId, NodeId};
use std::collections::HashSet;
use std::path::Path;
use std::thread;
use std::time::Duration;

const WRITERS: u64 = 4;
const MOVES_PER_WRITER: u64 = 30;
const TASKS: usize = 8;

fn open(path: &Path) -> Board {
    Board::open(path, Duration::from_secs(30)).expect("open board")
}

/// Small deterministic generator so each writer picks a different sequence.
fn next(seed: &mut u64) -> u64 {
    *seed = seed.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
    *seed >> 33
}

#[test]
fn overlapping_moves_from_many_connections_keep_chain_valid() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("board.db");

    let (state, ids): (ContainerId, Vec<NodeId>) = {
        let mut board = open(&path);
        let actor = Actor::new("setup").expect("actor");
        let project = board.create_project(&actor, "Race").expect("project");
        let state: ContainerId = board
            .create_and_append(&actor, ChainKind::TaskState, project.id, "Todo")
            .expect("state")
            .id
            .into();
        let ids = (0..TASKS)
            .map(|i| {
                board
                    .create_and_append(&actor, ChainKind::Task, state, &format!("task {i}"))
                    .expect("task")
                    .id
            })
            .collect();
        (state, ids)
    };

    let handles: Vec<_> = (0..WRITERS)
        .map(|writer| {
            let path = path.clone();
            let ids = ids.clone();
            thread::spawn(move || {
                let mut board = open(&path);
                let actor = Actor::new(format!("writer-{writer}")).expect("actor");
                let mut seed = writer + 1;
                for _ in 0..MOVES_PER_WRITER {
                    let pick = ids[usize::try_from(next(&mut seed)).expect("index") % ids.len()];
                    let roll = next(&mut seed);
                    let after = if roll % 4 == 0 {
                        None
                    } else {
                        Some(ids[usize::try_from(roll).expect("index") % ids.len()])
                    };
                    if after == Some(pick) {
                        continue;
                    }
                    board
                        .move_after(&actor, ChainKind::Task, pick, after)
                        .expect("move under contention");
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread");
    }

    let board = open(&path);
    assert!(board.verify().expect("verify").is_ok());
    let listed: Vec<NodeId> = board
        .list_in_order(ChainKind::Task, state)
        .expect("list")
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(listed.len(), TASKS);
    let expected: HashSet<NodeId> = ids.into_iter().collect();
    assert_eq!(listed.into_iter().collect::<HashSet<_>>(), expected);
}

#[test]
fn held_write_lock_surfaces_as_lock_contention() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("board.db");
    let actor = Actor::new("setup").expect("actor");

    let mut board = Board::open(&path, Duration::from_millis(50)).expect("open board");
    let project = board.create_project(&actor, "Locked").expect("project");
    let state: ContainerId = board
        .create_and_append(&actor, ChainKind::TaskState, project.id, "Todo")
        .expect("state")
        .id
        .into();
    let ids: Vec<NodeId> = ["A", "B", "C"]
        .iter()
        .map(|name| {
            board
                .create_and_append(&actor, ChainKind::Task, state, name)
                .expect("task")
                .id
        })
        .collect();

    let holder = rusqlite::Connection::open(&path).expect("second connection");
    holder.execute_batch("BEGIN IMMEDIATE").expect("take write lock");

    let err = board
        .move_after(&actor, ChainKind::Task, ids[2], None)
        .expect_err("move while another writer holds the lock");
    assert_eq!(err.code(), ErrorCode::LockContention);

    // Reads still see the last committed snapshot.
    let during: Vec<NodeId> = board
        .list_in_order(ChainKind::Task, state)
        .expect("list")
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(during, ids);

    holder.execute_batch("ROLLBACK").expect("release write lock");
    let after: Vec<NodeId> = board
        .list_in_order(ChainKind::Task, state)
        .expect("list")
        .into_iter()
        .map(|n| n.id)
        .collect();
    assert_eq!(after, ids, "the refused move wrote nothing");
    assert!(board.verify().expect("verify").is_ok());
}
