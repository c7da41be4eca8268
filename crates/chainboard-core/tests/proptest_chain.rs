use chainboard_core::error::ErrorCode;
use chainboard_core::{Actor, Board, ChainKind, ContainerId, NodeId};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum Op {
    Append { column: usize },
    Move { pick: usize, after: Option<usize> },
    Remove { pick: usize },
    Transfer { pick: usize, column: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..2usize).prop_map(|column| Op::Append { column }),
        4 => (any::<usize>(), proptest::option::of(any::<usize>()))
            .prop_map(|(pick, after)| Op::Move { pick, after }),
        1 => any::<usize>().prop_map(|pick| Op::Remove { pick }),
        2 => (any::<usize>(), 0..2usize).prop_map(|(pick, column)| Op::Transfer { pick, column }),
    ]
}

/// Plain-vector reference model: one `Vec` per column in head-to-tail order.
struct Harness {
    board: Board,
    actor: Actor,
    columns: [ContainerId; 2],
    model: [Vec<NodeId>; 2],
    counter: usize,
}

impl Harness {
    fn new() -> Self {
        let mut board = Board::open_in_memory().expect("open");
        let actor = Actor::new("prop").expect("actor");
        let project = board.create_project(&actor, "P").expect("project");
        let mut column = |name: &str| -> ContainerId {
            board
                .create_and_append(&actor, ChainKind::TaskState, project.id, name)
                .expect("state")
                .id
                .into()
        };
        let columns = [column("X"), column("Y")];
        Self {
            board,
            actor,
            columns,
            model: [Vec::new(), Vec::new()],
            counter: 0,
        }
    }

    fn live(&self) -> Vec<(usize, NodeId)> {
        self.model
            .iter()
            .enumerate()
            .flat_map(|(c, ids)| ids.iter().map(move |id| (c, *id)))
            .collect()
    }

    fn apply(&mut self, op: &Op) {
        let live = self.live();
        match *op {
            Op::Append { column } => {
                self.counter += 1;
                let node = self
                    .board
                    .create_and_append(
                        &self.actor,
                        ChainKind::Task,
                        self.columns[column],
                        &format!("t{}", self.counter),
                    )
                    .expect("append");
                self.model[column].push(node.id);
            }
            Op::Move { pick, after } if !live.is_empty() => {
                let (column, id) = live[pick % live.len()];
                let target = after.map(|a| live[a % live.len()]);
                let result = self
                    .board
                    .move_after(&self.actor, ChainKind::Task, id, target.map(|(_, t)| t));
                let target_id = target.map(|(_, t)| t);
                if self.left_of(column, id) == target_id {
                    assert!(!result.expect("no-op move").changed());
                } else if target_id == Some(id) {
                    let err = result.expect_err("self target");
                    assert_eq!(err.code(), ErrorCode::InvalidOperation);
                } else if target.is_some_and(|(tc, _)| tc != column) {
                    let err = result.expect_err("foreign target");
                    assert_eq!(err.code(), ErrorCode::CrossContainerViolation);
                } else {
                    assert!(result.expect("move").changed());
                    let chain = &mut self.model[column];
                    chain.retain(|n| *n != id);
                    let slot = match target_id {
                        None => 0,
                        Some(t) => chain.iter().position(|n| *n == t).expect("target in model") + 1,
                    };
                    chain.insert(slot, id);
                }
            }
            Op::Remove { pick } if !live.is_empty() => {
                let (column, id) = live[pick % live.len()];
                self.board
                    .remove(&self.actor, ChainKind::Task, id)
                    .expect("remove");
                self.model[column].retain(|n| *n != id);
            }
            Op::Transfer { pick, column: dest } if !live.is_empty() => {
                let (column, id) = live[pick % live.len()];
                self.board
                    .transfer_container(&self.actor, ChainKind::Task, id, self.columns[dest])
                    .expect("transfer");
                if dest != column {
                    self.model[column].retain(|n| *n != id);
                    self.model[dest].push(id);
                }
            }
            _ => {}
        }
    }

    fn left_of(&self, column: usize, id: NodeId) -> Option<NodeId> {
        let chain = &self.model[column];
        let pos = chain.iter().position(|n| *n == id)?;
        pos.checked_sub(1).map(|p| chain[p])
    }

    fn assert_consistent(&self) {
        assert!(self.board.verify().expect("verify").is_ok());
        for (column, expected) in self.columns.iter().zip(&self.model) {
            let listed: Vec<NodeId> = self
                .board
                .list_in_order(ChainKind::Task, *column)
                .expect("list")
                .into_iter()
                .map(|n| n.id)
                .collect();
            let unique: HashSet<NodeId> = listed.iter().copied().collect();
            assert_eq!(unique.len(), listed.len(), "duplicate ids in chain");
            assert_eq!(&listed, expected);

            let tail = self.board.tail(ChainKind::Task, *column).expect("tail");
            assert_eq!(tail.map(|n| n.id), expected.last().copied());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn chains_match_reference_model(ops in prop::collection::vec(arb_op(), 1..40)) {
        let mut h = Harness::new();
        for op in &ops {
            h.apply(op);
            h.assert_consistent();
        }
    }

    #[test]
    fn repeated_move_is_idempotent(
        len in 2..8usize,
        pick in any::<usize>(),
        after in proptest::option::of(any::<usize>()),
    ) {
        let mut h = Harness::new();
        for _ in 0..len {
            h.apply(&Op::Append { column: 0 });
        }
        let ids = h.model[0].clone();
        let id = ids[pick % len];
        let target = after.map(|a| ids[a % len]).filter(|t| *t != id);

        h.board.move_after(&h.actor, ChainKind::Task, id, target).expect("first move");
        let once = h.board.list_in_order(ChainKind::Task, h.columns[0]).expect("list");
        let second = h.board.move_after(&h.actor, ChainKind::Task, id, target).expect("second move");
        let twice = h.board.list_in_order(ChainKind::Task, h.columns[0]).expect("list");

        prop_assert!(!second.changed());
        prop_assert_eq!(once, twice);
    }
}
