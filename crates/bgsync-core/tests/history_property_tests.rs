//! Property-based tests for the history ledger
//!
//! These tests drive the ledger with arbitrary sequences of commits and
//! navigation steps and check the stack invariants that every client relies
//! on: the root is never popped, commits clear redo, serial numbers are
//! never reused, and persistence restores exactly what was saved.

use bgsync_core::{
    history::{Direction, HistoryLedger},
    persistence::PersistenceStore,
    Board, CheckerPos, Cube, GameState, MAX_DIE_FACE, MAX_POINT, MAX_SLOT,
};
use proptest::prelude::*;
use std::collections::HashSet;

#[derive(Debug, Clone)]
enum LedgerOp {
    Commit(Box<GameState>),
    Back,
    Fwd,
}

fn arb_checker_pos() -> impl Strategy<Value = CheckerPos> {
    (0..=MAX_POINT, 0..=MAX_SLOT).prop_map(|(point, slot)| CheckerPos(point, slot))
}

fn arb_cube() -> impl Strategy<Value = Cube> {
    (-1i32..=1, 1u32..=64, any::<bool>()).prop_map(|(side, value, accepted)| Cube {
        side,
        value,
        accepted,
    })
}

fn arb_board() -> impl Strategy<Value = Board> {
    (
        arb_cube(),
        prop::array::uniform2(prop::array::uniform4(0..=MAX_DIE_FACE)),
        prop::array::uniform2(prop::array::uniform15(arb_checker_pos())),
        prop::array::uniform2("\\PC{0,12}"),
    )
        .prop_map(|(cube, dice, checker, playername)| Board {
            cube,
            dice,
            checker,
            playername,
        })
}

/// Any snapshot a client could legitimately produce
fn arb_game_state() -> impl Strategy<Value = GameState> {
    (
        0u32..1000,
        0u32..25,
        prop::array::uniform2(0u32..25),
        -1i32..=2,
        -1i32..=1,
        prop::array::uniform2("\\PC{0,16}"),
        arb_board(),
    )
        .prop_map(
            |(game_num, match_score, score, turn, resign, banner, board)| GameState {
                sn: 0,
                server_version: "prop".to_string(),
                game_num,
                match_score,
                score,
                turn,
                resign,
                banner,
                board,
            },
        )
}

fn arb_op() -> impl Strategy<Value = LedgerOp> {
    prop_oneof![
        arb_game_state().prop_map(|state| LedgerOp::Commit(Box::new(state))),
        Just(LedgerOp::Back),
        Just(LedgerOp::Fwd),
    ]
}

fn arb_ops() -> impl Strategy<Value = Vec<LedgerOp>> {
    prop::collection::vec(arb_op(), 0..64)
}

fn root() -> GameState {
    GameState::new("prop")
}

fn apply(ledger: &mut HistoryLedger, op: &LedgerOp) {
    match op {
        LedgerOp::Commit(state) => {
            ledger.commit((**state).clone());
        }
        LedgerOp::Back => {
            ledger.step_back();
        }
        LedgerOp::Fwd => {
            ledger.step_forward();
        }
    }
}

proptest! {
    /// Property: history is never empty and the root keeps serial number 1
    #[test]
    fn root_is_never_popped(ops in arb_ops()) {
        let mut ledger = HistoryLedger::new(root());
        for op in &ops {
            apply(&mut ledger, op);
            prop_assert!(ledger.position() >= 1);
            prop_assert_eq!(ledger.history()[0].sn, 1);
            prop_assert_eq!(ledger.total(), ledger.history().len() + ledger.redo().len());
        }
    }

    /// Property: a commit empties redo and stamps exactly last_sn + 1
    #[test]
    fn commit_clears_redo_and_increments(ops in arb_ops(), next in arb_game_state()) {
        let mut ledger = HistoryLedger::new(root());
        for op in &ops {
            apply(&mut ledger, op);
        }

        let previous = ledger.last_sn();
        let sn = ledger.commit(next.clone());

        prop_assert_eq!(sn, Some(previous + 1));
        prop_assert!(ledger.redo().is_empty());
        prop_assert_eq!(&ledger.current().board, &next.board);
        prop_assert_eq!(&ledger.current().banner, &next.banner);
    }

    /// Property: committed serial numbers are unique across the whole run
    #[test]
    fn serial_numbers_never_reused(ops in arb_ops()) {
        let mut ledger = HistoryLedger::new(root());
        let mut seen = HashSet::from([1u64]);
        for op in &ops {
            if let LedgerOp::Commit(state) = op {
                let sn = ledger.commit((**state).clone()).expect("commit of a snapshot");
                prop_assert!(seen.insert(sn), "sn {} handed out twice", sn);
            } else {
                apply(&mut ledger, op);
            }
        }
    }

    /// Property: one step back followed by one step forward is the identity
    #[test]
    fn back_then_forward_is_identity(ops in arb_ops()) {
        let mut ledger = HistoryLedger::new(root());
        for op in &ops {
            apply(&mut ledger, op);
        }
        prop_assume!(ledger.can_step(Direction::Backward));

        let before = ledger.clone();
        prop_assert!(ledger.step(Direction::Backward).is_some());
        prop_assert!(ledger.step(Direction::Forward).is_some());
        prop_assert_eq!(ledger, before);
    }

    /// Property: walking back until exhausted lands on the root and leaves
    /// every other entry on the redo stack
    #[test]
    fn back_all_reaches_root(ops in arb_ops()) {
        let mut ledger = HistoryLedger::new(root());
        for op in &ops {
            apply(&mut ledger, op);
        }
        let total = ledger.total();

        while ledger.step_back().is_some() {}

        prop_assert_eq!(ledger.position(), 1);
        prop_assert_eq!(ledger.redo().len(), total - 1);
        prop_assert_eq!(ledger.current().sn, 1);
    }

    /// Property: save then load restores both stacks field for field
    #[test]
    fn save_load_round_trip(ops in arb_ops()) {
        let mut ledger = HistoryLedger::new(root());
        for op in &ops {
            apply(&mut ledger, op);
        }

        let path = std::env::temp_dir()
            .join(format!("bgsync-prop-{}", bgsync_core::ClientId::new()))
            .join("ledger.json");
        let store = PersistenceStore::new(&path, "prop");
        store.try_save(ledger.history(), ledger.redo()).expect("save to temp dir");

        let loaded = store.try_load().expect("load what was saved");
        let restored = HistoryLedger::from_parts(loaded.history, loaded.redo)
            .expect("saved history has a root");

        prop_assert_eq!(restored.history(), ledger.history());
        prop_assert_eq!(restored.redo(), ledger.redo());
        prop_assert_eq!(restored.last_sn(), ledger.last_sn());

        let _ = std::fs::remove_dir_all(path.parent().expect("temp parent"));
    }
}
