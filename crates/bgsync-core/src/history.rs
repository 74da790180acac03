//! Undo/redo history ledger
//!
//! The ledger keeps two stacks of immutable snapshots:
//!
//! - `history`: committed states, oldest first. Never empty; the bottom
//!   entry (the root) is never popped.
//! - `redo`: states popped by backward navigation, the most recently popped
//!   on top. Cleared by every commit.
//!
//! Serial numbers come from a monotonic counter. A commit stamps
//! `last_sn + 1`, so a number discarded together with the redo stack is
//! never handed out again.
//!
//! The ledger itself is synchronous and single-owner. Timed, cancellable
//! traversal over it is driven by the runtime crate.

use crate::game::GameState;

/// Direction of a single navigation step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Backward,
    Forward,
}

/// Append-only committed history plus a redo stack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryLedger {
    history: Vec<GameState>,
    redo: Vec<GameState>,
    last_sn: u64,
}

impl HistoryLedger {
    /// Create a ledger whose root is `root`, committed with serial number 1
    pub fn new(root: GameState) -> Self {
        let mut ledger = Self {
            history: Vec::new(),
            redo: Vec::new(),
            last_sn: 0,
        };
        ledger.commit(root);
        ledger
    }

    /// Rebuild a ledger from persisted stacks. Returns `None` when
    /// `history` is empty since a ledger always has a root.
    pub fn from_parts(history: Vec<GameState>, redo: Vec<GameState>) -> Option<Self> {
        if history.is_empty() {
            return None;
        }
        let last_sn = history
            .iter()
            .chain(redo.iter())
            .map(|state| state.sn)
            .max()
            .unwrap_or(0);
        Some(Self {
            history,
            redo,
            last_sn,
        })
    }

    /// Commit a snapshot: clear the redo stack, stamp the next serial
    /// number and append. `None` is a no-op. Returns the assigned number.
    pub fn commit<S: Into<Option<GameState>>>(&mut self, snapshot: S) -> Option<u64> {
        let mut snapshot = snapshot.into()?;
        self.redo.clear();
        self.last_sn += 1;
        snapshot.sn = self.last_sn;
        self.history.push(snapshot);
        Some(self.last_sn)
    }

    /// Most recent committed entry
    pub fn current(&self) -> &GameState {
        // history is never empty: `new` commits a root and `from_parts`
        // refuses an empty stack
        &self.history[self.history.len() - 1]
    }

    /// Move the top of `history` onto `redo`. Returns the new current
    /// entry, or `None` when only the root is left.
    pub fn step_back(&mut self) -> Option<&GameState> {
        if !self.can_step_back() {
            return None;
        }
        let popped = self.history.pop()?;
        self.redo.push(popped);
        Some(self.current())
    }

    /// Move the top of `redo` back onto `history`. Returns the new current
    /// entry, or `None` when there is nothing to redo.
    pub fn step_forward(&mut self) -> Option<&GameState> {
        let restored = self.redo.pop()?;
        self.history.push(restored);
        Some(self.current())
    }

    pub fn step(&mut self, direction: Direction) -> Option<&GameState> {
        match direction {
            Direction::Backward => self.step_back(),
            Direction::Forward => self.step_forward(),
        }
    }

    pub fn can_step_back(&self) -> bool {
        self.history.len() >= 2
    }

    pub fn can_step_forward(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn can_step(&self, direction: Direction) -> bool {
        match direction {
            Direction::Backward => self.can_step_back(),
            Direction::Forward => self.can_step_forward(),
        }
    }

    /// 1-based position of the current entry (`len(history)`)
    pub fn position(&self) -> usize {
        self.history.len()
    }

    /// Number of reachable entries (`len(history) + len(redo)`)
    pub fn total(&self) -> usize {
        self.history.len() + self.redo.len()
    }

    pub fn history(&self) -> &[GameState] {
        &self.history
    }

    pub fn redo(&self) -> &[GameState] {
        &self.redo
    }

    /// Highest serial number handed out so far
    pub fn last_sn(&self) -> u64 {
        self.last_sn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with(commits: usize) -> HistoryLedger {
        let mut state = GameState::new("1.0");
        let mut ledger = HistoryLedger::new(state.clone());
        for i in 0..commits {
            state.game_num = i as u32 + 1;
            ledger.commit(state.clone());
        }
        ledger
    }

    #[test]
    fn test_new_ledger_has_root() {
        let ledger = HistoryLedger::new(GameState::new("1.0"));
        assert_eq!(ledger.position(), 1);
        assert_eq!(ledger.total(), 1);
        assert_eq!(ledger.current().sn, 1);
        assert!(!ledger.can_step_back());
        assert!(!ledger.can_step_forward());
    }

    #[test]
    fn test_commit_assigns_serial_numbers() {
        let ledger = ledger_with(3);
        let sns: Vec<u64> = ledger.history().iter().map(|s| s.sn).collect();
        assert_eq!(sns, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_commit_none_is_noop() {
        let mut ledger = ledger_with(1);
        ledger.step_back();
        assert_eq!(ledger.commit(None), None);
        assert_eq!(ledger.redo().len(), 1);
        assert_eq!(ledger.position(), 1);
    }

    #[test]
    fn test_client_serial_number_is_overwritten() {
        let mut ledger = ledger_with(0);
        let mut state = GameState::new("1.0");
        state.sn = 999;
        assert_eq!(ledger.commit(state), Some(2));
        assert_eq!(ledger.current().sn, 2);
    }

    #[test]
    fn test_step_back_and_forward() {
        let mut ledger = ledger_with(2);
        assert_eq!(ledger.step_back().map(|s| s.sn), Some(2));
        assert_eq!((ledger.position(), ledger.total()), (2, 3));
        assert_eq!(ledger.step_back().map(|s| s.sn), Some(1));
        assert_eq!(ledger.step_back(), None);
        assert_eq!((ledger.position(), ledger.total()), (1, 3));

        assert_eq!(ledger.step_forward().map(|s| s.sn), Some(2));
        assert_eq!(ledger.step_forward().map(|s| s.sn), Some(3));
        assert_eq!(ledger.step_forward(), None);
        assert_eq!((ledger.position(), ledger.total()), (3, 3));
    }

    #[test]
    fn test_commit_after_undo_clears_redo_and_never_reuses_sn() {
        let mut ledger = ledger_with(2);
        ledger.step_back();
        ledger.step_back();
        assert_eq!(ledger.redo().len(), 2);

        let sn = ledger.commit(GameState::new("1.0"));
        assert_eq!(sn, Some(4));
        assert!(ledger.redo().is_empty());
        assert_eq!(ledger.total(), 2);
    }

    #[test]
    fn test_from_parts_seeds_counter_from_both_stacks() {
        let mut ledger = ledger_with(4);
        ledger.step_back();
        ledger.step_back();

        let mut rebuilt =
            HistoryLedger::from_parts(ledger.history().to_vec(), ledger.redo().to_vec()).unwrap();
        assert_eq!(rebuilt.last_sn(), 5);
        assert_eq!(rebuilt.commit(GameState::new("1.0")), Some(6));

        assert!(HistoryLedger::from_parts(Vec::new(), vec![GameState::new("1.0")]).is_none());
    }
}
