//! Best-effort persistence of the history ledger
//!
//! The data file is a JSON object keyed by server id. Each record holds the
//! two ledger stacks, `history` and `fwd_hist`, as full snapshots tagged
//! with their `sn`:
//!
//! ```json
//! { "bgsync": { "history": [ {..}, {..} ], "fwd_hist": [ {..} ] } }
//! ```
//!
//! Saving rewrites only this server's record. The new content goes to a
//! sibling temporary file which is then renamed over the data file, so a
//! crash leaves either the old or the new file behind. Failures are logged
//! and swallowed; the in-memory ledger stays authoritative.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{SyncError, SyncResult};
use crate::game::GameState;

/// One server's persisted ledger
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedLedger {
    pub history: Vec<GameState>,
    #[serde(default)]
    pub fwd_hist: Vec<GameState>,
}

type DataFile = BTreeMap<String, PersistedLedger>;

/// Stacks read back from storage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadedHistory {
    pub history: Vec<GameState>,
    pub redo: Vec<GameState>,
}

impl LoadedHistory {
    pub fn history_count(&self) -> usize {
        self.history.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }
}

// ----------------------------------------------------------------------------
// Persistence Store
// ----------------------------------------------------------------------------

/// Reads and writes one server's record in the data file
#[derive(Debug, Clone)]
pub struct PersistenceStore {
    path: PathBuf,
    server_id: String,
}

impl PersistenceStore {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(path: P, server_id: S) -> Self {
        Self {
            path: path.into(),
            server_id: server_id.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Save both stacks, logging instead of failing
    pub fn save(&self, history: &[GameState], redo: &[GameState]) {
        match self.try_save(history, redo) {
            Ok(()) => debug!(
                "Saved history=({}) fwd_hist=({}) to {}",
                history.len(),
                redo.len(),
                self.path.display()
            ),
            Err(e) => warn!("Failed to save history to {}: {}", self.path.display(), e),
        }
    }

    /// Save both stacks, reporting failures
    pub fn try_save(&self, history: &[GameState], redo: &[GameState]) -> SyncResult<()> {
        // Keep records of other servers sharing the file; an unreadable
        // file is replaced by a fresh one
        let mut data = self.read_data_file().unwrap_or_default();
        data.insert(
            self.server_id.clone(),
            PersistedLedger {
                history: history.to_vec(),
                fwd_hist: redo.to_vec(),
            },
        );

        let json = serde_json::to_vec(&data)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp_path = self.tmp_path();
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    /// Load both stacks. Any failure yields empty stacks.
    pub fn load(&self) -> LoadedHistory {
        match self.try_load() {
            Ok(loaded) => {
                debug!(
                    "Loaded history=({}) fwd_hist=({}) from {}",
                    loaded.history_count(),
                    loaded.redo_count(),
                    self.path.display()
                );
                loaded
            }
            Err(e) => {
                warn!("{}: {}", self.path.display(), e);
                LoadedHistory::default()
            }
        }
    }

    /// Load both stacks, reporting failures
    pub fn try_load(&self) -> SyncResult<LoadedHistory> {
        let mut data = self.read_data_file()?;
        let record = data.remove(&self.server_id).ok_or_else(|| {
            SyncError::persistence(format!("no record for server '{}'", self.server_id))
        })?;

        for state in record.history.iter().chain(record.fwd_hist.iter()) {
            state.validate().map_err(|e| {
                SyncError::persistence(format!("snapshot sn={} is corrupt: {}", state.sn, e))
            })?;
        }

        Ok(LoadedHistory {
            history: record.history,
            redo: record.fwd_hist,
        })
    }

    fn read_data_file(&self) -> SyncResult<DataFile> {
        let content = fs::read(&self.path)?;
        Ok(serde_json::from_slice(&content)?)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistoryLedger;

    fn temp_file(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("bgsync-persistence-{}", uuid::Uuid::new_v4()))
            .join(name)
    }

    fn sample_ledger() -> HistoryLedger {
        let mut state = GameState::new("1.0");
        let mut ledger = HistoryLedger::new(state.clone());
        state.move_checker(0, 1, 0).unwrap();
        ledger.commit(state.clone());
        state.set_banner(1, "doubles!").unwrap();
        state.set_dice(1, [4, 4, 4, 4]).unwrap();
        ledger.commit(state.clone());
        ledger.step_back();
        ledger
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let path = temp_file("ytbg.json");
        let store = PersistenceStore::new(&path, "bgsync");
        let ledger = sample_ledger();

        store.try_save(ledger.history(), ledger.redo()).unwrap();
        let loaded = store.try_load().unwrap();

        assert_eq!(loaded.history, ledger.history());
        assert_eq!(loaded.redo, ledger.redo());
        assert_eq!(loaded.history_count(), 2);
        assert_eq!(loaded.redo_count(), 1);
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let store = PersistenceStore::new(temp_file("absent.json"), "bgsync");
        assert!(store.try_load().is_err());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_loads_empty() {
        let path = temp_file("corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"{\"bgsync\": {\"history\": [").unwrap();

        let store = PersistenceStore::new(&path, "bgsync");
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_out_of_range_snapshot_is_rejected() {
        let path = temp_file("bad-point.json");
        let store = PersistenceStore::new(&path, "bgsync");
        let mut state = GameState::new("1.0");
        state.board.checker[0][0] = crate::game::CheckerPos(99, 0);
        store.try_save(&[state], &[]).unwrap();

        assert!(store.try_load().is_err());
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_records_are_keyed_by_server() {
        let path = temp_file("shared.json");
        let first = PersistenceStore::new(&path, "table-1");
        let second = PersistenceStore::new(&path, "table-2");
        let ledger = sample_ledger();

        first.try_save(ledger.history(), ledger.redo()).unwrap();
        second.try_save(&ledger.history()[..1], &[]).unwrap();

        assert_eq!(first.try_load().unwrap().history_count(), 2);
        assert_eq!(second.try_load().unwrap().history_count(), 1);
        assert!(PersistenceStore::new(&path, "table-3").load().is_empty());
    }

    #[test]
    fn test_file_layout() {
        let path = temp_file("layout.json");
        let store = PersistenceStore::new(&path, "bgsync");
        let ledger = sample_ledger();
        store.try_save(ledger.history(), ledger.redo()).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["bgsync"]["history"][1]["sn"], 2);
        assert_eq!(value["bgsync"]["fwd_hist"][0]["sn"], 3);
        assert_eq!(
            value["bgsync"]["history"][1]["board"]["checker"][0][0],
            serde_json::json!([1, 0])
        );
    }

    #[test]
    fn test_save_failure_is_swallowed() {
        // A directory where the data file should be makes the rename fail
        let path = temp_file("dir-in-the-way");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("keep"), b"x").unwrap();

        let store = PersistenceStore::new(&path, "bgsync");
        let ledger = sample_ledger();
        assert!(store.try_save(ledger.history(), ledger.redo()).is_err());
        store.save(ledger.history(), ledger.redo());
    }
}
