//! Shared board state
//!
//! `GameState` is the full match snapshot every client renders. Mutations
//! validate their input before touching the struct, so a rejected call
//! leaves the state exactly as it was. Every mutation hands back the
//! post-mutation snapshot by value, ready to be committed to the ledger.
//!
//! Point convention (fixed by the clients): points 1..=24 are board points
//! numbered from player 0's home, 0 and 25 are the bars, 26 and 27 the
//! off-board trays.

use serde::{Deserialize, Serialize};

use crate::errors::{SyncError, SyncResult};
use crate::types::{
    checked_point, checked_slot, CheckerId, Player, CHECKERS_PER_PLAYER, MAX_DIE_FACE, MAX_POINT,
    MAX_SLOT,
};

/// `turn` value enabling every checker
pub const TURN_ALL_ENABLED: i32 = 2;

/// `turn` value disabling every checker
pub const TURN_ALL_DISABLED: i32 = -1;

/// `resign` value when nobody is resigning
pub const NO_RESIGN: i32 = -1;

/// Starting points of player 0, as `(point, checker count)`
const START_LAYOUT: [(u8, usize); 4] = [(6, 5), (8, 3), (13, 5), (24, 2)];

// ----------------------------------------------------------------------------
// Board Pieces
// ----------------------------------------------------------------------------

/// Location of one checker: `(point, slot)`, serialized as a two-element array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CheckerPos(pub u8, pub u8);

impl CheckerPos {
    pub fn point(&self) -> u8 {
        self.0
    }

    pub fn slot(&self) -> u8 {
        self.1
    }
}

/// Doubling cube
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cube {
    /// -1 centered, otherwise the owning player
    pub side: i32,
    pub value: u32,
    pub accepted: bool,
}

impl Default for Cube {
    fn default() -> Self {
        Self {
            side: -1,
            value: 1,
            accepted: true,
        }
    }
}

impl Cube {
    pub fn validate(&self) -> SyncResult<()> {
        if !(-1..=1).contains(&self.side) {
            return Err(SyncError::validation(
                "cube.side",
                format!("{} is not -1, 0 or 1", self.side),
            ));
        }
        if self.value < 1 {
            return Err(SyncError::validation("cube.value", "must be at least 1"));
        }
        Ok(())
    }
}

/// Board sub-state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub cube: Cube,
    /// Four dice slots per player so doubles can be shown as four dice
    pub dice: [[u8; 4]; 2],
    pub checker: [[CheckerPos; CHECKERS_PER_PLAYER]; 2],
    #[serde(default)]
    pub playername: [String; 2],
}

impl Board {
    /// Canonical starting position
    pub fn starting() -> Self {
        Self {
            cube: Cube::default(),
            dice: [[0; 4]; 2],
            checker: [starting_checkers(Player::ZERO), starting_checkers(Player::ONE)],
            playername: Default::default(),
        }
    }

    pub fn checker_pos(&self, id: CheckerId) -> CheckerPos {
        self.checker[id.player().index()][id.index()]
    }
}

fn starting_checkers(player: Player) -> [CheckerPos; CHECKERS_PER_PLAYER] {
    let mut checkers = [CheckerPos(0, 0); CHECKERS_PER_PLAYER];
    let mut next = 0;
    for (point, count) in START_LAYOUT {
        // Player 1 mirrors player 0 across the board
        let point = if player == Player::ZERO { point } else { 25 - point };
        for slot in 0..count {
            checkers[next] = CheckerPos(point, slot as u8);
            next += 1;
        }
    }
    checkers
}

// ----------------------------------------------------------------------------
// Game State
// ----------------------------------------------------------------------------

/// Full match snapshot shared by every connected client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Serial number; assigned by the ledger on commit, never by clients
    #[serde(default)]
    pub sn: u64,
    #[serde(default)]
    pub server_version: String,
    #[serde(default)]
    pub game_num: u32,
    #[serde(default)]
    pub match_score: u32,
    #[serde(default)]
    pub score: [u32; 2],
    /// <= -1 all checkers disabled, 0/1 that player's turn, >= 2 all enabled
    pub turn: i32,
    /// -1 when nobody resigns, otherwise the resigning player
    #[serde(default = "no_resign")]
    pub resign: i32,
    /// Per-player status banner
    #[serde(rename = "text", alias = "banner", default)]
    pub banner: [String; 2],
    pub board: Board,
}

fn no_resign() -> i32 {
    NO_RESIGN
}

impl GameState {
    /// Fresh game in the starting position
    pub fn new<S: Into<String>>(server_version: S) -> Self {
        Self {
            sn: 0,
            server_version: server_version.into(),
            game_num: 0,
            match_score: 0,
            score: [0, 0],
            turn: TURN_ALL_ENABLED,
            resign: NO_RESIGN,
            banner: Default::default(),
            board: Board::starting(),
        }
    }

    /// Check every field against its valid range
    pub fn validate(&self) -> SyncResult<()> {
        self.board.cube.validate()?;

        if !(TURN_ALL_DISABLED..=TURN_ALL_ENABLED).contains(&self.turn) {
            return Err(SyncError::validation("turn", format!("{} is out of range", self.turn)));
        }

        if !(-1..=1).contains(&self.resign) {
            return Err(SyncError::validation(
                "resign",
                format!("{} is not -1, 0 or 1", self.resign),
            ));
        }

        for (player, faces) in self.board.dice.iter().enumerate() {
            if let Some(face) = faces.iter().find(|f| **f > MAX_DIE_FACE) {
                return Err(SyncError::validation(
                    "dice",
                    format!("player {player} has die face {face}"),
                ));
            }
        }

        for (player, checkers) in self.board.checker.iter().enumerate() {
            for (index, pos) in checkers.iter().enumerate() {
                if pos.point() > MAX_POINT || pos.slot() > MAX_SLOT {
                    return Err(SyncError::validation(
                        "checker",
                        format!(
                            "checker {} at ({}, {}) is off the board",
                            player * 100 + index,
                            pos.point(),
                            pos.slot()
                        ),
                    ));
                }
            }
        }

        Ok(())
    }

    // ------------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------------

    /// Restore the starting position, keeping the server version and names
    pub fn reset(&mut self) -> GameState {
        let playername = std::mem::take(&mut self.board.playername);
        let version = std::mem::take(&mut self.server_version);
        *self = GameState::new(version);
        self.board.playername = playername;
        self.clone()
    }

    /// Relocate one checker by identity
    pub fn move_checker(&mut self, checker: i64, point: i64, slot: i64) -> SyncResult<GameState> {
        let id = CheckerId::try_from(checker)?;
        let point = checked_point(point)?;
        let slot = checked_slot(slot)?;

        self.board.checker[id.player().index()][id.index()] = CheckerPos(point, slot);
        Ok(self.clone())
    }

    /// Replace the cube wholesale
    pub fn set_cube(&mut self, side: i64, value: i64, accepted: bool) -> SyncResult<GameState> {
        let side = i32::try_from(side)
            .map_err(|_| SyncError::validation("cube.side", format!("{side} is out of range")))?;
        let value = u32::try_from(value)
            .map_err(|_| SyncError::validation("cube.value", format!("{value} is out of range")))?;
        let cube = Cube {
            side,
            value,
            accepted,
        };
        cube.validate()?;

        self.board.cube = cube;
        Ok(self.clone())
    }

    /// Replace one player's four dice slots
    pub fn set_dice(&mut self, player: i64, faces: [i64; 4]) -> SyncResult<GameState> {
        let player = Player::try_from(player)?;
        let mut dice = [0u8; 4];
        for (slot, face) in dice.iter_mut().zip(faces) {
            if !(0..=i64::from(MAX_DIE_FACE)).contains(&face) {
                return Err(SyncError::validation(
                    "dice",
                    format!("{face} is outside 0..={MAX_DIE_FACE}"),
                ));
            }
            *slot = face as u8;
        }

        self.board.dice[player.index()] = dice;
        Ok(self.clone())
    }

    /// Set whose checkers are movable: a player, or everyone/no one
    pub fn set_turn(&mut self, turn: i64) -> SyncResult<GameState> {
        let allowed = i64::from(TURN_ALL_DISABLED)..=i64::from(TURN_ALL_ENABLED);
        if !allowed.contains(&turn) {
            return Err(SyncError::validation("turn", format!("{turn} is out of range")));
        }
        self.turn = turn as i32;
        Ok(self.clone())
    }

    pub fn set_banner<S: Into<String>>(&mut self, player: i64, text: S) -> SyncResult<GameState> {
        let player = Player::try_from(player)?;
        self.banner[player.index()] = text.into();
        Ok(self.clone())
    }

    pub fn set_player_name<S: Into<String>>(
        &mut self,
        player: i64,
        name: S,
    ) -> SyncResult<GameState> {
        let player = Player::try_from(player)?;
        self.board.playername[player.index()] = name.into();
        Ok(self.clone())
    }

    /// Record a resignation; -1 withdraws it
    pub fn set_resign(&mut self, player: i64) -> SyncResult<GameState> {
        self.resign = if player == i64::from(NO_RESIGN) {
            NO_RESIGN
        } else {
            Player::try_from(player)?.index() as i32
        };
        Ok(self.clone())
    }

    /// Replace the whole state with a validated snapshot from a client
    pub fn replace(&mut self, incoming: GameState) -> SyncResult<GameState> {
        incoming.validate()?;
        *self = incoming;
        Ok(self.clone())
    }
}
