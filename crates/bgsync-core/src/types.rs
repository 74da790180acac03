//! Core identifier types
//!
//! Newtypes for clients, players and checkers so that raw integers coming
//! off the wire are validated once, at the boundary.

use core::fmt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{SyncError, SyncResult};

/// Checkers owned by each player
pub const CHECKERS_PER_PLAYER: usize = 15;

/// Highest valid point index: 24 board points, bar and the two off-board trays
pub const MAX_POINT: u8 = 27;

/// Highest stacking slot at a single point
pub const MAX_SLOT: u8 = 29;

/// Highest die face; 0 means "not rolled"
pub const MAX_DIE_FACE: u8 = 6;

// ----------------------------------------------------------------------------
// Client Identifier
// ----------------------------------------------------------------------------

/// Identity of one connected viewer/player connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Create a fresh random client identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Build a deterministic identifier, mostly useful in tests
    pub fn from_u128(value: u128) -> Self {
        Self(Uuid::from_u128(value))
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Player
// ----------------------------------------------------------------------------

/// One of the two seats at the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Player(usize);

impl Player {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(1);

    pub fn index(&self) -> usize {
        self.0
    }

    /// The other seat
    pub fn opponent(&self) -> Self {
        Self(1 - self.0)
    }
}

impl TryFrom<i64> for Player {
    type Error = SyncError;

    fn try_from(value: i64) -> SyncResult<Self> {
        match value {
            0 => Ok(Self(0)),
            1 => Ok(Self(1)),
            other => Err(SyncError::validation(
                "player",
                format!("{other} is not a player index (expected 0 or 1)"),
            )),
        }
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "player{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Checker Identifier
// ----------------------------------------------------------------------------

/// Stable checker identity, encoded on the wire as `player * 100 + index`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CheckerId {
    player: Player,
    index: usize,
}

impl CheckerId {
    /// Create a checker id, rejecting indices past the last checker
    pub fn new(player: Player, index: usize) -> SyncResult<Self> {
        if index >= CHECKERS_PER_PLAYER {
            return Err(SyncError::validation(
                "ch",
                format!("checker index {index} exceeds {}", CHECKERS_PER_PLAYER - 1),
            ));
        }
        Ok(Self { player, index })
    }

    pub fn player(&self) -> Player {
        self.player
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// Wire encoding
    pub fn raw(&self) -> i64 {
        (self.player.index() * 100 + self.index) as i64
    }
}

impl TryFrom<i64> for CheckerId {
    type Error = SyncError;

    fn try_from(value: i64) -> SyncResult<Self> {
        if value < 0 {
            return Err(SyncError::validation(
                "ch",
                format!("{value} is not a checker id"),
            ));
        }
        let player = Player::try_from(value / 100)
            .map_err(|_| SyncError::validation("ch", format!("{value} is not a checker id")))?;
        CheckerId::new(player, (value % 100) as usize)
    }
}

impl fmt::Display for CheckerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw())
    }
}

/// Validate a point index from the wire
pub fn checked_point(value: i64) -> SyncResult<u8> {
    if (0..=i64::from(MAX_POINT)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(SyncError::validation(
            "point",
            format!("{value} is outside 0..={MAX_POINT}"),
        ))
    }
}

/// Validate a stacking slot from the wire
pub fn checked_slot(value: i64) -> SyncResult<u8> {
    if (0..=i64::from(MAX_SLOT)).contains(&value) {
        Ok(value as u8)
    } else {
        Err(SyncError::validation(
            "idx",
            format!("{value} is outside 0..={MAX_SLOT}"),
        ))
    }
}
