//! Message Dispatcher
//!
//! Stateless router from a typed inbound message to the work the engine has
//! to do: a validated state mutation (with its commit decision and the
//! animation hint to broadcast) or a history traversal.

use bgsync_core::protocol::{
    BannerUpdate, CubeUpdate, DiceUpdate, PlayerNameUpdate, PutChecker, ResignUpdate, TurnUpdate,
};
use bgsync_core::{
    ClientMessage, Direction, GameState, InboundMessage, NavigationConfig, NavigationRequest,
    SyncResult,
};

use crate::navigation::TraversalPlan;

// ----------------------------------------------------------------------------
// Mutations
// ----------------------------------------------------------------------------

/// A validated change to the live game state
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    NewGame,
    Replace(Box<GameState>),
    MoveChecker(PutChecker),
    Cube(CubeUpdate),
    Dice(DiceUpdate),
    Banner(BannerUpdate),
    Turn(TurnUpdate),
    PlayerName(PlayerNameUpdate),
    Resign(ResignUpdate),
}

impl Mutation {
    /// Apply to `state` as a whole: on error `state` is left untouched.
    /// Returns the post-mutation snapshot.
    pub fn apply(self, state: &mut GameState) -> SyncResult<GameState> {
        let mut next = state.clone();
        match self {
            Mutation::NewGame => {
                next.reset();
            }
            Mutation::Replace(incoming) => {
                // sn belongs to the ledger, never to the client
                let sn = next.sn;
                next.replace(*incoming)?;
                next.sn = sn;
            }
            Mutation::MoveChecker(PutChecker { ch, p, idx }) => {
                next.move_checker(ch, p, idx)?;
            }
            Mutation::Cube(CubeUpdate {
                side,
                value,
                accepted,
            }) => {
                next.set_cube(side, value, accepted)?;
            }
            Mutation::Dice(DiceUpdate { turn, player, dice }) => {
                next.set_dice(player, dice)?;
                if let Some(turn) = turn {
                    next.set_turn(turn)?;
                }
            }
            Mutation::Banner(BannerUpdate { player, text }) => {
                next.set_banner(player, text)?;
            }
            Mutation::Turn(TurnUpdate { turn }) => {
                next.set_turn(turn)?;
            }
            Mutation::PlayerName(PlayerNameUpdate { player, name }) => {
                next.set_player_name(player, name)?;
            }
            Mutation::Resign(ResignUpdate { player }) => {
                next.set_resign(player)?;
            }
        }
        *state = next;
        Ok(state.clone())
    }
}

// ----------------------------------------------------------------------------
// Routing
// ----------------------------------------------------------------------------

/// What the engine does with one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    Mutate {
        mutation: Mutation,
        /// Commit the result to history before broadcasting
        commit: bool,
        /// Animation hint carried by the resulting broadcast
        animation_secs: f64,
    },
    Navigate(TraversalPlan),
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    navigation: NavigationConfig,
}

impl Dispatcher {
    pub fn new(navigation: NavigationConfig) -> Self {
        Self { navigation }
    }

    pub fn route(&self, inbound: InboundMessage) -> Route {
        let history = inbound.history;
        match inbound.message {
            ClientMessage::New => Route::Mutate {
                mutation: Mutation::NewGame,
                commit: true,
                animation_secs: self.navigation.new_game_animation_secs,
            },
            ClientMessage::SetGameinfo(state) => Route::Mutate {
                mutation: Mutation::Replace(state),
                commit: true,
                animation_secs: 0.0,
            },
            ClientMessage::PutChecker(update) => self.mutate(Mutation::MoveChecker(update), history),
            ClientMessage::Cube(update) => self.mutate(Mutation::Cube(update), history),
            ClientMessage::Dice(update) => self.mutate(Mutation::Dice(update), history),
            ClientMessage::SetBanner(update) => self.mutate(Mutation::Banner(update), history),
            ClientMessage::SetTurn(update) => self.mutate(Mutation::Turn(update), history),
            ClientMessage::SetPlayerName(update) => {
                self.mutate(Mutation::PlayerName(update), history)
            }
            ClientMessage::Resign(update) => self.mutate(Mutation::Resign(update), history),
            ClientMessage::Navigate(request) => Route::Navigate(self.plan(request)),
        }
    }

    fn mutate(&self, mutation: Mutation, commit: bool) -> Route {
        Route::Mutate {
            mutation,
            commit,
            animation_secs: 0.0,
        }
    }

    /// Traversal parameters for a navigation request
    pub fn plan(&self, request: NavigationRequest) -> TraversalPlan {
        let nav = &self.navigation;
        match request {
            NavigationRequest::Back => TraversalPlan::single(Direction::Backward, nav),
            NavigationRequest::Fwd => TraversalPlan::single(Direction::Forward, nav),
            NavigationRequest::Back2 => TraversalPlan::slow(Direction::Backward, nav),
            NavigationRequest::Fwd2 => TraversalPlan::slow(Direction::Forward, nav),
            NavigationRequest::BackAll => TraversalPlan::fast(Direction::Backward, nav),
            NavigationRequest::FwdAll => TraversalPlan::fast(Direction::Forward, nav),
        }
    }
}
