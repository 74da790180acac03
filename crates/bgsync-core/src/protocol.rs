//! Wire protocol
//!
//! Inbound messages arrive as a loose JSON envelope
//! `{ "type": .., "data": {..}, "history": bool }`. The envelope is parsed
//! first and then turned into a closed `ClientMessage` enum, so unknown
//! tags and missing fields are reported as errors instead of being
//! silently dropped.
//!
//! Outbound messages are `{ "src": "server", "dst": .., "type": .., "data": .. }`
//! where `type` is `gameinfo` for state pushes and `error` for rejections.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{SyncError, SyncResult};
use crate::game::GameState;
use crate::types::ClientId;

// ----------------------------------------------------------------------------
// Inbound Envelope
// ----------------------------------------------------------------------------

/// Untyped inbound envelope as sent by clients
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
    /// Commit the mutation to history before broadcasting
    #[serde(default)]
    pub history: bool,
}

/// A parsed, typed inbound message
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub message: ClientMessage,
    pub history: bool,
}

impl InboundMessage {
    pub fn new(message: ClientMessage, history: bool) -> Self {
        Self { message, history }
    }

    /// Parse a JSON text frame
    pub fn parse(text: &str) -> SyncResult<Self> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| SyncError::malformed(format!("invalid envelope: {e}")))?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> SyncResult<Self> {
        let message = ClientMessage::from_parts(&envelope.message_type, envelope.data)?;
        Ok(Self {
            message,
            history: envelope.history,
        })
    }
}

// ----------------------------------------------------------------------------
// Client Messages
// ----------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PutChecker {
    pub ch: i64,
    pub p: i64,
    pub idx: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CubeUpdate {
    pub side: i64,
    pub value: i64,
    pub accepted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiceUpdate {
    /// Older clients hand over the turn together with the roll
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub turn: Option<i64>,
    pub player: i64,
    pub dice: [i64; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BannerUpdate {
    pub player: i64,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnUpdate {
    pub turn: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerNameUpdate {
    pub player: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResignUpdate {
    pub player: i64,
}

/// History navigation requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NavigationRequest {
    /// One step back
    Back,
    /// Slow walk back
    Back2,
    /// Fast walk back to the root
    BackAll,
    /// One step forward
    Fwd,
    /// Slow walk forward
    Fwd2,
    /// Fast walk forward to the newest entry
    FwdAll,
}

/// Closed set of inbound message variants, one per `type` tag
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    New,
    SetGameinfo(Box<GameState>),
    PutChecker(PutChecker),
    Cube(CubeUpdate),
    Dice(DiceUpdate),
    SetBanner(BannerUpdate),
    SetTurn(TurnUpdate),
    SetPlayerName(PlayerNameUpdate),
    Resign(ResignUpdate),
    Navigate(NavigationRequest),
}

impl ClientMessage {
    /// Build a typed message from an envelope's `type` and `data`
    pub fn from_parts(message_type: &str, data: serde_json::Value) -> SyncResult<Self> {
        let message = match message_type {
            "new" => ClientMessage::New,
            "set_gameinfo" => ClientMessage::SetGameinfo(Box::new(payload(message_type, data)?)),
            "put_checker" => ClientMessage::PutChecker(payload(message_type, data)?),
            "cube" => ClientMessage::Cube(payload(message_type, data)?),
            "dice" => ClientMessage::Dice(payload(message_type, data)?),
            "set_banner" => ClientMessage::SetBanner(payload(message_type, data)?),
            "turn" => ClientMessage::SetTurn(payload(message_type, data)?),
            "set_playername" => ClientMessage::SetPlayerName(payload(message_type, data)?),
            "resign" => ClientMessage::Resign(payload(message_type, data)?),
            "back" => ClientMessage::Navigate(NavigationRequest::Back),
            "back2" => ClientMessage::Navigate(NavigationRequest::Back2),
            "back_all" => ClientMessage::Navigate(NavigationRequest::BackAll),
            "fwd" => ClientMessage::Navigate(NavigationRequest::Fwd),
            "fwd2" => ClientMessage::Navigate(NavigationRequest::Fwd2),
            "fwd_all" => ClientMessage::Navigate(NavigationRequest::FwdAll),
            other => {
                return Err(SyncError::UnknownMessageType {
                    message_type: other.to_string(),
                })
            }
        };
        Ok(message)
    }

    /// The wire `type` tag of this message
    pub fn message_type(&self) -> &'static str {
        match self {
            ClientMessage::New => "new",
            ClientMessage::SetGameinfo(_) => "set_gameinfo",
            ClientMessage::PutChecker(_) => "put_checker",
            ClientMessage::Cube(_) => "cube",
            ClientMessage::Dice(_) => "dice",
            ClientMessage::SetBanner(_) => "set_banner",
            ClientMessage::SetTurn(_) => "turn",
            ClientMessage::SetPlayerName(_) => "set_playername",
            ClientMessage::Resign(_) => "resign",
            ClientMessage::Navigate(NavigationRequest::Back) => "back",
            ClientMessage::Navigate(NavigationRequest::Back2) => "back2",
            ClientMessage::Navigate(NavigationRequest::BackAll) => "back_all",
            ClientMessage::Navigate(NavigationRequest::Fwd) => "fwd",
            ClientMessage::Navigate(NavigationRequest::Fwd2) => "fwd2",
            ClientMessage::Navigate(NavigationRequest::FwdAll) => "fwd_all",
        }
    }
}

fn payload<T: DeserializeOwned>(message_type: &str, data: serde_json::Value) -> SyncResult<T> {
    serde_json::from_value(data)
        .map_err(|e| SyncError::malformed(format!("{message_type}: {e}")))
}

// ----------------------------------------------------------------------------
// Server Messages
// ----------------------------------------------------------------------------

/// Sender tag on every outbound message
pub const SERVER_SOURCE: &str = "server";

/// Destination tag for broadcasts
pub const BROADCAST_DESTINATION: &str = "all";

/// Payload of a `gameinfo` push
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameInfo {
    pub gameinfo: GameState,
    /// Suggested client-side animation duration in seconds
    pub sec: f64,
    /// Position of the current entry (`len(history)`)
    pub hist_i: usize,
    /// Reachable entries (`len(history) + len(redo)`)
    pub hist_n: usize,
}

/// Payload of an `error` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerPayload {
    Gameinfo(GameInfo),
    Error(ErrorInfo),
}

/// Outbound notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerMessage {
    pub src: String,
    pub dst: String,
    #[serde(flatten)]
    pub payload: ServerPayload,
}

impl ServerMessage {
    /// State push to every client
    pub fn broadcast_gameinfo(gameinfo: GameState, sec: f64, hist_i: usize, hist_n: usize) -> Self {
        Self {
            src: SERVER_SOURCE.to_string(),
            dst: BROADCAST_DESTINATION.to_string(),
            payload: ServerPayload::Gameinfo(GameInfo {
                gameinfo,
                sec,
                hist_i,
                hist_n,
            }),
        }
    }

    /// State push to a single client
    pub fn gameinfo_to(
        client: ClientId,
        gameinfo: GameState,
        sec: f64,
        hist_i: usize,
        hist_n: usize,
    ) -> Self {
        Self {
            dst: client.to_string(),
            ..Self::broadcast_gameinfo(gameinfo, sec, hist_i, hist_n)
        }
    }

    /// Rejection of a client's message
    pub fn error_to(client: ClientId, error: &SyncError) -> Self {
        Self {
            src: SERVER_SOURCE.to_string(),
            dst: client.to_string(),
            payload: ServerPayload::Error(ErrorInfo {
                kind: error.kind().to_string(),
                reason: error.to_string(),
            }),
        }
    }

    pub fn as_gameinfo(&self) -> Option<&GameInfo> {
        match &self.payload {
            ServerPayload::Gameinfo(info) => Some(info),
            ServerPayload::Error(_) => None,
        }
    }

    pub fn as_error(&self) -> Option<&ErrorInfo> {
        match &self.payload {
            ServerPayload::Error(info) => Some(info),
            ServerPayload::Gameinfo(_) => None,
        }
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
