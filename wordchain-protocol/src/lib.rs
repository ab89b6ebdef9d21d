use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A player's verdict on the pending word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ballot {
    Yes,
    No,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid ballot: {0:?}")]
pub struct ParseBallotError(pub String);

impl FromStr for Ballot {
    type Err = ParseBallotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yes" => Ok(Ballot::Yes),
            "no" => Ok(Ballot::No),
            other => Err(ParseBallotError(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerupKind {
    Skip,
    Challenge,
    Double,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown powerup: {0:?}")]
pub struct ParsePowerupError(pub String);

impl FromStr for PowerupKind {
    type Err = ParsePowerupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skip" => Ok(PowerupKind::Skip),
            "challenge" => Ok(PowerupKind::Challenge),
            "double" => Ok(PowerupKind::Double),
            other => Err(ParsePowerupError(other.to_string())),
        }
    }
}

impl fmt::Display for PowerupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = match self {
            PowerupKind::Skip => "skip",
            PowerupKind::Challenge => "challenge",
            PowerupKind::Double => "double",
        };
        f.write_str(id)
    }
}

/// Remaining uses of each power-up for one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Powerups {
    pub skip: u8,
    pub challenge: u8,
    pub double: u8,
}

impl Powerups {
    pub const USES_PER_GAME: u8 = 1;

    pub fn full() -> Self {
        Self {
            skip: Self::USES_PER_GAME,
            challenge: Self::USES_PER_GAME,
            double: Self::USES_PER_GAME,
        }
    }

    pub fn remaining(&self, kind: PowerupKind) -> u8 {
        match kind {
            PowerupKind::Skip => self.skip,
            PowerupKind::Challenge => self.challenge,
            PowerupKind::Double => self.double,
        }
    }

    /// Uses one charge. Returns false (and leaves the count alone) if none are left.
    pub fn consume(&mut self, kind: PowerupKind) -> bool {
        let slot = match kind {
            PowerupKind::Skip => &mut self.skip,
            PowerupKind::Challenge => &mut self.challenge,
            PowerupKind::Double => &mut self.double,
        };
        match slot.checked_sub(1) {
            Some(left) => {
                *slot = left;
                true
            }
            None => false,
        }
    }
}

impl Default for Powerups {
    fn default() -> Self {
        Self::full()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Theme {
    pub name: String,
    pub emoji: String,
    pub hint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainStatus {
    Accepted,
    Rejected,
}

/// One resolved submission. Never modified once appended to a chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    pub word: String,
    pub player: String,
    pub explanation: Option<String>,
    pub status: ChainStatus,
    pub yes_votes: u32,
    pub no_votes: u32,
    pub points_earned: u32,
    pub streak_bonus: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicPlayer {
    pub name: String,
    pub score: u32,
    pub streak: u32,
    pub powerups: Powerups,
    pub double_active: bool,
}

/// Everything a participant is allowed to see about a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicRoom {
    pub code: String,
    pub host: String,
    pub players: Vec<PublicPlayer>,
    pub game_started: bool,
    pub game_over: bool,
    pub chain: Vec<ChainEntry>,
    pub current_turn_index: usize,
    pub round: u32,
    pub max_rounds: u32,
    pub current_theme: Option<Theme>,
    pub voting_active: bool,
    pub pending_word: Option<String>,
    pub pending_explanation: Option<String>,
    pub pending_player: Option<String>,
    pub votes: BTreeMap<String, Ballot>,
    pub challenged: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteResolution {
    pub entry: ChainEntry,
    pub accepted: bool,
    pub points_earned: u32,
    pub streak_bonus: u32,
    pub game_over: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkipReason {
    Timeout,
    Powerup,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Authorization,
    StateConflict,
}

/// What a client asks the server to do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "intent", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Intent {
    CreateRoom {
        player_name: String,
    },
    JoinRoom {
        code: String,
        player_name: String,
    },
    StartGame {
        code: String,
        player_name: String,
    },
    SubmitWord {
        code: String,
        player_name: String,
        word: String,
        #[serde(default)]
        explanation: Option<String>,
    },
    CastVote {
        code: String,
        player_name: String,
        vote: String,
    },
    UsePowerup {
        code: String,
        player_name: String,
        powerup_id: String,
    },
    EndGame {
        code: String,
        player_name: String,
    },
    PlayAgain {
        code: String,
        player_name: String,
    },
}

impl Intent {
    pub fn name(&self) -> &'static str {
        match self {
            Intent::CreateRoom { .. } => "create_room",
            Intent::JoinRoom { .. } => "join_room",
            Intent::StartGame { .. } => "start_game",
            Intent::SubmitWord { .. } => "submit_word",
            Intent::CastVote { .. } => "cast_vote",
            Intent::UsePowerup { .. } => "use_powerup",
            Intent::EndGame { .. } => "end_game",
            Intent::PlayAgain { .. } => "play_again",
        }
    }
}

/// A client frame: an intent plus an optional correlation id echoed in the ack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub intent: Intent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AckOutcome {
    Ok {
        ok: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room: Option<PublicRoom>,
    },
    Err {
        error: String,
        kind: ErrorKind,
    },
}

/// Synchronous reply to the connection that sent an intent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub outcome: AckOutcome,
}

impl Ack {
    pub fn ok(id: Option<u64>, room: Option<PublicRoom>) -> Self {
        Self {
            id,
            outcome: AckOutcome::Ok { ok: true, room },
        }
    }

    pub fn error(id: Option<u64>, error: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            id,
            outcome: AckOutcome::Err {
                error: error.into(),
                kind,
            },
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, AckOutcome::Ok { .. })
    }
}

/// Fire-and-forget notifications sent to every member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    RoomUpdated(PublicRoom),
    GameStarted(PublicRoom),
    VotingStarted(PublicRoom),
    VoteUpdated(PublicRoom),
    VoteResolved {
        result: VoteResolution,
        room: PublicRoom,
    },
    GameOver(PublicRoom),
    PowerupUsed {
        player: String,
        powerup: PowerupKind,
        room: PublicRoom,
    },
    VoteChallenged {
        player: String,
        room: PublicRoom,
    },
    PlayerSkipped {
        player: String,
        reason: SkipReason,
        room: PublicRoom,
    },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::RoomUpdated(_) => "room_updated",
            ServerEvent::GameStarted(_) => "game_started",
            ServerEvent::VotingStarted(_) => "voting_started",
            ServerEvent::VoteUpdated(_) => "vote_updated",
            ServerEvent::VoteResolved { .. } => "vote_resolved",
            ServerEvent::GameOver(_) => "game_over",
            ServerEvent::PowerupUsed { .. } => "powerup_used",
            ServerEvent::VoteChallenged { .. } => "vote_challenged",
            ServerEvent::PlayerSkipped { .. } => "player_skipped",
        }
    }
}

/// Anything the server writes to a socket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    Event(ServerEvent),
    Ack(Ack),
}
