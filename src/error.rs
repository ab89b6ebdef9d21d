use thiserror::Error;
use wordchain_protocol::ErrorKind;

/// Every way a client intent can be refused. The display string is what the
/// client sees in its error ack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GameError {
    #[error("Name required")]
    NameRequired,
    #[error("Not your turn")]
    NotYourTurn,
    #[error("Empty word")]
    EmptyWord,
    #[error("Word already in chain")]
    DuplicateWord,
    #[error("Already voted")]
    AlreadyVoted,
    #[error("Invalid vote")]
    InvalidBallot,
    #[error("No uses left")]
    NoUsesLeft,
    #[error("Unknown powerup")]
    UnknownPowerup,
    #[error("Name already taken")]
    NameTaken,

    #[error("Room not found")]
    RoomNotFound,
    #[error("Player not found")]
    PlayerNotFound,

    #[error("Only host can {action}")]
    NotHost { action: &'static str },
    /// The connection is not seated in that room under that name.
    #[error("Not allowed to act as that player")]
    NotSeated,

    #[error("Game already started")]
    AlreadyStarted,
    #[error("Game is still in progress")]
    GameInProgress,
    #[error("Game is not in progress")]
    GameNotActive,
    #[error("Need at least 2 players")]
    NotEnoughPlayers,
    #[error("Voting in progress")]
    VoteInProgress,
    #[error("No vote in progress")]
    NoVoteInProgress,
    #[error("Already challenged")]
    AlreadyChallenged,
    #[error("Already in a room")]
    AlreadyInRoom,
}

impl GameError {
    pub fn kind(&self) -> ErrorKind {
        use GameError::*;
        match self {
            NameRequired | NotYourTurn | EmptyWord | DuplicateWord | AlreadyVoted
            | InvalidBallot | NoUsesLeft | UnknownPowerup | NameTaken => ErrorKind::Validation,
            RoomNotFound | PlayerNotFound => ErrorKind::NotFound,
            NotHost { .. } | NotSeated => ErrorKind::Authorization,
            AlreadyStarted | GameInProgress | GameNotActive | NotEnoughPlayers
            | VoteInProgress | NoVoteInProgress | AlreadyChallenged | AlreadyInRoom => {
                ErrorKind::StateConflict
            }
        }
    }
}
