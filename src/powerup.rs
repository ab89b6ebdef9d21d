use crate::error::GameError;
use crate::room::Room;
use crate::{turn, voting};
use wordchain_protocol::PowerupKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PowerupOutcome {
    /// The player gave up their turn; the turn has already advanced.
    Skipped,
    DoubleArmed,
    Challenged,
}

/// Spends one charge of `kind` from the named player.
pub(crate) fn consume(room: &mut Room, player_name: &str, kind: PowerupKind) -> Result<(), GameError> {
    let player = room
        .player_mut(player_name)
        .ok_or(GameError::PlayerNotFound)?;
    if player.powerups.consume(kind) {
        Ok(())
    } else {
        Err(GameError::NoUsesLeft)
    }
}

pub fn use_powerup(room: &mut Room, player_name: &str, powerup_id: &str) -> Result<PowerupOutcome, GameError> {
    let kind: PowerupKind = powerup_id.parse().map_err(|_| GameError::UnknownPowerup)?;
    if !room.in_progress() {
        return Err(GameError::GameNotActive);
    }
    let player = room.player(player_name).ok_or(GameError::PlayerNotFound)?;
    if player.powerups.remaining(kind) == 0 {
        return Err(GameError::NoUsesLeft);
    }

    match kind {
        PowerupKind::Skip => skip(room, player_name),
        PowerupKind::Double => {
            consume(room, player_name, kind)?;
            if let Some(player) = room.player_mut(player_name) {
                player.double_active = true;
            }
            Ok(PowerupOutcome::DoubleArmed)
        }
        PowerupKind::Challenge => {
            voting::challenge(room, player_name)?;
            Ok(PowerupOutcome::Challenged)
        }
    }
}

fn skip(room: &mut Room, player_name: &str) -> Result<PowerupOutcome, GameError> {
    if !room.is_turn_of(player_name) {
        return Err(GameError::NotYourTurn);
    }
    if room.voting_active() {
        return Err(GameError::VoteInProgress);
    }
    consume(room, player_name, PowerupKind::Skip)?;
    if let Some(player) = room.player_mut(player_name) {
        player.skipped = true;
        player.streak = 0;
    }
    turn::advance(room);
    Ok(PowerupOutcome::Skipped)
}
