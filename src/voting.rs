use crate::error::GameError;
use crate::powerup;
use crate::room::{PendingWord, Room};
use crate::{scoring, turn};
use wordchain_protocol::{Ballot, ChainEntry, ChainStatus, PowerupKind, VoteResolution};

/// Words are compared trimmed and case-folded.
pub fn normalize_word(word: &str) -> String {
    word.trim().to_lowercase()
}

/// Opens a vote on `word`. The turn does not move until the vote resolves.
pub fn submit_word(
    room: &mut Room,
    player_name: &str,
    word: &str,
    explanation: Option<&str>,
) -> Result<(), GameError> {
    if !room.in_progress() {
        return Err(GameError::GameNotActive);
    }
    if !room.is_turn_of(player_name) {
        return Err(GameError::NotYourTurn);
    }
    if room.voting_active() {
        return Err(GameError::VoteInProgress);
    }
    let word = normalize_word(word);
    if word.is_empty() {
        return Err(GameError::EmptyWord);
    }
    if room.chain.iter().any(|entry| entry.word == word) {
        return Err(GameError::DuplicateWord);
    }

    let explanation = explanation
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(String::from);
    room.votes.clear();
    room.challenged = false;
    room.pending = Some(PendingWord {
        word,
        explanation,
        player: player_name.to_string(),
    });
    room.next_generation();
    Ok(())
}

/// Records a ballot. Returns whether every seated player has now voted.
pub fn cast_vote(room: &mut Room, player_name: &str, ballot: &str) -> Result<bool, GameError> {
    if !room.voting_active() {
        return Err(GameError::NoVoteInProgress);
    }
    if room.player(player_name).is_none() {
        return Err(GameError::PlayerNotFound);
    }
    if room.votes.contains_key(player_name) {
        return Err(GameError::AlreadyVoted);
    }
    let ballot: Ballot = ballot.parse().map_err(|_| GameError::InvalidBallot)?;

    room.votes.insert(player_name.to_string(), ballot);
    Ok(all_voted(room))
}

pub fn all_voted(room: &Room) -> bool {
    room.voting_active() && room.votes.len() >= room.players.len()
}

/// Closes the open vote, if any.
///
/// The word is rejected only when every seated player voted no. Abstentions
/// count toward acceptance, and the submitter sits in the denominator whether
/// or not they voted.
pub fn resolve_vote(room: &mut Room) -> Option<VoteResolution> {
    let pending = room.pending.take()?;

    let total = room.players.len() as u32;
    let no_votes = room.votes.values().filter(|b| **b == Ballot::No).count() as u32;
    let yes_votes = room.votes.values().filter(|b| **b == Ballot::Yes).count() as u32;
    let accepted = no_votes < total;

    let award = room
        .player_mut(&pending.player)
        .map(|submitter| scoring::settle(submitter, accepted))
        .unwrap_or_default();

    let entry = ChainEntry {
        word: pending.word,
        player: pending.player,
        explanation: pending.explanation,
        status: if accepted {
            ChainStatus::Accepted
        } else {
            ChainStatus::Rejected
        },
        yes_votes,
        no_votes,
        points_earned: award.points,
        streak_bonus: award.streak_bonus,
    };
    room.chain.push(entry.clone());

    turn::advance(room);
    room.clear_pending();

    Some(VoteResolution {
        entry,
        accepted,
        points_earned: award.points,
        streak_bonus: award.streak_bonus,
        game_over: room.game_over,
    })
}

/// Vote-timer expiry: forces resolution only if the vote the timer was armed
/// for is still the one open.
pub fn expire(room: &mut Room, generation: u64) -> Option<VoteResolution> {
    if room.generation() != generation || !room.voting_active() {
        return None;
    }
    resolve_vote(room)
}

/// Wipes every ballot on the pending word and flags it for a revote.
/// Spends the challenger's power-up only when the challenge goes through.
pub fn challenge(room: &mut Room, player_name: &str) -> Result<(), GameError> {
    if !room.voting_active() {
        return Err(GameError::NoVoteInProgress);
    }
    if room.challenged {
        return Err(GameError::AlreadyChallenged);
    }
    powerup::consume(room, player_name, PowerupKind::Challenge)?;

    room.votes.clear();
    room.challenged = true;
    room.next_generation();
    Ok(())
}
