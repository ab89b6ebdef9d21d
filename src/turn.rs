use crate::room::Room;

/// Resets the room for a fresh game and hands the first turn to player 0.
pub fn start(room: &mut Room) {
    room.game_started = true;
    room.game_over = false;
    room.chain.clear();
    room.clear_pending();
    room.current_turn_index = 0;
    room.turn_vacated = false;
    room.round = 1;
    room.current_theme = room.theme_for_round(1);
    for player in &mut room.players {
        player.reset();
    }
    room.next_generation();
}

/// Passes the turn to the next seat. Wrapping to seat 0 starts a new round,
/// and crossing the round cap ends the game.
pub fn advance(room: &mut Room) {
    if room.players.is_empty() {
        return;
    }
    if std::mem::take(&mut room.turn_vacated) {
        room.next_generation();
        return;
    }
    room.current_turn_index = (room.current_turn_index + 1) % room.players.len();
    if room.current_turn_index == 0 {
        room.round += 1;
        room.current_theme = room.theme_for_round(room.round);
        if room.round > room.max_rounds {
            room.game_over = true;
        }
    }
    room.next_generation();
}

/// Ends the game where it stands. A pending word is dropped unresolved.
pub fn finish(room: &mut Room) {
    room.game_over = true;
    room.clear_pending();
    room.next_generation();
}

/// Turn-timer expiry. Skips `expected` if the room is still in the exact turn
/// the timer was armed for. Returns the skipped player's name, or `None` when
/// the timer is stale.
///
/// A timeout costs no power-up and leaves the streak alone.
pub fn expire(room: &mut Room, generation: u64, expected: &str) -> Option<String> {
    if room.generation() != generation || !room.in_progress() || room.voting_active() {
        return None;
    }
    if !room.is_turn_of(expected) {
        return None;
    }
    advance(room);
    Some(expected.to_string())
}
