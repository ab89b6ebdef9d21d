use std::collections::BTreeMap;
use wordchain_protocol::{Ballot, ChainEntry, Powerups, PublicPlayer, PublicRoom, Theme};

pub const MAX_ROUNDS: u32 = 7;
pub const MIN_PLAYERS: usize = 2;

const ROUND_THEMES: [(&str, &str, &str); 7] = [
    ("Nature", "🌿", "Think forests, oceans, weather, animals"),
    ("Emotions", "💭", "Feelings, moods, states of mind"),
    ("Technology", "⚡", "Gadgets, software, the digital world"),
    ("Food", "🍜", "Ingredients, dishes, flavors, cooking"),
    ("Cities", "🌆", "Urban life, architecture, movement"),
    ("Wild Card", "🃏", "Anything goes, be creative"),
    ("Mythology", "⚔️", "Legends, gods, folklore, epic tales"),
];

/// The built-in theme list, in canonical order (rooms shuffle their own copy).
pub fn default_themes() -> Vec<Theme> {
    ROUND_THEMES
        .iter()
        .map(|(name, emoji, hint)| Theme {
            name: name.to_string(),
            emoji: emoji.to_string(),
            hint: hint.to_string(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub score: u32,
    pub streak: u32,
    pub powerups: Powerups,
    pub double_active: bool,
    /// Set when the player spent their skip power-up this game.
    pub skipped: bool,
}

impl Player {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: 0,
            streak: 0,
            powerups: Powerups::full(),
            double_active: false,
            skipped: false,
        }
    }

    /// Zeroes everything that belongs to a single game.
    pub fn reset(&mut self) {
        self.score = 0;
        self.streak = 0;
        self.powerups = Powerups::full();
        self.double_active = false;
        self.skipped = false;
    }

    fn public(&self) -> PublicPlayer {
        PublicPlayer {
            name: self.name.clone(),
            score: self.score,
            streak: self.streak,
            powerups: self.powerups,
            double_active: self.double_active,
        }
    }
}

/// The word currently under vote. Present exactly while voting is active.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingWord {
    pub word: String,
    pub explanation: Option<String>,
    pub player: String,
}

/// What happened to the room when a player was taken out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub name: String,
    pub index: usize,
    pub was_host: bool,
    /// The departing player held the turn and someone else holds it now.
    pub turn_passed: bool,
}

#[derive(Debug, Clone)]
pub struct Room {
    code: String,
    pub(crate) host: String,
    pub(crate) players: Vec<Player>,
    pub(crate) chain: Vec<ChainEntry>,
    pub(crate) current_turn_index: usize,
    pub(crate) round: u32,
    pub(crate) max_rounds: u32,
    pub(crate) current_theme: Option<Theme>,
    themes: Vec<Theme>,
    pub(crate) pending: Option<PendingWord>,
    pub(crate) votes: BTreeMap<String, Ballot>,
    pub(crate) challenged: bool,
    pub(crate) game_started: bool,
    pub(crate) game_over: bool,
    /// The turn holder left mid-vote; their successor already sits at
    /// `current_turn_index`, so the next advance must not move the index.
    pub(crate) turn_vacated: bool,
    generation: u64,
}

impl Room {
    pub fn new(code: impl Into<String>, host: impl Into<String>, themes: Vec<Theme>, max_rounds: u32) -> Self {
        let host = host.into();
        Self {
            code: code.into(),
            players: vec![Player::new(host.clone())],
            host,
            chain: Vec::new(),
            current_turn_index: 0,
            round: 1,
            max_rounds,
            current_theme: None,
            themes,
            pending: None,
            votes: BTreeMap::new(),
            challenged: false,
            game_started: false,
            game_over: false,
            turn_vacated: false,
            generation: 0,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn players(&self) -> &[Player] {
        &self.players
    }

    pub fn chain(&self) -> &[ChainEntry] {
        &self.chain
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn current_turn_index(&self) -> usize {
        self.current_turn_index
    }

    pub fn is_host(&self, name: &str) -> bool {
        self.host == name
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub(crate) fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn current_player(&self) -> Option<&Player> {
        self.players.get(self.current_turn_index)
    }

    pub fn is_turn_of(&self, name: &str) -> bool {
        self.current_player().is_some_and(|p| p.name == name)
    }

    pub fn voting_active(&self) -> bool {
        self.pending.is_some()
    }

    pub fn is_over(&self) -> bool {
        self.game_over
    }

    /// A game has started and has not finished.
    pub fn in_progress(&self) -> bool {
        self.game_started && !self.game_over
    }

    pub(crate) fn add_player(&mut self, name: impl Into<String>) {
        self.players.push(Player::new(name));
    }

    /// The theme for a 1-based round; rounds beyond the list reuse the last theme.
    pub(crate) fn theme_for_round(&self, round: u32) -> Option<Theme> {
        let last = self.themes.len().checked_sub(1)?;
        let index = (round.saturating_sub(1) as usize).min(last);
        self.themes.get(index).cloned()
    }

    /// Identifies the current turn or vote instance. Timers armed for an
    /// older generation must not act.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending = None;
        self.votes.clear();
        self.challenged = false;
    }

    /// Removes a player without reordering the others.
    ///
    /// Turn policy: whoever held the turn keeps it. If the departing player
    /// held it, the next player in rotation inherits it; falling off the end
    /// wraps to index 0 without starting a new round. If their word is still
    /// under vote, the successor inherits the turn once that vote resolves.
    pub(crate) fn remove_player(&mut self, name: &str) -> Option<Removal> {
        let index = self.players.iter().position(|p| p.name == name)?;
        let removed = self.players.remove(index);
        self.votes.remove(&removed.name);

        let held_turn = index == self.current_turn_index;
        if index < self.current_turn_index {
            self.current_turn_index -= 1;
        }
        if self.current_turn_index >= self.players.len() {
            self.current_turn_index = 0;
        }

        let was_host = removed.name == self.host;
        if was_host {
            if let Some(first) = self.players.first() {
                self.host = first.name.clone();
            }
        }

        let turn_passed = held_turn && !self.players.is_empty();
        if turn_passed && self.voting_active() {
            self.turn_vacated = true;
        }

        Some(Removal {
            name: removed.name,
            index,
            was_host,
            turn_passed: turn_passed && !self.turn_vacated,
        })
    }

    pub fn public(&self) -> PublicRoom {
        PublicRoom {
            code: self.code.clone(),
            host: self.host.clone(),
            players: self.players.iter().map(Player::public).collect(),
            game_started: self.game_started,
            game_over: self.game_over,
            chain: self.chain.clone(),
            current_turn_index: self.current_turn_index,
            round: self.round,
            max_rounds: self.max_rounds,
            current_theme: self.current_theme.clone(),
            voting_active: self.voting_active(),
            pending_word: self.pending.as_ref().map(|p| p.word.clone()),
            pending_explanation: self.pending.as_ref().and_then(|p| p.explanation.clone()),
            pending_player: self.pending.as_ref().map(|p| p.player.clone()),
            votes: self.votes.clone(),
            challenged: self.challenged,
        }
    }
}
