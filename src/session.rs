//! Entry point for client intents.
//!
//! Every intent locks exactly one room, validates and mutates it through the
//! controllers, broadcasts the outcome, and re-arms that room's phase timer
//! before the lock is released. Timer callbacks go through the same lock and
//! re-check the phase generation they were armed for.

use crate::error::GameError;
use crate::hub::Broadcaster;
use crate::powerup::{self, PowerupOutcome};
use crate::registry::{normalize_code, normalize_name, ConnectionId, Membership, RoomRegistry, RoomSlot};
use crate::room::{MAX_ROUNDS, MIN_PLAYERS};
use crate::timer::TimerKind;
use crate::{turn, voting};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};
use wordchain_protocol::{Intent, PowerupKind, PublicRoom, ServerEvent, SkipReason};

pub const TURN_TIMEOUT: Duration = Duration::from_secs(15);
pub const VOTE_TIMEOUT: Duration = Duration::from_secs(12);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameConfig {
    pub turn_timeout: Duration,
    pub vote_timeout: Duration,
    pub max_rounds: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turn_timeout: TURN_TIMEOUT,
            vote_timeout: VOTE_TIMEOUT,
            max_rounds: MAX_ROUNDS,
        }
    }
}

#[derive(Clone)]
pub struct SessionOrchestrator {
    inner: Arc<Inner>,
}

struct Inner {
    registry: RoomRegistry,
    broadcaster: Arc<dyn Broadcaster>,
    config: GameConfig,
}

impl SessionOrchestrator {
    pub fn new(config: GameConfig, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry: RoomRegistry::new(config.max_rounds),
                broadcaster,
                config,
            }),
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.inner.registry
    }

    pub fn config(&self) -> &GameConfig {
        &self.inner.config
    }

    /// Dispatches one intent from `conn`. `Ok(Some(room))` is returned for
    /// intents whose ack carries the room projection.
    ///
    /// Once seated, a connection may only act in its own room under the name
    /// it joined with.
    pub async fn handle(&self, conn: ConnectionId, intent: Intent) -> Result<Option<PublicRoom>, GameError> {
        let name = intent.name();
        let result = self.dispatch(conn, intent).await;
        if let Err(e) = &result {
            debug!(%conn, intent = name, error = %e, "intent rejected");
        }
        result
    }

    async fn dispatch(&self, conn: ConnectionId, intent: Intent) -> Result<Option<PublicRoom>, GameError> {
        match intent {
            Intent::CreateRoom { player_name } => self.create_room(conn, &player_name).await.map(Some),
            Intent::JoinRoom { code, player_name } => self.join_room(conn, &code, &player_name).await.map(Some),
            Intent::StartGame { code, player_name } => {
                let seat = self.authorize(conn, &code, &player_name).await?;
                self.start_game(&seat.code, &seat.player).await?;
                Ok(None)
            }
            Intent::SubmitWord {
                code,
                player_name,
                word,
                explanation,
            } => {
                let seat = self.authorize(conn, &code, &player_name).await?;
                self.submit_word(&seat.code, &seat.player, &word, explanation.as_deref())
                    .await?;
                Ok(None)
            }
            Intent::CastVote {
                code,
                player_name,
                vote,
            } => {
                let seat = self.authorize(conn, &code, &player_name).await?;
                self.cast_vote(&seat.code, &seat.player, &vote).await?;
                Ok(None)
            }
            Intent::UsePowerup {
                code,
                player_name,
                powerup_id,
            } => {
                let seat = self.authorize(conn, &code, &player_name).await?;
                self.use_powerup(&seat.code, &seat.player, &powerup_id).await?;
                Ok(None)
            }
            Intent::EndGame { code, player_name } => {
                let seat = self.authorize(conn, &code, &player_name).await?;
                self.end_game(&seat.code, &seat.player).await?;
                Ok(None)
            }
            Intent::PlayAgain { code, player_name } => {
                let seat = self.authorize(conn, &code, &player_name).await?;
                self.play_again(&seat.code, &seat.player).await?;
                Ok(None)
            }
        }
    }

    /// The seat `conn` holds, if it matches the room and name it claims.
    async fn authorize(&self, conn: ConnectionId, code: &str, player_name: &str) -> Result<Membership, GameError> {
        let seat = self
            .inner
            .registry
            .membership(conn)
            .await
            .ok_or(GameError::NotSeated)?;
        if seat.code != normalize_code(code) || seat.player != normalize_name(player_name) {
            return Err(GameError::NotSeated);
        }
        Ok(seat)
    }

    pub async fn create_room(&self, conn: ConnectionId, player_name: &str) -> Result<PublicRoom, GameError> {
        let room = self.inner.registry.create(conn, player_name).await?;
        self.inner.broadcaster.subscribe(&room.code, conn).await;
        Ok(room)
    }

    pub async fn join_room(&self, conn: ConnectionId, code: &str, player_name: &str) -> Result<PublicRoom, GameError> {
        let room = self.inner.registry.join(conn, code, player_name).await?;
        self.inner.broadcaster.subscribe(&room.code, conn).await;
        self.publish(&room.code, ServerEvent::RoomUpdated(room.clone())).await;
        Ok(room)
    }

    pub(crate) async fn start_game(&self, code: &str, player_name: &str) -> Result<(), GameError> {
        let mut slot = self.lock(code).await?;
        if !slot.room.is_host(player_name) {
            return Err(GameError::NotHost { action: "start" });
        }
        if slot.room.in_progress() {
            return Err(GameError::AlreadyStarted);
        }
        self.begin(&mut slot).await
    }

    /// Restarts a finished game. A running game is refused rather than
    /// reset; the host ends it first with `end_game`.
    pub(crate) async fn play_again(&self, code: &str, player_name: &str) -> Result<(), GameError> {
        let mut slot = self.lock(code).await?;
        if !slot.room.is_host(player_name) {
            return Err(GameError::NotHost { action: "restart" });
        }
        if slot.room.in_progress() {
            return Err(GameError::GameInProgress);
        }
        self.begin(&mut slot).await
    }

    async fn begin(&self, slot: &mut RoomSlot) -> Result<(), GameError> {
        if slot.room.players().len() < MIN_PLAYERS {
            return Err(GameError::NotEnoughPlayers);
        }
        turn::start(&mut slot.room);
        info!(room = %slot.room.code(), players = slot.room.players().len(), "game started");
        self.publish(slot.room.code(), ServerEvent::GameStarted(slot.room.public()))
            .await;
        self.arm_turn_timer(slot);
        Ok(())
    }

    pub(crate) async fn submit_word(
        &self,
        code: &str,
        player_name: &str,
        word: &str,
        explanation: Option<&str>,
    ) -> Result<(), GameError> {
        let mut slot = self.lock(code).await?;
        voting::submit_word(&mut slot.room, player_name, word, explanation)?;
        debug!(room = %slot.room.code(), player = %player_name, "voting started");
        self.publish(slot.room.code(), ServerEvent::VotingStarted(slot.room.public()))
            .await;
        self.arm_vote_timer(&mut slot);
        Ok(())
    }

    pub(crate) async fn cast_vote(&self, code: &str, player_name: &str, ballot: &str) -> Result<(), GameError> {
        let mut slot = self.lock(code).await?;
        let all_voted = voting::cast_vote(&mut slot.room, player_name, ballot)?;
        self.publish(slot.room.code(), ServerEvent::VoteUpdated(slot.room.public()))
            .await;
        if all_voted {
            self.resolve_open_vote(&mut slot).await;
        }
        Ok(())
    }

    pub(crate) async fn use_powerup(&self, code: &str, player_name: &str, powerup_id: &str) -> Result<(), GameError> {
        let mut slot = self.lock(code).await?;
        let outcome = powerup::use_powerup(&mut slot.room, player_name, powerup_id)?;
        let code = slot.room.code().to_string();
        info!(room = %code, player = %player_name, powerup = %powerup_id, "powerup used");
        match outcome {
            PowerupOutcome::Skipped => {
                self.publish(
                    &code,
                    ServerEvent::PowerupUsed {
                        player: player_name.to_string(),
                        powerup: PowerupKind::Skip,
                        room: slot.room.public(),
                    },
                )
                .await;
                self.publish(
                    &code,
                    ServerEvent::PlayerSkipped {
                        player: player_name.to_string(),
                        reason: SkipReason::Powerup,
                        room: slot.room.public(),
                    },
                )
                .await;
                self.after_turn_change(&mut slot).await;
            }
            PowerupOutcome::DoubleArmed => {
                self.publish(
                    &code,
                    ServerEvent::PowerupUsed {
                        player: player_name.to_string(),
                        powerup: PowerupKind::Double,
                        room: slot.room.public(),
                    },
                )
                .await;
            }
            PowerupOutcome::Challenged => {
                self.publish(
                    &code,
                    ServerEvent::VoteChallenged {
                        player: player_name.to_string(),
                        room: slot.room.public(),
                    },
                )
                .await;
                self.arm_vote_timer(&mut slot);
            }
        }
        Ok(())
    }

    /// Host-only. Refused when no game is running so a finished game is
    /// never announced over twice.
    pub(crate) async fn end_game(&self, code: &str, player_name: &str) -> Result<(), GameError> {
        let mut slot = self.lock(code).await?;
        if !slot.room.is_host(player_name) {
            return Err(GameError::NotHost { action: "end the game" });
        }
        if !slot.room.in_progress() {
            return Err(GameError::GameNotActive);
        }
        turn::finish(&mut slot.room);
        slot.timers.cancel();
        info!(room = %slot.room.code(), "game ended by host");
        self.publish(slot.room.code(), ServerEvent::GameOver(slot.room.public()))
            .await;
        Ok(())
    }

    /// Connection closed. Host leaving hands the room to the next player;
    /// the last player leaving destroys it.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let Some(departure) = self.inner.registry.remove(conn).await else {
            return;
        };
        self.inner
            .broadcaster
            .unsubscribe(&departure.code, conn)
            .await;
        let Some(mut slot) = departure.slot else {
            return;
        };

        self.publish(&departure.code, ServerEvent::RoomUpdated(slot.room.public()))
            .await;
        if !slot.room.in_progress() {
            return;
        }
        if voting::all_voted(&slot.room) {
            self.resolve_open_vote(&mut slot).await;
        } else if departure.removal.turn_passed {
            slot.room.next_generation();
            self.arm_turn_timer(&mut slot);
        }
    }

    /// Current projection of a room, if it exists.
    pub async fn snapshot(&self, code: &str) -> Option<PublicRoom> {
        self.lock(code).await.ok().map(|slot| slot.room.public())
    }

    async fn lock(&self, code: &str) -> Result<OwnedMutexGuard<RoomSlot>, GameError> {
        let handle = self.inner.registry.get(&normalize_code(code)).await?;
        let slot = handle.lock_owned().await;
        if slot.is_closed() {
            return Err(GameError::RoomNotFound);
        }
        Ok(slot)
    }

    async fn publish(&self, code: &str, event: ServerEvent) {
        self.inner.broadcaster.publish(code, event).await;
    }

    async fn resolve_open_vote(&self, slot: &mut RoomSlot) {
        slot.timers.cancel();
        let Some(result) = voting::resolve_vote(&mut slot.room) else {
            return;
        };
        debug!(room = %slot.room.code(), word = %result.entry.word, accepted = result.accepted, "vote resolved");
        self.publish(
            slot.room.code(),
            ServerEvent::VoteResolved {
                result,
                room: slot.room.public(),
            },
        )
        .await;
        self.after_turn_change(slot).await;
    }

    /// Either announces the end of the game or starts the next turn's clock.
    async fn after_turn_change(&self, slot: &mut RoomSlot) {
        if slot.room.is_over() {
            slot.timers.cancel();
            info!(room = %slot.room.code(), "game over");
            self.publish(slot.room.code(), ServerEvent::GameOver(slot.room.public()))
                .await;
        } else {
            self.arm_turn_timer(slot);
        }
    }

    fn arm_turn_timer(&self, slot: &mut RoomSlot) {
        let room = &slot.room;
        let expected = match room.current_player() {
            Some(player) if room.in_progress() && !room.voting_active() => player.name.clone(),
            _ => {
                slot.timers.cancel();
                return;
            }
        };
        let generation = room.generation();
        let weak = slot.weak();
        let session = self.clone();
        let delay = self.inner.config.turn_timeout;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            session.on_turn_timeout(weak, generation, expected).await;
        });
        slot.timers.arm(TimerKind::Turn, task);
    }

    fn arm_vote_timer(&self, slot: &mut RoomSlot) {
        if !slot.room.voting_active() {
            slot.timers.cancel();
            return;
        }
        let generation = slot.room.generation();
        let weak = slot.weak();
        let session = self.clone();
        let delay = self.inner.config.vote_timeout;
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            session.on_vote_timeout(weak, generation).await;
        });
        slot.timers.arm(TimerKind::Vote, task);
    }

    async fn on_turn_timeout(&self, weak: Weak<Mutex<RoomSlot>>, generation: u64, expected: String) {
        let Some(handle) = weak.upgrade() else {
            debug!(generation, "turn timer fired for a deleted room");
            return;
        };
        let mut slot = handle.lock().await;
        if slot.is_closed() {
            return;
        }
        let Some(skipped) = turn::expire(&mut slot.room, generation, &expected) else {
            debug!(room = %slot.room.code(), generation, "stale turn timer");
            return;
        };
        slot.timers.release(TimerKind::Turn);
        info!(room = %slot.room.code(), player = %skipped, "turn timed out");
        self.publish(
            slot.room.code(),
            ServerEvent::PlayerSkipped {
                player: skipped,
                reason: SkipReason::Timeout,
                room: slot.room.public(),
            },
        )
        .await;
        self.after_turn_change(&mut slot).await;
    }

    async fn on_vote_timeout(&self, weak: Weak<Mutex<RoomSlot>>, generation: u64) {
        let Some(handle) = weak.upgrade() else {
            debug!(generation, "vote timer fired for a deleted room");
            return;
        };
        let mut slot = handle.lock().await;
        if slot.is_closed() {
            return;
        }
        let Some(result) = voting::expire(&mut slot.room, generation) else {
            debug!(room = %slot.room.code(), generation, "stale vote timer");
            return;
        };
        slot.timers.release(TimerKind::Vote);
        info!(room = %slot.room.code(), word = %result.entry.word, "vote timed out");
        self.publish(
            slot.room.code(),
            ServerEvent::VoteResolved {
                result,
                room: slot.room.public(),
            },
        )
        .await;
        self.after_turn_change(&mut slot).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use uuid::Uuid;
    use wordchain_protocol::{ChainStatus, ServerMessage};

    #[derive(Default)]
    struct Recorder {
        events: std::sync::Mutex<Vec<(String, ServerEvent)>>,
    }

    impl Recorder {
        fn names(&self) -> Vec<&'static str> {
            self.events
                .lock()
                .unwrap()
                .iter()
                .map(|(_, e)| e.name())
                .collect()
        }

        fn last(&self) -> ServerEvent {
            self.events.lock().unwrap().last().unwrap().1.clone()
        }

        fn clear(&self) {
            self.events.lock().unwrap().clear();
        }
    }

    #[async_trait]
    impl Broadcaster for Recorder {
        async fn subscribe(&self, _code: &str, _conn: ConnectionId) {}
        async fn unsubscribe(&self, _code: &str, _conn: ConnectionId) {}
        async fn publish(&self, code: &str, event: ServerEvent) {
            self.events.lock().unwrap().push((code.to_string(), event));
        }
        async fn send_to(&self, _conn: ConnectionId, _message: ServerMessage) {}
    }

    struct Table {
        session: SessionOrchestrator,
        recorder: Arc<Recorder>,
        code: String,
        conns: Vec<ConnectionId>,
    }

    fn config() -> GameConfig {
        GameConfig {
            turn_timeout: Duration::from_secs(15),
            vote_timeout: Duration::from_secs(12),
            max_rounds: MAX_ROUNDS,
        }
    }

    async fn table(names: &[&str], config: GameConfig) -> Table {
        let recorder = Arc::new(Recorder::default());
        let session = SessionOrchestrator::new(config, recorder.clone());
        let conns: Vec<_> = names.iter().map(|_| Uuid::new_v4()).collect();
        let room = session.create_room(conns[0], names[0]).await.unwrap();
        for (conn, name) in conns.iter().zip(names).skip(1) {
            session.join_room(*conn, &room.code, name).await.unwrap();
        }
        recorder.clear();
        Table {
            session,
            recorder,
            code: room.code,
            conns,
        }
    }

    async fn started(names: &[&str]) -> Table {
        let t = table(names, config()).await;
        t.session.start_game(&t.code, names[0]).await.unwrap();
        t.recorder.clear();
        t
    }

    async fn sleep(secs: u64) {
        tokio::time::sleep(Duration::from_secs(secs)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn start_requires_host_and_two_players() {
        let t = table(&["ana"], config()).await;
        assert_eq!(
            t.session.start_game(&t.code, "ana").await,
            Err(GameError::NotEnoughPlayers)
        );
        t.session.join_room(Uuid::new_v4(), &t.code, "bo").await.unwrap();
        assert_eq!(
            t.session.start_game(&t.code, "bo").await,
            Err(GameError::NotHost { action: "start" })
        );
        t.session.start_game(&t.code, "ana").await.unwrap();
        assert_eq!(t.recorder.names().last(), Some(&"game_started"));
        assert_eq!(
            t.session.start_game(&t.code, "ana").await,
            Err(GameError::AlreadyStarted)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_room_is_not_found() {
        let t = table(&["ana"], config()).await;
        assert_eq!(
            t.session.submit_word("ZZZZZZ", "ana", "ocean", None).await,
            Err(GameError::RoomNotFound)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn split_vote_accepts_and_scores() {
        let t = started(&["ana", "bo", "cy"]).await;
        t.session.submit_word(&t.code, "ana", "Ocean", None).await.unwrap();
        t.session.cast_vote(&t.code, "bo", "yes").await.unwrap();
        t.session.cast_vote(&t.code, "cy", "no").await.unwrap();
        t.session.cast_vote(&t.code, "ana", "yes").await.unwrap();

        assert_eq!(
            t.recorder.names(),
            ["voting_started", "vote_updated", "vote_updated", "vote_updated", "vote_resolved"]
        );
        let ServerEvent::VoteResolved { result, room } = t.recorder.last() else {
            panic!("expected vote_resolved");
        };
        assert!(result.accepted);
        assert_eq!(result.entry.word, "ocean");
        assert_eq!(room.players[0].score, 1);
        assert_eq!(room.players[0].streak, 1);
        assert_eq!(room.current_turn_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn vote_timeout_resolves_with_abstentions() {
        let t = started(&["ana", "bo", "cy"]).await;
        t.session.submit_word(&t.code, "ana", "ocean", None).await.unwrap();
        t.session.cast_vote(&t.code, "bo", "no").await.unwrap();
        t.session.cast_vote(&t.code, "cy", "no").await.unwrap();

        sleep(13).await;

        let ServerEvent::VoteResolved { result, room } = t.recorder.last() else {
            panic!("expected vote_resolved, got {:?}", t.recorder.names());
        };
        assert!(result.accepted, "2 no of 3 seats still accepts");
        assert_eq!(result.entry.no_votes, 2);
        assert!(!room.voting_active);
    }

    #[tokio::test(start_paused = true)]
    async fn unanimous_no_rejects() {
        let t = started(&["ana", "bo"]).await;
        t.session.use_powerup(&t.code, "ana", "double").await.unwrap();
        t.session.submit_word(&t.code, "ana", "ocean", None).await.unwrap();
        t.session.cast_vote(&t.code, "ana", "no").await.unwrap();
        t.session.cast_vote(&t.code, "bo", "no").await.unwrap();

        let ServerEvent::VoteResolved { result, room } = t.recorder.last() else {
            panic!("expected vote_resolved");
        };
        assert!(!result.accepted);
        assert_eq!(result.entry.status, ChainStatus::Rejected);
        assert_eq!(room.players[0].score, 0);
        assert!(!room.players[0].double_active);
    }

    #[tokio::test(start_paused = true)]
    async fn turn_timeout_skips_for_free() {
        let t = started(&["ana", "bo", "cy"]).await;

        sleep(16).await;

        let names = t.recorder.names();
        assert_eq!(names, ["player_skipped"]);
        let ServerEvent::PlayerSkipped { player, reason, room } = t.recorder.last() else {
            panic!("expected player_skipped");
        };
        assert_eq!(player, "ana");
        assert_eq!(reason, SkipReason::Timeout);
        assert_eq!(room.current_turn_index, 1);
        assert_eq!(room.players[0].powerups.skip, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn turn_timer_rearms_for_each_turn() {
        let t = started(&["ana", "bo"]).await;
        sleep(16).await;
        sleep(15).await;
        let skipped: Vec<String> = t
            .recorder
            .events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|(_, e)| match e {
                ServerEvent::PlayerSkipped { player, .. } => Some(player.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(skipped, ["ana", "bo"]);
        let room = t.session.snapshot(&t.code).await.unwrap();
        assert_eq!(room.round, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn submitting_cancels_turn_timer() {
        let t = started(&["ana", "bo"]).await;
        sleep(10).await;
        t.session.submit_word(&t.code, "ana", "ocean", None).await.unwrap();
        sleep(10).await;
        // 20s in: the turn timer would have fired at 15s, the vote timer not yet.
        assert_eq!(t.recorder.names(), ["voting_started"]);
        sleep(3).await;
        assert_eq!(t.recorder.names(), ["voting_started", "vote_resolved"]);
    }

    #[tokio::test(start_paused = true)]
    async fn challenge_clears_ballots_and_rearms_vote_timer() {
        let t = started(&["ana", "bo", "cy"]).await;
        t.session.submit_word(&t.code, "ana", "ocean", None).await.unwrap();
        t.session.cast_vote(&t.code, "bo", "yes").await.unwrap();
        t.session.cast_vote(&t.code, "cy", "no").await.unwrap();
        sleep(10).await;

        t.session.use_powerup(&t.code, "cy", "challenge").await.unwrap();
        let ServerEvent::VoteChallenged { player, room } = t.recorder.last() else {
            panic!("expected vote_challenged");
        };
        assert_eq!(player, "cy");
        assert!(room.votes.is_empty());
        assert!(room.challenged);

        assert_eq!(
            t.session.use_powerup(&t.code, "bo", "challenge").await,
            Err(GameError::AlreadyChallenged)
        );

        // The first deadline (12s) passes without resolving.
        sleep(5).await;
        assert!(t.session.snapshot(&t.code).await.unwrap().voting_active);
        // The rearmed deadline does.
        sleep(8).await;
        let room = t.session.snapshot(&t.code).await.unwrap();
        assert!(!room.voting_active);
        assert_eq!(room.chain.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn skip_powerup_advances_and_announces() {
        let t = started(&["ana", "bo"]).await;
        t.session.use_powerup(&t.code, "ana", "skip").await.unwrap();
        assert_eq!(t.recorder.names(), ["powerup_used", "player_skipped"]);
        let first = t.recorder.events.lock().unwrap()[0].1.clone();
        let ServerEvent::PowerupUsed { player, powerup, room } = first else {
            panic!("expected powerup_used");
        };
        assert_eq!(player, "ana");
        assert_eq!(powerup, PowerupKind::Skip);
        assert_eq!(room.current_turn_index, 1);
        assert_eq!(room.players[0].powerups.skip, 0);
        let ServerEvent::PlayerSkipped { reason, .. } = t.recorder.last() else {
            panic!("expected player_skipped");
        };
        assert_eq!(reason, SkipReason::Powerup);
        assert_eq!(
            t.session.use_powerup(&t.code, "bo", "fly").await,
            Err(GameError::UnknownPowerup)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn final_wrap_ends_game() {
        let mut cfg = config();
        cfg.max_rounds = 1;
        let t = table(&["ana", "bo"], cfg).await;
        t.session.start_game(&t.code, "ana").await.unwrap();
        t.session.submit_word(&t.code, "ana", "ocean", None).await.unwrap();
        t.session.cast_vote(&t.code, "ana", "yes").await.unwrap();
        t.session.cast_vote(&t.code, "bo", "yes").await.unwrap();
        t.session.submit_word(&t.code, "bo", "river", None).await.unwrap();
        t.session.cast_vote(&t.code, "ana", "yes").await.unwrap();
        t.session.cast_vote(&t.code, "bo", "yes").await.unwrap();

        let names = t.recorder.names();
        assert_eq!(names[names.len() - 2..], ["vote_resolved", "game_over"]);
        let ServerEvent::GameOver(room) = t.recorder.last() else {
            panic!("expected game_over");
        };
        assert!(room.game_over);
        assert_eq!(room.round, 2);
        assert_eq!(
            t.session.submit_word(&t.code, "ana", "delta", None).await,
            Err(GameError::GameNotActive)
        );

        // No timer survives the end of the game.
        t.recorder.clear();
        sleep(60).await;
        assert!(t.recorder.names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn host_ends_and_restarts() {
        let t = started(&["ana", "bo"]).await;
        t.session.submit_word(&t.code, "ana", "ocean", None).await.unwrap();
        t.recorder.clear();
        assert_eq!(
            t.session.end_game(&t.code, "bo").await,
            Err(GameError::NotHost { action: "end the game" })
        );
        t.session.end_game(&t.code, "ana").await.unwrap();
        let ServerEvent::GameOver(room) = t.recorder.last() else {
            panic!("expected game_over");
        };
        assert!(room.game_over);
        assert!(!room.voting_active);

        sleep(30).await;
        assert_eq!(t.recorder.names(), ["game_over"]);
        assert_eq!(
            t.session.end_game(&t.code, "ana").await,
            Err(GameError::GameNotActive)
        );

        assert_eq!(
            t.session.play_again(&t.code, "bo").await,
            Err(GameError::NotHost { action: "restart" })
        );
        t.session.play_again(&t.code, "ana").await.unwrap();
        let ServerEvent::GameStarted(room) = t.recorder.last() else {
            panic!("expected game_started");
        };
        assert!(room.game_started && !room.game_over);
        assert!(room.chain.is_empty());
        assert_eq!(
            t.session.play_again(&t.code, "ana").await,
            Err(GameError::GameInProgress)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn host_disconnect_reassigns_without_ending_game() {
        let t = started(&["ana", "bo", "cy"]).await;
        t.session.disconnect(t.conns[0]).await;
        let first = t.recorder.events.lock().unwrap()[0].1.clone();
        let ServerEvent::RoomUpdated(room) = first else {
            panic!("expected room_updated");
        };
        assert_eq!(room.host, "bo");
        assert!(room.game_started && !room.game_over);
        assert_eq!(room.current_turn_index, 0);

        // bo inherited the turn and a fresh clock.
        sleep(16).await;
        let ServerEvent::PlayerSkipped { player, .. } = t.recorder.last() else {
            panic!("expected player_skipped, got {:?}", t.recorder.names());
        };
        assert_eq!(player, "bo");
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_completing_the_vote_resolves_it() {
        let t = started(&["ana", "bo", "cy"]).await;
        t.session.submit_word(&t.code, "ana", "ocean", None).await.unwrap();
        t.session.cast_vote(&t.code, "ana", "yes").await.unwrap();
        t.session.cast_vote(&t.code, "bo", "yes").await.unwrap();
        t.session.disconnect(t.conns[2]).await;

        let names = t.recorder.names();
        assert_eq!(names[names.len() - 2..], ["room_updated", "vote_resolved"]);
    }

    #[tokio::test(start_paused = true)]
    async fn last_disconnect_destroys_room_and_timers() {
        let t = started(&["ana", "bo"]).await;
        t.session.disconnect(t.conns[1]).await;
        t.session.disconnect(t.conns[0]).await;
        assert_eq!(t.session.registry().room_count().await, 0);
        assert!(t.session.snapshot(&t.code).await.is_none());

        t.recorder.clear();
        sleep(60).await;
        assert!(t.recorder.names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_intents_leave_state_unchanged() {
        let t = started(&["ana", "bo"]).await;
        let before = t.session.snapshot(&t.code).await.unwrap();
        assert!(t.session.submit_word(&t.code, "bo", "ocean", None).await.is_err());
        assert!(t.session.cast_vote(&t.code, "bo", "yes").await.is_err());
        assert!(t.session.use_powerup(&t.code, "bo", "skip").await.is_err());
        assert_eq!(t.session.snapshot(&t.code).await.unwrap(), before);
        assert!(t.recorder.names().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn connections_act_only_for_their_own_seat() {
        let t = table(&["ana", "bo"], config()).await;
        let stranger = Uuid::new_v4();
        let start_as = |name: &str| Intent::StartGame {
            code: t.code.clone(),
            player_name: name.into(),
        };

        assert_eq!(t.session.handle(stranger, start_as("ana")).await, Err(GameError::NotSeated));
        assert_eq!(t.session.handle(t.conns[1], start_as("ana")).await, Err(GameError::NotSeated));
        assert_eq!(
            t.session.handle(t.conns[1], start_as("bo")).await,
            Err(GameError::NotHost { action: "start" })
        );
        assert!(!t.session.snapshot(&t.code).await.unwrap().game_started);

        // A seat in one room grants nothing in another.
        let other = t.session.create_room(stranger, "cy").await.unwrap();
        let end_other = Intent::EndGame {
            code: other.code.clone(),
            player_name: "cy".into(),
        };
        assert_eq!(t.session.handle(t.conns[0], end_other).await, Err(GameError::NotSeated));

        assert_eq!(t.session.handle(t.conns[0], start_as("ana")).await, Ok(None));
        let vote_as_ana = Intent::CastVote {
            code: t.code.clone(),
            player_name: "ana".into(),
            vote: "no".into(),
        };
        assert_eq!(t.session.handle(t.conns[1], vote_as_ana).await, Err(GameError::NotSeated));
        assert!(t.recorder.names().iter().all(|n| *n != "vote_updated"));
    }

    #[tokio::test(start_paused = true)]
    async fn names_and_codes_are_normalized_on_every_intent() {
        let recorder = Arc::new(Recorder::default());
        let session = SessionOrchestrator::new(config(), recorder.clone());
        let (ana, bo) = (Uuid::new_v4(), Uuid::new_v4());
        let room = session.create_room(ana, " ana ").await.unwrap();
        session.join_room(bo, &room.code, "bo").await.unwrap();

        let start = Intent::StartGame {
            code: format!(" {} ", room.code.to_lowercase()),
            player_name: " ana ".into(),
        };
        assert_eq!(session.handle(ana, start).await, Ok(None));
        let submit = Intent::SubmitWord {
            code: room.code.clone(),
            player_name: "ana\t".into(),
            word: "ocean".into(),
            explanation: None,
        };
        assert_eq!(session.handle(ana, submit).await, Ok(None));
        let snapshot = session.snapshot(&room.code).await.unwrap();
        assert_eq!(snapshot.pending_player.as_deref(), Some("ana"));
    }

    #[tokio::test(start_paused = true)]
    async fn ballot_at_the_vote_deadline_resolves_once() {
        let t = started(&["ana", "bo"]).await;
        t.session.submit_word(&t.code, "ana", "ocean", None).await.unwrap();
        t.session.cast_vote(&t.code, "ana", "yes").await.unwrap();

        // Lands on the same instant the vote timer is due.
        sleep(12).await;
        let late = t.session.cast_vote(&t.code, "bo", "no").await;
        assert!(
            matches!(late, Ok(()) | Err(GameError::NoVoteInProgress)),
            "unexpected {late:?}"
        );
        sleep(5).await;

        let resolved = t
            .recorder
            .names()
            .into_iter()
            .filter(|n| *n == "vote_resolved")
            .count();
        assert_eq!(resolved, 1);
        let room = t.session.snapshot(&t.code).await.unwrap();
        assert_eq!(room.chain.len(), 1);
        assert!(!room.voting_active);
        assert_eq!(room.current_turn_index, 1);
    }
}
