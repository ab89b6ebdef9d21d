use crate::session::GameConfig;
use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(
    name = "wordchain_server",
    rename_all = "kebab-case",
    rename_all_env = "screaming-snake"
)]
pub struct Args {
    #[clap(default_value = "0.0.0.0:5000", env = "WORDCHAIN_HOST")]
    pub host: SocketAddr,

    /// How long a player has to submit before being skipped.
    #[clap(long, default_value_t = 15_000, env = "WORDCHAIN_TURN_TIMEOUT_MS")]
    pub turn_timeout_ms: u64,

    /// How long a vote stays open before it is forced to resolve.
    #[clap(long, default_value_t = 12_000, env = "WORDCHAIN_VOTE_TIMEOUT_MS")]
    pub vote_timeout_ms: u64,

    #[clap(long, default_value_t = 7, env = "WORDCHAIN_MAX_ROUNDS")]
    pub max_rounds: u32,
}

impl Args {
    pub fn game_config(&self) -> GameConfig {
        GameConfig {
            turn_timeout: Duration::from_millis(self.turn_timeout_ms),
            vote_timeout: Duration::from_millis(self.vote_timeout_ms),
            max_rounds: self.max_rounds,
        }
    }
}
