//! Sticker Album Trading ABM
//!
//! Agent-based simulation of collectors filling a shared sticker album by
//! buying random packs and swapping duplicates. Each discrete round has three
//! phases:
//! - every pair of unfinished friends attempts a mutually beneficial swap
//! - each unfinished friend attempts swaps with freshly created strangers
//! - friends who traded nothing fall back to buying one pack
//!
//! The run terminates when every tracked friend has completed the album.
//! Termination is probabilistic (pack purchases cover the album with
//! probability 1 in finite expected time), so an optional round cap guards
//! against pathological parameter choices.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod collector;
pub mod market;
pub mod output;

/// Identifier of a sticker slot in the album, in `[0, n_stickers_in_album)`.
pub type StickerId = usize;

fn default_n_strangers() -> usize {
    5
}

fn default_stickers_per_pack() -> usize {
    5
}

fn default_n_stickers_in_album() -> usize {
    682
}

fn default_stranger_endowment() -> usize {
    500
}

/// Model configuration parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of friends the simulation tracks; the run ends when all finish
    pub n_friends: usize,

    /// Stickers in each friend's first pack (the pack bought at creation)
    pub starting_endowment: usize,

    /// One-shot strangers each unfinished friend meets per round
    #[serde(default = "default_n_strangers")]
    pub n_strangers: usize,

    /// Stickers per purchased pack
    #[serde(default = "default_stickers_per_pack")]
    pub stickers_per_pack: usize,

    /// Total stickers in the album
    #[serde(default = "default_n_stickers_in_album")]
    pub n_stickers_in_album: usize,

    /// Stickers in each stranger's initial pack; large values make strangers
    /// nearly complete and therefore good trading partners
    #[serde(default = "default_stranger_endowment")]
    pub stranger_endowment: usize,

    /// Optional safety cap on the number of rounds before the run aborts
    #[serde(default)]
    pub max_rounds: Option<usize>,
}

impl ModelConfig {
    /// Baseline configuration: the 682-sticker Panini-sized album
    pub fn baseline() -> Self {
        ModelConfig {
            n_friends: 10,
            starting_endowment: 5,
            n_strangers: default_n_strangers(),
            stickers_per_pack: default_stickers_per_pack(),
            n_stickers_in_album: default_n_stickers_in_album(),
            stranger_endowment: default_stranger_endowment(),
            max_rounds: None,
        }
    }

    /// Reject configurations that cannot produce a meaningful simulation
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.n_friends == 0 {
            return Err(ConfigError::NoFriends);
        }
        if self.n_stickers_in_album == 0 {
            return Err(ConfigError::EmptyAlbum);
        }
        if self.stickers_per_pack == 0 {
            return Err(ConfigError::EmptyPack);
        }
        Ok(())
    }
}

/// Invalid construction parameters, rejected before any simulation runs
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("number of friends must be positive")]
    NoFriends,

    #[error("album size must be positive")]
    EmptyAlbum,

    #[error("stickers per pack must be positive")]
    EmptyPack,
}

/// Failures surfaced by the run loop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SimulationError {
    #[error("round limit of {rounds} reached with {n_finished}/{n_friends} collectors finished")]
    RoundLimitExceeded {
        rounds: usize,
        n_finished: usize,
        n_friends: usize,
    },
}

/// Aggregate market state recorded after each round
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round: usize,
    pub n_finished: usize,
    pub total_money_spent: u64,
    pub n_trades: usize,
}

/// Final result of a completed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Rounds simulated before every friend finished
    pub n_rounds: usize,
    pub n_finished: usize,
    pub total_money_spent: u64,
    pub mean_money_spent: f64,

    /// One snapshot per simulated round, in order
    pub rounds: Vec<RoundSnapshot>,
}
