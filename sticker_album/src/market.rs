//! Market orchestration: pairwise trading, rounds, and the run loop
//!
//! The market drives everything; collectors are passive. Each round runs
//! three strictly ordered phases (friend pairing, stranger trading, fallback
//! purchase) with sequential state updates, so later pairings observe the
//! results of earlier ones within the same round.

use crate::collector::Collector;
use crate::{ConfigError, ModelConfig, RoundSnapshot, RunSummary, SimulationError, StickerId};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::HashSet;

/// Attempt a mutually beneficial swap between two collectors.
///
/// Each side's receivable set is what the other can offer minus what it
/// already owns. The trade is all-or-nothing: it executes only when both
/// receivable sets are non-empty, and then every eligible duplicate crosses
/// in one shot. Returns whether a trade occurred.
pub fn trade(a: &mut Collector, b: &mut Collector) -> bool {
    let a_offerable = a.offerable();
    let b_offerable = b.offerable();
    let a_receivable: HashSet<StickerId> = b_offerable.difference(a.album()).copied().collect();
    let b_receivable: HashSet<StickerId> = a_offerable.difference(b.album()).copied().collect();

    if a_receivable.is_empty() || b_receivable.is_empty() {
        return false;
    }

    a.update_collection(&b_receivable, &a_receivable);
    b.update_collection(&a_receivable, &b_receivable);
    true
}

/// What happened during one round, keyed by friend index
#[derive(Debug, Clone, Default)]
pub struct RoundActivity {
    /// Friends that completed at least one trade in phases 1-2
    pub traded: HashSet<usize>,

    /// Friends that fell back to a pack purchase in phase 3
    pub bought: Vec<usize>,

    /// Successful trades this round, stranger trades included
    pub n_trades: usize,
}

/// A population of friend collectors plus the per-round stranger churn
pub struct Market {
    members: Vec<Collector>,
    config: ModelConfig,
    rng: StdRng,
}

impl Market {
    /// Validate the configuration and create `n_friends` collectors, each
    /// buying its starting endowment from the shared random source
    pub fn new(config: ModelConfig, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut rng = StdRng::seed_from_u64(seed);
        let members = (0..config.n_friends)
            .map(|_| Collector::new(config.starting_endowment, config.n_stickers_in_album, &mut rng))
            .collect();

        Ok(Market {
            members,
            config,
            rng,
        })
    }

    /// Friend collectors, indexed by friend id
    pub fn members(&self) -> &[Collector] {
        &self.members
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Friends that have completed the album so far
    pub fn n_finished(&self) -> usize {
        self.members.iter().filter(|m| m.is_finished()).count()
    }

    /// Money spent across all friends, strangers excluded
    pub fn total_money_spent(&self) -> u64 {
        self.members.iter().map(|m| m.money_spent()).sum()
    }

    /// Run one round of trade: friend pairing, then stranger trading, then a
    /// fallback pack purchase for every friend that traded nothing.
    ///
    /// A collector that finishes mid-round is excluded from all later trade
    /// attempts and never buys again.
    pub fn round_of_trade(&mut self) -> RoundActivity {
        let mut activity = RoundActivity::default();

        // Phase 1: every unordered pair of unfinished friends, in index order
        for i in 0..self.members.len() {
            for j in (i + 1)..self.members.len() {
                let (left, right) = self.members.split_at_mut(j);
                let (a, b) = (&mut left[i], &mut right[0]);
                if a.is_finished() || b.is_finished() {
                    continue;
                }
                if trade(a, b) {
                    activity.traded.insert(i);
                    activity.traded.insert(j);
                    activity.n_trades += 1;
                }
            }
        }

        // Phase 2: each unfinished friend meets fresh one-shot strangers,
        // state carrying forward between attempts
        for (id, friend) in self.members.iter_mut().enumerate() {
            if friend.is_finished() {
                continue;
            }
            for _ in 0..self.config.n_strangers {
                if friend.is_finished() {
                    break;
                }
                let mut stranger = Collector::new(
                    self.config.stranger_endowment,
                    self.config.n_stickers_in_album,
                    &mut self.rng,
                );
                if trade(friend, &mut stranger) {
                    activity.traded.insert(id);
                    activity.n_trades += 1;
                }
            }
        }

        // Phase 3: friends with zero trades this round buy one pack
        for (id, friend) in self.members.iter_mut().enumerate() {
            if friend.is_finished() || activity.traded.contains(&id) {
                continue;
            }
            friend.buy_pack(self.config.stickers_per_pack, &mut self.rng);
            activity.bought.push(id);
        }

        activity
    }

    /// Repeat rounds of trade until every friend finishes, logging progress
    /// every `log_interval` rounds.
    ///
    /// Termination is almost sure rather than bounded: fallback purchases
    /// cover the album with probability 1 in finite expected time. When
    /// `max_rounds` is configured, exceeding it aborts the run instead of
    /// looping forever.
    pub fn run(&mut self, log_interval: usize) -> Result<RunSummary, SimulationError> {
        let log_interval = log_interval.max(1);
        let mut rounds = Vec::new();
        let mut n_rounds = 0;

        while self.n_finished() < self.members.len() {
            if let Some(cap) = self.config.max_rounds {
                if n_rounds >= cap {
                    return Err(SimulationError::RoundLimitExceeded {
                        rounds: n_rounds,
                        n_finished: self.n_finished(),
                        n_friends: self.members.len(),
                    });
                }
            }

            if n_rounds % log_interval == 0 {
                println!(
                    "Round {}: {}/{} finished, {} spent",
                    n_rounds,
                    self.n_finished(),
                    self.members.len(),
                    self.total_money_spent()
                );
            }

            let activity = self.round_of_trade();
            rounds.push(RoundSnapshot {
                round: n_rounds,
                n_finished: self.n_finished(),
                total_money_spent: self.total_money_spent(),
                n_trades: activity.n_trades,
            });
            n_rounds += 1;
        }

        let total_money_spent = self.total_money_spent();
        Ok(RunSummary {
            n_rounds,
            n_finished: self.n_finished(),
            total_money_spent,
            mean_money_spent: total_money_spent as f64 / self.members.len() as f64,
            rounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn small_config() -> ModelConfig {
        ModelConfig {
            n_friends: 4,
            starting_endowment: 5,
            n_strangers: 2,
            stickers_per_pack: 5,
            n_stickers_in_album: 30,
            stranger_endowment: 40,
            max_rounds: None,
        }
    }

    #[test]
    fn test_invalid_config_rejected_at_construction() {
        let mut config = small_config();
        config.n_stickers_in_album = 0;
        assert!(matches!(
            Market::new(config, 42),
            Err(ConfigError::EmptyAlbum)
        ));
    }

    #[test]
    fn test_two_friend_forced_trade() {
        // A owns 0 and holds a spare 1; B owns 1 and holds a spare 0
        let mut a = Collector::from_parts(HashSet::from([0]), HashMap::from([(1, 1)]), 10);
        let mut b = Collector::from_parts(HashSet::from([1]), HashMap::from([(0, 1)]), 10);

        assert!(trade(&mut a, &mut b));

        for collector in [&a, &b] {
            assert!(collector.album().contains(&0));
            assert!(collector.album().contains(&1));
            assert_eq!(collector.duplicate_count(0), 0);
            assert_eq!(collector.duplicate_count(1), 0);
        }
    }

    #[test]
    fn test_one_sided_trade_is_a_no_op() {
        // B could gain sticker 1 from A, but A gains nothing from B
        let mut a = Collector::from_parts(HashSet::from([0, 1]), HashMap::from([(1, 1)]), 10);
        let mut b = Collector::from_parts(HashSet::from([0]), HashMap::from([(0, 2)]), 10);

        let a_before = a.clone();
        let b_before = b.clone();

        assert!(!trade(&mut a, &mut b));
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn test_trade_with_no_duplicates_is_a_no_op() {
        let mut a = Collector::from_parts(HashSet::from([0]), HashMap::new(), 10);
        let mut b = Collector::from_parts(HashSet::from([1]), HashMap::new(), 10);

        let a_before = a.clone();
        let b_before = b.clone();

        assert!(!trade(&mut a, &mut b));
        assert_eq!(a, a_before);
        assert_eq!(b, b_before);
    }

    #[test]
    fn test_trade_conservation() {
        // A offers {1, 2}, B offers {3}; both sides gain
        let mut a = Collector::from_parts(
            HashSet::from([0, 1, 2]),
            HashMap::from([(1, 2), (2, 1)]),
            10,
        );
        let mut b = Collector::from_parts(HashSet::from([3]), HashMap::from([(3, 1)]), 10);

        assert!(trade(&mut a, &mut b));

        // A received 3 and gave one copy each of 1 and 2
        assert!(a.album().contains(&3));
        assert_eq!(a.duplicate_count(1), 1);
        assert_eq!(a.duplicate_count(2), 0);

        // B received 1 and 2 and gave its only spare 3
        assert!(b.album().contains(&1));
        assert!(b.album().contains(&2));
        assert_eq!(b.duplicate_count(3), 0);
    }

    #[test]
    fn test_round_completeness_non_traders_buy_one_pack() {
        // Empty endowments mean nobody has anything to trade, so every
        // friend must fall back to exactly one pack purchase
        let mut config = small_config();
        config.starting_endowment = 0;
        config.n_strangers = 0;

        let mut market = Market::new(config, 42).unwrap();
        let spent_before: Vec<u64> = market.members().iter().map(|m| m.money_spent()).collect();

        let activity = market.round_of_trade();

        assert!(activity.traded.is_empty());
        assert_eq!(activity.bought.len(), market.members().len());
        for (member, before) in market.members().iter().zip(spent_before) {
            assert_eq!(member.money_spent(), before + 1);
        }
    }

    #[test]
    fn test_finished_collectors_never_trade_or_buy() {
        // Album size 1: everyone finishes on the endowment purchase
        let mut config = small_config();
        config.n_stickers_in_album = 1;

        let mut market = Market::new(config, 42).unwrap();
        assert_eq!(market.n_finished(), 4);

        let spent_before = market.total_money_spent();
        let activity = market.round_of_trade();

        assert!(activity.traded.is_empty());
        assert!(activity.bought.is_empty());
        assert_eq!(activity.n_trades, 0);
        assert_eq!(market.total_money_spent(), spent_before);
    }

    #[test]
    fn test_run_terminates_immediately_when_album_has_one_sticker() {
        let mut config = small_config();
        config.n_stickers_in_album = 1;

        let mut market = Market::new(config, 42).unwrap();
        let summary = market.run(100).unwrap();

        assert_eq!(summary.n_rounds, 0);
        assert_eq!(summary.n_finished, 4);
        assert!(summary.rounds.is_empty());
        // Only the endowment purchases were made
        assert_eq!(summary.total_money_spent, 4);
    }

    #[test]
    fn test_round_cap_aborts_pathological_runs() {
        // No strangers and a huge album cannot finish within three rounds
        let config = ModelConfig {
            n_friends: 2,
            starting_endowment: 1,
            n_strangers: 0,
            stickers_per_pack: 1,
            n_stickers_in_album: 100_000,
            stranger_endowment: 0,
            max_rounds: Some(3),
        };

        let mut market = Market::new(config, 42).unwrap();
        let err = market.run(usize::MAX).unwrap_err();

        assert_eq!(
            err,
            SimulationError::RoundLimitExceeded {
                rounds: 3,
                n_finished: 0,
                n_friends: 2,
            }
        );
    }

    #[test]
    fn test_same_seed_reproduces_round_for_round() {
        let mut market1 = Market::new(small_config(), 42).unwrap();
        let mut market2 = Market::new(small_config(), 42).unwrap();

        let summary1 = market1.run(usize::MAX).unwrap();
        let summary2 = market2.run(usize::MAX).unwrap();

        assert_eq!(summary1, summary2);
    }

    #[test]
    fn test_finisher_count_derived_from_members() {
        let mut config = small_config();
        config.n_stickers_in_album = 1;
        let market = Market::new(config, 42).unwrap();

        assert_eq!(
            market.n_finished(),
            market.members().iter().filter(|m| m.is_finished()).count()
        );
    }
}
