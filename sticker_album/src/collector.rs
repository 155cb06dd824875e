//! Collector agent: one participant's sticker inventory
//!
//! A collector owns an album (stickers held at least once) and a duplicate
//! pool (spare copies beyond the first). It is passive: the market mutates it
//! only through `buy_pack` and `update_collection`.

use crate::StickerId;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collector {
    album: HashSet<StickerId>,
    duplicates: HashMap<StickerId, u32>,
    is_finished: bool,
    money_spent: u64,
    n_stickers: usize,
}

impl Collector {
    /// Create a collector targeting an album of `n_stickers` and buy its
    /// initial pack of `endowment` stickers
    pub fn new(endowment: usize, n_stickers: usize, rng: &mut StdRng) -> Self {
        let mut collector = Collector {
            album: HashSet::new(),
            duplicates: HashMap::new(),
            is_finished: false,
            money_spent: 0,
            n_stickers,
        };
        collector.buy_pack(endowment, rng);
        collector
    }

    /// Construct a collector with explicit inventory, for scenario setup.
    /// Zero duplicate counts are dropped so that the offerable set is exactly
    /// the duplicate key set.
    pub fn from_parts(
        album: HashSet<StickerId>,
        duplicates: HashMap<StickerId, u32>,
        n_stickers: usize,
    ) -> Self {
        let duplicates = duplicates.into_iter().filter(|&(_, count)| count > 0).collect();
        let mut collector = Collector {
            album,
            duplicates,
            is_finished: false,
            money_spent: 0,
            n_stickers,
        };
        collector.refresh_finished();
        collector
    }

    /// Buy one pack of `pack_size` stickers drawn i.i.d. uniformly with
    /// replacement. New stickers enter the album, repeats become duplicates.
    /// The purchase costs one monetary unit even for a zero-size pack.
    pub fn buy_pack(&mut self, pack_size: usize, rng: &mut StdRng) {
        self.money_spent += 1;
        for _ in 0..pack_size {
            let sticker = rng.gen_range(0..self.n_stickers);
            if self.album.contains(&sticker) {
                *self.duplicates.entry(sticker).or_insert(0) += 1;
            } else {
                self.album.insert(sticker);
            }
        }
        self.refresh_finished();
    }

    /// Apply the result of a confirmed trade: add every received sticker to
    /// the album and surrender one duplicate copy of every given sticker.
    ///
    /// The trade-eligibility computation guarantees every given sticker has a
    /// duplicate count above zero; giving an uncovered sticker is an internal
    /// invariant violation.
    pub fn update_collection(
        &mut self,
        giving: &HashSet<StickerId>,
        receiving: &HashSet<StickerId>,
    ) {
        for &sticker in receiving {
            self.album.insert(sticker);
        }

        for &sticker in giving {
            match self.duplicates.get_mut(&sticker) {
                Some(count) if *count > 1 => *count -= 1,
                Some(_) => {
                    self.duplicates.remove(&sticker);
                }
                None => {
                    debug_assert!(false, "gave sticker {sticker} with no recorded duplicate");
                }
            }
        }

        self.refresh_finished();
    }

    /// Stickers this collector can offer in trade (duplicate count > 0)
    pub fn offerable(&self) -> HashSet<StickerId> {
        self.duplicates.keys().copied().collect()
    }

    /// Spare copies held of `sticker`; an unseen sticker has count zero
    pub fn duplicate_count(&self, sticker: StickerId) -> u32 {
        self.duplicates.get(&sticker).copied().unwrap_or(0)
    }

    pub fn album(&self) -> &HashSet<StickerId> {
        &self.album
    }

    pub fn album_len(&self) -> usize {
        self.album.len()
    }

    /// Total spare copies across all stickers
    pub fn n_duplicates(&self) -> u64 {
        self.duplicates.values().map(|&count| u64::from(count)).sum()
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    pub fn money_spent(&self) -> u64 {
        self.money_spent
    }

    pub fn n_stickers(&self) -> usize {
        self.n_stickers
    }

    /// Set the finished flag once the album is full; never unsets it
    fn refresh_finished(&mut self) {
        if self.album.len() == self.n_stickers {
            self.is_finished = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng(seed: u64) -> StdRng {
        StdRng::seed_from_u64(seed)
    }

    #[test]
    fn test_new_collector_buys_endowment_pack() {
        let collector = Collector::new(10, 50, &mut rng(42));

        assert_eq!(collector.money_spent(), 1);
        // Every drawn sticker lands in exactly one of album or duplicates
        assert_eq!(collector.album_len() as u64 + collector.n_duplicates(), 10);
    }

    #[test]
    fn test_zero_size_pack_costs_one_unit() {
        let mut collector = Collector::new(0, 50, &mut rng(42));
        assert_eq!(collector.money_spent(), 1);
        assert_eq!(collector.album_len(), 0);

        collector.buy_pack(0, &mut rng(43));
        assert_eq!(collector.money_spent(), 2);
        assert_eq!(collector.album_len(), 0);
        assert_eq!(collector.n_duplicates(), 0);
    }

    #[test]
    fn test_repeat_draws_become_duplicates() {
        // With a one-sticker album every draw after the first is a repeat
        let collector = Collector::new(6, 1, &mut rng(42));

        assert_eq!(collector.album_len(), 1);
        assert!(collector.album().contains(&0));
        assert_eq!(collector.duplicate_count(0), 5);
        assert!(collector.is_finished());
    }

    #[test]
    fn test_album_grows_monotonically() {
        let mut collector = Collector::new(5, 100, &mut rng(42));
        let mut rng = rng(7);

        let mut previous = collector.album_len();
        for _ in 0..50 {
            collector.buy_pack(5, &mut rng);
            assert!(collector.album_len() >= previous);
            previous = collector.album_len();
        }
    }

    #[test]
    fn test_finished_flag_is_monotonic() {
        let mut collector = Collector::new(20, 1, &mut rng(42));
        assert!(collector.is_finished());

        // Further operations never unset the flag
        collector.buy_pack(3, &mut rng(43));
        collector.update_collection(&HashSet::from([0]), &HashSet::new());
        assert!(collector.is_finished());
    }

    #[test]
    fn test_update_collection_receiving_is_idempotent() {
        let mut collector = Collector::from_parts(HashSet::from([3]), HashMap::new(), 10);

        collector.update_collection(&HashSet::new(), &HashSet::from([3, 4]));

        assert_eq!(collector.album_len(), 2);
        assert!(collector.album().contains(&3));
        assert!(collector.album().contains(&4));
    }

    #[test]
    fn test_update_collection_decrements_and_removes_duplicates() {
        let mut collector =
            Collector::from_parts(HashSet::from([1, 2]), HashMap::from([(1, 2), (2, 1)]), 10);

        collector.update_collection(&HashSet::from([1, 2]), &HashSet::new());

        assert_eq!(collector.duplicate_count(1), 1);
        assert_eq!(collector.duplicate_count(2), 0);
        assert!(!collector.offerable().contains(&2));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "no recorded duplicate")]
    fn test_giving_unheld_sticker_panics_in_debug() {
        let mut collector = Collector::from_parts(HashSet::from([1]), HashMap::new(), 10);
        collector.update_collection(&HashSet::from([1]), &HashSet::new());
    }

    #[test]
    fn test_from_parts_drops_zero_counts_and_computes_finished() {
        let collector = Collector::from_parts(
            HashSet::from([0, 1]),
            HashMap::from([(0, 0), (1, 3)]),
            2,
        );

        assert!(collector.is_finished());
        assert!(!collector.offerable().contains(&0));
        assert_eq!(collector.offerable(), HashSet::from([1]));
    }

    #[test]
    fn test_unseen_sticker_has_zero_duplicate_count() {
        let collector = Collector::from_parts(HashSet::new(), HashMap::new(), 10);
        assert_eq!(collector.duplicate_count(9), 0);
    }
}
