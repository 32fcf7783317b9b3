use std::collections::BTreeSet;

use crate::address;
use crate::config::{CacheConfig, ConfigError};
use crate::error::InvariantViolation;
use crate::lru::LruTracker;
use crate::simulation_result::SimulationResult;
use crate::store::CacheStore;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AccessKind {
    Load,
    Store,
    /// a load followed by a store to the same address
    Modify,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Access {
    pub kind: AccessKind,
    pub address: u64,
}

impl Access {
    pub fn load(address: u64) -> Self {
        Self {
            kind: AccessKind::Load,
            address,
        }
    }

    pub fn store(address: u64) -> Self {
        Self {
            kind: AccessKind::Store,
            address,
        }
    }

    pub fn modify(address: u64) -> Self {
        Self {
            kind: AccessKind::Modify,
            address,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CacheHit {
    Hit,
    /// `evicted` holds the tag of the replaced line on a capacity miss
    Miss { evicted: Option<u64> },
}

impl std::fmt::Display for CacheHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheHit::Hit => f.write_str("hit"),
            CacheHit::Miss { evicted: None } => f.write_str("miss"),
            CacheHit::Miss { evicted: Some(_) } => f.write_str("miss eviction"),
        }
    }
}

/// Outcome of one [`Access`], a modify touches the cache twice.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AccessOutcome {
    pub first: CacheHit,
    pub second: Option<CacheHit>,
}

impl AccessOutcome {
    pub fn iter(&self) -> impl Iterator<Item = CacheHit> {
        std::iter::once(self.first).chain(self.second)
    }
}

impl std::fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.second {
            Some(second) => f.write_fmt(format_args!("{} {second}", self.first)),
            None => f.write_fmt(format_args!("{}", self.first)),
        }
    }
}

/// Set-associative cache with least recently used replacement.
#[derive(Debug, Clone)]
pub struct Simulator {
    config: CacheConfig,
    store: CacheStore,
    tracker: LruTracker,
    result: SimulationResult,
}

impl Simulator {
    pub fn new(config: CacheConfig) -> Result<Self, ConfigError> {
        let store = CacheStore::new(&config)?;
        let tracker = LruTracker::new(&config)?;

        tracing::debug!(
            sets = config.num_sets(),
            ways = config.num_lines(),
            offset_bits = config.offset_bits(),
            "allocated cache"
        );

        Ok(Self {
            config,
            store,
            tracker,
            result: SimulationResult::new(),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn result(&self) -> SimulationResult {
        self.result
    }

    pub fn reset(&mut self) {
        self.store.reset();
        self.tracker.clear();
        self.result = SimulationResult::new();
    }

    /// Looks up a single address and updates the cache.
    pub fn access(&mut self, address: u64) -> Result<CacheHit, InvariantViolation> {
        let address::DecodedAddress { tag, set_index } = address::decode(address, &self.config);
        let tracker = &mut self.tracker;

        let cache_hit = if self.store.lookup(set_index, tag) {
            self.result.hit_count += 1;
            tracker.record_access(set_index, tag)?;

            CacheHit::Hit
        } else if self.store.has_free_slot(set_index) {
            self.result.miss_count += 1;
            self.store.occupy_free_slot(set_index, tag)?;
            tracker.record_access(set_index, tag)?;

            CacheHit::Miss { evicted: None }
        } else {
            self.result.miss_count += 1;
            self.result.eviction_count += 1;

            let victim = tracker
                .least_recently_used_tag(set_index)
                .ok_or(InvariantViolation::EmptyTracker { set_index })?;
            if tracker.evict_least_recently_used(set_index) != Some(victim) {
                return Err(InvariantViolation::Desynchronized { set_index });
            }
            self.store.overwrite_line(set_index, victim, tag)?;
            tracker.record_access(set_index, tag)?;

            CacheHit::Miss {
                evicted: Some(victim),
            }
        };

        tracing::trace!(address, set_index, tag, %cache_hit, "access");
        Ok(cache_hit)
    }

    pub fn apply(&mut self, Access { kind, address }: Access) -> Result<AccessOutcome, InvariantViolation> {
        let first = self.access(address)?;
        let second = match kind {
            AccessKind::Load | AccessKind::Store => None,
            AccessKind::Modify => Some(self.access(address)?),
        };

        Ok(AccessOutcome { first, second })
    }

    pub fn run(
        &mut self,
        accesses: impl IntoIterator<Item = Access>,
    ) -> Result<SimulationResult, InvariantViolation> {
        for access in accesses {
            self.apply(access)?;
        }

        tracing::debug!(
            hits = self.result.hit_count,
            misses = self.result.miss_count,
            evictions = self.result.eviction_count,
            "simulation finished"
        );
        Ok(self.result)
    }

    /// Checks that every set tracks exactly the tags of its valid lines.
    pub fn check_consistency(&self) -> Result<(), InvariantViolation> {
        for set_index in 0..self.tracker.num_sets() {
            let valid: BTreeSet<u64> = self.store.valid_tags(set_index).collect();
            let tracked: BTreeSet<u64> = self.tracker.iter(set_index).collect();

            let valid_count = self.store.valid_tags(set_index).count();
            if valid_count > self.config.num_lines()
                || valid_count != valid.len()
                || self.tracker.len(set_index) != tracked.len()
                || valid != tracked
            {
                return Err(InvariantViolation::Desynchronized { set_index });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    use super::*;

    const HIT: CacheHit = CacheHit::Hit;
    const MISS: CacheHit = CacheHit::Miss { evicted: None };

    fn simulator(set_index_bits: u32, num_lines: usize, offset_bits: u32) -> Simulator {
        Simulator::new(CacheConfig::new(set_index_bits, num_lines, offset_bits).unwrap()).unwrap()
    }

    fn result(hit_count: u64, miss_count: u64, eviction_count: u64) -> SimulationResult {
        SimulationResult {
            hit_count,
            miss_count,
            eviction_count,
        }
    }

    #[test]
    fn direct_mapped_aliasing() {
        let mut sim = simulator(1, 1, 1);

        assert_eq!(sim.access(0x0).unwrap(), MISS);
        assert_eq!(sim.access(0x2).unwrap(), MISS);
        assert_eq!(sim.access(0x4).unwrap(), CacheHit::Miss { evicted: Some(0) });
        assert_eq!(sim.result(), result(0, 3, 1));
    }

    #[test]
    fn evicts_least_recently_used_tag() {
        // one set with two lines, tags equal addresses
        let mut sim = simulator(0, 2, 0);
        let (a, b, c) = (0xa, 0xb, 0xc);

        sim.access(a).unwrap();
        sim.access(b).unwrap();
        assert_eq!(sim.access(a).unwrap(), HIT);
        assert_eq!(sim.access(c).unwrap(), CacheHit::Miss { evicted: Some(b) });

        assert_eq!(sim.access(a).unwrap(), HIT);
        assert_eq!(sim.access(b).unwrap(), CacheHit::Miss { evicted: Some(c) });
        assert_eq!(sim.result(), result(2, 4, 2));
        sim.check_consistency().unwrap();
    }

    #[test]
    fn repeated_address_hits() {
        for n in [1, 2, 10, 1_000] {
            let mut sim = simulator(2, 2, 4);
            for _ in 0..n {
                sim.access(0x1234).unwrap();
            }
            assert_eq!(sim.result(), result(n - 1, 1, 0));
        }
    }

    #[test]
    fn same_block_hits() {
        let mut sim = simulator(2, 1, 4);

        assert_eq!(sim.access(0x40).unwrap(), MISS);
        for offset in 1..16 {
            assert_eq!(sim.access(0x40 + offset).unwrap(), HIT);
        }
        assert_eq!(sim.access(0x50).unwrap(), MISS);
    }

    #[test]
    fn modify_loads_then_stores() {
        let mut sim = simulator(4, 1, 4);

        let outcome = sim.apply(Access::modify(0x20)).unwrap();
        assert_eq!(outcome, AccessOutcome { first: MISS, second: Some(HIT) });
        assert_eq!(outcome.to_string(), "miss hit");
        assert_eq!(sim.result(), result(1, 1, 0));

        let outcome = sim.apply(Access::store(0x20)).unwrap();
        assert_eq!(outcome.to_string(), "hit");
        assert_eq!(outcome.iter().count(), 1);
    }

    #[test]
    fn single_set_routes_everything_together() {
        let mut sim = simulator(0, 1, 0);

        sim.run([0, 1, 2, 3].map(Access::load)).unwrap();
        assert_eq!(sim.result(), result(0, 4, 3));
    }

    #[test]
    fn fully_associative_never_evicts() {
        let mut sim = simulator(0, 64, 3);
        let trace = (0..64u64).chain(0..64).map(|block| Access::load(block << 3));

        assert_eq!(sim.run(trace).unwrap(), result(64, 64, 0));
        sim.check_consistency().unwrap();
    }

    #[test]
    fn full_width_tags_are_distinct() {
        let mut sim = simulator(0, 2, 0);

        sim.access(u64::MAX).unwrap();
        sim.access(u64::MAX >> 32).unwrap();
        assert_eq!(sim.access(u64::MAX).unwrap(), HIT);
        assert_eq!(sim.access(u64::MAX >> 32).unwrap(), HIT);
    }

    #[test]
    fn reference_trace() {
        // yi.trace with -s 4 -E 1 -b 4
        let trace = [
            Access::load(0x10),
            Access::modify(0x20),
            Access::load(0x22),
            Access::store(0x18),
            Access::load(0x110),
            Access::load(0x210),
            Access::modify(0x12),
        ];
        let mut sim = simulator(4, 1, 4);

        let verbose = trace
            .iter()
            .map(|access| sim.apply(*access).unwrap().to_string())
            .collect::<Vec<_>>();

        assert_eq!(
            verbose,
            vec![
                "miss",
                "miss hit",
                "hit",
                "hit",
                "miss eviction",
                "miss eviction",
                "miss eviction hit"
            ]
        );
        assert_eq!(sim.result(), result(4, 5, 3));
    }

    #[test]
    fn reset_starts_over() {
        let mut sim = simulator(1, 1, 0);
        sim.run([0, 2, 0].map(Access::load)).unwrap();
        assert_ne!(sim.result(), SimulationResult::new());

        sim.reset();
        assert_eq!(sim.result(), SimulationResult::new());
        sim.check_consistency().unwrap();
        assert_eq!(sim.access(0).unwrap(), MISS);
    }

    #[test]
    fn detects_desynchronized_sets() {
        let mut sim = simulator(1, 2, 0);
        sim.access(0).unwrap();

        sim.tracker.clear();
        assert_eq!(
            sim.check_consistency(),
            Err(InvariantViolation::Desynchronized { set_index: 0 })
        );
    }

    #[test]
    fn empty_tracker_on_full_set_is_fatal() {
        let mut sim = simulator(0, 1, 0);
        sim.access(1).unwrap();

        sim.tracker.clear();
        assert_eq!(
            sim.access(2),
            Err(InvariantViolation::EmptyTracker { set_index: 0 })
        );
    }

    #[test]
    fn victim_missing_from_store_is_fatal() {
        let mut sim = simulator(0, 1, 0);
        sim.access(1).unwrap();

        // the recency order claims a tag that no line holds
        sim.tracker.clear();
        sim.tracker.record_access(0, 5).unwrap();
        assert_eq!(
            sim.access(2),
            Err(InvariantViolation::TagNotResident { set_index: 0, tag: 5 })
        );
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn oversized_geometry_is_rejected_before_simulating() {
        for (set_index_bits, num_lines) in [(62, 1), (60, 1 << 10), (40, usize::MAX >> 8)] {
            let config = CacheConfig::new(set_index_bits, num_lines, 0).unwrap();
            assert_eq!(
                Simulator::new(config).unwrap_err(),
                ConfigError::TooLarge {
                    set_index_bits,
                    num_lines
                }
            );
        }
    }

    /// Straightforward LRU cache, least recently used tag first.
    struct ReferenceCache {
        config: CacheConfig,
        sets: Vec<Vec<u64>>,
    }

    impl ReferenceCache {
        fn access(&mut self, address: u64) -> CacheHit {
            let address::DecodedAddress { tag, set_index } = address::decode(address, &self.config);
            let set = &mut self.sets[set_index];

            if let Some(pos) = set.iter().position(|&t| t == tag) {
                set.remove(pos);
                set.push(tag);
                CacheHit::Hit
            } else if set.len() < self.config.num_lines() {
                set.push(tag);
                CacheHit::Miss { evicted: None }
            } else {
                let evicted = set.remove(0);
                set.push(tag);
                CacheHit::Miss {
                    evicted: Some(evicted),
                }
            }
        }
    }

    #[test]
    fn matches_reference_on_random_traces() {
        let mut rng: StdRng = StdRng::seed_from_u64(0);

        for _ in 0..50 {
            let config = CacheConfig::new(
                rng.random_range(0..=3),
                rng.random_range(1..=4),
                rng.random_range(0..=3),
            )
            .unwrap();
            let mut sim = Simulator::new(config).unwrap();
            let mut reference = ReferenceCache {
                config,
                sets: vec![Vec::new(); config.num_sets()],
            };

            for _ in 0..500 {
                let address = rng.random_range(0..512u64);
                let cache_hit = sim.access(address).unwrap();
                assert_eq!(cache_hit, reference.access(address), "{config:?} {address:#x}");

                sim.check_consistency().unwrap();
            }

            let result = sim.result();
            assert_eq!(result.accesses(), 500);
            // every miss that did not evict filled a line that is still resident
            let resident = (0..config.num_sets())
                .map(|set_index| sim.tracker.len(set_index))
                .sum::<usize>() as u64;
            assert_eq!(result.miss_count - result.eviction_count, resident);
        }
    }
}
