use crate::config::{CacheConfig, ConfigError};
use crate::error::InvariantViolation;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheLine {
    pub valid: bool,
    pub tag: u64,
}

/// All cache-lines of the cache, stored set after set in one allocation.
///
/// Only knows which tags are resident, the order in which lines are
/// replaced is decided by the caller.
#[derive(Debug, Clone)]
pub struct CacheStore {
    num_lines: usize,
    lines: Vec<CacheLine>,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Result<Self, ConfigError> {
        let too_large = || config.too_large();

        let len = config
            .num_sets()
            .checked_mul(config.num_lines())
            .ok_or_else(too_large)?;

        let mut lines = Vec::new();
        lines.try_reserve_exact(len).map_err(|_| too_large())?;
        lines.resize(len, CacheLine::default());

        Ok(Self {
            num_lines: config.num_lines(),
            lines,
        })
    }

    pub fn num_sets(&self) -> usize {
        self.lines.len() / self.num_lines
    }

    pub fn set(&self, set_index: usize) -> &[CacheLine] {
        let start = set_index * self.num_lines;
        &self.lines[start..start + self.num_lines]
    }

    fn set_mut(&mut self, set_index: usize) -> &mut [CacheLine] {
        let start = set_index * self.num_lines;
        &mut self.lines[start..start + self.num_lines]
    }

    pub fn lookup(&self, set_index: usize, tag: u64) -> bool {
        self.set(set_index)
            .iter()
            .any(|line| line.valid && line.tag == tag)
    }

    pub fn has_free_slot(&self, set_index: usize) -> bool {
        self.set(set_index).iter().any(|line| !line.valid)
    }

    pub fn occupy_free_slot(&mut self, set_index: usize, tag: u64) -> Result<(), InvariantViolation> {
        let line = self
            .set_mut(set_index)
            .iter_mut()
            .find(|line| !line.valid)
            .ok_or(InvariantViolation::NoFreeSlot { set_index })?;

        *line = CacheLine { valid: true, tag };
        Ok(())
    }

    pub fn overwrite_line(
        &mut self,
        set_index: usize,
        old_tag: u64,
        new_tag: u64,
    ) -> Result<(), InvariantViolation> {
        let line = self
            .set_mut(set_index)
            .iter_mut()
            .find(|line| line.valid && line.tag == old_tag)
            .ok_or(InvariantViolation::TagNotResident {
                set_index,
                tag: old_tag,
            })?;

        line.tag = new_tag;
        Ok(())
    }

    pub fn valid_tags(&self, set_index: usize) -> impl Iterator<Item = u64> + '_ {
        self.set(set_index)
            .iter()
            .filter(|line| line.valid)
            .map(|line| line.tag)
    }

    pub fn reset(&mut self) {
        self.lines.fill(CacheLine::default());
    }
}
