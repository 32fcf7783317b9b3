//! Splits an address into `| tag | set index | block offset |`.

use crate::config::CacheConfig;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    pub tag: u64,
    pub set_index: usize,
}

pub fn decode(address: u64, config: &CacheConfig) -> DecodedAddress {
    DecodedAddress {
        tag: tag(address, config),
        set_index: set_index(address, config),
    }
}

pub fn tag(address: u64, config: &CacheConfig) -> u64 {
    // shifting by the full address width leaves no tag bits
    address
        .checked_shr(config.set_index_bits() + config.offset_bits())
        .unwrap_or(0)
}

pub fn set_index(address: u64, config: &CacheConfig) -> usize {
    let set_index_mask = !(!0u64 << config.set_index_bits());
    let block = address.checked_shr(config.offset_bits()).unwrap_or(0);

    // the mask keeps at most `usize::BITS - 1` bits, see `CacheConfig::new`
    (block & set_index_mask) as usize
}
