const ADDRESS_BITS: u32 = u64::BITS;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    AddressTooNarrow {
        set_index_bits: u32,
        offset_bits: u32,
    },
    NoLines,
    TooLarge {
        set_index_bits: u32,
        num_lines: usize,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::AddressTooNarrow {
                set_index_bits,
                offset_bits,
            } => f.write_fmt(format_args!(
                "{set_index_bits} set index bits and {offset_bits} offset bits do not fit into a {ADDRESS_BITS} bit address"
            )),
            ConfigError::NoLines => f.write_str("a set needs at least one line"),
            ConfigError::TooLarge {
                set_index_bits,
                num_lines,
            } => f.write_fmt(format_args!(
                "unable to allocate 2^{set_index_bits} sets with {num_lines} lines each"
            )),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Geometry of the simulated cache.
///
/// - `set_index_bits`: the cache has `2^set_index_bits` sets
/// - `num_lines`: number of cache-lines in a set (associativity)
/// - `offset_bits`: a cache-line holds `2^offset_bits` bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    set_index_bits: u32,
    num_lines: usize,
    offset_bits: u32,
}

impl CacheConfig {
    pub fn new(set_index_bits: u32, num_lines: usize, offset_bits: u32) -> Result<Self, ConfigError> {
        if set_index_bits
            .checked_add(offset_bits)
            .is_none_or(|bits| bits > ADDRESS_BITS)
        {
            return Err(ConfigError::AddressTooNarrow {
                set_index_bits,
                offset_bits,
            });
        }

        if num_lines == 0 {
            return Err(ConfigError::NoLines);
        }

        // the number of sets has to be addressable on this platform
        if set_index_bits >= usize::BITS {
            return Err(ConfigError::TooLarge {
                set_index_bits,
                num_lines,
            });
        }

        Ok(Self {
            set_index_bits,
            num_lines,
            offset_bits,
        })
    }

    pub fn set_index_bits(&self) -> u32 {
        self.set_index_bits
    }

    pub fn num_lines(&self) -> usize {
        self.num_lines
    }

    pub fn offset_bits(&self) -> u32 {
        self.offset_bits
    }

    pub fn num_sets(&self) -> usize {
        1 << self.set_index_bits
    }

    pub fn tag_bits(&self) -> u32 {
        ADDRESS_BITS - (self.set_index_bits + self.offset_bits)
    }

    /// Size of a cache-line in bytes, `None` if it does not fit into a `u64`.
    pub fn block_size(&self) -> Option<u64> {
        1u64.checked_shl(self.offset_bits)
    }

    pub(crate) fn too_large(&self) -> ConfigError {
        ConfigError::TooLarge {
            set_index_bits: self.set_index_bits,
            num_lines: self.num_lines,
        }
    }

    pub fn format_info(&self) -> String {
        let block_size = self.block_size();
        let total_size = block_size
            .and_then(|block_size| block_size.checked_mul(self.num_lines as u64))
            .and_then(|set_size| set_size.checked_mul(self.num_sets() as u64));

        let format_bytes = |bytes: Option<u64>| match bytes {
            Some(bytes) => format!("{bytes}B"),
            None => String::from("overflow"),
        };

        [
            String::from("LRU Cache:"),
            format!("\tTotal Size: {}", format_bytes(total_size)),
            format!("\tSets: {}", self.num_sets()),
            format!("\tWays: {}", self.num_lines),
            format!("\tLine-Size: {}", format_bytes(block_size)),
            format!(
                "\t| {} tag bits | {} set bits | {} offset bits |",
                self.tag_bits(),
                self.set_index_bits,
                self.offset_bits
            ),
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn derived_geometry() {
        let config = CacheConfig::new(5, 1, 5).unwrap();

        assert_eq!(config.num_sets(), 32);
        assert_eq!(config.block_size(), Some(32));
        assert_eq!(config.tag_bits(), 54);
        assert!(config.format_info().contains("Total Size: 1024B"));
        assert!(config.format_info().contains("| 54 tag bits | 5 set bits | 5 offset bits |"));
    }

    #[test]
    fn single_set() {
        let config = CacheConfig::new(0, 8, 4).unwrap();
        assert_eq!(config.num_sets(), 1);
    }

    #[test]
    fn whole_address_is_offset() {
        let config = CacheConfig::new(0, 1, 64).unwrap();

        assert_eq!(config.tag_bits(), 0);
        assert_eq!(config.block_size(), None);
        assert!(config.format_info().contains("Line-Size: overflow"));
    }

    #[test]
    fn rejects_invalid_geometry() {
        assert_eq!(
            CacheConfig::new(40, 1, 30),
            Err(ConfigError::AddressTooNarrow {
                set_index_bits: 40,
                offset_bits: 30
            })
        );
        assert_eq!(
            CacheConfig::new(u32::MAX, 1, 1),
            Err(ConfigError::AddressTooNarrow {
                set_index_bits: u32::MAX,
                offset_bits: 1
            })
        );
        assert_eq!(CacheConfig::new(4, 0, 4), Err(ConfigError::NoLines));
        assert!(matches!(
            CacheConfig::new(64, 1, 0),
            Err(ConfigError::TooLarge { .. })
        ));
    }
}
