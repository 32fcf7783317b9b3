#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct SimulationResult {
    pub hit_count: u64,
    pub miss_count: u64,
    pub eviction_count: u64,
}

impl SimulationResult {
    pub fn new() -> Self {
        Self {
            hit_count: 0,
            miss_count: 0,
            eviction_count: 0,
        }
    }

    pub fn accesses(&self) -> u64 {
        self.hit_count + self.miss_count
    }

    pub fn percent_hit(&self) -> f64 {
        self.percent_of(self.hit_count)
    }

    pub fn percent_miss(&self) -> f64 {
        self.percent_of(self.miss_count)
    }

    pub fn format_summary(&self) -> String {
        [
            self.to_string(),
            format!("Percent Hits: {:.3}%", self.percent_hit()),
            format!("Percent Misses: {:.3}%", self.percent_miss()),
        ]
        .join("\n")
    }

    fn percent_of(&self, count: u64) -> f64 {
        match self.accesses() {
            0 => 0.0,
            accesses => 100.0 * count as f64 / accesses as f64,
        }
    }
}

impl std::fmt::Display for SimulationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "hits:{} misses:{} evictions:{}",
            self.hit_count, self.miss_count, self.eviction_count
        ))
    }
}
