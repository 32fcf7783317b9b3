/// The cache store and the recency tracking of a set disagree.
///
/// This never happens while both are only driven through
/// [`Simulator`](crate::simulation::Simulator), so a run that reports one of
/// these has to be aborted: its counts can no longer be trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    NoFreeSlot { set_index: usize },
    TagNotResident { set_index: usize, tag: u64 },
    EmptyTracker { set_index: usize },
    TrackerFull { capacity: usize, tag: u64 },
    Desynchronized { set_index: usize },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantViolation::NoFreeSlot { set_index } => {
                f.write_fmt(format_args!("set {set_index} has no free line"))
            }
            InvariantViolation::TagNotResident { set_index, tag } => f.write_fmt(format_args!(
                "tag {tag:#x} is not resident in set {set_index}"
            )),
            InvariantViolation::EmptyTracker { set_index } => f.write_fmt(format_args!(
                "set {set_index} is full but tracks no recently used line"
            )),
            InvariantViolation::TrackerFull { capacity, tag } => f.write_fmt(format_args!(
                "unable to track tag {tag:#x}, all {capacity} entries are in use"
            )),
            InvariantViolation::Desynchronized { set_index } => f.write_fmt(format_args!(
                "valid lines and recency order of set {set_index} differ"
            )),
        }
    }
}

impl std::error::Error for InvariantViolation {}
