/// Configuration for the snapshot history.

/// Number of snapshots retained before the oldest is evicted.
pub const DEFAULT_CAPACITY: usize = 50;

/// Configuration for the history system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Max snapshots held at once. Always at least 1.
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl HistoryConfig {
    /// Creates a config with the given capacity, raised to 1 if zero.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
        }
    }
}
