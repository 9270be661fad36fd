use serde::{Deserialize, Serialize};

/// What a pooled request does when every pooled voice is busy.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Refuse the request with `PlayError::PoolExhausted`.
    #[default]
    Reject,
    /// Serve the request through an ad hoc, unpooled voice.
    Unpooled,
    /// Reclaim the pooled voice that started first and reuse it.
    StealOldest,
}

/// Construction-time settings for the playback manager.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    /// Whether pooled requests may use the pool at all.
    pub pooling_enabled: bool,
    /// Number of voices allocated up front. Values below 1 are treated as 1.
    pub capacity: usize,
    /// Behaviour when a pooled request finds no free voice.
    pub on_exhausted: ExhaustionPolicy,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            pooling_enabled: true,
            capacity: 10,
            on_exhausted: ExhaustionPolicy::default(),
        }
    }
}

impl PoolConfig {
    /// Capacity after clamping to at least one voice.
    pub fn effective_capacity(&self) -> usize {
        self.capacity.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_capacity_clamps_zero() {
        let cfg = PoolConfig {
            capacity: 0,
            ..PoolConfig::default()
        };
        assert_eq!(cfg.effective_capacity(), 1);
        assert_eq!(PoolConfig::default().effective_capacity(), 10);
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg: PoolConfig = toml::from_str("capacity = 4\non_exhausted = \"steal_oldest\"").unwrap();
        assert_eq!(cfg.capacity, 4);
        assert!(cfg.pooling_enabled);
        assert_eq!(cfg.on_exhausted, ExhaustionPolicy::StealOldest);
    }
}
