//! Mutation engine tuning, embedded as `[mutation]` in the fuzz config.

use serde::{Deserialize, Serialize};

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MutatorConfig {
    /// Candidates tried by one `mutate` call before giving up.
    pub max_attempts: u32,

    /// Synthesis prefers resources that no later verb depends on.
    pub prefer_independent: bool,

    /// Removing a producer also removes everything that depends on what it produced.
    pub cascade_remove: bool,

    pub weights: MutationWeights,
}

/// Relative odds of each mutation kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MutationWeights {
    pub insert: u32,
    pub remove: u32,
    #[serde(rename = "move")]
    pub relocate: u32,
    pub reparam: u32,
}

impl Default for MutatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 64,
            prefer_independent: true,
            cascade_remove: true,
            weights: MutationWeights::default(),
        }
    }
}

impl Default for MutationWeights {
    fn default() -> Self {
        Self {
            insert: 4,
            remove: 2,
            relocate: 2,
            reparam: 2,
        }
    }
}

impl MutationWeights {
    pub fn total(&self) -> u64 {
        [self.insert, self.remove, self.relocate, self.reparam]
            .iter()
            .map(|weight| u64::from(*weight))
            .sum()
    }
}

impl MutatorConfig {
    /// Problems with the settings, one message each.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.max_attempts == 0 {
            problems.push("mutation.max_attempts must be > 0".to_string());
        }
        if self.weights.total() == 0 {
            problems.push("mutation.weights must not all be zero".to_string());
        }
        problems
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(MutatorConfig::default().problems().is_empty());
    }

    #[test]
    fn zero_weights_and_attempts_are_reported() {
        let cfg = MutatorConfig {
            max_attempts: 0,
            weights: MutationWeights {
                insert: 0,
                remove: 0,
                relocate: 0,
                reparam: 0,
            },
            ..MutatorConfig::default()
        };
        assert_eq!(cfg.problems().len(), 2);
    }
}
