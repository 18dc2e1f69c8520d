/*!
 * Filter Policy
 * Pure predicate gating buffer inspection
 */

use serde::{Deserialize, Serialize};

/// Decides whether an intercepted operation warrants buffer inspection.
///
/// A cheap gate handlers apply before touching the memory bridge, so
/// unrelated or oversized buffers are never mapped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPolicy {
    /// Path suffix marking protected files
    pub suffix: String,
    /// Largest transfer worth mapping, in bytes
    pub max_size: usize,
}

impl FilterPolicy {
    #[must_use]
    pub fn new(suffix: impl Into<String>, max_size: usize) -> Self {
        Self {
            suffix: suffix.into(),
            max_size,
        }
    }

    /// True iff `path` ends with the configured suffix and
    /// `1 <= size <= max_size`. Size 0 is never inspected, regardless of
    /// path.
    #[must_use]
    pub fn should_inspect(&self, path: &str, size: usize) -> bool {
        size > 0 && size <= self.max_size && path.ends_with(&self.suffix)
    }
}

impl Default for FilterPolicy {
    fn default() -> Self {
        Self::new(".prot", 4096)
    }
}
