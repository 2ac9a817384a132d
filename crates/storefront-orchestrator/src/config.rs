use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

/// Tuning for how a workflow is driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct OrchestratorConfig {
    /// Upper bound on invokes in flight at once. Unbounded when unset.
    #[serde(default)]
    max_concurrency: Option<NonZeroUsize>,
}

impl OrchestratorConfig {
    #[must_use]
    pub fn max_concurrency(&self) -> Option<NonZeroUsize> {
        self.max_concurrency
    }

    #[must_use]
    pub fn with_max_concurrency(mut self, limit: NonZeroUsize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Steps run one at a time, in execution-plan order.
    #[must_use]
    pub fn sequential() -> Self {
        Self::default().with_max_concurrency(NonZeroUsize::MIN)
    }

    pub(crate) fn concurrency_limit(&self) -> usize {
        self.max_concurrency.map_or(usize::MAX, NonZeroUsize::get)
    }
}
