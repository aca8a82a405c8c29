//! Batch runner configuration.

use serde::{Deserialize, Serialize};

/// Configuration for one [`BatchRunner`](crate::runner::BatchRunner)
/// invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    /// Maximum records selected per batch. Default: 25.
    pub batch_size: usize,

    /// Politeness delay between successive page fetches, in milliseconds,
    /// observed after every attempt (success or failure). Default: 1000.
    pub delay_ms: u64,

    /// Number of batches to run. `None` = run until the backlog is empty.
    pub max_batches: Option<usize>,

    /// Hard cap on total records processed across all batches.
    /// `None` = unbounded.
    pub max_posts: Option<usize>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            batch_size: 25,
            delay_ms: 1000,
            max_batches: Some(1),
            max_posts: None,
        }
    }
}

impl RunnerConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the per-batch selection limit.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the inter-request delay in milliseconds.
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Set the number of batches to run.
    pub fn with_max_batches(mut self, batches: usize) -> Self {
        self.max_batches = Some(batches);
        self
    }

    /// Run batches until the backlog selection comes back empty.
    pub fn until_empty(mut self) -> Self {
        self.max_batches = None;
        self
    }

    /// Cap the total number of records processed across all batches.
    pub fn with_max_posts(mut self, max_posts: usize) -> Self {
        self.max_posts = Some(max_posts);
        self
    }
}
