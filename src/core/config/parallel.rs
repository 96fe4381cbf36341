//! Shared parallel processing configuration types.

use serde::{Deserialize, Serialize};

use super::errors::{ConfigError, ConfigValidator};

/// Configuration for data parallelism inside a single extraction or restore call.
///
/// Each image of a batch is independent, so batches above
/// `utility_threshold` images are processed with rayon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelPolicy {
    /// Maximum number of threads to use for parallel processing.
    /// If None, rayon will use the default thread pool size (typically number of CPU cores).
    #[serde(default)]
    pub max_threads: Option<usize>,

    /// Batches with at most this many images are processed sequentially.
    /// Default: 4
    #[serde(default = "ParallelPolicy::default_utility_threshold")]
    pub utility_threshold: usize,
}

impl ParallelPolicy {
    /// Create a new ParallelPolicy with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never parallelizes.
    pub fn sequential() -> Self {
        Self {
            max_threads: None,
            utility_threshold: usize::MAX,
        }
    }

    /// Set the maximum number of threads.
    pub fn with_max_threads(mut self, max_threads: Option<usize>) -> Self {
        self.max_threads = max_threads;
        self
    }

    /// Set the sequential/parallel threshold.
    pub fn with_utility_threshold(mut self, threshold: usize) -> Self {
        self.utility_threshold = threshold;
        self
    }

    /// Returns true when a batch of `items` should be processed in parallel.
    pub fn should_parallelize(&self, items: usize) -> bool {
        items > self.utility_threshold
    }

    /// Install the global rayon thread pool with the configured number of threads.
    ///
    /// This method should be called once at application startup before any parallel
    /// processing occurs. If `max_threads` is None, this method does nothing and
    /// rayon will use its default thread pool size.
    ///
    /// # Returns
    ///
    /// - `Ok(true)` if the thread pool was successfully configured
    /// - `Ok(false)` if `max_threads` is None (no configuration needed)
    /// - `Err` if the thread pool has already been initialized
    pub fn install_global_thread_pool(&self) -> Result<bool, rayon::ThreadPoolBuildError> {
        if let Some(num_threads) = self.max_threads {
            rayon::ThreadPoolBuilder::new()
                .num_threads(num_threads)
                .build_global()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn default_utility_threshold() -> usize {
        4
    }
}

impl Default for ParallelPolicy {
    fn default() -> Self {
        Self {
            max_threads: None,
            utility_threshold: Self::default_utility_threshold(),
        }
    }
}

impl ConfigValidator for ParallelPolicy {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_threads == Some(0) {
            return Err(ConfigError::invalid(
                "max_threads must be greater than 0 when set",
            ));
        }
        Ok(())
    }

    fn get_defaults() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::ConfigValidatorExt;

    #[test]
    fn test_threshold_is_exclusive() {
        let policy = ParallelPolicy::new().with_utility_threshold(2);
        assert!(!policy.should_parallelize(2));
        assert!(policy.should_parallelize(3));
        assert!(!ParallelPolicy::sequential().should_parallelize(10_000));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let policy = ParallelPolicy::from_json_str(r#"{"max_threads": 2}"#).unwrap();
        assert_eq!(policy.max_threads, Some(2));
        assert_eq!(policy.utility_threshold, 4);
    }

    #[test]
    fn test_zero_threads_rejected() {
        assert!(ParallelPolicy::from_json_str(r#"{"max_threads": 0}"#).is_err());
    }
}
