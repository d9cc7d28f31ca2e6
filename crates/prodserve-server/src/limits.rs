//! Worker pool limits for asynchronous execution.
//!
//! Every accepted asynchronous invocation runs on its own tokio task, gated
//! by a semaphore so the number of concurrently executing jobs is bounded.
//! Excess jobs queue in creation order rather than being rejected: creation
//! has already handed the caller a status handle, so rejection would break
//! the asynchronous contract.

/// Limits for the asynchronous worker pool.
///
/// # Example
///
/// ```
/// use prodserve_server::WorkerPoolConfig;
///
/// let config = WorkerPoolConfig::new().with_max_concurrent_jobs(8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Maximum number of jobs executing at once; further jobs queue
    pub max_concurrent_jobs: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 32,
        }
    }
}

impl WorkerPoolConfig {
    /// Creates a configuration with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of concurrently executing jobs.
    pub fn with_max_concurrent_jobs(mut self, max: usize) -> Self {
        self.max_concurrent_jobs = max;
        self
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the limit is zero or implausibly large.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_concurrent_jobs == 0 {
            return Err("max concurrent jobs must be greater than zero".to_string());
        }
        if self.max_concurrent_jobs > 4096 {
            return Err(format!(
                "max concurrent jobs must be <= 4096 (got {})",
                self.max_concurrent_jobs
            ));
        }
        Ok(())
    }
}
