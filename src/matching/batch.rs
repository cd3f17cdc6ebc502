//! Bounded-concurrency fan-out of per-profile work.
//!
//! Every item is tagged with its input index; workers hold a semaphore permit while the
//! synchronous pipeline runs on the blocking pool, and results are written back by index.

use std::fmt;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::config::MatchingConfig;

/// Caller-fault problems with a batch request itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("batch of {count} items exceeds the maximum of {max}")]
    TooLarge { count: usize, max: usize },
    #[error("concurrency must be at least 1")]
    InvalidConcurrency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchOrchestrator {
    max_items: usize,
    default_concurrency: usize,
}

impl BatchOrchestrator {
    pub fn new(max_items: usize, default_concurrency: usize) -> Self {
        Self {
            max_items: max_items.max(1),
            default_concurrency: default_concurrency.max(1),
        }
    }

    pub fn from_config(config: &MatchingConfig) -> Self {
        Self::new(config.batch_max_items, config.max_batch_concurrency)
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn default_concurrency(&self) -> usize {
        self.default_concurrency
    }

    /// Validate the batch shape and resolve the effective concurrency.
    pub fn admit(&self, count: usize, concurrency: Option<usize>) -> Result<usize, BatchError> {
        if count > self.max_items {
            return Err(BatchError::TooLarge {
                count,
                max: self.max_items,
            });
        }
        match concurrency {
            Some(0) => Err(BatchError::InvalidConcurrency),
            Some(limit) => Ok(limit),
            None => Ok(self.default_concurrency),
        }
    }

    /// Run `work` over `items` with at most `concurrency` items in flight.
    ///
    /// Items for which `skip` returns true resolve to `O::default()` without taking a permit.
    /// A failed or panicked item also resolves to `O::default()` and is logged at `warn`.
    pub async fn run<I, O, E, S, F>(
        &self,
        items: Vec<I>,
        concurrency: Option<usize>,
        skip: S,
        work: F,
    ) -> Result<Vec<O>, BatchError>
    where
        I: Send + 'static,
        O: Default + Send + 'static,
        E: fmt::Display + Send + 'static,
        S: Fn(&I) -> bool,
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    {
        let total = items.len();
        // Never more permits than items; keeps the semaphore under MAX_PERMITS.
        let limit = self.admit(total, concurrency)?.min(total.max(1));
        let semaphore = Arc::new(Semaphore::new(limit));
        let work = Arc::new(work);
        let mut slots: Vec<Option<O>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut tasks = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            if skip(&item) {
                slots[index] = Some(O::default());
                continue;
            }

            let semaphore = Arc::clone(&semaphore);
            let work = Arc::clone(&work);
            tasks.spawn(async move {
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => tokio::task::spawn_blocking(move || work(item))
                        .await
                        .map_err(|join| format!("worker panicked: {join}"))
                        .and_then(|result| result.map_err(|err| err.to_string())),
                    Err(closed) => Err(closed.to_string()),
                };
                (index, outcome)
            });
        }

        let mut failed = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(output))) => slots[index] = Some(output),
                Ok((index, Err(reason))) => {
                    failed += 1;
                    warn!(index, error = %reason, "batch item failed; returning empty result");
                }
                Err(join) => {
                    failed += 1;
                    warn!(error = %join, "batch task aborted; its slot stays empty");
                }
            }
        }

        debug!(total, limit, failed, "batch complete");
        Ok(slots.into_iter().map(Option::unwrap_or_default).collect())
    }
}

impl Default for BatchOrchestrator {
    fn default() -> Self {
        Self::from_config(&MatchingConfig::default())
    }
}
