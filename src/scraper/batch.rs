//! Bounded-parallel batched fetching.
//!
//! Ids are split into contiguous batches, each batch runs as one task on a
//! [`JoinSet`], and a [`Semaphore`] caps how many are in flight. The call
//! returns only after every task has been joined.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, trace};

use crate::utils::fmt_duration;

/// Ids requested per call to the programs, schedules and extended-metadata endpoints.
pub const MAX_QUERIES: usize = 5000;

/// Ids requested per call to the description and artwork endpoints.
pub const MAX_IMAGE_QUERIES: usize = 500;

/// Splits `ids` into `ceil(len / batch_size)` contiguous batches.
pub fn partition<T: Clone>(ids: &[T], batch_size: usize) -> Vec<Vec<T>> {
    ids.chunks(batch_size.max(1)).map(<[T]>::to_vec).collect()
}

#[derive(Debug, Clone, Copy)]
pub struct BatchFetcher {
    max_parallel: usize,
}

impl BatchFetcher {
    pub fn new(max_parallel: usize) -> Self {
        Self {
            max_parallel: max_parallel.max(1),
        }
    }

    pub fn max_parallel(&self) -> usize {
        self.max_parallel
    }

    /// Fetches every id exactly once and returns all records in completion order.
    ///
    /// A batch whose `fetch` yields `None` contributes nothing; it never fails the call.
    pub async fn fetch_all<T, F, Fut>(&self, ids: &[String], batch_size: usize, fetch: F) -> Vec<T>
    where
        T: Send + 'static,
        F: Fn(Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<Vec<T>>> + Send + 'static,
    {
        if ids.is_empty() {
            return Vec::new();
        }

        let start = Instant::now();
        let batches = partition(ids, batch_size);
        let batch_count = batches.len();
        let fetch = Arc::new(fetch);
        let semaphore = Arc::new(Semaphore::new(self.max_parallel));
        let results: Arc<Mutex<Vec<T>>> = Arc::new(Mutex::new(Vec::new()));
        let mut join_set = JoinSet::new();

        for (index, batch) in batches.into_iter().enumerate() {
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) => permit,
                Err(e) => {
                    error!(error = ?e, "Batch semaphore closed, dispatch stopped");
                    break;
                }
            };
            let fetch = Arc::clone(&fetch);
            let results = Arc::clone(&results);

            join_set.spawn(async move {
                let _permit = permit;
                let size = batch.len();
                trace!(batch = index, size, "Dispatching batch");
                match (*fetch)(batch).await {
                    Some(records) => {
                        debug!(batch = index, size, records = records.len(), "Batch completed");
                        results
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .extend(records);
                    }
                    None => debug!(batch = index, size, "Batch returned no data"),
                }
            });
        }

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                error!(error = ?e, "Batch task failed");
            }
        }

        debug!(
            ids = ids.len(),
            batches = batch_count,
            duration = fmt_duration(start.elapsed()),
            "All batches joined"
        );

        match Arc::try_unwrap(results) {
            Ok(mutex) => mutex.into_inner().unwrap_or_else(PoisonError::into_inner),
            Err(shared) => std::mem::take(&mut *shared.lock().unwrap_or_else(PoisonError::into_inner)),
        }
    }
}
