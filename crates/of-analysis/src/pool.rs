//! Bounded worker pool for per-column sub-operations.

use crate::error::{AnalysisError, AnalysisResult};
use futures::stream::{self, StreamExt};
use of_core::CancelFlag;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Runs sub-operations with bounded concurrency.
///
/// Pools derived with [`with_cancel`](Self::with_cancel) share one semaphore,
/// so concurrent runs draw from the same permit budget.
#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_concurrency: usize,
    cancel: CancelFlag,
}

impl WorkerPool {
    pub fn new(max_concurrency: usize) -> Self {
        let max_concurrency = max_concurrency.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrency)),
            max_concurrency,
            cancel: CancelFlag::new(),
        }
    }

    /// Same permits, different cancellation flag.
    pub fn with_cancel(&self, cancel: CancelFlag) -> Self {
        Self {
            semaphore: Arc::clone(&self.semaphore),
            max_concurrency: self.max_concurrency,
            cancel,
        }
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Apply `f` to every item, at most `max_concurrency` at a time.
    ///
    /// Results keep input order. Cancellation is checked before each item
    /// starts; once observed, no further items start and the call returns
    /// [`AnalysisError::Cancelled`].
    pub async fn map<I, T, F, Fut>(&self, items: Vec<I>, f: F) -> AnalysisResult<Vec<T>>
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = T>,
    {
        let f = &f;
        let mut results: Vec<(usize, Option<T>)> = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move {
                let Ok(_permit) = self.semaphore.acquire().await else {
                    return (index, None);
                };
                if self.cancel.is_cancelled() {
                    return (index, None);
                }
                (index, Some(f(item).await))
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        results.sort_by_key(|(index, _)| *index);
        results
            .into_iter()
            .map(|(_, result)| result.ok_or(AnalysisError::Cancelled))
            .collect()
    }
}
