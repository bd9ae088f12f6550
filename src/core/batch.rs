//! Failure-isolating batch runner
//!
//! Runs one async operation per keyed item, in order, and partitions the
//! results. A failing item is logged and recorded; it never stops the rest of
//! the batch. Bulk patient sync and generator output harvesting both run on
//! top of this.

use crate::domain::{Result, SyncError};
use std::fmt::Display;
use std::future::Future;
use tracing::Span;

/// An item whose operation succeeded
#[derive(Debug)]
pub struct BatchSuccess<K, T> {
    pub key: K,
    pub value: T,
}

/// An item whose operation failed
#[derive(Debug)]
pub struct BatchFailure<K> {
    pub key: K,
    pub error: SyncError,
}

/// Partitioned results of a batch, each side in input order
#[derive(Debug)]
pub struct BatchOutcome<K, T> {
    pub succeeded: Vec<BatchSuccess<K, T>>,
    pub failed: Vec<BatchFailure<K>>,
}

impl<K, T> BatchOutcome<K, T> {
    pub fn new() -> Self {
        Self {
            succeeded: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record_success(&mut self, key: K, value: T) {
        self.succeeded.push(BatchSuccess { key, value });
    }

    pub fn record_failure(&mut self, key: K, error: SyncError) {
        self.failed.push(BatchFailure { key, error });
    }

    pub fn succeeded_keys(&self) -> impl Iterator<Item = &K> {
        self.succeeded.iter().map(|s| &s.key)
    }

    pub fn failed_keys(&self) -> impl Iterator<Item = &K> {
        self.failed.iter().map(|f| &f.key)
    }

    /// Folds the successful values
    pub fn aggregate<A>(&self, init: A, f: impl FnMut(A, &T) -> A) -> A {
        self.succeeded.iter().map(|s| &s.value).fold(init, f)
    }

    /// Number of items the batch ran
    pub fn processed(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    /// True when no item failed
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

impl<K, T> Default for BatchOutcome<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sequential runner with per-item failure isolation
pub struct BatchRunner {
    label: String,
    span: Span,
}

impl BatchRunner {
    /// `label` names the batch in log events, e.g. `bulk-sync`
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            span: Span::none(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Runs `operation` on every item in order
    ///
    /// Items are processed one at a time; the next item starts only after the
    /// previous one finished. Errors are captured into the outcome and logged
    /// with the item's key.
    pub async fn run<K, I, T, F, Fut>(
        &self,
        items: impl IntoIterator<Item = (K, I)>,
        mut operation: F,
    ) -> BatchOutcome<K, T>
    where
        K: Display,
        F: FnMut(I) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut outcome = BatchOutcome::new();

        for (key, item) in items {
            match operation(item).await {
                Ok(value) => outcome.record_success(key, value),
                Err(error) => {
                    tracing::error!(
                        parent: &self.span,
                        batch = %self.label,
                        key = %key,
                        error = %error,
                        "Batch item failed"
                    );
                    outcome.record_failure(key, error);
                }
            }
        }

        tracing::debug!(
            parent: &self.span,
            batch = %self.label,
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "Batch finished"
        );
        outcome
    }
}
