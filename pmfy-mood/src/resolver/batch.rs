//! Bounded-parallel batch resolution
//!
//! Items sharing a cache key are fetched once and the outcome fanned out to
//! every member. Output order follows completion order, not input order.

use super::cache::{CachedOutcome, ResolverCache};
use super::retry::RetryPolicy;
use crate::error::{FetchError, SkipReason};
use crate::models::StageStats;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use thiserror::Error;

/// Per-item result
#[derive(Debug, Clone, PartialEq)]
pub enum ItemOutcome<V> {
    Resolved(V),
    Skipped(SkipReason),
}

/// The collaborator is unusable; the whole stage must stop
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Batch aborted: {detail}")]
pub struct BatchAbort {
    pub detail: String,
}

/// Every input item paired with its outcome, plus stage counters
#[derive(Debug)]
pub struct BatchOutput<I, V> {
    pub outcomes: Vec<(I, ItemOutcome<V>)>,
    pub stats: StageStats,
}

impl<I, V> BatchOutput<I, V> {
    pub fn resolved(&self) -> impl Iterator<Item = (&I, &V)> {
        self.outcomes.iter().filter_map(|(item, outcome)| match outcome {
            ItemOutcome::Resolved(value) => Some((item, value)),
            ItemOutcome::Skipped(_) => None,
        })
    }

    pub fn skipped(&self) -> impl Iterator<Item = (&I, SkipReason)> {
        self.outcomes.iter().filter_map(|(item, outcome)| match outcome {
            ItemOutcome::Skipped(reason) => Some((item, *reason)),
            ItemOutcome::Resolved(_) => None,
        })
    }

    /// Drop skipped items, keeping resolved values
    pub fn into_resolved(self) -> Vec<(I, V)> {
        self.outcomes
            .into_iter()
            .filter_map(|(item, outcome)| match outcome {
                ItemOutcome::Resolved(value) => Some((item, value)),
                ItemOutcome::Skipped(_) => None,
            })
            .collect()
    }
}

struct KeyGroup<K, I> {
    key: K,
    representative: I,
    members: Vec<I>,
}

/// Resolver for one stage: cache, retry policy and concurrency limit
pub struct BatchResolver<K: Hash + Eq, V> {
    label: &'static str,
    cache: ResolverCache<K, V>,
    retry: RetryPolicy,
    concurrency: usize,
}

impl<K, V> BatchResolver<K, V>
where
    K: Hash + Eq + Clone + Display,
    V: Clone,
{
    pub fn new(label: &'static str, concurrency: usize, retry: RetryPolicy, cache_capacity: usize) -> Self {
        Self {
            label,
            cache: ResolverCache::new(cache_capacity),
            retry,
            concurrency: concurrency.max(1),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn cache(&self) -> &ResolverCache<K, V> {
        &self.cache
    }

    /// Resolve every item
    ///
    /// `fetch` receives the first item of each key group. At most
    /// `concurrency` fetches are in flight at once. Returns [`BatchAbort`]
    /// when the collaborator reports itself unreachable, or when nothing
    /// resolved and every failure was an exhausted transient error.
    pub async fn run<I, KF, F, Fut>(
        &self,
        items: Vec<I>,
        key_fn: KF,
        fetch: F,
    ) -> Result<BatchOutput<I, V>, BatchAbort>
    where
        I: Clone,
        KF: Fn(&I) -> K,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<V, FetchError>>,
    {
        self.run_alongside(0, items, key_fn, fetch).await
    }

    /// Like [`run`](Self::run), for a stage that already holds `prior_survivors`
    /// items resolved outside this batch
    ///
    /// Exhausted retries only abort when the stage has no survivors at all;
    /// otherwise they are ordinary drops. `Unreachable` always aborts.
    pub async fn run_alongside<I, KF, F, Fut>(
        &self,
        prior_survivors: usize,
        items: Vec<I>,
        key_fn: KF,
        fetch: F,
    ) -> Result<BatchOutput<I, V>, BatchAbort>
    where
        I: Clone,
        KF: Fn(&I) -> K,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<V, FetchError>>,
    {
        let mut stats = StageStats {
            input: items.len(),
            ..Default::default()
        };
        let mut outcomes: Vec<(I, ItemOutcome<V>)> = Vec::with_capacity(items.len());

        // Group by key, preserving first-seen order
        let mut index: HashMap<K, usize> = HashMap::new();
        let mut groups: Vec<KeyGroup<K, I>> = Vec::new();
        for item in items {
            let key = key_fn(&item);
            match index.get(&key) {
                Some(&slot) => groups[slot].members.push(item),
                None => {
                    index.insert(key.clone(), groups.len());
                    groups.push(KeyGroup {
                        key,
                        representative: item.clone(),
                        members: vec![item],
                    });
                }
            }
        }

        let mut pending = Vec::new();
        for group in groups {
            match self.cache.get(&group.key) {
                Some(CachedOutcome::Found(value)) => {
                    tracing::debug!(stage = self.label, key = %group.key, "Cache hit");
                    stats.cache_hits += 1;
                    for member in group.members {
                        outcomes.push((member, ItemOutcome::Resolved(value.clone())));
                    }
                }
                Some(CachedOutcome::NotFound) => {
                    tracing::debug!(stage = self.label, key = %group.key, "Cache hit (not found)");
                    stats.cache_hits += 1;
                    for member in group.members {
                        outcomes.push((member, ItemOutcome::Skipped(SkipReason::NotFound)));
                    }
                }
                None => pending.push(group),
            }
        }

        tracing::debug!(
            stage = self.label,
            keys_to_fetch = pending.len(),
            concurrency = self.concurrency,
            "Starting batch fetch"
        );

        let retry = self.retry;
        let label = self.label;
        let fetch = &fetch;
        let mut in_flight = stream::iter(pending)
            .map(move |group| async move {
                let representative = group.representative.clone();
                let attempted = retry.run(label, || fetch(representative.clone())).await;
                (group, attempted)
            })
            .buffer_unordered(self.concurrency);

        let mut last_transient: Option<String> = None;

        while let Some((group, attempted)) = in_flight.next().await {
            stats.outbound_calls += attempted.attempts as usize;

            let outcome = match attempted.result {
                Ok(value) => {
                    self.cache.insert(group.key.clone(), CachedOutcome::Found(value.clone()));
                    ItemOutcome::Resolved(value)
                }
                Err(FetchError::NotFound) => {
                    tracing::debug!(stage = self.label, key = %group.key, "Not found");
                    self.cache.insert(group.key.clone(), CachedOutcome::NotFound);
                    ItemOutcome::Skipped(SkipReason::NotFound)
                }
                Err(FetchError::Rejected(reason)) => {
                    tracing::debug!(stage = self.label, key = %group.key, reason = %reason, "Rejected");
                    ItemOutcome::Skipped(SkipReason::Rejected)
                }
                Err(FetchError::Transient(reason)) => {
                    last_transient = Some(reason);
                    ItemOutcome::Skipped(SkipReason::RetriesExhausted)
                }
                Err(FetchError::Unreachable(detail)) => {
                    tracing::error!(
                        stage = self.label,
                        key = %group.key,
                        error = %detail,
                        "Collaborator unreachable, aborting batch"
                    );
                    return Err(BatchAbort { detail });
                }
            };

            for member in group.members {
                outcomes.push((member, outcome.clone()));
            }
        }

        for (_, outcome) in &outcomes {
            match outcome {
                ItemOutcome::Resolved(_) => stats.resolved += 1,
                ItemOutcome::Skipped(SkipReason::NotFound) => stats.dropped_not_found += 1,
                ItemOutcome::Skipped(SkipReason::Rejected) => stats.dropped_rejected += 1,
                ItemOutcome::Skipped(SkipReason::RetriesExhausted) => {
                    stats.dropped_retries_exhausted += 1
                }
            }
        }

        if prior_survivors == 0
            && stats.resolved == 0
            && stats.dropped_retries_exhausted > 0
            && stats.dropped_retries_exhausted == stats.dropped()
        {
            let detail = format!(
                "all {} lookups failed after retries: {}",
                stats.dropped_retries_exhausted,
                last_transient.unwrap_or_default()
            );
            tracing::error!(stage = self.label, error = %detail, "Total outage, aborting batch");
            return Err(BatchAbort { detail });
        }

        if stats.has_losses() {
            tracing::warn!(
                stage = self.label,
                dropped = stats.dropped(),
                not_found = stats.dropped_not_found,
                rejected = stats.dropped_rejected,
                retries_exhausted = stats.dropped_retries_exhausted,
                "Items dropped from stage"
            );
        }

        tracing::info!(
            stage = self.label,
            input = stats.input,
            resolved = stats.resolved,
            cache_hits = stats.cache_hits,
            outbound_calls = stats.outbound_calls,
            "Batch complete"
        );

        Ok(BatchOutput { outcomes, stats })
    }
}
