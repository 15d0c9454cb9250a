//! Shared dedup-key registry for concurrent mood tasks

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Set of claimed dedup keys
///
/// [`claim`](Self::claim) checks and inserts under one lock acquisition, so
/// two tasks racing for the same key cannot both win.
#[derive(Debug, Default)]
pub struct ClaimRegistry {
    claimed: Mutex<HashSet<String>>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<String>> {
        self.claimed.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claim `key`; `false` if another task already holds it
    pub fn claim(&self, key: &str) -> bool {
        self.lock().insert(key.to_string())
    }

    pub fn is_claimed(&self, key: &str) -> bool {
        self.lock().contains(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Claimed keys, sorted
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().iter().cloned().collect();
        keys.sort();
        keys
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tokio::task::JoinSet;

    #[test]
    fn test_second_claim_loses() {
        let registry = ClaimRegistry::new();
        assert!(registry.claim("song - band"));
        assert!(!registry.claim("song - band"));
        assert!(registry.is_claimed("song - band"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_exactly_one_winner_under_contention() {
        let registry = Arc::new(ClaimRegistry::new());
        let mut tasks = JoinSet::new();

        for _ in 0..32 {
            let registry = Arc::clone(&registry);
            tasks.spawn(async move { registry.claim("contested - key") });
        }

        let mut winners = 0;
        while let Some(result) = tasks.join_next().await {
            if result.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(registry.keys(), vec!["contested - key".to_string()]);
    }
}
