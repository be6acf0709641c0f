//! # Transaction Serializer
//!
//! Keyed async mutual exclusion: at most one holder per key (payment id).
//! The guard releases on drop, so every exit path of the critical section,
//! including `?` returns and panics, gives the key back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

type LockMap = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Per-key async locks, created on demand and dropped when unused
#[derive(Clone, Default)]
pub struct KeyedLock {
    locks: Arc<LockMap>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`
    pub async fn acquire(&self, key: &str) -> KeyedGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = lock.lock_owned().await;
        trace!(key, "acquired payment lock");

        KeyedGuard {
            key: key.to_string(),
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
        }
    }

    /// Number of keys currently held or awaited
    pub fn active_keys(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

/// Exclusive access to one key until dropped
pub struct KeyedGuard {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<LockMap>,
}

impl KeyedGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // Only the map still references the mutex: nobody holds or awaits it
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
        trace!(key = %self.key, "released payment lock");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = KeyedLock::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = Arc::clone(&inside);
            let max_seen = Arc::clone(&max_seen);
            tasks.push(tokio::spawn(async move {
                let _guard = locks.acquire("pay_1").await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active_keys(), 0);
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyedLock::new();
        let _a = locks.acquire("pay_a").await;

        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("pay_b")).await;
        assert!(b.is_ok());
        assert_eq!(locks.active_keys(), 2);
    }

    #[tokio::test]
    async fn test_released_on_early_return() {
        async fn fails(locks: &KeyedLock) -> Result<(), &'static str> {
            let _guard = locks.acquire("pay_1").await;
            Err("gateway exploded")
        }

        let locks = KeyedLock::new();
        assert!(fails(&locks).await.is_err());
        assert_eq!(locks.active_keys(), 0);

        let reacquired =
            tokio::time::timeout(Duration::from_millis(100), locks.acquire("pay_1")).await;
        assert!(reacquired.is_ok());
    }
}
