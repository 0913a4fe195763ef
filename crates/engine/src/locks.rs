//! Per-key async mutual exclusion.
//!
//! Receipt updates are serialized per receipt id (a usage toggle moves a file,
//! two concurrent toggles would race on it) and uploads per content digest (two
//! uploads of the same image must not both pass the duplicate check).

use std::{
    collections::HashMap,
    hash::Hash,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard returned by [`KeyedLocks::lock`]; the key is released on drop.
pub type KeyGuard = OwnedMutexGuard<()>;

#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds `key`.
    pub async fn lock(&self, key: &K) -> KeyGuard {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            // Drop slots nobody holds or waits on.
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots
                .entry(key.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Locks several keys in a stable order so overlapping batches cannot
    /// deadlock.
    pub async fn lock_many(&self, keys: &[K]) -> Vec<KeyGuard>
    where
        K: Ord,
    {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            guards.push(self.lock(key).await);
        }
        guards
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::<i64>::new());
        let guard = locks.lock(&1).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.lock(&1).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::<String>::new();
        let _a = locks.lock(&"a".to_string()).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock(&"b".to_string())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_slots_are_pruned() {
        let locks = KeyedLocks::<i64>::new();
        drop(locks.lock(&1).await);
        drop(locks.lock(&2).await);
        let _three = locks.lock(&3).await;
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test]
    async fn lock_many_dedups_keys() {
        let locks = KeyedLocks::<i64>::new();
        let guards = locks.lock_many(&[3, 1, 3, 2]).await;
        assert_eq!(guards.len(), 3);
    }
}
