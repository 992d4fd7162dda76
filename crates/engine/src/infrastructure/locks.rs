//! Per-character single-writer locks.
//!
//! Every read-resolve-save transaction holds the lock of its character for
//! its whole duration. Different characters never share a lock.

use dashmap::DashMap;
use sheetsmith_domain::CharacterId;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Default)]
pub struct CharacterLocks {
    locks: DashMap<CharacterId, Arc<Mutex<()>>>,
}

impl CharacterLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to one character.
    pub async fn acquire(&self, id: CharacterId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the map shard is not held across the await
        let lock = self.locks.entry(id).or_default().clone();
        lock.lock_owned().await
    }

    /// Drop the lock entry of a deleted character.
    pub fn forget(&self, id: CharacterId) {
        self.locks.remove(&id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_character_is_exclusive() {
        let locks = Arc::new(CharacterLocks::new());
        let id = CharacterId::new();
        let guard = locks.acquire(id).await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
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
    async fn different_characters_do_not_contend() {
        let locks = CharacterLocks::new();
        let _first = locks.acquire(CharacterId::new()).await;
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(CharacterId::new()),
        )
        .await;
        assert!(second.is_ok());
    }
}
