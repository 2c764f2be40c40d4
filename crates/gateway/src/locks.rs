//! Per-conversation request serialization.
//!
//! One `enhance` is several store calls in a row. Two requests for the same
//! conversation must not interleave, so each conversation id gets its own
//! async mutex. Requests for different conversations never wait on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;

#[derive(Default)]
pub struct ConversationLocks {
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, conversation_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(conversation_id.to_string()).or_default().clone()
    }

    /// Wait for exclusive access to one conversation.
    pub async fn acquire(&self, conversation_id: &str) -> OwnedMutexGuard<()> {
        self.lock_for(conversation_id).lock_owned().await
    }

    /// Exclusive access without waiting; `None` while a request holds it.
    pub fn try_acquire(&self, conversation_id: &str) -> Option<OwnedMutexGuard<()>> {
        self.lock_for(conversation_id).try_lock_owned().ok()
    }

    /// Drop entries nobody holds or waits on. Returns how many were dropped.
    pub fn prune(&self) -> usize {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_conversation_waits() {
        let locks = Arc::new(ConversationLocks::new());
        let guard = locks.acquire("C1").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("C1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should finish once the lock is released")
            .unwrap();
    }

    #[tokio::test]
    async fn different_conversations_do_not_block() {
        let locks = ConversationLocks::new();
        let _a = locks.acquire("A").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire("B")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }

    #[tokio::test]
    async fn try_acquire_fails_while_held() {
        let locks = ConversationLocks::new();
        let guard = locks.acquire("C1").await;
        assert!(locks.try_acquire("C1").is_none());
        assert!(locks.try_acquire("C2").is_some());

        drop(guard);
        assert!(locks.try_acquire("C1").is_some());
    }

    #[tokio::test]
    async fn prune_keeps_held_locks() {
        let locks = ConversationLocks::new();
        let held = locks.acquire("held").await;
        drop(locks.acquire("released").await);

        assert_eq!(locks.prune(), 1);
        assert_eq!(locks.len(), 1);

        drop(held);
        assert_eq!(locks.prune(), 1);
        assert!(locks.is_empty());
    }
}
