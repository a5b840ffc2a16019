use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

/// Per-session async mutexes so that writes to one session run one at a time
/// within this process. The store's version check covers other processes.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>>,
}

impl SessionLocks {
    pub async fn acquire(&self, session_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            // drop entries nobody holds or waits on
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(session_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.inner.lock().unwrap().len()
    }
}

#[cfg(test)]
mod lock_tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn same_session_is_serialized() {
        let locks = SessionLocks::default();
        let id = Uuid::new_v4();
        let guard = locks.acquire(id).await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.acquire(id).await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn different_sessions_do_not_block_and_idle_entries_are_dropped() {
        let locks = SessionLocks::default();
        let _a = locks.acquire(Uuid::new_v4()).await;
        {
            let _b = locks.acquire(Uuid::new_v4()).await;
        }
        let _c = locks.acquire(Uuid::new_v4()).await;
        // b was released before c was acquired
        assert_eq!(locks.tracked(), 2);
    }
}
