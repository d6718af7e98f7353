use crate::domain::WorkflowId;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per workflow id. Mutating operations hold the guard for
/// their whole duration, so two operations on the same workflow never
/// interleave while different workflows proceed independently.
#[derive(Debug, Default)]
pub(crate) struct WorkflowLocks {
    locks: Mutex<HashMap<WorkflowId, Arc<Mutex<()>>>>,
}

impl WorkflowLocks {
    pub(crate) async fn acquire(&self, id: WorkflowId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.entry(id).or_default().clone()
        };
        lock.lock_owned().await
    }

    /// Drop the entry for a workflow that no longer exists in the active store.
    pub(crate) async fn forget(&self, id: WorkflowId) {
        self.locks.lock().await.remove(&id);
    }

    #[cfg(test)]
    pub(crate) async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_workflow_is_serialized() {
        let locks = Arc::new(WorkflowLocks::default());
        let id = WorkflowId::new();
        let guard = locks.acquire(id).await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_workflows_do_not_block() {
        let locks = WorkflowLocks::default();
        let _a = locks.acquire(WorkflowId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(WorkflowId::new())).await;
        assert!(b.is_ok());
        assert_eq!(locks.tracked().await, 2);
    }

    #[tokio::test]
    async fn test_forget_removes_entry() {
        let locks = WorkflowLocks::default();
        let id = WorkflowId::new();
        drop(locks.acquire(id).await);
        locks.forget(id).await;
        assert_eq!(locks.tracked().await, 0);
    }
}
