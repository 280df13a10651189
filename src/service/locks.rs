use std::sync::Arc;
use std::time::Duration;

use futures::lock::{Mutex, OwnedMutexGuard};
use moka::future::Cache;

/// One async mutex per employee, so a command's read-check-write runs without
/// another command for the same employee interleaving. Idle handles are
/// evicted.
#[derive(Clone)]
pub struct EmployeeLocks {
    handles: Cache<u64, Arc<Mutex<()>>>,
}

impl EmployeeLocks {
    pub fn new(idle: Duration) -> Self {
        Self {
            handles: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(idle)
                .build(),
        }
    }

    pub async fn acquire(&self, employee_id: u64) -> OwnedMutexGuard<()> {
        let handle = self
            .handles
            .get_with(employee_id, async { Arc::new(Mutex::new(())) })
            .await;
        handle.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn same_employee_waits_other_employees_do_not() {
        let locks = EmployeeLocks::new(Duration::from_secs(60));
        let held = locks.acquire(7).await;

        let other = locks.acquire(8).await;
        drop(other);

        let handle = locks.handles.get(&7).await.unwrap();
        assert!(handle.try_lock().is_none());

        drop(held);
        assert!(handle.try_lock().is_some());
    }
}
