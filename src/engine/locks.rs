use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::lock::{Mutex, OwnedMutexGuard};
use moka::future::Cache;

/// Async mutex per `(staff_id, date)`. Same-key clock actions queue up,
/// different keys never touch each other's lock.
pub struct KeyLocks {
    inner: Cache<(u64, NaiveDate), Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(100_000)
                .time_to_idle(Duration::from_secs(600))
                .build(),
        }
    }

    pub async fn acquire(&self, staff_id: u64, date: NaiveDate) -> OwnedMutexGuard<()> {
        let lock = self
            .inner
            .get_with((staff_id, date), async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::new()
    }
}
