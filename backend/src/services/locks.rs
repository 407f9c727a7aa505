use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;

/// One async lock per destination worksheet, so runs against the same tab queue up
/// while runs against different tabs proceed in parallel. Entries nobody holds or waits
/// on any more are dropped whenever a lock is requested.
#[derive(Default)]
pub struct SheetLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SheetLocks {
    pub fn lock_for(&self, spreadsheet_id: &str, tab: &str) -> Arc<AsyncMutex<()>> {
        let key = format!("{spreadsheet_id}/{tab}");
        let mut locks = match self.locks.lock() {
            Ok(locks) => locks,
            Err(poisoned) => poisoned.into_inner(),
        };
        // The map's own reference is the only one left for idle entries.
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        locks.entry(key).or_default().clone()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_tab_shares_a_lock() {
        let locks = SheetLocks::default();
        let a = locks.lock_for("sheet", "Example");
        let b = locks.lock_for("sheet", "Example");
        let other = locks.lock_for("sheet", "Sheet1");

        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other));
    }

    #[test]
    fn released_locks_are_dropped() {
        let locks = SheetLocks::default();
        let held = locks.lock_for("sheet", "Example");
        drop(locks.lock_for("sheet", "Sheet1"));

        let again = locks.lock_for("sheet", "Other");

        assert_eq!(locks.tracked(), 2);
        assert!(Arc::ptr_eq(&held, &locks.lock_for("sheet", "Example")));
        drop(again);
    }

    #[tokio::test]
    async fn second_run_waits_for_the_first() {
        let locks = SheetLocks::default();
        let guard = locks.lock_for("sheet", "Example").lock_owned().await;

        assert!(locks.lock_for("sheet", "Example").try_lock().is_err());
        drop(guard);
        assert!(locks.lock_for("sheet", "Example").try_lock().is_ok());
    }
}
