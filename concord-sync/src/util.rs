//! Small synchronization helpers shared by channels and exchanges.

use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::Notify;

/// Locks a mutex, recovering the guard if a previous holder panicked.
///
/// Every critical section in this crate leaves its data consistent before
/// calling anything that could panic.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Waits until `settled` holds, re-checking whenever `notify` fires.
///
/// Interest is registered before each check, so a notification sent between
/// the check and the await is never lost.
pub(crate) async fn wait_until(notify: &Notify, settled: impl Fn() -> bool) {
    loop {
        let notified = notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if settled() {
            return;
        }
        notified.await;
    }
}
