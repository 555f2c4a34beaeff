use std::sync::{LockResult, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub(crate) fn read<'a, T: ?Sized>(
    lock: &'a RwLock<T>,
    op: &'static str,
) -> RwLockReadGuard<'a, T> {
    recover(lock.read(), "rwlock.read", op)
}

pub(crate) fn write<'a, T: ?Sized>(
    lock: &'a RwLock<T>,
    op: &'static str,
) -> RwLockWriteGuard<'a, T> {
    recover(lock.write(), "rwlock.write", op)
}

pub(crate) fn lock<'a, T: ?Sized>(mutex: &'a Mutex<T>, op: &'static str) -> MutexGuard<'a, T> {
    recover(mutex.lock(), "mutex.lock", op)
}

// Poisoned locks are recovered and logged.
fn recover<G>(result: LockResult<G>, lock_kind: &'static str, op: &'static str) -> G {
    result.unwrap_or_else(|poisoned| {
        warn!(
            op,
            lock_kind,
            result = "poisoned_recovered",
            "Recovered from poisoned note store lock"
        );
        poisoned.into_inner()
    })
}
