//! Scoped device power lock.

/// Keeps the device from suspending while an operation runs.
pub trait PowerLock: Send + Sync {
    fn lock(&self);
    fn unlock(&self);
}

/// Power lock for hosts that never suspend mid-operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPowerLock;

impl PowerLock for NoPowerLock {
    fn lock(&self) {}
    fn unlock(&self) {}
}

/// Holds a [`PowerLock`] until dropped, on every exit path.
#[must_use = "the lock is released as soon as the guard is dropped"]
pub struct PowerGuard<'a> {
    lock: &'a dyn PowerLock,
}

impl<'a> PowerGuard<'a> {
    pub fn acquire(lock: &'a dyn PowerLock) -> Self {
        lock.lock();
        Self { lock }
    }
}

impl Drop for PowerGuard<'_> {
    fn drop(&mut self) {
        self.lock.unlock();
    }
}
