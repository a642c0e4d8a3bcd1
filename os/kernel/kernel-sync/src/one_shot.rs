use core::sync::atomic::{AtomicBool, Ordering};

/// A latch that flips from clear to set exactly once.
///
/// Setting publishes everything the setter wrote before it; a reader that
/// observes the latch set also observes those writes.
///
/// ```
/// use kernel_sync::OneShot;
///
/// static DONE: OneShot = OneShot::new();
/// assert!(!DONE.is_set());
/// assert!(DONE.set());
/// assert!(!DONE.set());
/// assert!(DONE.is_set());
/// ```
#[derive(Debug, Default)]
pub struct OneShot {
    set: AtomicBool,
}

impl OneShot {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            set: AtomicBool::new(false),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_set(&self) -> bool {
        self.set.load(Ordering::Acquire)
    }

    /// Sets the latch. Returns `true` if this call was the one that set it.
    #[inline]
    pub fn set(&self) -> bool {
        !self.set.swap(true, Ordering::AcqRel)
    }
}
