use core::sync::atomic::{AtomicUsize, Ordering};

/// Number of participants that have not yet checked in.
///
/// The owner [`arm`](Self::arm)s the countdown before asking others to act,
/// participants call [`arrive`](Self::arrive) once their work is visible, and
/// the owner polls [`remaining`](Self::remaining). `arrive` releases and
/// `remaining` acquires, so an owner that reads zero observes every write a
/// participant made before arriving.
///
/// ```
/// use kernel_sync::Countdown;
///
/// let pending = Countdown::new();
/// pending.arm(2);
/// assert_eq!(pending.arrive(), Some(1));
/// assert_eq!(pending.arrive(), Some(0));
/// assert!(pending.is_done());
/// // Stray arrivals never wrap the counter.
/// assert_eq!(pending.arrive(), None);
/// assert_eq!(pending.remaining(), 0);
/// ```
#[derive(Debug, Default)]
pub struct Countdown {
    pending: AtomicUsize,
}

impl Countdown {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            pending: AtomicUsize::new(0),
        }
    }

    /// Resets the number of outstanding arrivals to `count`.
    #[inline]
    pub fn arm(&self, count: usize) {
        self.pending.store(count, Ordering::Release);
    }

    /// Records one arrival and returns the count still outstanding, or
    /// `None` if nobody was outstanding.
    #[inline]
    pub fn arrive(&self) -> Option<usize> {
        self.pending
            .fetch_update(Ordering::Release, Ordering::Relaxed, |n| n.checked_sub(1))
            .ok()
            .map(|prev| prev - 1)
    }

    #[inline]
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    #[inline]
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.remaining() == 0
    }
}
