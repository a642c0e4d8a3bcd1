use crate::PhysicalAddress;
use core::fmt;

/// A half-open span `[start, start + len)` of physical memory.
///
/// The end is computed with overflow checking: a range whose end would wrap
/// past the top of the address space has no end and is never contained in
/// another range.
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct PhysicalRange {
    start: PhysicalAddress,
    len: u64,
}

impl PhysicalRange {
    #[inline]
    #[must_use]
    pub const fn new(start: PhysicalAddress, len: u64) -> Self {
        Self { start, len }
    }

    #[inline]
    #[must_use]
    pub const fn start(&self) -> PhysicalAddress {
        self.start
    }

    #[inline]
    #[must_use]
    pub const fn len(&self) -> u64 {
        self.len
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Exclusive end, or `None` if it would overflow.
    #[inline]
    #[must_use]
    pub const fn end(&self) -> Option<PhysicalAddress> {
        self.start.checked_add(self.len)
    }

    /// Whether `other` lies entirely within `self`.
    ///
    /// An empty `other` is contained if its start lies within `self` or on
    /// its end boundary.
    #[must_use]
    pub fn contains_range(&self, other: &Self) -> bool {
        match (self.end(), other.end()) {
            (Some(end), Some(other_end)) => self.start <= other.start && other_end <= end,
            _ => false,
        }
    }
}

impl fmt::Debug for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PhysicalRange({}+0x{:X})", self.start, self.len)
    }
}

impl fmt::Display for PhysicalRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "[{}, {})", self.start, end),
            None => write!(f, "[{}, <overflow>)", self.start),
        }
    }
}
