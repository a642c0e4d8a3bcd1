use core::fmt;

/// Logical CPU number.
#[repr(transparent)]
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CpuId(u32);

impl CpuId {
    #[inline]
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[inline]
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU{}", self.0)
    }
}

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A set of up to [`CpuMask::MAX_CPUS`] logical CPUs.
///
/// ```
/// use kernel_kexec::{CpuId, CpuMask};
///
/// let online = CpuMask::first(4);
/// let others = online.without(CpuId::new(2));
/// assert_eq!(others.count(), 3);
/// assert_eq!(others.iter().map(CpuId::as_u32).collect::<Vec<_>>(), [0, 1, 3]);
/// ```
#[repr(transparent)]
#[derive(Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct CpuMask(u64);

impl CpuMask {
    pub const MAX_CPUS: u32 = u64::BITS;

    #[inline]
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[inline]
    #[must_use]
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// CPUs `0..n`.
    #[inline]
    #[must_use]
    pub const fn first(n: u32) -> Self {
        if n >= Self::MAX_CPUS {
            Self(u64::MAX)
        } else {
            Self((1u64 << n) - 1)
        }
    }

    #[inline]
    #[must_use]
    pub const fn bits(self) -> u64 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn with(self, cpu: CpuId) -> Self {
        Self(self.0 | Self::bit(cpu))
    }

    #[inline]
    #[must_use]
    pub const fn without(self, cpu: CpuId) -> Self {
        Self(self.0 & !Self::bit(cpu))
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, cpu: CpuId) -> bool {
        self.0 & Self::bit(cpu) != 0
    }

    #[inline]
    #[must_use]
    pub const fn count(self) -> usize {
        self.0.count_ones() as usize
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn iter(self) -> impl Iterator<Item = CpuId> {
        let mut rest = self.0;
        core::iter::from_fn(move || {
            if rest == 0 {
                return None;
            }
            let id = rest.trailing_zeros();
            rest &= rest - 1;
            Some(CpuId(id))
        })
    }

    const fn bit(cpu: CpuId) -> u64 {
        if cpu.0 < Self::MAX_CPUS {
            1 << cpu.0
        } else {
            0
        }
    }
}

impl fmt::Debug for CpuMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
