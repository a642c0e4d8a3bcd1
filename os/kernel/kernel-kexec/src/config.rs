//! Tunables of the kexec path.
//!
//! The defaults reproduce the legacy zImage boot convention: the kernel
//! entry sits [`DEFAULT_LEGACY_IMAGE_OFFSET`] above the start of RAM and the
//! boot tag list [`DEFAULT_LEGACY_TAG_OFFSET`] above it. Platforms with a
//! different layout override the values through [`KexecConfig`].

use kernel_memory_addresses::PhysicalAddress;

/// Offset of a legacy kernel image's entry point from the start of RAM.
pub const DEFAULT_LEGACY_IMAGE_OFFSET: u64 = 0x8000;

/// Offset of the legacy boot tag list from the start of RAM.
pub const DEFAULT_LEGACY_TAG_OFFSET: u64 = 0x1000;

/// Flattened device tree header magic, stored big-endian.
pub const DTB_MAGIC: u32 = 0xd00d_feed;

/// How long the crash path waits for other CPUs to stop.
pub const DEFAULT_STOP_TIMEOUT_MS: u32 = 1000;

/// Busy-wait granularity while waiting for other CPUs to stop.
pub const DEFAULT_STOP_POLL_INTERVAL_MS: u32 = 1;

/// Platform-overridable kexec configuration.
///
/// ```
/// use kernel_kexec::KexecConfig;
/// use kernel_memory_addresses::PhysicalAddress;
///
/// let config = KexecConfig::new();
/// let r2 = config.default_registration(PhysicalAddress::new(0x8000_8000));
/// assert_eq!(r2, PhysicalAddress::new(0x8000_1000));
///
/// let custom = KexecConfig::new().with_legacy_offsets(0x10_0000, 0x100);
/// let r2 = custom.default_registration(PhysicalAddress::new(0x8010_0000));
/// assert_eq!(r2, PhysicalAddress::new(0x8000_0100));
/// ```
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct KexecConfig {
    /// Entry offset of a legacy image relative to the start of RAM.
    pub legacy_image_offset: u64,
    /// Boot tag list offset relative to the start of RAM.
    pub legacy_tag_offset: u64,
    /// Big-endian magic identifying a device tree segment.
    pub dtb_magic: u32,
    /// Upper bound on the wait for other CPUs during a crash.
    pub stop_timeout_ms: u32,
    /// Delay between two polls of the stop acknowledgement counter.
    pub stop_poll_interval_ms: u32,
}

impl Default for KexecConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl KexecConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            legacy_image_offset: DEFAULT_LEGACY_IMAGE_OFFSET,
            legacy_tag_offset: DEFAULT_LEGACY_TAG_OFFSET,
            dtb_magic: DTB_MAGIC,
            stop_timeout_ms: DEFAULT_STOP_TIMEOUT_MS,
            stop_poll_interval_ms: DEFAULT_STOP_POLL_INTERVAL_MS,
        }
    }

    #[must_use]
    pub const fn with_legacy_offsets(mut self, image_offset: u64, tag_offset: u64) -> Self {
        self.legacy_image_offset = image_offset;
        self.legacy_tag_offset = tag_offset;
        self
    }

    #[must_use]
    pub const fn with_stop_timeout(mut self, timeout_ms: u32, poll_interval_ms: u32) -> Self {
        self.stop_timeout_ms = timeout_ms;
        self.stop_poll_interval_ms = poll_interval_ms;
        self
    }

    /// Boot parameter address used when no segment carries a device tree.
    ///
    /// Computed modulo 2^64, as the boot register is a plain machine word.
    #[must_use]
    pub const fn default_registration(&self, entry: PhysicalAddress) -> PhysicalAddress {
        PhysicalAddress::new(
            entry
                .as_u64()
                .wrapping_sub(self.legacy_image_offset)
                .wrapping_add(self.legacy_tag_offset),
        )
    }

    /// Poll interval clamped to at least one millisecond.
    #[must_use]
    pub const fn poll_interval_ms(&self) -> u32 {
        if self.stop_poll_interval_ms == 0 {
            1
        } else {
            self.stop_poll_interval_ms
        }
    }

    /// Number of polls that fit into the stop timeout.
    #[must_use]
    pub const fn stop_poll_budget(&self) -> u32 {
        self.stop_timeout_ms.div_ceil(self.poll_interval_ms())
    }
}
