//! Layout shared between the kernel and the relocation stub.
//!
//! The control page is filled as
//!
//! ```text
//! base ┌──────────────────────────────┐
//!      │ relocation stub code         │ RelocationStub::code
//!      ├──────────────────────────────┤ base + code.len()
//!      │ start            (u64)       │ new kernel entry, physical
//!      │ indirection_page (u64)       │ head of the indirection list
//!      │ mach_type        (u64)       │ machine identifier
//!      │ boot_register    (u64)       │ boot parameter pointer
//!      ├──────────────────────────────┤
//!      │ unused                       │
//!      └──────────────────────────────┘ base + CONTROL_PAGE_SIZE
//! ```
//!
//! The stub locates the block by its own length, so neither side may change
//! the field order on its own. Words are stored in native byte order.

use crate::image::{CONTROL_PAGE_SIZE, ControlPage};
use crate::platform::CacheOps;
use core::mem::{offset_of, size_of};
use kernel_memory_addresses::{PhysicalAddress, VirtualAddress};

/// The position-independent routine that finishes the job after the jump.
#[derive(Debug, Copy, Clone)]
pub struct RelocationStub {
    code: &'static [u8],
    entry_offset: usize,
}

impl RelocationStub {
    /// # Panics
    /// If `entry_offset` is not inside `code`.
    #[must_use]
    pub const fn new(code: &'static [u8], entry_offset: usize) -> Self {
        assert!(entry_offset < code.len(), "stub entry outside of its code");
        Self { code, entry_offset }
    }

    #[must_use]
    pub const fn code(&self) -> &'static [u8] {
        self.code
    }

    #[must_use]
    pub const fn entry_offset(&self) -> usize {
        self.entry_offset
    }

    /// Whether the stub and a [`HandoffParameterBlock`] fit one control page.
    #[must_use]
    pub const fn fits_control_page(&self) -> bool {
        self.code.len() + HandoffParameterBlock::SIZE <= CONTROL_PAGE_SIZE
    }
}

/// Parameters the relocation stub reads right behind its own code.
#[repr(C)]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct HandoffParameterBlock {
    /// Physical entry point of the new kernel.
    pub start: PhysicalAddress,
    /// Page holding the first indirection list.
    pub indirection_page: PhysicalAddress,
    /// Machine identifier for the boot calling convention.
    pub mach_type: u64,
    /// Boot register value (the boot parameter pointer).
    pub boot_register: u64,
}

impl HandoffParameterBlock {
    pub const SIZE: usize = size_of::<Self>();

    pub const START_OFFSET: usize = offset_of!(Self, start);
    pub const INDIRECTION_PAGE_OFFSET: usize = offset_of!(Self, indirection_page);
    pub const MACH_TYPE_OFFSET: usize = offset_of!(Self, mach_type);
    pub const BOOT_REGISTER_OFFSET: usize = offset_of!(Self, boot_register);

    /// Serializes the block into the first [`Self::SIZE`] bytes of `dst`.
    ///
    /// # Panics
    /// If `dst` is shorter than [`Self::SIZE`].
    pub fn write_to(&self, dst: &mut [u8]) {
        let dst = &mut dst[..Self::SIZE];
        put(dst, Self::START_OFFSET, self.start.as_u64());
        put(dst, Self::INDIRECTION_PAGE_OFFSET, self.indirection_page.as_u64());
        put(dst, Self::MACH_TYPE_OFFSET, self.mach_type);
        put(dst, Self::BOOT_REGISTER_OFFSET, self.boot_register);
    }

    /// Reads a block back from the first [`Self::SIZE`] bytes of `src`.
    ///
    /// # Panics
    /// If `src` is shorter than [`Self::SIZE`].
    #[must_use]
    pub fn read_from(src: &[u8]) -> Self {
        let src = &src[..Self::SIZE];
        Self {
            start: PhysicalAddress::new(get(src, Self::START_OFFSET)),
            indirection_page: PhysicalAddress::new(get(src, Self::INDIRECTION_PAGE_OFFSET)),
            mach_type: get(src, Self::MACH_TYPE_OFFSET),
            boot_register: get(src, Self::BOOT_REGISTER_OFFSET),
        }
    }
}

fn put(dst: &mut [u8], offset: usize, value: u64) {
    dst[offset..offset + size_of::<u64>()].copy_from_slice(&value.to_ne_bytes());
}

fn get(src: &[u8], offset: usize) -> u64 {
    let mut word = [0u8; size_of::<u64>()];
    word.copy_from_slice(&src[offset..offset + size_of::<u64>()]);
    u64::from_ne_bytes(word)
}

/// Copies `stub` to the start of `page`, makes it executable and stores
/// `block` right behind it.
///
/// On return the instruction cache is coherent over the copied code. The
/// block is only written to the data cache; it reaches RAM when
/// [`Relocation::soft_restart`](crate::platform::Relocation::soft_restart)
/// cleans the caches. The returned address is the stub's entry point in the
/// current mapping.
///
/// # Panics
/// If the stub and block do not fit the page; images that pass
/// [`machine_kexec_prepare`](crate::machine_kexec_prepare) always fit.
pub fn install_relocation_stub<C>(
    cache: &C,
    page: &mut ControlPage<'_>,
    stub: &RelocationStub,
    block: &HandoffParameterBlock,
) -> VirtualAddress
where
    C: CacheOps + ?Sized,
{
    assert!(
        stub.fits_control_page(),
        "relocation stub does not fit the control page"
    );

    let code = stub.code();
    let base = page.base();
    let bytes = page.bytes_mut();

    bytes[..code.len()].copy_from_slice(code);
    cache.flush_icache_range(base, code.len());

    block.write_to(&mut bytes[code.len()..]);

    base + stub.entry_offset() as u64
}
