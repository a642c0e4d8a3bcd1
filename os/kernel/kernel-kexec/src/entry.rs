//! Entries of the kexec indirection list.
//!
//! The loader describes the copies still to be done as a chain of
//! page-sized lists of tagged page addresses. The relocation stub walks the
//! chain starting at the image's head entry; the only part of it this crate
//! touches is the head's page address, which becomes the indirection-page
//! pointer of the handoff block.

use bitfield_struct::bitfield;
use kernel_memory_addresses::{PageSize, PhysicalAddress, Size4K};

/// One tagged page address of the indirection list.
///
/// Exactly one of the flag bits is expected to be set on a well-formed entry.
#[bitfield(u64)]
#[derive(PartialEq, Eq)]
pub struct KimageEntry {
    /// Bit 0: following source pages are copied starting at this page.
    pub destination: bool,

    /// Bit 1: the page holds the next list of entries.
    pub indirection: bool,

    /// Bit 2: end of the list.
    pub done: bool,

    /// Bit 3: the page is copied to the current destination.
    pub source: bool,

    /// Bits 4–11: unused.
    #[bits(8)]
    __: u8,

    /// Bits 12–63: page frame number.
    #[bits(52)]
    frame: u64,
}

impl KimageEntry {
    #[must_use]
    pub fn destination_page(page: PhysicalAddress) -> Self {
        Self::for_page(page).with_destination(true)
    }

    #[must_use]
    pub fn indirection_page(page: PhysicalAddress) -> Self {
        Self::for_page(page).with_indirection(true)
    }

    #[must_use]
    pub fn source_page(page: PhysicalAddress) -> Self {
        Self::for_page(page).with_source(true)
    }

    #[must_use]
    pub fn end() -> Self {
        Self::new().with_done(true)
    }

    /// Page address with the flag bits masked off.
    #[must_use]
    pub fn page_address(&self) -> PhysicalAddress {
        PhysicalAddress::new(self.frame() << Size4K::SHIFT)
    }

    fn for_page(page: PhysicalAddress) -> Self {
        debug_assert!(page.is_aligned::<Size4K>(), "entry page must be 4K-aligned");
        Self::new().with_frame(page.as_u64() >> Size4K::SHIFT)
    }
}
