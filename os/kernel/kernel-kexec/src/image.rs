//! The candidate kernel as handed over by the loader.

use crate::entry::KimageEntry;
use kernel_memory_addresses::{PageSize, PhysicalAddress, PhysicalRange, Size4K, VirtualAddress};

/// Size of the control page in bytes.
#[allow(clippy::cast_possible_truncation)]
pub const CONTROL_PAGE_SIZE: usize = Size4K::SIZE as usize;

/// Why the image is being loaded.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ImageKind {
    /// Replaces the running kernel on an orderly reboot.
    Normal,
    /// Preloaded capture kernel, entered after a crash.
    Crash,
}

/// One region the new kernel wants placed in physical memory.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Segment {
    /// Source buffer in loader-supplied memory.
    pub buf: VirtualAddress,
    /// Bytes available at `buf`.
    pub bufsz: usize,
    /// Physical destination.
    pub mem: PhysicalAddress,
    /// Bytes reserved at `mem`; the tail past `bufsz` is zero-filled.
    pub memsz: u64,
}

impl Segment {
    #[must_use]
    pub const fn new(buf: VirtualAddress, bufsz: usize, mem: PhysicalAddress, memsz: u64) -> Self {
        Self {
            buf,
            bufsz,
            mem,
            memsz,
        }
    }

    /// Physical range the segment occupies once placed.
    #[must_use]
    pub const fn destination(&self) -> PhysicalRange {
        PhysicalRange::new(self.mem, self.memsz)
    }
}

/// Where the new kernel's boot parameters came from.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum RegistrationSource {
    /// Derived from the entry point with the legacy tag offsets.
    LegacyDefault,
    /// Destination of the segment at `segment` carrying a device tree.
    DeviceTree { segment: usize },
}

/// Physical address passed to the new kernel in its boot register.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RegistrationPointer {
    pub address: PhysicalAddress,
    pub source: RegistrationSource,
}

/// The page the relocation stub and its parameter block are copied into.
///
/// The page must be identity-mappable: its physical address is where the CPU
/// continues executing once translation is turned off.
pub struct ControlPage<'a> {
    base: VirtualAddress,
    bytes: &'a mut [u8; CONTROL_PAGE_SIZE],
}

impl<'a> ControlPage<'a> {
    /// Wraps the control page mapped at `base`, which must be page-aligned.
    #[must_use]
    pub const fn new(base: VirtualAddress, bytes: &'a mut [u8; CONTROL_PAGE_SIZE]) -> Self {
        debug_assert!(
            base.page_offset::<Size4K>() == 0,
            "control page must be 4K-aligned"
        );
        Self { base, bytes }
    }

    /// Wraps the control page mapped at `base` in the current address space.
    ///
    /// ```
    /// use kernel_kexec::{CONTROL_PAGE_SIZE, ControlPage};
    /// use kernel_memory_addresses::VirtualAddress;
    ///
    /// #[repr(align(4096))]
    /// struct Page([u8; CONTROL_PAGE_SIZE]);
    ///
    /// let page = Box::leak(Box::new(Page([0; CONTROL_PAGE_SIZE])));
    /// let base = VirtualAddress::from_ptr(page.0.as_ptr());
    /// let control = unsafe { ControlPage::from_raw(base) };
    /// assert_eq!(control.base(), base);
    /// assert!(control.bytes().iter().all(|b| *b == 0));
    /// ```
    ///
    /// # Safety
    /// `base` must be the page-aligned, writable mapping of a whole page that
    /// nothing else accesses for `'a`.
    #[must_use]
    pub unsafe fn from_raw(base: VirtualAddress) -> Self {
        debug_assert!(
            base.page_offset::<Size4K>() == 0,
            "control page must be 4K-aligned"
        );
        #[allow(clippy::cast_possible_truncation)]
        let ptr = base.as_u64() as usize as *mut [u8; CONTROL_PAGE_SIZE];
        // SAFETY: the caller guarantees an exclusively owned, mapped page.
        let bytes = unsafe { &mut *ptr };
        Self { base, bytes }
    }

    #[must_use]
    pub const fn base(&self) -> VirtualAddress {
        self.base
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes[..]
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..]
    }
}

/// A kernel image staged for kexec.
///
/// Built by the loader, annotated by
/// [`machine_kexec_prepare`](crate::machine_kexec_prepare) and finally
/// consumed by [`machine_kexec`](crate::machine_kexec).
pub struct KernelImage<'a> {
    kind: ImageKind,
    entry: PhysicalAddress,
    head: KimageEntry,
    segments: &'a [Segment],
    control_page: ControlPage<'a>,
    registration: Option<RegistrationPointer>,
}

impl<'a> KernelImage<'a> {
    #[must_use]
    pub const fn new(
        kind: ImageKind,
        entry: PhysicalAddress,
        head: KimageEntry,
        segments: &'a [Segment],
        control_page: ControlPage<'a>,
    ) -> Self {
        Self {
            kind,
            entry,
            head,
            segments,
            control_page,
            registration: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ImageKind {
        self.kind
    }

    /// Physical entry point of the new kernel.
    #[must_use]
    pub const fn entry(&self) -> PhysicalAddress {
        self.entry
    }

    /// First entry of the indirection list.
    #[must_use]
    pub const fn head(&self) -> KimageEntry {
        self.head
    }

    #[must_use]
    pub const fn segments(&self) -> &'a [Segment] {
        self.segments
    }

    #[must_use]
    pub const fn control_page(&self) -> &ControlPage<'a> {
        &self.control_page
    }

    /// Boot parameter location, present once the image has been prepared.
    #[must_use]
    pub const fn registration(&self) -> Option<RegistrationPointer> {
        self.registration
    }

    pub(crate) const fn set_registration(&mut self, registration: RegistrationPointer) {
        self.registration = Some(registration);
    }

    pub(crate) fn into_control_page(self) -> ControlPage<'a> {
        self.control_page
    }
}
