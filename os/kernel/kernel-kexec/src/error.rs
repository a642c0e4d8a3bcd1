use kernel_memory_addresses::{PhysicalRange, VirtualAddress};

/// Reasons an image is rejected before anything irreversible happens.
///
/// All of these leave the image unannotated; the loader may retry with a
/// different image or abandon the request.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KexecError {
    /// Secondary CPUs can be brought up but not taken down again.
    #[error("SMP hardware without CPU hotplug support cannot kexec reliably")]
    UnsupportedTopology,
    /// A segment's destination is not backed by system memory.
    #[error("segment {index} destination {range} is not in system memory")]
    InvalidSegment { index: usize, range: PhysicalRange },
    /// A segment's source buffer could not be read.
    #[error("fault reading the header of segment {index} at {address}")]
    ReadFault {
        index: usize,
        address: VirtualAddress,
    },
    /// The relocation stub and its parameter block do not fit one page.
    #[error(
        "relocation stub ({stub_len} bytes) and handoff block ({block_len} bytes) exceed the {page_size}-byte control page"
    )]
    ControlPageOverflow {
        stub_len: usize,
        block_len: usize,
        page_size: usize,
    },
}

/// A loader-supplied buffer could not be read.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
#[error("fault accessing user memory at {0}")]
pub struct UserFault(pub VirtualAddress);
