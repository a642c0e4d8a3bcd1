//! The point of no return.

use crate::handoff::{HandoffParameterBlock, install_relocation_stub};
use crate::image::KernelImage;
use crate::platform::{CacheOps, PhysMemory, Relocation, Topology};
use log::info;

/// Installs the relocation stub for `image` and jumps to it.
///
/// The stub copies the remaining pages described by the image's indirection
/// list and enters the new kernel; this function never returns.
///
/// # Panics
/// If more than one CPU is still online. That can only happen when the
/// checks in [`machine_kexec_prepare`](crate::machine_kexec_prepare) or the
/// CPU shutdown did not hold, and a CPU still running while its memory is
/// being overwritten cannot be recovered from. Also panics if `image` was
/// never successfully prepared.
pub fn machine_kexec<P>(platform: &P, image: KernelImage<'_>) -> !
where
    P: Topology + PhysMemory + CacheOps + Relocation + ?Sized,
{
    let online = platform.online_cpu_count();
    assert!(
        online <= 1,
        "kexec with {online} CPUs online: secondary CPUs were not stopped"
    );

    let Some(registration) = image.registration() else {
        panic!("kexec of an image that was never prepared");
    };

    let block = HandoffParameterBlock {
        start: image.entry(),
        indirection_page: image.head().page_address(),
        mach_type: u64::from(platform.machine_type()),
        boot_register: registration.address.as_u64(),
    };

    let stub = platform.relocation_stub();
    let mut control_page = image.into_control_page();
    let reboot_entry = install_relocation_stub(platform, &mut control_page, &stub, &block);

    let reboot_entry_phys = platform.virt_to_idmap(reboot_entry);

    info!("Bye!");

    // SAFETY: the stub was copied into the identity-mappable control page and
    // its instruction cache range flushed; all other CPUs are offline.
    unsafe { platform.soft_restart(reboot_entry_phys) }
}
