//! Feasibility checks run before an image is committed to.

use crate::config::KexecConfig;
use crate::error::KexecError;
use crate::handoff::HandoffParameterBlock;
use crate::image::{CONTROL_PAGE_SIZE, KernelImage, RegistrationPointer, RegistrationSource, Segment};
use crate::platform::{PhysMemory, Relocation, Topology, UserMemory};
use log::{debug, warn};

/// Vets `image` and annotates it with its boot parameter location.
///
/// The checks run in this order and stop at the first failure:
///
/// 1. SMP-capable hardware requires CPU hotplug support, otherwise the other
///    CPUs could not be stopped later.
/// 2. Every segment destination must lie within system memory.
/// 3. Every segment's first word is read, whatever its buffer size; a device
///    tree magic makes that segment's destination the boot parameter pointer
///    (the last match wins).
/// 4. The platform's relocation stub and the handoff block must fit the
///    control page.
///
/// Nothing is copied and no CPU is touched. On error the image is left
/// exactly as it was.
///
/// # Errors
/// See [`KexecError`].
pub fn machine_kexec_prepare<P>(
    platform: &P,
    config: &KexecConfig,
    image: &mut KernelImage<'_>,
) -> Result<(), KexecError>
where
    P: Topology + PhysMemory + UserMemory + Relocation + ?Sized,
{
    let result = check_topology(platform)
        .and_then(|()| check_destinations(platform, image.segments()))
        .and_then(|()| find_registration(platform, config, image))
        .and_then(|registration| check_control_page(platform).map(|()| registration));

    match result {
        Ok(registration) => {
            debug!(
                "kexec image entry {} boots with parameters at {} ({:?})",
                image.entry(),
                registration.address,
                registration.source
            );
            image.set_registration(registration);
            Ok(())
        }
        Err(err) => {
            warn!("rejecting kexec image: {err}");
            Err(err)
        }
    }
}

fn check_topology<P>(platform: &P) -> Result<(), KexecError>
where
    P: Topology + ?Sized,
{
    if platform.possible_cpu_count() > 1
        && platform.can_secondary_boot()
        && !platform.can_cpu_hotplug()
    {
        return Err(KexecError::UnsupportedTopology);
    }
    Ok(())
}

fn check_destinations<P>(platform: &P, segments: &[Segment]) -> Result<(), KexecError>
where
    P: PhysMemory + ?Sized,
{
    for (index, segment) in segments.iter().enumerate() {
        let range = segment.destination();
        if !platform.is_region_memory(range) {
            return Err(KexecError::InvalidSegment { index, range });
        }
    }
    Ok(())
}

fn find_registration<P>(
    platform: &P,
    config: &KexecConfig,
    image: &KernelImage<'_>,
) -> Result<RegistrationPointer, KexecError>
where
    P: UserMemory + ?Sized,
{
    let mut registration = RegistrationPointer {
        address: config.default_registration(image.entry()),
        source: RegistrationSource::LegacyDefault,
    };

    for (index, segment) in image.segments().iter().enumerate() {
        let mut header = [0u8; size_of::<u32>()];
        platform
            .read_user(segment.buf, &mut header)
            .map_err(|fault| KexecError::ReadFault {
                index,
                address: fault.0,
            })?;

        if u32::from_be_bytes(header) == config.dtb_magic {
            debug!("kexec segment {index} at {} holds a device tree", segment.mem);
            registration = RegistrationPointer {
                address: segment.mem,
                source: RegistrationSource::DeviceTree { segment: index },
            };
        }
    }

    Ok(registration)
}

fn check_control_page<P>(platform: &P) -> Result<(), KexecError>
where
    P: Relocation + ?Sized,
{
    let stub = platform.relocation_stub();
    if stub.fits_control_page() {
        Ok(())
    } else {
        Err(KexecError::ControlPageOverflow {
            stub_len: stub.code().len(),
            block_len: HandoffParameterBlock::SIZE,
            page_size: CONTROL_PAGE_SIZE,
        })
    }
}
