//! What the kexec path needs from the rest of the kernel.
//!
//! Each trait covers one collaborator. The core is generic over them so the
//! protocol logic stays ordinary, testable code while everything that
//! touches hardware lives behind these seams.

use crate::cpu::{CpuId, CpuMask};
use crate::error::UserFault;
use crate::handoff::RelocationStub;
use kernel_memory_addresses::{PhysicalAddress, PhysicalRange, VirtualAddress};

/// CPU bookkeeping of the running kernel.
pub trait Topology {
    /// Number of CPUs that may ever be brought online.
    fn possible_cpu_count(&self) -> usize;

    /// CPUs currently marked online.
    fn online_cpus(&self) -> CpuMask;

    #[inline]
    fn online_cpu_count(&self) -> usize {
        self.online_cpus().count()
    }

    /// Whether secondary CPUs can be started on this hardware.
    fn can_secondary_boot(&self) -> bool;

    /// Whether this kernel can park and resume individual CPUs.
    fn can_cpu_hotplug(&self) -> bool;

    /// Permanently removes `cpu` from the online set.
    fn set_cpu_offline(&self, cpu: CpuId);
}

/// Per-CPU primitives usable with interrupts and scheduling disabled.
pub trait Cpu {
    /// The CPU executing the caller.
    fn current_cpu(&self) -> CpuId;

    /// Busy-waits for roughly `ms` milliseconds.
    fn mdelay(&self, ms: u32);

    /// Low-power wait until the next event; may return spuriously.
    fn wait_for_event(&self);
}

/// Physical memory map and address translation.
pub trait PhysMemory {
    /// Whether `range` lies entirely within system RAM.
    fn is_region_memory(&self, range: PhysicalRange) -> bool;

    /// Physical address of `va` under the identity mapping.
    fn virt_to_idmap(&self, va: VirtualAddress) -> PhysicalAddress;
}

/// Access to buffers supplied by the loader.
pub trait UserMemory {
    /// Fills `dst` from `src`.
    ///
    /// # Errors
    /// Returns [`UserFault`] if any byte of the source is inaccessible.
    fn read_user(&self, src: VirtualAddress, dst: &mut [u8]) -> Result<(), UserFault>;
}

/// Cache maintenance.
pub trait CacheOps {
    /// Cleans and invalidates every data cache level of the calling CPU.
    fn flush_cache_all(&self);

    /// Makes `len` bytes at `start` coherent between data and instruction
    /// caches, so that freshly written code can be executed.
    fn flush_icache_range(&self, start: VirtualAddress, len: usize);
}

/// Interrupt control on the calling CPU and the interrupt controller.
pub trait Interrupts {
    fn local_irq_disable(&self);

    /// Disables the high-priority (fast) interrupt source.
    fn local_fiq_disable(&self);

    /// Completes in-flight interrupts and masks every interrupt line.
    fn mask_all_interrupts(&self);
}

/// Work executed on another CPU that never hands the CPU back.
pub trait RemoteCall: Sync {
    fn run(&self) -> !;
}

/// Asynchronous single-CPU function calls.
pub trait CrossCall {
    /// Queues `call` on `cpu` and returns without waiting for delivery.
    fn call_single_async(&self, cpu: CpuId, call: &'static dyn RemoteCall);
}

/// Crash dump register notes.
pub trait CrashDump {
    /// Architecture register snapshot.
    type Registers: Copy + Send;

    /// Captures the calling CPU's registers, preferring `saved` (the context
    /// of the exception or interrupt being handled) when available.
    fn capture_registers(&self, saved: Option<&Self::Registers>) -> Self::Registers;

    /// Stores `regs` as the crash note of `cpu`.
    fn commit_snapshot(&self, cpu: CpuId, regs: &Self::Registers);
}

/// The final hand-over of control.
pub trait Relocation {
    /// The opaque routine that places the remaining pages and enters the
    /// new kernel.
    fn relocation_stub(&self) -> RelocationStub;

    /// Machine identifier passed to the new kernel.
    fn machine_type(&self) -> u32;

    /// Cleans the data caches, turns address translation off and jumps to
    /// `entry`.
    ///
    /// The handoff block is stored through the cache after the stub was made
    /// executable; implementations must clean the data caches to the point of
    /// coherency before disabling translation so the stub reads it from RAM.
    ///
    /// # Safety
    /// `entry` must be the identity-mapped address of code that is coherent
    /// in the instruction cache. Nothing of the running kernel survives.
    unsafe fn soft_restart(&self, entry: PhysicalAddress) -> !;
}

/// Everything the kexec machine needs, in one bound.
pub trait KexecPlatform:
    Topology + Cpu + PhysMemory + UserMemory + CacheOps + Interrupts + CrossCall + CrashDump + Relocation + Sync
{
}

impl<T> KexecPlatform for T where
    T: Topology
        + Cpu
        + PhysMemory
        + UserMemory
        + CacheOps
        + Interrupts
        + CrossCall
        + CrashDump
        + Relocation
        + Sync
{
}
