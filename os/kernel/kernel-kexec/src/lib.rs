//! # Kexec Machine Support
//!
//! The architecture half of kexec: everything between "the loader has
//! staged a new kernel" and "the CPU is executing the relocation stub with
//! translation off". Parsing the image, allocating its pages and building the
//! indirection list happen elsewhere; this crate decides whether the image
//! can be run, parks the other CPUs after a crash and performs the final,
//! non-returning jump.
//!
//! ## Flow
//!
//! ```text
//!   loader ──> machine_kexec_prepare ──> (reboot path)  ────────────┐
//!               │  topology check                                   │
//!               │  segment destinations in RAM                      │
//!               │  device tree lookup → boot register               ▼
//!               │                                            machine_kexec
//!               └──> (crash path) CrashCoordinator ──────────>  │ ≤ 1 CPU online
//!                     stop other CPUs, bounded wait             │ copy stub, flush I-cache
//!                     save registers, mask interrupts           │ write handoff block
//!                                                               │ soft restart (never returns)
//! ```
//!
//! ## Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`machine_kexec_prepare`] | Rejects images that cannot be run safely and records the boot parameter pointer. |
//! | [`CrashCoordinator`] | Forces all other CPUs into a parked state within a bounded time. |
//! | [`machine_kexec`] | Installs the [`RelocationStub`] and [`HandoffParameterBlock`] and jumps. |
//! | [`Machine`] | Bundles the above behind the [`MachineKexec`] hooks. |
//! | [`platform`] | The traits the surrounding kernel implements. |
//!
//! ## Error Tiers
//!
//! * Before anything irreversible happens, problems are returned as
//!   [`KexecError`] and leave the image untouched.
//! * CPUs that ignore the crash stop request are logged and left behind; a
//!   crash path has to make progress.
//! * More than one CPU online at [`machine_kexec`] is a broken invariant and
//!   panics.
//!
//! ## Usage
//!
//! ```rust,ignore
//! static BOARD: Board = Board::new();
//! static MACHINE: Machine<Board> = Machine::new(&BOARD, KexecConfig::new());
//!
//! // kexec_load():
//! MACHINE.prepare(&mut image)?;
//!
//! // panic():
//! MACHINE.crash_shutdown(&regs);
//! MACHINE.execute(crash_image);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod config;
mod cpu;
mod crash;
mod entry;
mod error;
mod handoff;
mod image;
mod machine;
pub mod platform;
mod prepare;
mod relocate;

pub use config::{
    DEFAULT_LEGACY_IMAGE_OFFSET, DEFAULT_LEGACY_TAG_OFFSET, DEFAULT_STOP_POLL_INTERVAL_MS,
    DEFAULT_STOP_TIMEOUT_MS, DTB_MAGIC, KexecConfig,
};
pub use cpu::{CpuId, CpuMask};
pub use crash::{CrashCoordinator, StopOutcome};
pub use entry::KimageEntry;
pub use error::{KexecError, UserFault};
pub use handoff::{HandoffParameterBlock, RelocationStub, install_relocation_stub};
pub use image::{
    CONTROL_PAGE_SIZE, ControlPage, ImageKind, KernelImage, RegistrationPointer,
    RegistrationSource, Segment,
};
pub use machine::{Machine, MachineKexec};
pub use platform::KexecPlatform;
pub use prepare::machine_kexec_prepare;
pub use relocate::machine_kexec;
