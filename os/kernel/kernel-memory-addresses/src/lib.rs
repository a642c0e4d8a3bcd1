//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for the raw addresses that travel through the
//! kexec handoff path: segment destinations, the control page, the
//! identity-mapped entry of the relocation stub and the new kernel's entry
//! point.
//!
//! ## Overview
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`PhysicalAddress`] | Physical memory (RAM or MMIO) as seen with translation disabled. |
//! | [`VirtualAddress`] | An address in the running kernel's current address space. |
//! | [`PhysicalRange`] | A `[start, start + len)` span of physical memory. |
//!
//! Page arithmetic is expressed through the [`PageSize`] marker trait; the
//! handoff path only ever deals in [`Size4K`] pages.
//!
//! ## Typical Usage
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let pa = PhysicalAddress::new(0x8000_1234);
//! assert_eq!(pa.page_base::<Size4K>().as_u64(), 0x8000_1000);
//! assert_eq!(pa.page_offset::<Size4K>(), 0x234);
//!
//! let ram = PhysicalRange::new(PhysicalAddress::new(0x8000_0000), 0x1000_0000);
//! let seg = PhysicalRange::new(PhysicalAddress::new(0x8000_8000), 0x40_0000);
//! assert!(ram.contains_range(&seg));
//! ```
//!
//! ## Design Notes
//!
//! - The address types are `#[repr(transparent)]` over `u64` and implement
//!   `Copy`, `Eq`, `Ord` and `Hash`.
//! - Arithmetic that can wrap is offered in checked form; a wrapped segment
//!   end must never look like a small, valid range.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod page_size;
mod physical_address;
mod physical_range;
mod virtual_address;

pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use physical_range::PhysicalRange;
pub use virtual_address::VirtualAddress;
