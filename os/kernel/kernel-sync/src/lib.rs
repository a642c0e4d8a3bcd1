//! # Crash-path synchronization primitives
//!
//! Primitives that stay correct when interrupts are off, the scheduler is
//! gone and any other core may already be dead. Nothing here blocks or owns
//! anything: both types are a single atomic word accessed with
//! acquire/release read-modify-write operations.
//!
//! * [`OneShot`] is a latch that can be set once and never cleared.
//! * [`Countdown`] counts outstanding acknowledgements from other cores.

#![cfg_attr(not(any(test, doctest)), no_std)]

mod countdown;
mod one_shot;

pub use countdown::Countdown;
pub use one_shot::OneShot;
