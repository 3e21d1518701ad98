//! # Kernel synchronization primitives
//!
//! * [`SpinLock`]: named busy-waiting mutual exclusion with an explicit
//!   unlocked access path for single-context startup code.
//! * [`SyncOnceCell`]: write-once storage for values published during boot.

#![cfg_attr(not(any(test, doctest)), no_std)]
#![allow(unsafe_code)]

mod spin_lock;
mod sync_once_cell;

pub use spin_lock::{SpinLock, SpinLockGuard};
pub use sync_once_cell::SyncOnceCell;
