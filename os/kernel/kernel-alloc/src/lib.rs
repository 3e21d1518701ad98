//! # Kernel Physical Page Allocator
//!
//! Hands out and takes back 4 KiB pages of physical memory, addressed through
//! the kernel's direct map (`KERNBASE + pa`). Every user process page, page
//! table page, kernel stack and pipe buffer comes from here.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │               kinit1 / kinit2 / kalloc / kfree      │
//! │    • Global KMEM instance                           │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                     Kmem                            │
//! │    • Bounds validation on every free                │
//! │    • Poison fill before a page is linked            │
//! │    • Phase gate: unlocked boot, locked multicore    │
//! └─────────────────┬───────────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────────┐
//! │                 Free page list                      │
//! │    • Intrusive LIFO, link lives in the free page    │
//! │    • Links are encoded and checked when popped      │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! ## Two-Phase Initialization
//!
//! At boot only the first 4 MiB of physical memory are mapped, and only the
//! boot core runs. [`kinit1`] registers the pages between the end of the
//! kernel image and that ceiling without touching the lock. Once the kernel
//! page table maps everything up to `PHYSTOP`, [`kinit2`] registers the rest
//! and turns locking on for good, just before the other cores start.
//!
//! ```rust,ignore
//! use kernel_alloc::{PageBounds, kinit1, kinit2};
//! use kernel_info::memory::{bootstrap_top, direct_map_top};
//!
//! let bounds = PageBounds::from_linker();
//! unsafe { kinit1(bounds, bounds.kernel_end(), bootstrap_top()) };
//! // ... install the full kernel page table ...
//! unsafe { kinit2(bootstrap_top(), direct_map_top()) };
//! // ... start the application processors ...
//! ```
//!
//! ## Free Page Layout
//!
//! A free page is filled with [`FREE_POISON`] (`0x01`). Its first word holds
//! the link to the next free page, stored XOR [`POISON_WORD`], so the last
//! page on the list is poison from first to last byte. Allocated pages are
//! not cleared: the caller sees the poison and must initialize the page.
//!
//! ## Fatal Conditions
//!
//! Freeing a misaligned page, a page below the kernel image, a page at or
//! above the top of memory, the page that is already the head of the free
//! list, or any page before initialization panics with a message naming
//! `kfree` and the offending address. A corrupted link found by [`kalloc`]
//! panics as well. Running out of pages is not fatal: [`kalloc`] returns
//! `None`.
//!
//! ## Using a Private Instance
//!
//! [`Kmem`] is an ordinary value; the global functions only wrap [`KMEM`].
//!
//! ```rust
//! use kernel_alloc::{Kmem, PageBounds, Phase};
//! use kernel_memory_addresses::VirtualAddress;
//!
//! #[repr(C, align(4096))]
//! struct Frame([u8; 4096]);
//!
//! let frames: &mut [Frame] = Vec::from_iter((0..4).map(|_| Frame([0; 4096]))).leak();
//! let start = VirtualAddress::from_ptr(frames.as_mut_ptr().cast_const());
//! let end = start + 4 * 4096;
//!
//! let kmem = Kmem::new();
//! unsafe {
//!     kmem.init_bootstrap(PageBounds::new(start, end), start, end);
//!     kmem.init_multicore(end, end);
//! }
//! assert_eq!(kmem.phase(), Phase::Multicore);
//!
//! let page = kmem.alloc().unwrap();
//! assert_eq!(kmem.free_pages(), 3);
//! unsafe { kmem.free(page) };
//! assert_eq!(kmem.free_pages(), 4);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod bounds;
mod free_list;
mod kmem;
mod phase;
mod poison;

pub use bounds::{FreeError, PageBounds};
pub use free_list::CorruptLink;
pub use kmem::Kmem;
pub use phase::{Phase, PhaseGate};
pub use poison::{FREE_POISON, POISON_WORD, is_poisoned};

use kernel_memory_addresses::VirtualAddress;

/// The kernel's page allocator.
pub static KMEM: Kmem = Kmem::new();

/// Fix the allocator bounds and register `[start, end)` while the boot core
/// runs alone.
///
/// # Safety
/// See [`Kmem::init_bootstrap`].
#[inline]
pub unsafe fn kinit1(bounds: PageBounds, start: VirtualAddress, end: VirtualAddress) {
    unsafe { KMEM.init_bootstrap(bounds, start, end) };
}

/// Register `[start, end)` and enable locking before the other cores start.
///
/// # Safety
/// See [`Kmem::init_multicore`].
#[inline]
pub unsafe fn kinit2(start: VirtualAddress, end: VirtualAddress) {
    unsafe { KMEM.init_multicore(start, end) };
}

/// Allocate one 4 KiB page, or `None` if memory is exhausted.
#[inline]
#[must_use]
pub fn kalloc() -> Option<VirtualAddress> {
    KMEM.alloc()
}

/// Return a page obtained from [`kalloc`].
///
/// # Safety
/// See [`Kmem::free`].
#[inline]
pub unsafe fn kfree(page: VirtualAddress) {
    unsafe { KMEM.free(page) };
}
