//! # Virtual and Physical Memory Address Types
//!
//! Strongly typed wrappers for raw memory addresses used by the kernel's
//! physical page allocator and its consumers.
//!
//! ## Overview
//!
//! The types prevent mixing virtual and physical addresses at compile time
//! while remaining zero-cost wrappers around `u64` values:
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`MemoryAddress`] | A raw 64-bit address, either physical or virtual. |
//! | [`VirtualAddress`] | A kernel-visible address, e.g. inside the direct-mapped region. |
//! | [`PhysicalAddress`] | A physical RAM or MMIO address. |
//!
//! ## Page Sizes
//!
//! The allocator works in a single granularity, expressed by the [`Size4K`]
//! marker implementing [`PageSize`]. The trait carries the
//! [`SIZE`](PageSize::SIZE) and [`SHIFT`](PageSize::SHIFT) constants and the
//! rounding helpers (`PGROUNDUP` / `PGROUNDDOWN` in classic kernels).
//!
//! ```rust
//! # use kernel_memory_addresses::*;
//! let end_of_kernel = VirtualAddress::new(0x8011_5A10);
//! let first_page = end_of_kernel.align_up::<Size4K>();
//! assert_eq!(first_page.as_u64(), 0x8011_6000);
//! assert!(first_page.is_aligned::<Size4K>());
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]

mod memory_address;
mod page_size;
mod physical_address;
mod virtual_address;

pub use memory_address::MemoryAddress;
pub use page_size::{PageSize, Size4K};
pub use physical_address::PhysicalAddress;
pub use virtual_address::VirtualAddress;
