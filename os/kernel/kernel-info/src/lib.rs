//! # Kernel Memory Layout
//!
//! Constants that shape the kernel's view of physical memory, such as the
//! link address of the kernel image and the end of usable RAM. The physical
//! page allocator takes its bounds from here.
//!
//! See [`memory`] for the layout itself and the direct-map conversions.
//!
//! ```rust
//! use kernel_info::memory::{PHYSTOP, direct_map_top, v2p};
//!
//! assert_eq!(v2p(direct_map_top()).as_u64(), PHYSTOP);
//! ```

#![cfg_attr(not(any(test, doctest)), no_std)]
#![deny(unsafe_code)]

pub mod memory;
