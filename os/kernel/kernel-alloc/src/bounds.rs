//! # Managed Bounds
//!
//! The window of direct-mapped kernel addresses the page allocator may ever
//! hold: from the end of the loaded kernel image up to the top of usable
//! physical memory. Both limits are kept as *kernel virtual* addresses so a
//! candidate page is compared against them without any translation.

use core::fmt;
use kernel_info::memory::direct_map_top;
use kernel_memory_addresses::{Size4K, VirtualAddress};

/// Why a page was refused by [`Kmem::free`](crate::Kmem::free).
///
/// Every variant is fatal: the allocator panics with the error's message
/// rather than returning it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FreeError {
    #[error("{0} is not page aligned")]
    Misaligned(VirtualAddress),
    #[error("{addr} lies below the end of the kernel image at {kernel_end}")]
    BelowKernelEnd {
        addr: VirtualAddress,
        kernel_end: VirtualAddress,
    },
    #[error("{addr} lies at or above the top of memory at {top}")]
    AboveTop {
        addr: VirtualAddress,
        top: VirtualAddress,
    },
    #[error("{0} is already the head of the free list")]
    DoubleFree(VirtualAddress),
    #[error("{0} freed before the allocator was initialized")]
    Uninitialized(VirtualAddress),
}

/// `[kernel_end, top)` in direct-mapped kernel addresses.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct PageBounds {
    kernel_end: VirtualAddress,
    top: VirtualAddress,
}

impl PageBounds {
    /// # Panics
    /// If `kernel_end` lies above `top`.
    #[must_use]
    pub const fn new(kernel_end: VirtualAddress, top: VirtualAddress) -> Self {
        assert!(
            kernel_end.as_u64() <= top.as_u64(),
            "kernel image ends above the top of memory"
        );
        Self { kernel_end, top }
    }

    /// Bounds for a kernel whose image ends at `kernel_end`, capped by the
    /// direct-mapped image of `PHYSTOP`.
    #[must_use]
    pub const fn direct_mapped(kernel_end: VirtualAddress) -> Self {
        Self::new(kernel_end, direct_map_top())
    }

    /// Bounds derived from the linker-provided `end` symbol.
    #[cfg(target_os = "none")]
    #[must_use]
    pub fn from_linker() -> Self {
        unsafe extern "C" {
            /// First address after the kernel image, defined by the linker script.
            static end: u8;
        }

        Self::direct_mapped(VirtualAddress::from_ptr(&raw const end))
    }

    #[inline]
    #[must_use]
    pub const fn kernel_end(self) -> VirtualAddress {
        self.kernel_end
    }

    #[inline]
    #[must_use]
    pub const fn top(self) -> VirtualAddress {
        self.top
    }

    /// Classify `addr` as a page the allocator may own.
    ///
    /// # Errors
    /// The first violated precondition, checked in the order alignment,
    /// lower bound, upper bound.
    pub fn check(self, addr: VirtualAddress) -> Result<(), FreeError> {
        if !addr.is_aligned::<Size4K>() {
            return Err(FreeError::Misaligned(addr));
        }
        if addr < self.kernel_end {
            return Err(FreeError::BelowKernelEnd {
                addr,
                kernel_end: self.kernel_end,
            });
        }
        if addr >= self.top {
            return Err(FreeError::AboveTop { addr, top: self.top });
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn contains_page(self, addr: VirtualAddress) -> bool {
        self.check(addr).is_ok()
    }
}

impl fmt::Debug for PageBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageBounds[{}, {})", self.kernel_end, self.top)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const fn bounds() -> PageBounds {
        PageBounds::new(VirtualAddress::new(0x8011_5A10), VirtualAddress::new(0x8E00_0000))
    }

    #[test]
    fn accepts_aligned_pages_inside() {
        let b = bounds();
        assert_eq!(b.check(VirtualAddress::new(0x8011_6000)), Ok(()));
        assert_eq!(b.check(VirtualAddress::new(0x8DFF_F000)), Ok(()));
        assert!(b.contains_page(VirtualAddress::new(0x8040_0000)));
    }

    #[test]
    fn rejects_misaligned_first() {
        let b = bounds();
        // also below the kernel end; alignment is reported first
        let addr = VirtualAddress::new(0x8000_0010);
        assert_eq!(b.check(addr), Err(FreeError::Misaligned(addr)));
    }

    #[test]
    fn rejects_below_kernel_end() {
        let b = bounds();
        let addr = VirtualAddress::new(0x8011_5000);
        assert_eq!(
            b.check(addr),
            Err(FreeError::BelowKernelEnd {
                addr,
                kernel_end: b.kernel_end()
            })
        );
    }

    #[test]
    fn top_is_exclusive() {
        let b = bounds();
        let addr = VirtualAddress::new(0x8E00_0000);
        assert_eq!(b.check(addr), Err(FreeError::AboveTop { addr, top: b.top() }));
    }

    #[test]
    fn kernel_end_is_inclusive() {
        let b = PageBounds::new(VirtualAddress::new(0x8020_0000), VirtualAddress::new(0x8030_0000));
        assert!(b.contains_page(b.kernel_end()));
    }

    #[test]
    fn direct_mapped_top_is_phystop() {
        let b = PageBounds::direct_mapped(VirtualAddress::new(0x8011_5A10));
        assert_eq!(b, bounds());
    }

    #[test]
    #[should_panic(expected = "kernel image ends above the top of memory")]
    fn inverted_bounds_are_rejected() {
        let _ = PageBounds::new(VirtualAddress::new(0x9000_0000), VirtualAddress::new(0x8000_0000));
    }

    #[test]
    fn error_messages_name_the_address() {
        let err = FreeError::Misaligned(VirtualAddress::new(0x8011_6008));
        assert_eq!(err.to_string(), "0x0000000080116008 is not page aligned");
    }
}
