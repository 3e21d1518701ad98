//! # Memory Layout
//!
//! ```text
//!            physical memory                        virtual memory
//!
//!     4 GiB ┌──────────────────┐                  ┌──────────────────┐ 4 GiB
//!           │                  │                  │     devices      │
//!           │                  │                  ├──────────────────┤ DEVSPACE
//!           │                  │                  │                  │
//!           │                  │                  ├──────────────────┤ KERNBASE + PHYSTOP
//!           │                  │                  │  direct-mapped   │
//!           │                  │                  │  free pages      │
//!           │                  │                  ├──────────────────┤ end (kernel image)
//!           │                  │                  │ kernel text/data │
//!           │                  │                  ├──────────────────┤ KERNLINK
//!           │                  │                  │   I/O space      │
//!  KERNBASE ├──────────────────┤                  ├──────────────────┤ KERNBASE
//!           │                  │                  │                  │
//!   PHYSTOP ├──────────────────┤                  │   user space     │
//!           │  free pages      │                  │                  │
//!           ├──────────────────┤                  │                  │
//!           │ kernel text/data │                  │                  │
//!    EXTMEM ├──────────────────┤                  │                  │
//!           │   I/O space      │                  │                  │
//!         0 └──────────────────┘                  └──────────────────┘ 0
//! ```
//!
//! Every physical address below [`PHYSTOP`] is visible to the kernel at
//! `KERNBASE + pa`. The page allocator only ever deals in these direct-mapped
//! kernel addresses; [`v2p`] and [`p2v`] are the only conversions.

use kernel_memory_addresses::{PageSize, PhysicalAddress, Size4K, VirtualAddress};

/// Size of the single allocation unit of the page allocator.
pub const PAGE_SIZE: u64 = Size4K::SIZE;

/// Start of extended memory (1 MiB); the kernel image is loaded here.
pub const EXTMEM: u64 = 0x0010_0000;

/// Top of usable physical memory (224 MiB). Nothing at or above it is ever
/// handed out by the page allocator.
pub const PHYSTOP: u64 = 0x0E00_0000;

/// Memory-mapped devices live above this physical address.
pub const DEVSPACE: u64 = 0xFE00_0000;

/// First kernel virtual address; physical address `0` is mapped here.
pub const KERNBASE: u64 = 0x8000_0000;

/// Address the kernel image is linked at.
pub const KERNLINK: u64 = KERNBASE + EXTMEM;

/// Physical ceiling of the boot page table.
///
/// Before the full kernel page table is installed only the first 4 MiB of
/// physical memory are mapped, so the bootstrap phase of the page allocator
/// may only register pages below this address.
pub const BOOTSTRAP_PHYS_END: u64 = 4 * 1024 * 1024;

const _: () = {
    assert!(PHYSTOP.is_multiple_of(PAGE_SIZE));
    assert!(BOOTSTRAP_PHYS_END.is_multiple_of(PAGE_SIZE));
    assert!(EXTMEM < BOOTSTRAP_PHYS_END);
    assert!(BOOTSTRAP_PHYS_END <= PHYSTOP);
    assert!(PHYSTOP <= KERNBASE);
    assert!(KERNBASE + PHYSTOP <= DEVSPACE);
};

/// Translate a direct-mapped kernel address to its physical address.
///
/// The caller must pass an address at or above [`KERNBASE`]; anything else
/// is not part of the direct map.
#[inline]
#[must_use]
pub const fn v2p(va: VirtualAddress) -> PhysicalAddress {
    debug_assert!(va.as_u64() >= KERNBASE);
    PhysicalAddress::new(va.as_u64() - KERNBASE)
}

/// Translate a physical address to its direct-mapped kernel address.
#[inline]
#[must_use]
pub const fn p2v(pa: PhysicalAddress) -> VirtualAddress {
    VirtualAddress::new(pa.as_u64() + KERNBASE)
}

/// Kernel address one past the highest page the allocator may manage.
#[inline]
#[must_use]
pub const fn direct_map_top() -> VirtualAddress {
    p2v(PhysicalAddress::new(PHYSTOP))
}

/// Kernel address one past the highest page the boot page table maps.
#[inline]
#[must_use]
pub const fn bootstrap_top() -> VirtualAddress {
    p2v(PhysicalAddress::new(BOOTSTRAP_PHYS_END))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_map_round_trip() {
        let pa = PhysicalAddress::new(0x0030_0000);
        let va = p2v(pa);
        assert_eq!(va.as_u64(), 0x8030_0000);
        assert_eq!(v2p(va), pa);
    }

    #[test]
    fn boundaries() {
        assert_eq!(KERNLINK, 0x8010_0000);
        assert_eq!(bootstrap_top(), VirtualAddress::new(0x8040_0000));
        assert_eq!(direct_map_top(), VirtualAddress::new(0x8E00_0000));
        assert!(bootstrap_top() < direct_map_top());
    }
}
