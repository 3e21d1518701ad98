use core::fmt;
use core::hash::Hash;

/// Sealed trait pattern to restrict `PageSize` impls to our markers.
mod sealed {
    pub trait Sealed {}
}

/// Marker trait for supported page sizes.
pub trait PageSize:
    sealed::Sealed + Clone + Copy + Eq + PartialEq + Ord + PartialOrd + Hash + fmt::Display + fmt::Debug
{
    /// Page size in bytes (power of two).
    const SIZE: u64;
    /// log2(SIZE), i.e., number of low bits used for the offset.
    const SHIFT: u32;

    fn as_str() -> &'static str;

    /// Round `value` up to the next multiple of [`SIZE`](Self::SIZE).
    ///
    /// Saturates to the highest aligned value instead of wrapping.
    #[inline]
    #[must_use]
    fn round_up(value: u64) -> u64 {
        match value.checked_add(Self::SIZE - 1) {
            Some(v) => v & !(Self::SIZE - 1),
            None => u64::MAX & !(Self::SIZE - 1),
        }
    }

    /// Round `value` down to a multiple of [`SIZE`](Self::SIZE).
    #[inline]
    #[must_use]
    fn round_down(value: u64) -> u64 {
        value & !(Self::SIZE - 1)
    }

    /// Whether `value` is a multiple of [`SIZE`](Self::SIZE).
    #[inline]
    #[must_use]
    fn is_aligned(value: u64) -> bool {
        value & (Self::SIZE - 1) == 0
    }
}

/// 4 KiB page (4096 bytes), the only allocation unit of the page allocator.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Size4K;
impl sealed::Sealed for Size4K {}
impl PageSize for Size4K {
    const SIZE: u64 = 4096;
    const SHIFT: u32 = 12;

    fn as_str() -> &'static str {
        "4K"
    }
}

impl fmt::Display for Size4K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(Self::as_str())
    }
}

impl fmt::Debug for Size4K {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self, f)
    }
}

const _: () = {
    assert!(Size4K::SIZE.is_power_of_two());
    assert!(1u64 << Size4K::SHIFT == Size4K::SIZE);
};
