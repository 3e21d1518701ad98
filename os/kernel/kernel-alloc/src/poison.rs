//! # Poison Fill
//!
//! Every page is overwritten with [`FREE_POISON`] before it goes onto the
//! free list. A stale reference into a freed page then reads `0x01` bytes
//! instead of the previous owner's data.

use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::VirtualAddress;

/// Byte written across every freed page.
pub const FREE_POISON: u8 = 0x01;

/// [`FREE_POISON`] replicated across a machine word.
pub const POISON_WORD: u64 = u64::from_ne_bytes([FREE_POISON; 8]);

#[allow(clippy::cast_possible_truncation)]
pub(crate) const PAGE_BYTES: usize = PAGE_SIZE as usize;

/// Fill the whole page at `page` with [`FREE_POISON`].
///
/// # Safety
/// `page` must be page aligned, mapped, writable and exclusively owned by
/// the caller.
#[inline]
pub(crate) unsafe fn poison_page(page: VirtualAddress) {
    unsafe {
        core::ptr::write_bytes(page.as_mut_ptr::<u8>(), FREE_POISON, PAGE_BYTES);
    }
}

/// Whether every byte of `bytes` is the poison pattern.
#[must_use]
pub fn is_poisoned(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == FREE_POISON)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[repr(align(4096))]
    struct Page([u8; PAGE_BYTES]);

    #[test]
    fn fills_the_entire_page() {
        let mut page = Page([0xAA; PAGE_BYTES]);
        unsafe { poison_page(VirtualAddress::from_ptr(page.0.as_mut_ptr().cast_const())) };
        assert!(is_poisoned(&page.0));
    }

    #[test]
    fn word_matches_byte_pattern() {
        assert_eq!(POISON_WORD, 0x0101_0101_0101_0101);
        assert!(is_poisoned(&POISON_WORD.to_ne_bytes()));
        assert!(!is_poisoned(&[FREE_POISON, 0]));
    }
}
