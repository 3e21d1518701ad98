use crate::bounds::PageBounds;
use crate::poison::POISON_WORD;
use core::ptr::NonNull;
use kernel_memory_addresses::VirtualAddress;

/// The view of a **free** page through its first machine word.
///
/// ```text
/// +-------------------+--------------------------------------+
/// | link (8 bytes)    |  poison fill (PAGE_SIZE - 8 bytes)   |
/// +-------------------+--------------------------------------+
/// ^ page
/// ```
///
/// `link` holds the address of the next free page XOR [`POISON_WORD`]. The
/// end of the list (`next = 0`) is therefore stored as the poison pattern
/// itself, and the last page of the chain reads as entirely poisoned.
#[repr(C)]
struct Run {
    link: u64,
}

#[inline]
const fn encode(next: u64) -> u64 {
    next ^ POISON_WORD
}

#[inline]
const fn decode(link: u64) -> u64 {
    link ^ POISON_WORD
}

/// The free list no longer describes the pages it owns. Something wrote
/// into a page after it was freed, or a page was freed twice.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorruptLink {
    /// The stored link decodes to an address outside the managed bounds.
    #[error("free page {page} links to invalid page 0x{next:016X}")]
    OutOfBounds { page: VirtualAddress, next: u64 },
    /// The chain and the page count disagree: the list ends early, or it
    /// runs on past its last counted page (a cycle).
    #[error("free page {page} links to 0x{next:016X} with {len} pages counted")]
    LengthMismatch {
        page: VirtualAddress,
        next: u64,
        len: usize,
    },
}

/// Intrusive LIFO list of free pages.
///
/// # Invariants
/// - Every node is a page-aligned page inside the managed bounds.
/// - Every node's first word is an encoded link to the next node, or the
///   encoded end-of-list marker.
/// - `len` is the number of nodes reachable from `head`.
pub(crate) struct FreePageList {
    head: Option<NonNull<Run>>,
    len: usize,
}

// Safety: The list is only reached through Kmem, which serializes access (single
// context during bootstrap, the spin lock afterwards).
unsafe impl Send for FreePageList {}

impl FreePageList {
    pub(crate) const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    #[inline]
    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub(crate) fn head(&self) -> Option<VirtualAddress> {
        self.head.map(VirtualAddress::from_nonnull)
    }

    /// Link `page` in as the new head.
    ///
    /// # Safety
    /// - `page` is page aligned, inside the bounds later passed to [`pop`](Self::pop),
    ///   writable, and exclusively owned by the list from now on.
    /// - `page` is not already on the list.
    pub(crate) unsafe fn push(&mut self, page: VirtualAddress) {
        let run = page.as_mut_ptr::<Run>();
        let next = self.head().map_or(0, VirtualAddress::as_u64);
        unsafe {
            run.write(Run { link: encode(next) });
        }
        self.head = NonNull::new(run);
        self.len += 1;
    }

    /// Unlink and return the head page, or `None` if the list is empty.
    ///
    /// The head's stored link is validated against `bounds` and against the
    /// page count before it becomes the new head; on failure the list is
    /// left untouched.
    pub(crate) fn pop(
        &mut self,
        bounds: PageBounds,
    ) -> Result<Option<VirtualAddress>, CorruptLink> {
        let Some(run) = self.head else {
            return Ok(None);
        };

        // SAFETY: nodes are owned, mapped pages (push contract).
        let next = decode(unsafe { run.as_ptr().read() }.link);
        let page = VirtualAddress::from_nonnull(run);
        if next != 0 && !bounds.contains_page(VirtualAddress::new(next)) {
            return Err(CorruptLink::OutOfBounds { page, next });
        }
        // The head is the last page exactly when it is the only one counted.
        let remaining = self
            .len
            .checked_sub(1)
            .filter(|&rest| (next == 0) == (rest == 0));
        let Some(remaining) = remaining else {
            return Err(CorruptLink::LengthMismatch {
                page,
                next,
                len: self.len,
            });
        };

        self.head = NonNull::new(VirtualAddress::new(next).as_mut_ptr::<Run>());
        self.len = remaining;
        Ok(Some(page))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::poison::{FREE_POISON, PAGE_BYTES, is_poisoned};

    #[repr(align(4096))]
    struct Frame([u8; PAGE_BYTES]);

    struct Mem {
        frames: Vec<Frame>,
        base: VirtualAddress,
    }

    impl Mem {
        fn new(n: usize) -> Self {
            let mut frames: Vec<Frame> = (0..n).map(|_| Frame([0; PAGE_BYTES])).collect();
            let base = VirtualAddress::from_ptr(frames.as_mut_ptr().cast_const());
            Self { frames, base }
        }

        fn page(&self, i: usize) -> VirtualAddress {
            self.base + (i * PAGE_BYTES) as u64
        }

        fn bounds(&self) -> PageBounds {
            PageBounds::new(self.base, self.page(self.frames.len()))
        }
    }

    #[test]
    fn empty_list_pops_none() {
        let mem = Mem::new(1);
        let mut list = FreePageList::new();
        assert_eq!(list.pop(mem.bounds()), Ok(None));
        assert_eq!(list.len(), 0);
        assert_eq!(list.head(), None);
    }

    #[test]
    fn pops_in_lifo_order() {
        let mem = Mem::new(3);
        let mut list = FreePageList::new();
        for i in 0..3 {
            unsafe { list.push(mem.page(i)) };
        }
        assert_eq!(list.len(), 3);
        assert_eq!(list.head(), Some(mem.page(2)));

        let b = mem.bounds();
        assert_eq!(list.pop(b), Ok(Some(mem.page(2))));
        assert_eq!(list.pop(b), Ok(Some(mem.page(1))));
        assert_eq!(list.pop(b), Ok(Some(mem.page(0))));
        assert_eq!(list.pop(b), Ok(None));
        assert_eq!(list.len(), 0);
    }

    #[test]
    fn tail_link_is_the_poison_word() {
        let mut mem = Mem::new(1);
        mem.frames[0].0.fill(FREE_POISON);
        let mut list = FreePageList::new();
        unsafe { list.push(mem.page(0)) };
        assert!(is_poisoned(&mem.frames[0].0));
    }

    #[test]
    fn corrupt_link_is_reported_and_list_kept() {
        let mem = Mem::new(2);
        let mut list = FreePageList::new();
        unsafe {
            list.push(mem.page(0));
            list.push(mem.page(1));
        }

        // Scribble over the head's link, as a use-after-free would.
        let head = mem.page(1);
        unsafe { head.as_mut_ptr::<u64>().write(0x1234) };

        let err = list.pop(mem.bounds()).unwrap_err();
        assert_eq!(
            err,
            CorruptLink::OutOfBounds {
                page: head,
                next: 0x1234 ^ POISON_WORD
            }
        );
        assert_eq!(list.len(), 2);
        assert_eq!(list.head(), Some(head));
    }

    #[test]
    fn cycle_is_caught_before_the_count_runs_out() {
        let mem = Mem::new(2);
        let mut list = FreePageList::new();
        unsafe {
            list.push(mem.page(0));
            list.push(mem.page(1));
            // Page 0 goes on a second time; page 1 still links back to it.
            list.push(mem.page(0));
        }
        assert_eq!(list.len(), 3);

        let b = mem.bounds();
        assert_eq!(list.pop(b), Ok(Some(mem.page(0))));
        assert_eq!(list.pop(b), Ok(Some(mem.page(1))));
        assert_eq!(
            list.pop(b),
            Err(CorruptLink::LengthMismatch {
                page: mem.page(0),
                next: mem.page(1).as_u64(),
                len: 1
            })
        );
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn truncated_chain_is_reported() {
        let mem = Mem::new(2);
        let mut list = FreePageList::new();
        unsafe {
            list.push(mem.page(0));
            list.push(mem.page(1));
        }

        // Re-poisoning the head turns its link into the end-of-list marker.
        let head = mem.page(1);
        unsafe { head.as_mut_ptr::<u64>().write(POISON_WORD) };

        assert_eq!(
            list.pop(mem.bounds()),
            Err(CorruptLink::LengthMismatch {
                page: head,
                next: 0,
                len: 2
            })
        );
    }
}
