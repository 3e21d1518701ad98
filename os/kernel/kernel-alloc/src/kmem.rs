//! # Physical Page Allocator
//!
//! [`Kmem`] owns every free 4 KiB page between the end of the kernel image
//! and the top of usable memory. Pages enter it in two batches:
//!
//! 1. [`init_bootstrap`](Kmem::init_bootstrap) runs on the boot core while
//!    only the boot page table is active. It fixes the [`PageBounds`] and
//!    registers the pages below the boot mapping ceiling. The free list is
//!    accessed without the lock.
//! 2. [`init_multicore`](Kmem::init_multicore) registers the remaining pages
//!    once the full kernel page table is live and then switches the
//!    allocator into [`Phase::Multicore`]. From here on every access to the
//!    free list holds the `kmem` spin lock.
//!
//! Freed pages are poisoned before they are linked, and every free is
//! validated against the bounds. A free that fails validation is a kernel
//! bug and panics.

use crate::bounds::{FreeError, PageBounds};
use crate::free_list::FreePageList;
use crate::phase::{Phase, PhaseGate};
use crate::poison::poison_page;
use kernel_info::memory::PAGE_SIZE;
use kernel_memory_addresses::{Size4K, VirtualAddress};
use kernel_sync::{SpinLock, SyncOnceCell};
use log::info;

/// The page allocator: managed bounds, phase gate and the locked free list.
///
/// Built in a `const` context so the kernel can keep it in a `static`
/// ([`KMEM`](crate::KMEM)).
pub struct Kmem {
    /// Fixed by the bootstrap phase, read without the lock afterwards.
    bounds: SyncOnceCell<PageBounds>,
    phase: PhaseGate,
    free_list: SpinLock<FreePageList>,
}

impl Kmem {
    /// An allocator with no pages, in [`Phase::Bootstrap`].
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bounds: SyncOnceCell::new(),
            phase: PhaseGate::new(),
            free_list: SpinLock::new("kmem", FreePageList::new()),
        }
    }

    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase.current()
    }

    /// The managed bounds, once [`init_bootstrap`](Self::init_bootstrap) ran.
    #[inline]
    #[must_use]
    pub fn bounds(&self) -> Option<PageBounds> {
        self.bounds.get().copied()
    }

    /// Number of pages currently on the free list.
    #[must_use]
    pub fn free_pages(&self) -> usize {
        self.with_free_list(|list| list.len())
    }

    fn with_free_list<R>(&self, f: impl FnOnce(&mut FreePageList) -> R) -> R {
        match self.phase.current() {
            // SAFETY: init_bootstrap's contract; a single context until the
            // multicore transition.
            Phase::Bootstrap => unsafe { self.free_list.with_unlocked(f) },
            Phase::Multicore => self.free_list.with_lock(f),
        }
    }

    /// First initialization phase: fix `bounds` and register the pages of
    /// `[start, end)`. Returns the number of pages registered.
    ///
    /// # Safety
    /// - Until [`init_multicore`](Self::init_multicore) returns, every call
    ///   into this allocator happens from one execution context.
    /// - Every page in `[start, end)` is mapped, writable, unused and inside
    ///   `bounds`.
    ///
    /// # Panics
    /// If called a second time, or after [`init_multicore`](Self::init_multicore).
    pub unsafe fn init_bootstrap(
        &self,
        bounds: PageBounds,
        start: VirtualAddress,
        end: VirtualAddress,
    ) -> usize {
        assert!(
            self.phase.current() == Phase::Bootstrap,
            "kinit1: called after kinit2"
        );
        assert!(
            !self.free_list.is_locked(),
            "kinit1: kmem lock held during bootstrap"
        );
        if self.bounds.set(bounds).is_err() {
            panic!("kinit1: called twice");
        }

        let pages = unsafe { self.free_range(start, end) };
        info!("kmem: {bounds:?}, {pages} pages from [{start}, {end}) before multicore");
        pages
    }

    /// Second initialization phase: register the pages of `[start, end)`,
    /// then make locking mandatory. Returns the number of pages registered.
    ///
    /// # Safety
    /// - Called from the same context as [`init_bootstrap`](Self::init_bootstrap),
    ///   before any other context uses the allocator.
    /// - Every page in `[start, end)` is mapped, writable, unused, inside the
    ///   bounds, and disjoint from the pages registered so far.
    ///
    /// # Panics
    /// If [`init_bootstrap`](Self::init_bootstrap) has not run, or if called
    /// a second time.
    pub unsafe fn init_multicore(&self, start: VirtualAddress, end: VirtualAddress) -> usize {
        assert!(self.bounds.get().is_some(), "kinit2: called before kinit1");
        assert!(
            self.phase.current() == Phase::Bootstrap,
            "kinit2: called twice"
        );

        let pages = unsafe { self.free_range(start, end) };
        self.phase.enter_multicore();
        info!(
            "kmem: {pages} pages from [{start}, {end}), {} free, locking enabled",
            self.free_pages()
        );
        pages
    }

    /// Free every whole page inside `[start, end)`.
    ///
    /// `start` is rounded up to a page boundary; a trailing partial page is
    /// skipped. Returns the number of pages freed.
    ///
    /// # Safety
    /// As for [`free`](Self::free), for every page of the range.
    pub unsafe fn free_range(&self, start: VirtualAddress, end: VirtualAddress) -> usize {
        let mut page = start.align_up::<Size4K>();
        let mut pages = 0;
        while let Some(page_end) = page.checked_add(PAGE_SIZE)
            && page_end <= end
        {
            unsafe { self.free(page) };
            pages += 1;
            page = page_end;
        }
        pages
    }

    /// Hand out one page, or `None` when every page is in use.
    ///
    /// The page still carries the poison fill (apart from the first word,
    /// which held the free-list link). Nothing is zeroed.
    ///
    /// # Panics
    /// If the free list is found corrupted: a link leaves the managed bounds,
    /// or the chain disagrees with the page count (a page was freed twice).
    pub fn alloc(&self) -> Option<VirtualAddress> {
        let bounds = *self.bounds.get()?;
        match self.with_free_list(|list| list.pop(bounds)) {
            Ok(page) => page,
            Err(err) => panic!("kalloc: {err}"),
        }
    }

    /// Return `page` to the allocator.
    ///
    /// # Safety
    /// `page` was handed out by [`alloc`](Self::alloc) or lies inside a range
    /// given to initialization, is mapped and writable, and nobody uses it
    /// any longer.
    ///
    /// # Panics
    /// With the [`FreeError`] message if `page` is not a page this allocator
    /// may own, if it is already the head of the free list, or if the
    /// allocator has not been initialized. Deeper double frees are caught
    /// later by [`alloc`](Self::alloc) as a corrupted list.
    pub unsafe fn free(&self, page: VirtualAddress) {
        let Some(bounds) = self.bounds.get() else {
            panic!("kfree: {}", FreeError::Uninitialized(page));
        };
        if let Err(err) = bounds.check(page) {
            panic!("kfree: {err}");
        }

        // Checked before the poison fill, which would clobber the head's link.
        if self.with_free_list(|list| list.head()) == Some(page) {
            panic!("kfree: {}", FreeError::DoubleFree(page));
        }

        // Dangling references into the page now read poison.
        unsafe { poison_page(page) };

        let linked = self.with_free_list(|list| {
            if list.head() == Some(page) {
                return Err(FreeError::DoubleFree(page));
            }
            unsafe { list.push(page) };
            Ok(())
        });
        if let Err(err) = linked {
            panic!("kfree: {err}");
        }
    }
}

impl Default for Kmem {
    fn default() -> Self {
        Self::new()
    }
}
