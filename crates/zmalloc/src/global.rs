//! `GlobalAlloc` integration.
//!
//! ```rust,no_run
//! #[global_allocator]
//! static GLOBAL: zmalloc::ZmallocGlobal = zmalloc::ZmallocGlobal;
//!
//! fn main() {
//!     let v = vec![0u8; 1024];
//!     assert!(zmalloc::used_memory() >= v.len());
//! }
//! ```
//!
//! Every Rust heap allocation then flows through the process-wide tracker and shows
//! up in [`crate::used_memory`].

use std::alloc::{GlobalAlloc, Layout};
use std::ptr;

use crate::backend::RawAllocator;
use crate::tracker::Zmalloc;

impl<A: RawAllocator> Zmalloc<A> {
    const PAYLOAD_ALIGN: usize = Self::STRATEGY.payload_align(A::MIN_ALIGN);

    /// Small size classes may only be aligned to their size, so a request smaller
    /// than its alignment goes through `aligned_alloc` as well.
    #[inline]
    fn fits(layout: Layout) -> bool {
        layout.align() <= Self::PAYLOAD_ALIGN && layout.align() <= layout.size()
    }
}

unsafe impl<A: RawAllocator> GlobalAlloc for Zmalloc<A> {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        if Self::fits(layout) {
            self.try_alloc(layout.size())
                .map_or(ptr::null_mut(), |p| p.as_ptr())
        } else {
            self.try_alloc_aligned(layout.align(), layout.size(), false)
        }
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        if Self::fits(layout) {
            self.try_calloc(layout.size())
                .map_or(ptr::null_mut(), |p| p.as_ptr())
        } else {
            self.try_alloc_aligned(layout.align(), layout.size(), true)
        }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if Self::fits(layout) {
            unsafe { self.free(ptr) }
        } else {
            unsafe { self.free_aligned(ptr, layout.size()) }
        }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        let new_layout = unsafe { Layout::from_size_align_unchecked(new_size, layout.align()) };
        if Self::fits(layout) && Self::fits(new_layout) {
            return unsafe { self.try_realloc(ptr, new_size) }
                .map_or(ptr::null_mut(), |p| p.as_ptr());
        }

        // the block changes allocation path, so move it
        let new = unsafe { GlobalAlloc::alloc(self, new_layout) };
        if !new.is_null() {
            unsafe {
                ptr::copy_nonoverlapping(ptr, new, layout.size().min(new_size));
                GlobalAlloc::dealloc(self, ptr, layout);
            }
        }
        new
    }
}

/// Handle to the process-wide tracker, usable as `#[global_allocator]`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZmallocGlobal;

unsafe impl GlobalAlloc for ZmallocGlobal {
    #[inline]
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe { GlobalAlloc::alloc(crate::global(), layout) }
    }

    #[inline]
    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        unsafe { GlobalAlloc::alloc_zeroed(crate::global(), layout) }
    }

    #[inline]
    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { GlobalAlloc::dealloc(crate::global(), ptr, layout) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        unsafe { GlobalAlloc::realloc(crate::global(), ptr, layout, new_size) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounting::round_to_word;
    use crate::backend::{Libc, NoMallocSize};
    use crate::block::PREFIX_SIZE;

    #[test]
    fn test_small_alignment_uses_header() {
        let tracker = Zmalloc::new(NoMallocSize(Libc));
        let layout = Layout::from_size_align(24, 8).unwrap();
        unsafe {
            let ptr = GlobalAlloc::alloc(&tracker, layout);
            assert!(!ptr.is_null());
            assert_eq!(ptr as usize % 8, 0);
            assert_eq!(tracker.used_memory(), round_to_word(24 + PREFIX_SIZE));
            GlobalAlloc::dealloc(&tracker, ptr, layout);
        }
        assert_eq!(tracker.used_memory(), 0);
    }

    #[test]
    fn test_over_aligned_layouts() {
        let tracker = Zmalloc::new(NoMallocSize(Libc));
        let layout = Layout::from_size_align(100, 256).unwrap();
        unsafe {
            let ptr = GlobalAlloc::alloc_zeroed(&tracker, layout);
            assert!(!ptr.is_null());
            assert_eq!(ptr as usize % 256, 0);
            assert!(std::slice::from_raw_parts(ptr, 100).iter().all(|&b| b == 0));
            assert_eq!(tracker.used_memory(), round_to_word(100));

            ptr.write(7);
            let grown = GlobalAlloc::realloc(&tracker, ptr, layout, 1000);
            assert!(!grown.is_null());
            assert_eq!(grown as usize % 256, 0);
            assert_eq!(grown.read(), 7);
            assert_eq!(tracker.used_memory(), round_to_word(1000));

            GlobalAlloc::dealloc(&tracker, grown, Layout::from_size_align(1000, 256).unwrap());
        }
        assert_eq!(tracker.used_memory(), 0);
    }

    #[test]
    fn test_realloc_through_global_alloc() {
        let tracker = Zmalloc::new(Libc);
        let layout = Layout::from_size_align(10, 1).unwrap();
        unsafe {
            let ptr = GlobalAlloc::alloc(&tracker, layout);
            let grown = GlobalAlloc::realloc(&tracker, ptr, layout, 500);
            assert!(!grown.is_null());
            GlobalAlloc::dealloc(&tracker, grown, Layout::from_size_align(500, 1).unwrap());
        }
        assert_eq!(tracker.used_memory(), 0);
    }

    fn small_over_aligned<A: RawAllocator>(tracker: Zmalloc<A>) {
        let layout = Layout::from_size_align(8, 16).unwrap();
        let ptrs: Vec<*mut u8> = (0..64)
            .map(|_| unsafe { GlobalAlloc::alloc(&tracker, layout) })
            .collect();

        let misaligned = ptrs.iter().filter(|&&p| p as usize % 16 != 0).count();
        assert_eq!(misaligned, 0);
        assert_eq!(tracker.used_memory(), 64 * round_to_word(8));

        for ptr in ptrs {
            unsafe { GlobalAlloc::dealloc(&tracker, ptr, layout) };
        }
        assert_eq!(tracker.used_memory(), 0);
    }

    #[test]
    fn test_size_smaller_than_align_is_aligned() {
        small_over_aligned(Zmalloc::new(Libc));
        small_over_aligned(Zmalloc::new(NoMallocSize(Libc)));
    }

    #[cfg(feature = "jemalloc")]
    #[test]
    fn test_jemalloc_tiny_class_is_aligned() {
        small_over_aligned(Zmalloc::new(crate::backend::Jemalloc));
        small_over_aligned(Zmalloc::new(NoMallocSize(crate::backend::Jemalloc)));
    }

    #[test]
    fn test_realloc_shrinking_below_align_switches_path() {
        let tracker = Zmalloc::new(Libc);
        let layout = Layout::from_size_align(64, 16).unwrap();
        unsafe {
            let ptr = GlobalAlloc::alloc(&tracker, layout);
            assert!(!ptr.is_null());
            ptr.write_bytes(0x5A, 64);

            let shrunk = GlobalAlloc::realloc(&tracker, ptr, layout, 8);
            assert!(!shrunk.is_null());
            assert_eq!(shrunk as usize % 16, 0);
            assert_eq!(std::slice::from_raw_parts(shrunk, 8), &[0x5A; 8]);
            assert_eq!(tracker.used_memory(), round_to_word(8));

            let small = Layout::from_size_align(8, 16).unwrap();
            let grown = GlobalAlloc::realloc(&tracker, shrunk, small, 128);
            assert!(!grown.is_null());
            assert_eq!(std::slice::from_raw_parts(grown, 8), &[0x5A; 8]);
            GlobalAlloc::dealloc(&tracker, grown, Layout::from_size_align(128, 16).unwrap());
        }
        assert_eq!(tracker.used_memory(), 0);
    }

    #[test]
    fn test_unsatisfiable_layout_returns_null() {
        let tracker = Zmalloc::new(NoMallocSize(Libc));
        let layout = Layout::from_size_align(isize::MAX as usize - 64, 8).unwrap();
        let ptr = unsafe { GlobalAlloc::alloc(&tracker, layout) };
        assert!(ptr.is_null());
        assert_eq!(tracker.used_memory(), 0);
    }
}
