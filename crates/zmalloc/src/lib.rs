//! Allocation accounting on top of libc or jemalloc.
//!
//! `zmalloc`, `zcalloc` and `zfree` behave like their C counterparts but keep a
//! process-wide count of live heap bytes. When the backend can report the usable size
//! of a pointer (glibc, macOS, jemalloc) that size is accounted directly; otherwise a
//! small size header is stored in front of every block.
//!
//! ```rust
//! let before = zmalloc::used_memory();
//! let ptr = zmalloc::zmalloc(10);
//! assert!(zmalloc::used_memory() > before);
//! unsafe { zmalloc::zfree(ptr.as_ptr()) };
//! assert_eq!(zmalloc::used_memory(), before);
//! ```
//!
//! Allocation failure is fatal: the requested size is printed to stderr and the
//! process aborts. Use the `try_*` methods on [`Zmalloc`] to observe failure instead.

#[cfg(not(unix))]
compile_error!("zmalloc is only implemented for unix targets");

pub mod accounting;
pub mod backend;
mod block;
mod global;
mod stats;
mod tracker;

use std::ptr::NonNull;

pub use accounting::{round_to_word, Strategy, UsedMemory};
pub use backend::{Backend, DefaultAllocator, NoMallocSize, RawAllocator, ZMALLOC_LIB};
pub use block::PREFIX_SIZE;
pub use global::ZmallocGlobal;
pub use stats::{format_bytes, Stats};
pub use tracker::Zmalloc;

static ZMALLOC: Zmalloc<DefaultAllocator> = Zmalloc::new(DefaultAllocator {});

/// The process-wide tracker behind the free functions and [`ZmallocGlobal`].
#[inline]
pub fn global() -> &'static Zmalloc<DefaultAllocator> {
    &ZMALLOC
}

/// Allocates `size` bytes; `size` may be zero. Aborts on failure.
#[inline]
pub fn zmalloc(size: usize) -> NonNull<u8> {
    ZMALLOC.alloc(size)
}

/// Allocates `size` zero-filled bytes. Aborts on failure.
#[inline]
pub fn zcalloc(size: usize) -> NonNull<u8> {
    ZMALLOC.calloc(size)
}

/// Resizes a block from [`zmalloc`]/[`zcalloc`]; a null `ptr` allocates. Aborts on failure.
///
/// # Safety
///
/// `ptr` must be null or a live pointer returned by this crate's free functions.
#[inline]
pub unsafe fn zrealloc(ptr: *mut u8, size: usize) -> NonNull<u8> {
    unsafe { ZMALLOC.realloc(ptr, size) }
}

/// Releases a block. Passing null does nothing.
///
/// # Safety
///
/// `ptr` must be null or a live pointer returned by this crate's free functions, and
/// must not be used afterwards.
#[inline]
pub unsafe fn zfree(ptr: *mut u8) {
    unsafe { ZMALLOC.free(ptr) }
}

/// Word-rounded bytes currently held by callers of the process-wide tracker.
#[inline]
pub fn used_memory() -> usize {
    ZMALLOC.used_memory()
}

pub fn stats() -> Stats {
    ZMALLOC.stats()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_free_is_noop() {
        unsafe { zfree(std::ptr::null_mut()) };
    }

    #[test]
    fn test_zero_size_round_trip() {
        let ptr = zmalloc(0);
        unsafe { zfree(ptr.as_ptr()) };
    }

    #[test]
    fn test_zcalloc_zeroed() {
        let ptr = zcalloc(128);
        let bytes = unsafe { std::slice::from_raw_parts(ptr.as_ptr(), 128) };
        assert!(bytes.iter().all(|&b| b == 0));
        unsafe { zfree(ptr.as_ptr()) };
    }

    #[test]
    fn test_global_stats_identify_backend() {
        let stats = stats();
        assert_eq!(stats.lib.name(), ZMALLOC_LIB);
        assert_eq!(stats.malloc_size, DefaultAllocator::HAVE_MALLOC_SIZE);
        assert_eq!(stats.prefix_size, Zmalloc::<DefaultAllocator>::STRATEGY.prefix_size());
    }
}
