use std::io::Write;
use std::ptr::NonNull;

use crate::accounting::{Strategy, UsedMemory};
use crate::backend::RawAllocator;
use crate::stats::Stats;

/// Accounting wrapper around one backend and one live-byte counter.
///
/// The process-wide instance is reached through [`crate::global`], but private
/// instances are cheap and fully independent, which is what tests use.
#[derive(Debug, Default)]
pub struct Zmalloc<A> {
    allocator: A,
    used_memory: UsedMemory,
}

impl<A: RawAllocator> Zmalloc<A> {
    /// Accounting strategy, fixed by the backend type.
    pub const STRATEGY: Strategy = Strategy::of::<A>();

    pub const fn new(allocator: A) -> Self {
        Self {
            allocator,
            used_memory: UsedMemory::new(),
        }
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Word-rounded bytes currently outstanding.
    #[inline]
    pub fn used_memory(&self) -> usize {
        self.used_memory.get()
    }

    pub fn stats(&self) -> Stats {
        Stats {
            lib: A::BACKEND,
            malloc_size: A::HAVE_MALLOC_SIZE,
            prefix_size: Self::STRATEGY.prefix_size(),
            used_memory: self.used_memory(),
        }
    }

    /// Allocates `size` bytes. Aborts the process if the backend fails.
    #[inline]
    pub fn alloc(&self, size: usize) -> NonNull<u8> {
        self.try_alloc(size).unwrap_or_else(|| oom(size))
    }

    /// Allocates `size` zeroed bytes. Aborts the process if the backend fails.
    #[inline]
    pub fn calloc(&self, size: usize) -> NonNull<u8> {
        self.try_calloc(size).unwrap_or_else(|| oom(size))
    }

    /// Resizes a block; a null `ptr` allocates. Aborts the process if the backend fails.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live pointer returned by this tracker.
    #[inline]
    pub unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> NonNull<u8> {
        unsafe { self.try_realloc(ptr, size) }.unwrap_or_else(|| oom(size))
    }

    #[inline]
    pub fn try_alloc(&self, size: usize) -> Option<NonNull<u8>> {
        let raw_size = Self::STRATEGY.raw_size(size)?;
        let raw = NonNull::new(unsafe { self.allocator.malloc(raw_size) })?;
        Some(unsafe { self.finish_alloc(raw, size) })
    }

    #[inline]
    pub fn try_calloc(&self, size: usize) -> Option<NonNull<u8>> {
        let raw_size = Self::STRATEGY.raw_size(size)?;
        let raw = NonNull::new(unsafe { self.allocator.calloc(raw_size) })?;
        Some(unsafe { self.finish_alloc(raw, size) })
    }

    /// On failure the old block is left live and accounted.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live pointer returned by this tracker.
    pub unsafe fn try_realloc(&self, ptr: *mut u8, size: usize) -> Option<NonNull<u8>> {
        let Some(ptr) = NonNull::new(ptr) else {
            return self.try_alloc(size);
        };
        let raw_size = Self::STRATEGY.raw_size(size)?;

        let (raw, old_footprint) = unsafe { Self::STRATEGY.account_on_free(&self.allocator, ptr) };
        let new_raw = NonNull::new(unsafe { self.allocator.realloc(raw.as_ptr(), raw_size) })?;
        self.used_memory.sub(old_footprint);
        Some(unsafe { self.finish_alloc(new_raw, size) })
    }

    /// Releases a block. Null is a no-op.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a live pointer returned by this tracker, freed once.
    #[inline]
    pub unsafe fn free(&self, ptr: *mut u8) {
        let Some(ptr) = NonNull::new(ptr) else {
            return;
        };
        let (raw, footprint) = unsafe { Self::STRATEGY.account_on_free(&self.allocator, ptr) };
        self.used_memory.sub(footprint);
        unsafe { self.allocator.free(raw.as_ptr()) };
    }

    /// Bytes the caller may use behind `ptr`.
    ///
    /// # Safety
    ///
    /// `ptr` must be a live pointer returned by this tracker.
    pub unsafe fn usable_size(&self, ptr: NonNull<u8>) -> usize {
        unsafe { Self::STRATEGY.usable_size(&self.allocator, ptr) }
    }

    #[inline]
    unsafe fn finish_alloc(&self, raw: NonNull<u8>, size: usize) -> NonNull<u8> {
        let (ptr, footprint) =
            unsafe { Self::STRATEGY.account_on_alloc(&self.allocator, raw, size) };
        self.used_memory.add(footprint);
        ptr
    }

    /// Over-aligned blocks carry no header; they are accounted by layout size.
    pub(crate) fn try_alloc_aligned(&self, align: usize, size: usize, zeroed: bool) -> *mut u8 {
        let ptr = unsafe { self.allocator.aligned_alloc(align, size) };
        if ptr.is_null() {
            return ptr;
        }
        if zeroed {
            unsafe { ptr.write_bytes(0, size) };
        }
        self.used_memory.add(size);
        ptr
    }

    /// # Safety
    ///
    /// `ptr` must come from `try_alloc_aligned` with the same `size`.
    pub(crate) unsafe fn free_aligned(&self, ptr: *mut u8, size: usize) {
        self.used_memory.sub(size);
        unsafe { self.allocator.free(ptr) };
    }
}

/// Reports the failed request and aborts. Allocation never returns failure to callers.
#[cold]
#[inline(never)]
pub(crate) fn oom(size: usize) -> ! {
    let mut stderr = std::io::stderr().lock();
    let _ = writeln!(
        stderr,
        "zmalloc: Out of memory trying to allocate {size} bytes"
    );
    let _ = stderr.flush();
    std::process::abort()
}
