//! Underlying allocators the tracker delegates to.
//!
//! The backend is picked at compile time: `jemalloc` when the `jemalloc` feature is
//! enabled, the platform libc otherwise. Whether the backend can report the usable
//! size of a pointer is an associated constant, so the header/no-header decision is
//! made once per allocator type and never per call.

mod system;
#[cfg(feature = "jemalloc")]
mod jemalloc;

pub use self::system::Libc;
#[cfg(feature = "jemalloc")]
pub use self::jemalloc::Jemalloc;

cfg_if::cfg_if! {
    if #[cfg(feature = "jemalloc")] {
        /// Allocator used by the process-wide tracker.
        pub type DefaultAllocator = Jemalloc;
    } else {
        /// Allocator used by the process-wide tracker.
        pub type DefaultAllocator = Libc;
    }
}

/// Name of the active backend, for diagnostics.
pub const ZMALLOC_LIB: &str = <DefaultAllocator as RawAllocator>::BACKEND.name();

/// Identifies which allocator supplies the memory.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Backend {
    Libc,
    Jemalloc,
}

impl Backend {
    pub const fn name(self) -> &'static str {
        match self {
            Backend::Libc => "libc",
            Backend::Jemalloc => "jemalloc",
        }
    }
}

impl std::fmt::Display for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A C-style allocator: blocks are released without knowing their size.
///
/// # Safety
///
/// Implementors must return blocks aligned to at least [`RawAllocator::MIN_ALIGN`],
/// accept every pointer they returned in `realloc`/`free`, and, when
/// [`RawAllocator::HAVE_MALLOC_SIZE`] is true, report from `malloc_size` a value at
/// least as large as the size requested for that block and stable for its lifetime.
pub unsafe trait RawAllocator: Sync {
    const BACKEND: Backend;

    /// Whether `malloc_size` can be called.
    const HAVE_MALLOC_SIZE: bool;

    /// Alignment guaranteed for blocks of at least `MIN_ALIGN` bytes returned by
    /// `malloc`/`calloc`/`realloc`. Smaller blocks may only be aligned to their size.
    const MIN_ALIGN: usize = DEFAULT_MIN_ALIGN;

    unsafe fn malloc(&self, size: usize) -> *mut u8;

    /// Returns `size` zero-filled bytes.
    unsafe fn calloc(&self, size: usize) -> *mut u8;

    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8;

    /// Returns a block aligned to `align`, a power of two larger than `MIN_ALIGN`.
    /// The block is released with `free`.
    unsafe fn aligned_alloc(&self, align: usize, size: usize) -> *mut u8;

    unsafe fn free(&self, ptr: *mut u8);

    /// Usable size of a live block. Only called when `HAVE_MALLOC_SIZE` is true.
    unsafe fn malloc_size(&self, _ptr: *const u8) -> usize {
        0
    }
}

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        const DEFAULT_MIN_ALIGN: usize = 16;
    } else {
        const DEFAULT_MIN_ALIGN: usize = 8;
    }
}

/// Hides the size query of `A`, forcing the size-header scheme.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoMallocSize<A>(pub A);

unsafe impl<A: RawAllocator> RawAllocator for NoMallocSize<A> {
    const BACKEND: Backend = A::BACKEND;
    const HAVE_MALLOC_SIZE: bool = false;
    const MIN_ALIGN: usize = A::MIN_ALIGN;

    #[inline]
    unsafe fn malloc(&self, size: usize) -> *mut u8 {
        unsafe { self.0.malloc(size) }
    }

    #[inline]
    unsafe fn calloc(&self, size: usize) -> *mut u8 {
        unsafe { self.0.calloc(size) }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        unsafe { self.0.realloc(ptr, size) }
    }

    #[inline]
    unsafe fn aligned_alloc(&self, align: usize, size: usize) -> *mut u8 {
        unsafe { self.0.aligned_alloc(align, size) }
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut u8) {
        unsafe { self.0.free(ptr) }
    }
}
