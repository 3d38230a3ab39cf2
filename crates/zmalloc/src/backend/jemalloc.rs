use std::ffi::c_void;
use std::ptr;

use tikv_jemalloc_sys as ffi;

use super::{Backend, RawAllocator};

/// jemalloc, linked through `tikv-jemalloc-sys`. Always reports usable sizes.
#[derive(Clone, Copy, Debug, Default)]
pub struct Jemalloc;

unsafe impl RawAllocator for Jemalloc {
    const BACKEND: Backend = Backend::Jemalloc;
    const HAVE_MALLOC_SIZE: bool = true;

    #[inline]
    unsafe fn malloc(&self, size: usize) -> *mut u8 {
        unsafe { ffi::malloc(size).cast() }
    }

    #[inline]
    unsafe fn calloc(&self, size: usize) -> *mut u8 {
        unsafe { ffi::calloc(1, size).cast() }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        unsafe { ffi::realloc(ptr.cast(), size).cast() }
    }

    #[inline]
    unsafe fn aligned_alloc(&self, align: usize, size: usize) -> *mut u8 {
        let mut out: *mut c_void = ptr::null_mut();
        let ret = unsafe { ffi::posix_memalign(&mut out, align, size) };
        if ret != 0 {
            return ptr::null_mut();
        }
        out.cast()
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut u8) {
        unsafe { ffi::free(ptr.cast()) }
    }

    #[inline]
    unsafe fn malloc_size(&self, ptr: *const u8) -> usize {
        unsafe { tikv_jemallocator::usable_size(ptr) }
    }
}
