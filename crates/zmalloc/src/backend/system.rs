use std::ptr;

use super::{Backend, RawAllocator};

/// The platform C allocator.
///
/// glibc reports usable sizes through `malloc_usable_size` and Apple platforms
/// through `malloc_size`; everywhere else the tracker falls back to size headers.
#[derive(Clone, Copy, Debug, Default)]
pub struct Libc;

unsafe impl RawAllocator for Libc {
    const BACKEND: Backend = Backend::Libc;
    const HAVE_MALLOC_SIZE: bool = HAS_USABLE_SIZE;

    #[inline]
    unsafe fn malloc(&self, size: usize) -> *mut u8 {
        unsafe { libc::malloc(size).cast() }
    }

    #[inline]
    unsafe fn calloc(&self, size: usize) -> *mut u8 {
        unsafe { libc::calloc(1, size).cast() }
    }

    #[inline]
    unsafe fn realloc(&self, ptr: *mut u8, size: usize) -> *mut u8 {
        unsafe { libc::realloc(ptr.cast(), size).cast() }
    }

    #[inline]
    unsafe fn aligned_alloc(&self, align: usize, size: usize) -> *mut u8 {
        let mut out: *mut libc::c_void = ptr::null_mut();
        let ret = unsafe { libc::posix_memalign(&mut out, align, size) };
        if ret != 0 {
            return ptr::null_mut();
        }
        out.cast()
    }

    #[inline]
    unsafe fn free(&self, ptr: *mut u8) {
        unsafe { libc::free(ptr.cast()) }
    }

    #[inline]
    unsafe fn malloc_size(&self, ptr: *const u8) -> usize {
        unsafe { usable_size(ptr) }
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(target_os = "linux", target_env = "gnu"))] {
        const HAS_USABLE_SIZE: bool = true;

        #[inline]
        unsafe fn usable_size(ptr: *const u8) -> usize {
            unsafe { libc::malloc_usable_size(ptr as *mut libc::c_void) }
        }
    } else if #[cfg(target_vendor = "apple")] {
        const HAS_USABLE_SIZE: bool = true;

        #[inline]
        unsafe fn usable_size(ptr: *const u8) -> usize {
            unsafe { libc::malloc_size(ptr.cast()) }
        }
    } else {
        const HAS_USABLE_SIZE: bool = false;

        unsafe fn usable_size(_ptr: *const u8) -> usize {
            0
        }
    }
}
