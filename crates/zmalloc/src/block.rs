//! Size-header layout used when the backend cannot report usable sizes.
//!
//! ```text
//! raw block:  [ header: requested size ][ payload ... ]
//!             ^ raw                     ^ payload (handed to the caller)
//! ```

use std::mem;
use std::ptr::NonNull;

cfg_if::cfg_if! {
    if #[cfg(any(target_arch = "sparc", target_arch = "sparc64", target_os = "solaris"))] {
        type Header = u64;
    } else {
        type Header = usize;
    }
}

/// Bytes reserved in front of every payload in header mode.
pub const PREFIX_SIZE: usize = mem::size_of::<Header>();

/// A raw block carrying a size header.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Block {
    raw: NonNull<u8>,
}

impl Block {
    /// Bytes to request from the backend for a `size`-byte payload.
    #[inline]
    pub(crate) const fn footprint(size: usize) -> Option<usize> {
        size.checked_add(PREFIX_SIZE)
    }

    /// Writes `size` into the header of a freshly allocated raw block.
    ///
    /// # Safety
    ///
    /// `raw` must point to at least `PREFIX_SIZE + size` writable bytes aligned
    /// for the header.
    #[inline]
    pub(crate) unsafe fn init(raw: NonNull<u8>, size: usize) -> Self {
        unsafe { raw.cast::<Header>().as_ptr().write(size as Header) };
        Self { raw }
    }

    /// Recovers the block from a payload pointer previously produced by [`Block::payload`].
    ///
    /// # Safety
    ///
    /// `payload` must come from `Block::payload` of a block that is still live.
    #[inline]
    pub(crate) unsafe fn from_payload(payload: NonNull<u8>) -> Self {
        let raw = unsafe { NonNull::new_unchecked(payload.as_ptr().sub(PREFIX_SIZE)) };
        Self { raw }
    }

    #[inline]
    pub(crate) fn raw(self) -> NonNull<u8> {
        self.raw
    }

    #[inline]
    pub(crate) fn payload(self) -> NonNull<u8> {
        // SAFETY: every block spans at least PREFIX_SIZE bytes.
        unsafe { NonNull::new_unchecked(self.raw.as_ptr().add(PREFIX_SIZE)) }
    }

    /// The size originally requested by the caller.
    ///
    /// # Safety
    ///
    /// The block must still be live.
    #[inline]
    pub(crate) unsafe fn requested_size(self) -> usize {
        unsafe { self.raw.cast::<Header>().as_ptr().read() as usize }
    }
}
