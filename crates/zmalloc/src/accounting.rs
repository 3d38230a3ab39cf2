use std::mem;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::backend::RawAllocator;
use crate::block::{Block, PREFIX_SIZE};

const WORD: usize = mem::size_of::<usize>();

/// Rounds `n` up to the next multiple of the word width.
///
/// The remainder check is done once on the unrounded value, so the amount added for
/// a block and the amount later subtracted for it are always identical.
#[inline]
pub const fn round_to_word(n: usize) -> usize {
    let rem = n & (WORD - 1);
    if rem == 0 {
        n
    } else {
        n + (WORD - rem)
    }
}

/// Live-byte counter, word-rounded.
#[derive(Debug, Default)]
pub struct UsedMemory(AtomicUsize);

impl UsedMemory {
    pub const fn new() -> Self {
        Self(AtomicUsize::new(0))
    }

    #[inline]
    pub fn get(&self) -> usize {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub(crate) fn add(&self, footprint: usize) {
        self.0.fetch_add(round_to_word(footprint), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn sub(&self, footprint: usize) {
        self.0.fetch_sub(round_to_word(footprint), Ordering::Relaxed);
    }
}

/// How the footprint of a block is known.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strategy {
    /// The backend reports the usable size of any live pointer.
    MallocSize,
    /// A size header is stored in front of every payload.
    SizePrefix,
}

impl Strategy {
    pub const fn of<A: RawAllocator>() -> Self {
        if A::HAVE_MALLOC_SIZE {
            Strategy::MallocSize
        } else {
            Strategy::SizePrefix
        }
    }

    pub const fn prefix_size(self) -> usize {
        match self {
            Strategy::MallocSize => 0,
            Strategy::SizePrefix => PREFIX_SIZE,
        }
    }

    /// Alignment guaranteed for payload pointers.
    pub const fn payload_align(self, min_align: usize) -> usize {
        match self {
            Strategy::MallocSize => min_align,
            Strategy::SizePrefix if PREFIX_SIZE < min_align => PREFIX_SIZE,
            Strategy::SizePrefix => min_align,
        }
    }

    /// Bytes to request from the backend for a `size`-byte payload.
    #[inline]
    pub(crate) const fn raw_size(self, size: usize) -> Option<usize> {
        match self {
            // malloc(0) may legally return null
            Strategy::MallocSize if size == 0 => Some(1),
            Strategy::MallocSize => Some(size),
            Strategy::SizePrefix => Block::footprint(size),
        }
    }

    /// Turns a fresh raw block into the caller's pointer and the block footprint.
    ///
    /// # Safety
    ///
    /// `raw` must be a live block from `allocator` of at least `raw_size(size)` bytes.
    #[inline]
    pub(crate) unsafe fn account_on_alloc<A: RawAllocator>(
        self,
        allocator: &A,
        raw: NonNull<u8>,
        size: usize,
    ) -> (NonNull<u8>, usize) {
        match self {
            Strategy::MallocSize => (raw, unsafe { allocator.malloc_size(raw.as_ptr()) }),
            Strategy::SizePrefix => {
                let block = unsafe { Block::init(raw, size) };
                (block.payload(), size + PREFIX_SIZE)
            }
        }
    }

    /// Turns a caller's pointer back into the raw block and its footprint.
    ///
    /// # Safety
    ///
    /// `ptr` must have been produced by `account_on_alloc` with the same strategy and
    /// allocator, and still be live.
    #[inline]
    pub(crate) unsafe fn account_on_free<A: RawAllocator>(
        self,
        allocator: &A,
        ptr: NonNull<u8>,
    ) -> (NonNull<u8>, usize) {
        match self {
            Strategy::MallocSize => (ptr, unsafe { allocator.malloc_size(ptr.as_ptr()) }),
            Strategy::SizePrefix => {
                let block = unsafe { Block::from_payload(ptr) };
                (block.raw(), unsafe { block.requested_size() } + PREFIX_SIZE)
            }
        }
    }

    /// Bytes usable by the caller behind `ptr`.
    ///
    /// # Safety
    ///
    /// Same contract as [`Strategy::account_on_free`].
    #[inline]
    pub(crate) unsafe fn usable_size<A: RawAllocator>(self, allocator: &A, ptr: NonNull<u8>) -> usize {
        match self {
            Strategy::MallocSize => unsafe { allocator.malloc_size(ptr.as_ptr()) },
            Strategy::SizePrefix => unsafe { Block::from_payload(ptr).requested_size() },
        }
    }
}
