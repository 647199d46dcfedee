//! A [`GlobalAlloc`]-compatible wrapper embedding both a fixed-size buffer
//! and the [`Pool`] that sub-allocates from it.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr;

use crate::pool::{Pool, PoolDescriptor};

struct Inner<const N: usize> {
    buffer: [u8; N],
    pool: Option<Pool>,
}

/// The memory allocator for embedded systems.
///
/// This is a statically sized, synchronised wrapper around [`Pool`]: the
/// buffer and the pool driving it both live inline inside the allocator, so
/// a single `static` is enough to back a `#[global_allocator]`.
///
/// ```no_run
/// #[global_allocator]
/// static ALLOCATOR: membuddy::Allocator<4096> = membuddy::Allocator::new();
/// ```
/// Also see the [crate-level](crate) documentation for the buddy-scheme
/// implementation this wraps.
pub struct Allocator<const N: usize> {
    inner: spin::Mutex<Inner<N>>,
}

impl<const N: usize> Allocator<N> {
    /// Create a new [`Allocator`].
    ///
    /// This is a `const fn`, so it can be used directly in a `static`
    /// initializer. The pool itself is not initialized until the first call
    /// to `alloc`, since a `const fn` cannot take the address of `self`
    /// ahead of time to hand to [`Pool::init`].
    #[must_use = "assign the allocator to a static variable and apply the `#[global_allocator]`-attribute to make it the global allocator"]
    pub const fn new() -> Self {
        let inner = spin::Mutex::new(Inner { buffer: [0u8; N], pool: None });
        Self { inner }
    }

    /// Align a given pointer to the specified alignment.
    ///
    /// # Safety
    /// This function requires `align` to be a power of two and requires the
    /// `ptr` to point to a memory region that is large enough, so that the
    /// aligned pointer is still in that memory region.
    unsafe fn align_to(ptr: *mut u8, align: usize) -> *mut u8 {
        let addr = ptr as usize;
        let mismatch = addr & (align - 1);
        let offset = if mismatch != 0 { align - mismatch } else { 0 };
        // SAFETY: "in-bounds" is part of the safety contract of this function,
        // so the caller is responsible for it.
        unsafe { ptr.add(offset) }
    }
}

impl<const N: usize> Default for Allocator<N> {
    fn default() -> Self {
        Self::new()
    }
}

// SAFETY: the safety contract of `GlobalAlloc` is lengthy, but in short:
// this implementation never panics and never returns a pointer that
// violates the requested `Layout` (the over-allocation-and-align path below
// ensures the aligned pointer stays inside the claimed partition).
unsafe impl<const N: usize> GlobalAlloc for Allocator<N> {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        let align = layout.align();
        let natural = crate::header::natural_alignment();
        // The pool always returns partitions aligned to at least the
        // natural word alignment, so smaller requests are always satisfied
        // as-is. Larger alignments need over-allocation and adjustment,
        // mirroring the same worst-case-estimate approach as above `natural`.
        let size = if align > natural { layout.size() + align } else { layout.size() };

        let mut inner = self.inner.lock();
        if inner.pool.is_none() {
            let descriptor =
                PoolDescriptor { base_addr: inner.buffer.as_mut_ptr(), size: N };
            inner.pool = Pool::init(descriptor).ok();
        }
        let Some(pool) = inner.pool.as_mut() else {
            return ptr::null_mut();
        };

        match pool.claim(size) {
            // SAFETY: `align` is a power of two per the contract of
            // `Layout`. The claimed region was over-allocated by `align`
            // bytes above, so the aligned pointer still lies inside it.
            Ok(memory) => unsafe { Self::align_to(memory.as_ptr(), align) },
            Err(_) => ptr::null_mut(),
        }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
        // Alignment is irrelevant here: `release` locates a partition from
        // any pointer it returned, aligned or not, by walking back to its
        // header. `GlobalAlloc` forbids panicking on a failure here, and
        // there is no process to abort on bare `core`, so errors (e.g. a
        // double free) are silently ignored, same as the teacher crate does.
        let Some(ptr) = core::ptr::NonNull::new(ptr) else { return };
        let mut inner = self.inner.lock();
        if let Some(pool) = inner.pool.as_mut() {
            let _ = pool.release(ptr);
        }
    }
}
