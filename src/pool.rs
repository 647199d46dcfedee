//! The allocator engine: `init`, `claim`, `release`, and introspection over a
//! single externally-provided buffer.

use core::ptr::NonNull;

use crate::error::Error;
use crate::header::{self, Header};
use crate::list::Node;

/// Describes the buffer a [`Pool`] sub-allocates from.
///
/// The caller creates and owns this; `membuddy` never frees `base_addr` and
/// never mutates the descriptor itself, only the bytes it points at.
#[derive(Clone, Copy)]
pub struct PoolDescriptor {
    /// Base address of the buffer. Must be non-null.
    pub base_addr: *mut u8,
    /// Size of the buffer in bytes. Must be a power of two, larger than
    /// [`metadata_size`](crate::metadata_size).
    pub size: usize,
}

/// One row of [`Pool::debug_info`]: a snapshot of a single partition.
#[derive(Debug, Clone, Copy)]
pub struct DebugInfo {
    /// `true` if this partition has no predecessor in the list.
    pub is_first: bool,
    /// `true` if this partition has no successor in the list.
    pub is_last: bool,
    /// `true` if the partition is currently claimed by a client.
    pub occupied: bool,
    /// Total partition size, including its list node and header.
    pub total_size: usize,
    /// Usable size, i.e. `total_size - metadata_size()`.
    pub usable_size: usize,
    /// Address of the partition's list node (its very first byte).
    pub partition_address: *const u8,
    /// Address a `claim()` against this partition would have returned.
    pub usable_address: *const u8,
}

/// A buddy-scheme memory pool sub-allocating from a single caller-supplied
/// buffer.
///
/// `Pool` is a non-owning handle: it never allocates or frees the
/// underlying buffer, only mutates bytes inside it. The caller is
/// responsible for keeping that buffer alive for the lifetime of the
/// `Pool` and for not touching its metadata bytes directly.
///
/// Per §5 of the design, a `Pool` is not internally synchronised; callers
/// that share one across threads must serialise access themselves (see
/// [`crate::Allocator`] for a synchronised wrapper).
pub struct Pool {
    base_addr: NonNull<u8>,
    size: usize,
}

// SAFETY: `Pool` only ever touches the caller-supplied buffer it was handed
// at `init`; it holds no thread-affine state of its own. Moving one across
// threads is sound as long as access stays serialised, which is the
// caller's obligation either way (see the type-level docs). This impl exists
// so synchronised wrappers like `spin::Mutex<Pool>` can be `Sync`.
unsafe impl Send for Pool {}

impl Pool {
    /// Initializes a pool over `descriptor`'s buffer.
    ///
    /// Creates a single partition spanning the whole buffer, unoccupied.
    /// Mirrors `mempool_init`.
    pub fn init(descriptor: PoolDescriptor) -> Result<Self, Error> {
        let base_addr = NonNull::new(descriptor.base_addr).ok_or(Error::NullPointer)?;
        if !descriptor.size.is_power_of_two() {
            return Err(Error::SizeError);
        }
        if descriptor.size <= header::metadata_size() {
            return Err(Error::OutOfMemory);
        }

        // SAFETY: `base_addr` is non-null and `descriptor.size` bytes are
        // valid for writes per the caller's contract on `PoolDescriptor`.
        unsafe {
            let node: NonNull<Node> = base_addr.cast();
            let hdr: NonNull<Header> = NonNull::new_unchecked(
                base_addr.as_ptr().add(core::mem::size_of::<Node>()).cast(),
            );
            Node::create(node, hdr.cast());
            Header::write(hdr, descriptor.size, false);
        }

        Ok(Pool { base_addr, size: descriptor.size })
    }

    fn head(&self) -> NonNull<Node> {
        self.base_addr.cast()
    }

    /// Claims a usable region of at least `len` bytes, rounding up to the
    /// nearest power-of-two partition size as described in §4.3. Returns the
    /// pointer past the claimed partition's header.
    pub fn claim(&mut self, len: usize) -> Result<NonNull<u8>, Error> {
        if len == 0 {
            return Err(Error::SizeError);
        }

        let required = len
            .checked_add(header::metadata_size())
            .and_then(usize::checked_next_power_of_two)
            .ok_or(Error::OutOfMemory)?;

        // SAFETY: `self.head()` is the true head of a list built entirely out
        // of `init`/`claim`/`release`, so it is always live.
        let partition = unsafe {
            Node::find(self.head(), |node| {
                let hdr = header_of(node);
                hdr.as_ref().total_size >= required && !hdr.as_ref().occupied
            })
        }
        .ok_or(Error::OutOfMemory)?;

        unsafe {
            while header_of(partition).as_ref().total_size > required {
                self.split(partition)?;
            }
            header_of(partition).as_mut().occupied = true;
            Ok(user_ptr(partition))
        }
    }

    /// Halves `partition` in place, threading a freshly-created buddy
    /// partition in immediately after it. `partition` keeps its own address;
    /// only its recorded size shrinks.
    ///
    /// # Safety
    /// `partition` must be free and large enough (`total_size >= 2 * M`) to
    /// leave both halves with at least one usable byte.
    unsafe fn split(&mut self, partition: NonNull<Node>) -> Result<(), Error> {
        unsafe {
            let old_size = header_of(partition).as_ref().total_size;
            let new_size = old_size / 2;

            let buddy_node: NonNull<Node> =
                NonNull::new_unchecked((partition.as_ptr() as *mut u8).add(new_size).cast());
            let buddy_hdr: NonNull<Header> = NonNull::new_unchecked(
                (buddy_node.as_ptr() as *mut u8)
                    .add(core::mem::size_of::<Node>())
                    .cast(),
            );

            Node::create(buddy_node, buddy_hdr.cast());
            Header::write(buddy_hdr, new_size, false);
            Node::insert_after(partition, buddy_node)?;

            header_of(partition).as_mut().total_size = new_size;
        }
        Ok(())
    }

    /// Returns a previously claimed region to the pool, merging with free
    /// buddies until none remain (§4.4).
    pub fn release(&mut self, ptr: NonNull<u8>) -> Result<(), Error> {
        // SAFETY: callers are required to pass back a pointer obtained from
        // `claim` on this same pool, never released since.
        unsafe {
            let node: NonNull<Node> =
                NonNull::new(ptr.as_ptr().sub(header::metadata_size()).cast())
                    .ok_or(Error::NullPointer)?;
            let hdr = header_of(node);

            #[cfg(feature = "sanity-check")]
            if !Header::is_sane(hdr) {
                return Err(Error::InvalidMemory);
            }

            if !hdr.as_ref().occupied {
                return Err(Error::InvalidMemory);
            }
            header_of(node).as_mut().occupied = false;

            let mut current = node;
            while let Some(merged) = self.merge_once(current) {
                current = merged;
            }
        }
        Ok(())
    }

    /// Attempts one merge step starting from `partition`. Returns the
    /// surviving (lower-addressed) partition if a merge happened, so the
    /// caller can loop until it returns `None`.
    ///
    /// # Safety
    /// `partition` must be free and a live member of this pool's list.
    unsafe fn merge_once(&mut self, partition: NonNull<Node>) -> Option<NonNull<Node>> {
        unsafe {
            let size = header_of(partition).as_ref().total_size;
            let base = self.base_addr.as_ptr() as usize;
            let offset = partition.as_ptr() as usize - base;
            // Invariant 3 (§3): a partition's buddy is its same-size neighbour
            // positioned so the pair starts on a 2*size boundary. Whether that
            // neighbour is to the left or right follows from which side of
            // that boundary `partition` itself sits on.
            let on_boundary = offset % (2 * size) == 0;

            let buddy = if on_boundary { Node::next(partition) } else { Node::prev(partition) }?;
            let buddy_hdr = header_of(buddy);
            if buddy_hdr.as_ref().total_size != size {
                return None;
            }
            // Re-derive the buddy's expected address via XOR on the
            // base-relative offset (§9) rather than trust same-size alone.
            debug_assert_eq!(
                buddy.as_ptr() as usize - base,
                offset ^ size,
                "same-size neighbour is not actually positioned as this partition's buddy"
            );
            if buddy_hdr.as_ref().occupied {
                return None;
            }

            let (left, right) = if on_boundary { (partition, buddy) } else { (buddy, partition) };
            Node::delete_after(left);
            header_of(left).as_mut().total_size = size * 2;
            let _ = right;
            Some(left)
        }
    }

    /// Number of partitions currently in the list (occupied or not).
    pub fn partitions_used(&self) -> usize {
        // SAFETY: the list always has at least the partition `init` created.
        unsafe { Node::count(self.head()) }
    }

    /// Bytes currently accounted as "used": the metadata bytes of every
    /// partition (occupied or not; every partition's header costs bytes
    /// regardless of occupancy) plus the full size of every occupied
    /// partition. This definition is preserved from the source rather than
    /// redefined to avoid double-counting occupied headers; see `SPEC_FULL.md`.
    pub fn memory_used(&self) -> usize {
        let mut used = 0usize;
        // SAFETY: the list always has at least the partition `init` created.
        unsafe {
            Node::traverse(self.head(), |node| {
                let hdr = header_of(node);
                used += header::metadata_size();
                if hdr.as_ref().occupied {
                    used += hdr.as_ref().total_size;
                }
            });
        }
        used
    }

    /// Writes one [`DebugInfo`] row per partition into `out`, in address
    /// order, and returns the number of rows written. `out` should be sized
    /// via a prior call to [`Pool::partitions_used`]; rows beyond `out.len()`
    /// are silently dropped.
    pub fn debug_info(&self, out: &mut [DebugInfo]) -> usize {
        let mut written = 0usize;
        // SAFETY: the list always has at least the partition `init` created.
        unsafe {
            Node::traverse(self.head(), |node| {
                if written >= out.len() {
                    return;
                }
                let hdr = header_of(node);
                let total_size = hdr.as_ref().total_size;
                out[written] = DebugInfo {
                    is_first: Node::prev(node).is_none(),
                    is_last: Node::next(node).is_none(),
                    occupied: hdr.as_ref().occupied,
                    total_size,
                    usable_size: total_size - header::metadata_size(),
                    partition_address: node.as_ptr().cast(),
                    usable_address: user_ptr(node).as_ptr().cast(),
                };
                written += 1;
            });
        }
        written
    }

    /// Size of the buffer this pool was initialized over.
    pub fn capacity(&self) -> usize {
        self.size
    }
}

/// # Safety
/// `node` must point at a live, initialized `Node`.
unsafe fn header_of(node: NonNull<Node>) -> NonNull<Header> {
    unsafe { Node::user_data(node).cast() }
}

/// # Safety
/// `node` must point at a live partition at least `metadata_size()` bytes long.
unsafe fn user_ptr(node: NonNull<Node>) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked((node.as_ptr() as *mut u8).add(header::metadata_size())) }
}
