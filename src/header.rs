//! The partition header: a small fixed record carrying a partition's total
//! size and occupancy, written immediately after its [`list::Node`](crate::list::Node).

use core::mem::{align_of, size_of};
use core::ptr::NonNull;

use crate::list::Node;

#[cfg(feature = "sanity-check")]
const MAGIC: u16 = 0xFEED;

#[repr(C)]
pub(crate) struct Header {
    pub(crate) total_size: usize,
    pub(crate) occupied: bool,
    #[cfg(feature = "sanity-check")]
    magic: u16,
}

impl Header {
    /// Writes a fresh header at `at`.
    ///
    /// # Safety
    /// `at` must be valid for writes of a `Header` and suitably aligned.
    pub(crate) unsafe fn write(at: NonNull<Header>, total_size: usize, occupied: bool) {
        unsafe {
            at.as_ptr().write(Header {
                total_size,
                occupied,
                #[cfg(feature = "sanity-check")]
                magic: MAGIC,
            });
        }
    }

    /// Validates the sanity-check magic number. Only meaningful with the
    /// `sanity-check` feature; always `true` otherwise.
    ///
    /// # Safety
    /// `header` must point at a live, initialized `Header`.
    #[cfg(feature = "sanity-check")]
    pub(crate) unsafe fn is_sane(header: NonNull<Header>) -> bool {
        unsafe { header.as_ref().magic == MAGIC }
    }

    /// Stomps the magic field so a later `is_sane` check fails. Test-only:
    /// lets callers outside this module (the `pool` tests) exercise the
    /// sanity-check rejection path without reaching into a private field.
    #[cfg(all(test, feature = "sanity-check"))]
    pub(crate) unsafe fn corrupt_magic_for_test(mut header: NonNull<Header>) {
        unsafe {
            header.as_mut().magic = !MAGIC;
        }
    }
}

/// Bytes consumed by a list node plus a partition header: `M` throughout the
/// rest of the crate. Every partition's usable region is `total_size - M`.
pub(crate) const fn metadata_size() -> usize {
    size_of::<Node>() + size_of::<Header>()
}

/// The natural word alignment of the target, i.e. `align_of::<usize>()`
/// (2, 4, or 8 bytes). Partitions are always aligned to at least this much,
/// so over-allocation for alignment requests above it is only ever needed
/// above this boundary (see [`crate::global::Allocator`]).
pub(crate) const fn natural_alignment() -> usize {
    align_of::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_size_is_stable_regardless_of_occupancy() {
        // The whole point of fixed-size padding: M doesn't depend on whether
        // a given header happens to describe a free or occupied partition.
        assert_eq!(metadata_size(), size_of::<Node>() + size_of::<Header>());
        assert!(metadata_size() >= 2 * size_of::<usize>());
    }

    #[test]
    fn write_and_read_round_trips() {
        let mut storage: Header = unsafe { core::mem::zeroed() };
        let ptr = NonNull::from(&mut storage);
        unsafe {
            Header::write(ptr, 256, true);
            assert_eq!(ptr.as_ref().total_size, 256);
            assert!(ptr.as_ref().occupied);
            #[cfg(feature = "sanity-check")]
            assert!(Header::is_sane(ptr));
        }
    }

    #[cfg(feature = "sanity-check")]
    #[test]
    fn corrupted_magic_is_not_sane() {
        let mut storage: Header = unsafe { core::mem::zeroed() };
        let ptr = NonNull::from(&mut storage);
        unsafe {
            Header::write(ptr, 256, true);
            assert!(Header::is_sane(ptr));
            Header::corrupt_magic_for_test(ptr);
            assert!(!Header::is_sane(ptr));
        }
    }
}
