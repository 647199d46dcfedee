//! Buddy-scheme memory pool for embedded systems
//!
//! This crate provides a [`Pool`]: a memory pool that sub-allocates from a
//! single, externally provided byte buffer using the classic buddy-block
//! scheme. Unlike a linear-scan allocator, every partition's size is always a
//! power of two, and every partition's buddy (its same-size neighbour) can be
//! found from its address alone. This keeps `claim`/`release` proportional to
//! the number of partitions currently carved out of the buffer, and keeps
//! merging on release simple: a freed partition only ever needs to look at
//! the one neighbour that could possibly be its buddy.
//!
//! # Usage
//! `Pool` itself does not own any memory or implement [`GlobalAlloc`]: it
//! operates purely on a caller-supplied [`PoolDescriptor`]. If you want a
//! `#[global_allocator]`-compatible type with an embedded buffer, enable the
//! `global` feature and use [`Allocator`]:
//! ```
//! #[cfg(feature = "global")]
//! # {
//! #[global_allocator]
//! static ALLOCATOR: membuddy::Allocator<4096> = membuddy::Allocator::new();
//!
//! extern crate alloc;
//! # }
//! ```
//! Without that feature, drive a [`Pool`] directly over your own buffer:
//! ```
//! use membuddy::{Pool, PoolDescriptor};
//!
//! let mut buffer = [0u8; 1024];
//! let descriptor = PoolDescriptor { base_addr: buffer.as_mut_ptr(), size: buffer.len() };
//! let mut pool = Pool::init(descriptor).unwrap();
//!
//! let ptr = pool.claim(100).unwrap();
//! pool.release(ptr).unwrap();
//! ```
//!
//! # Implementation
//! Every partition is a contiguous run of bytes starting with an intrusive
//! list node (see [`list`]) immediately followed by a small header (see
//! [`header`]) recording the partition's total size and whether it is
//! currently claimed. The buffer starts out as a single partition spanning
//! its whole length:
//! ```text
//! [node|hdr 512                           ]
//!  FREE size = 512
//! ```
//! A claim for up to half the partition's usable bytes repeatedly halves it
//! (§4.2 of the design): each half becomes its own partition, threaded into
//! the list immediately after the one it was split from, until the partition
//! is the smallest power of two that still satisfies the request:
//! ```text
//! [node|hdr 128][node|hdr 128][node|hdr 256              ]
//!  USED size=128 FREE size=128 FREE size = 256
//! ```
//! Releasing a partition walks outward from it, repeatedly checking whether
//! its current buddy (the one other partition that, combined with it, would
//! reconstruct the next size class up) is itself free, and if so merging the
//! two back into one larger partition. This repeats until either the buddy is
//! occupied or still split, or the partition has grown back to the size of
//! the whole buffer.
//!
//! A partition's buddy is never tracked explicitly: it is always the list
//! neighbour positioned on the other side of the nearest `2 * size`-byte
//! boundary, so it can be found in constant time from the partition's address
//! alone (see [`pool`] for the derivation).
#![cfg_attr(not(test), no_std)]
#![warn(unsafe_op_in_unsafe_fn)]
#![warn(clippy::undocumented_unsafe_blocks)]

mod error;
mod header;
mod list;
mod pool;

#[cfg(feature = "global")]
mod global;

pub use error::Error;
pub use pool::{DebugInfo, Pool, PoolDescriptor};

#[cfg(feature = "global")]
pub use global::Allocator;

/// Bytes of overhead every partition carries regardless of its size: one
/// [`list::Node`](crate::list::Node) plus one header. A partition's usable
/// size is always `total_size - metadata_size()`.
pub const fn metadata_size() -> usize {
    header::metadata_size()
}

/// Version of the pool layout and API implemented by this crate, as
/// `(major, minor, patch)`. Carried over from the original project's
/// `MEMPOOL_API_VERSION_*` macros; bump the major component on any change to
/// the on-buffer layout that would make pools initialized by one version
/// unsafe to drive with another.
pub const API_VERSION: (u8, u8, u8) = (0, 1, 0);
