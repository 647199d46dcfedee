//! Integration coverage for the public `Pool` API, exercised the way a
//! downstream crate would use it: over a plain stack buffer, with no
//! knowledge of the crate's internal module layout.

use membuddy::{DebugInfo, Error, Pool, PoolDescriptor};

fn pool_over(buffer: &mut [u8]) -> Pool {
    let descriptor = PoolDescriptor { base_addr: buffer.as_mut_ptr(), size: buffer.len() };
    Pool::init(descriptor).unwrap()
}

#[test]
fn claim_and_release_round_trip() {
    let mut buffer = [0u8; 2048];
    let mut pool = pool_over(&mut buffer);

    let a = pool.claim(300).unwrap();
    let b = pool.claim(50).unwrap();
    assert_ne!(a, b);

    pool.release(a).unwrap();
    pool.release(b).unwrap();
    assert_eq!(pool.partitions_used(), 1);
    assert_eq!(pool.memory_used(), membuddy::metadata_size());
}

#[test]
fn fragmentation_prevents_a_claim_that_would_otherwise_fit() {
    // Two adjacent 64-byte partitions freed out of a run of equally sized
    // occupied neighbours do not coalesce into the 128 bytes a bigger claim
    // would need, unless they also happen to be buddies of each other.
    let mut buffer = [0u8; 1024];
    let mut pool = pool_over(&mut buffer);
    let m = membuddy::metadata_size();

    let mut held = std::vec::Vec::new();
    for _ in 0..8 {
        held.push(pool.claim(128 - m).unwrap());
    }
    // Release two partitions that are not each other's buddy (indices 0 and 2
    // out of 8 equal-size partitions pair up as (0,1), (2,3), ... so 0 and 2
    // are not buddies of one another).
    pool.release(held[0]).unwrap();
    pool.release(held[2]).unwrap();
    assert_eq!(pool.partitions_used(), 8);

    // A request needing a 256-byte partition still fails: the two freed
    // 128-byte partitions are not adjacent buddies, so they never merge.
    assert_eq!(pool.claim(256 - m).unwrap_err(), Error::OutOfMemory);
}

#[test]
fn debug_info_rows_cover_the_whole_partition_chain() {
    let mut buffer = [0u8; 512];
    let mut pool = pool_over(&mut buffer);
    let m = membuddy::metadata_size();

    pool.claim(64 - m).unwrap();
    pool.claim(64 - m).unwrap();

    let blank = DebugInfo {
        is_first: false,
        is_last: false,
        occupied: false,
        total_size: 0,
        usable_size: 0,
        partition_address: std::ptr::null(),
        usable_address: std::ptr::null(),
    };
    let mut rows = [blank; 8];
    let written = pool.debug_info(&mut rows);
    assert_eq!(written, pool.partitions_used());

    assert!(rows[0].is_first);
    assert!(rows[written - 1].is_last);
    let total: usize = rows[..written].iter().map(|r| r.total_size).sum();
    assert_eq!(total, pool.capacity());
    for row in &rows[..written] {
        assert_eq!(row.usable_size, row.total_size - m);
    }
}

#[test]
fn out_of_memory_when_request_exceeds_capacity() {
    let mut buffer = [0u8; 256];
    let mut pool = pool_over(&mut buffer);
    assert_eq!(pool.claim(1024).unwrap_err(), Error::OutOfMemory);
}

#[test]
fn releasing_a_foreign_pointer_is_rejected() {
    let mut buffer_a = [0u8; 256];
    let mut buffer_b = [0u8; 256];
    let mut pool_a = pool_over(&mut buffer_a);
    let _pool_b = pool_over(&mut buffer_b);

    let m = membuddy::metadata_size();
    let ptr = pool_a.claim(32 - m).unwrap();

    // Releasing into the wrong pool reads garbage header bytes from
    // buffer_b; it is not guaranteed to return any particular error variant
    // in general, but it must never panic and must never report success for
    // a pointer this pool never handed out.
    let foreign = unsafe { std::ptr::NonNull::new_unchecked(buffer_b.as_mut_ptr().add(m)) };
    let _ = pool_a.release(foreign);

    // The original claim is still independently valid.
    pool_a.release(ptr).unwrap();
}

#[test]
fn repeated_claim_release_cycles_never_leak_partitions() {
    let mut buffer = [0u8; 1024];
    let mut pool = pool_over(&mut buffer);

    for _ in 0..50 {
        let a = pool.claim(32).unwrap();
        let b = pool.claim(16).unwrap();
        pool.release(a).unwrap();
        pool.release(b).unwrap();
    }
    assert_eq!(pool.partitions_used(), 1);
    assert_eq!(pool.capacity(), 1024);
}
