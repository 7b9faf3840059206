extern crate ippool;
#[macro_use]
extern crate trackable;

use ippool::address::{Address, CarryMode};
use ippool::pool::{Pool, PoolBuilder};
use ippool::range::Range;
use ippool::ErrorKind;
use std::net::Ipv4Addr;
use trackable::result::TestResult;

fn v4(a: u8, b: u8, c: u8, d: u8) -> Address {
    Address::from(Ipv4Addr::new(a, b, c, d))
}

// 再現可能な疑似乱数列 (xorshift)
struct Rng(u64);
impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }
}

fn assert_invariants(pool: &Pool) {
    let entire = pool.entire();
    let remains = pool.remains();
    for r in remains {
        assert!(!r.is_empty(), "{}", r);
        assert!(entire.contains(r), "{}", r);
    }
    for w in remains.windows(2) {
        assert!(w[0].first < w[1].first, "{} {}", w[0], w[1]);
        assert!(w[0].last < w[1].first, "{} {}", w[0], w[1]);
    }
    assert_eq!(pool.free_count() + pool.allocated_count(), entire.count());
}

fn random_operations(mut pool: Pool, seed: u64) -> TestResult {
    let entire = pool.entire();
    let mut rng = Rng(seed);
    let mut allocated: Vec<Range> = Vec::new();
    for _ in 0..2000 {
        if allocated.is_empty() || rng.next() % 3 != 0 {
            let size = u128::from(rng.next() % 64 + 1);
            if let Some(r) = track!(pool.find_first(size))? {
                assert_eq!(r.count(), size);
                assert!(!pool.is_allocated(&r));
                track!(pool.allocate(r))?;
                assert!(pool.is_allocated(&r));
                allocated.push(r);
            }
        } else {
            let i = (rng.next() as usize) % allocated.len();
            let r = allocated.swap_remove(i);
            track!(pool.deallocate(r))?;
            assert!(!pool.is_allocated(&r));
        }
        assert_invariants(&pool);
    }

    let total: u128 = allocated.iter().map(|r| r.count()).sum();
    assert_eq!(pool.allocated_count(), total);
    for r in allocated {
        track!(pool.deallocate(r))?;
    }
    assert_eq!(pool.free_count(), entire.count());
    assert!(pool.allocated_ranges().is_empty());
    Ok(())
}

#[test]
fn invariants_hold_after_random_operations() -> TestResult {
    let pool = track!(Pool::new(v4(10, 224, 0, 0), v4(10, 224, 15, 255)))?;
    random_operations(pool, 0x1234_5678)?;

    let pool = track!(PoolBuilder::new()
        .coalesce(true)
        .carry_mode(CarryMode::FullWidth)
        .build(v4(10, 224, 0, 0), v4(10, 224, 15, 255)))?;
    random_operations(pool, 0x9abc_def0)?;
    Ok(())
}

#[test]
fn allocate_then_deallocate_restores_free_count() -> TestResult {
    let mut pool = track!(Pool::new(v4(10, 224, 0, 0), v4(10, 224, 255, 255)))?;
    track!(pool.allocate(Range::new(v4(10, 224, 0, 10), v4(10, 224, 0, 20))))?;

    let before = pool.free_count();
    let r = Range::new(v4(10, 224, 3, 0), v4(10, 224, 3, 127));
    track!(pool.allocate(r))?;
    assert_eq!(pool.free_count(), before - 128);
    track!(pool.deallocate(r))?;
    assert!(!pool.is_allocated(&r));
    assert_eq!(pool.free_count(), before);
    Ok(())
}

#[test]
fn repeated_requests_are_rejected() -> TestResult {
    let mut pool = track!(Pool::new(v4(10, 224, 0, 0), v4(10, 224, 255, 255)))?;
    let r = Range::new(v4(10, 224, 100, 1), v4(10, 224, 100, 4));

    track!(pool.allocate(r))?;
    assert_eq!(
        pool.allocate(r).err().map(|e| *e.kind()),
        Some(ErrorKind::AlreadyAllocated)
    );

    track!(pool.deallocate(r))?;
    assert_eq!(
        pool.deallocate(r).err().map(|e| *e.kind()),
        Some(ErrorKind::NotYetAllocated)
    );
    assert_eq!(pool.metrics().rejected_requests(), 2);
    Ok(())
}

#[test]
fn restore_from_allocated_ranges() -> TestResult {
    let mut pool = track!(Pool::new(v4(172, 16, 0, 0), v4(172, 16, 255, 255)))?;
    for _ in 0..10 {
        track!(pool.allocate_first(100))?;
    }
    track!(pool.deallocate(Range::new(v4(172, 16, 0, 200), v4(172, 16, 0, 250))))?;

    let restored = track!(PoolBuilder::new().build_with_allocated(
        pool.entire().first,
        pool.entire().last,
        pool.allocated_ranges()
    ))?;
    assert_eq!(restored.allocated_ranges(), pool.allocated_ranges());
    assert_eq!(restored.free_count(), pool.free_count());
    for r in pool.allocated_ranges() {
        assert!(restored.is_allocated(&r));
    }
    Ok(())
}
