use prometrics::metrics::MetricBuilder;
use slog::{Discard, Logger};

use super::{FitPolicy, Pool};
use crate::address::{Address, CarryMode};
use crate::metrics::PoolMetrics;
use crate::range::Range;
use crate::{ErrorKind, Result};

/// `Pool`のビルダ.
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    carry_mode: CarryMode,
    fit_policy: FitPolicy,
    coalesce: bool,
    logger: Logger,
    metrics: MetricBuilder,
}
impl PoolBuilder {
    /// デフォルト設定で`PoolBuilder`インスタンスを生成する.
    pub fn new() -> Self {
        PoolBuilder {
            carry_mode: CarryMode::default(),
            fit_policy: FitPolicy::default(),
            coalesce: false,
            logger: Logger::root(Discard, o!()),
            metrics: MetricBuilder::new(),
        }
    }

    /// 空き領域の分割やプレフィックスの計算時に用いる、アドレスの桁上がりの扱いを設定する.
    ///
    /// デフォルト値は`CarryMode::TruncateTopByte`.
    pub fn carry_mode(&mut self, mode: CarryMode) -> &mut Self {
        self.carry_mode = mode;
        self
    }

    /// `Pool::find_first()`で用いる、空き領域の選択基準を設定する.
    ///
    /// デフォルト値は`FitPolicy::Strict`.
    pub fn fit_policy(&mut self, policy: FitPolicy) -> &mut Self {
        self.fit_policy = policy;
        self
    }

    /// フリーリストの正規化時に、隣接する空き領域を結合するかどうかを設定する.
    ///
    /// 結合を有効にすると、解放済みの範囲を跨ぐ割当が可能になる一方で、
    /// フリーリストの形状が(結合を行わない)既存のプールとは異なるものとなる.
    ///
    /// デフォルト値は`false`.
    pub fn coalesce(&mut self, enabled: bool) -> &mut Self {
        self.coalesce = enabled;
        self
    }

    /// プール用の logger を登録する.
    pub fn logger(&mut self, logger: Logger) -> &mut Self {
        self.logger = logger;
        self
    }

    /// メトリクス用の共通設定を登録する.
    ///
    /// デフォルト値は`MetricBuilder::new()`.
    pub fn metrics(&mut self, metrics: MetricBuilder) -> &mut Self {
        self.metrics = metrics;
        self
    }

    /// `[first, last]`を全体範囲とする、全てのアドレスが空いているプールを生成する.
    ///
    /// # Errors
    ///
    /// `first > last`の場合には`ErrorKind::InvalidUniverse`エラーが返される.
    pub fn build(&self, first: Address, last: Address) -> Result<Pool> {
        track_assert!(
            first <= last,
            ErrorKind::InvalidUniverse,
            "first={}, last={}",
            first,
            last
        );

        let entire = Range::new(first, last);
        let metrics = PoolMetrics::new(&self.metrics);
        metrics.capacity_addresses.set(entire.count() as f64);
        metrics.free_list_len.set(1.0);

        let logger = self.logger.new(o!("pool" => entire.to_string()));
        info!(logger, "New pool is built"; "capacity" => entire.count().to_string());
        Ok(Pool {
            entire,
            remains: vec![entire],
            carry_mode: self.carry_mode,
            fit_policy: self.fit_policy,
            coalesce: self.coalesce,
            logger,
            metrics,
        })
    }

    /// 割当済みの範囲群`allocated`を反映した状態で、プールを生成する.
    ///
    /// 利用者側で永続化しておいた割当状況(e.g., `Pool::allocated_ranges()`の結果)から、
    /// プールを復元するために使用する.
    ///
    /// # Errors
    ///
    /// `build()`が返すエラーに加えて、`allocated`のいずれかの範囲の割当に失敗した場合には、
    /// その時の`Pool::allocate()`のエラーが返される (E.g., 範囲同士が重なっている場合).
    pub fn build_with_allocated<I>(&self, first: Address, last: Address, allocated: I) -> Result<Pool>
    where
        I: IntoIterator<Item = Range>,
    {
        let mut pool = track!(self.build(first, last))?;
        let mut restored = 0;
        for range in allocated {
            track!(pool.allocate_impl(range, true))?;
            restored += 1;
        }
        info!(
            pool.logger,
            "Pool is restored";
            "allocated_ranges" => restored,
            "free_ranges" => pool.remains.len()
        );
        Ok(pool)
    }
}
impl Default for PoolBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;
    use trackable::result::TestResult;

    use super::*;

    fn v4(a: u8, b: u8, c: u8, d: u8) -> Address {
        Address::from(Ipv4Addr::new(a, b, c, d))
    }

    #[test]
    fn build_with_allocated_works() -> TestResult {
        let allocated = vec![
            Range::new(v4(10, 0, 0, 16), v4(10, 0, 0, 31)),
            Range::new(v4(10, 0, 0, 0), v4(10, 0, 0, 3)),
        ];
        let pool = track!(PoolBuilder::new().build_with_allocated(
            v4(10, 0, 0, 0),
            v4(10, 0, 0, 255),
            allocated.clone()
        ))?;
        assert_eq!(
            pool.allocated_ranges(),
            vec![allocated[1], allocated[0]]
        );
        assert_eq!(pool.free_count(), 256 - 20);

        let m = pool.metrics();
        assert_eq!(m.allocated_ranges(), 2);
        assert_eq!(m.allocated_addresses(), 20);
        assert_eq!(m.allocated_ranges_at_starting.value() as u64, 2);
        assert_eq!(m.allocated_ranges_at_running.value() as u64, 0);
        Ok(())
    }

    #[test]
    fn build_with_allocated_fails() {
        let allocated = vec![
            Range::new(v4(10, 0, 0, 0), v4(10, 0, 0, 7)),
            Range::new(v4(10, 0, 0, 4), v4(10, 0, 0, 11)),
        ];
        let result =
            PoolBuilder::new().build_with_allocated(v4(10, 0, 0, 0), v4(10, 0, 0, 255), allocated);
        assert_eq!(
            result.err().map(|e| *e.kind()),
            Some(ErrorKind::AlreadyAllocated)
        );

        let allocated = vec![Range::single(v4(10, 0, 1, 0))];
        let result =
            PoolBuilder::new().build_with_allocated(v4(10, 0, 0, 0), v4(10, 0, 0, 255), allocated);
        assert_eq!(
            result.err().map(|e| *e.kind()),
            Some(ErrorKind::OutOfPoolRange)
        );
    }

    #[test]
    fn coalesce_works() -> TestResult {
        let mut pool = track!(PoolBuilder::new()
            .coalesce(true)
            .build(v4(10, 0, 0, 0), v4(10, 0, 0, 255)))?;
        let a = Range::new(v4(10, 0, 0, 16), v4(10, 0, 0, 31));
        track!(pool.allocate(a))?;
        assert_eq!(pool.remains().len(), 2);

        track!(pool.deallocate(a))?;
        assert_eq!(
            pool.remains(),
            &[Range::new(v4(10, 0, 0, 0), v4(10, 0, 0, 255))][..]
        );

        // 結合されているので、以前の割当位置を跨ぐ範囲も割り当てられる
        track!(pool.allocate(Range::new(v4(10, 0, 0, 8), v4(10, 0, 0, 40))))?;
        Ok(())
    }

    #[test]
    fn inclusive_fit_policy_works() -> TestResult {
        let mut pool = track!(PoolBuilder::new()
            .fit_policy(FitPolicy::Inclusive)
            .build(v4(10, 0, 0, 0), v4(10, 0, 0, 15)))?;
        assert_eq!(
            track!(pool.find_first(16))?,
            Some(Range::new(v4(10, 0, 0, 0), v4(10, 0, 0, 15)))
        );
        assert_eq!(track!(pool.find_first(17))?, None);
        assert!(track!(pool.allocate_first(16))?.is_some());
        assert!(pool.remains().is_empty());
        Ok(())
    }

    #[test]
    fn carry_mode_affects_carving() -> TestResult {
        // 最上位バイトの境界を跨ぐ全体範囲
        let first = Address::from((1u128 << 120) - 2);
        let last = Address::from((1u128 << 120) + 1);
        let boundary = Range::single(Address::from(1u128 << 120));

        let mut pool = track!(PoolBuilder::new()
            .carry_mode(CarryMode::TruncateTopByte)
            .build(first, last))?;
        assert_eq!(
            pool.allocate(boundary).err().map(|e| *e.kind()),
            Some(ErrorKind::ArithmeticOverflow)
        );
        assert_eq!(pool.remains(), &[Range::new(first, last)][..]);

        let mut pool = track!(PoolBuilder::new()
            .carry_mode(CarryMode::FullWidth)
            .build(first, last))?;
        track!(pool.allocate(boundary))?;
        assert_eq!(
            pool.remains(),
            &[
                Range::new(first, Address::from((1u128 << 120) - 1)),
                Range::new(Address::from((1u128 << 120) + 1), last),
            ][..]
        );
        Ok(())
    }

    #[test]
    fn full_width_pool_works() -> TestResult {
        let mut pool = track!(PoolBuilder::new()
            .carry_mode(CarryMode::FullWidth)
            .build(Address::MIN, Address::MAX))?;
        assert_eq!(pool.free_count(), u128::max_value());

        track!(pool.allocate(Range::single(Address::MAX)))?;
        track!(pool.allocate(Range::single(Address::MIN)))?;
        assert_eq!(
            pool.remains(),
            &[Range::new(Address::from(1u128), Address::from(u128::max_value() - 1))][..]
        );
        assert_eq!(pool.allocated_count(), 2);
        Ok(())
    }
}
