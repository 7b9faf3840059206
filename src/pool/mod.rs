//! アドレス範囲のアロケータ.
//!
//! [Pool]は、固定された全体範囲の中から、連続したアドレス範囲の割当と解放を担当する.
//!
//! アロケータが担当するのは、範囲の計算処理のみで、割当状況の永続化や、
//! 割り当てたアドレスの通知等を、この中で行うことは無い.
//!
//! [Pool]: ./struct.Pool.html
use slog::Logger;

pub use self::builder::PoolBuilder;

use crate::address::{Address, CarryMode};
use crate::metrics::PoolMetrics;
use crate::range::Range;
use crate::{ErrorKind, Result};

mod builder;

/// `Pool::find_first()`で、空き領域が要求サイズを満たすかどうかの判定方法.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitPolicy {
    /// 空き領域のサイズが、要求サイズを **超える** 場合にのみ選択する.
    ///
    /// 要求サイズとちょうど等しい空き領域は選択されない.
    /// 既存のプールとの互換性のために、こちらがデフォルトとなっている.
    Strict,

    /// 空き領域のサイズが、要求サイズ以上であれば選択する.
    Inclusive,
}
impl FitPolicy {
    fn fits(self, size: u128, free: u128) -> bool {
        match self {
            FitPolicy::Strict => size < free,
            FitPolicy::Inclusive => size <= free,
        }
    }
}
impl Default for FitPolicy {
    fn default() -> Self {
        FitPolicy::Strict
    }
}

/// アドレス範囲のアロケータ.
///
/// 全体範囲(`entire`)の中の空き領域を、互いに素な範囲のリスト(フリーリスト)として管理する.
///
/// この実装自体は、完全にメモリ上のデータ構造であり、状態は永続化されない.
/// 再起動を跨いで割当状況を維持したい場合には、利用者側で`allocated_ranges()`の結果を保存しておき、
/// `PoolBuilder::build_with_allocated()`を用いて復元する必要がある.
///
/// また、内部で排他制御は行わないので、複数スレッドから操作する場合には
/// 利用者側で直列化する必要がある.
///
/// # フリーリストの管理
///
/// フリーリストは、各操作の後に、始端の昇順でソートされ、空の範囲が取り除かれる.
///
/// 隣接する空き領域の結合は、デフォルトでは行われない.
/// そのため、割当・解放を繰り返すと、フリーリストは断片化していき、
/// 複数の空き領域に跨る範囲は(たとえ全てのアドレスが空いていても)割り当てられなくなる.
/// 結合が必要な場合には`PoolBuilder::coalesce()`を指定すること.
#[derive(Debug)]
pub struct Pool {
    entire: Range,
    remains: Vec<Range>,
    carry_mode: CarryMode,
    fit_policy: FitPolicy,
    coalesce: bool,
    logger: Logger,
    metrics: PoolMetrics,
}
impl Pool {
    /// デフォルト設定で、`[first, last]`を全体範囲とするプールを生成する.
    ///
    /// `PoolBuilder::new().build(first, last)`と等価.
    ///
    /// # Errors
    ///
    /// `first > last`の場合には`ErrorKind::InvalidUniverse`エラーが返される.
    pub fn new(first: Address, last: Address) -> Result<Self> {
        track!(PoolBuilder::new().build(first, last))
    }

    /// プールの全体範囲を返す.
    pub fn entire(&self) -> Range {
        self.entire
    }

    /// 現在の空き領域のリストを、始端の昇順で返す.
    pub fn remains(&self) -> &[Range] {
        &self.remains
    }

    /// アドレスの加減算に使用している`CarryMode`を返す.
    pub fn carry_mode(&self) -> CarryMode {
        self.carry_mode
    }

    /// プール用のメトリクスを返す.
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }

    /// 空いているアドレスの総数を返す.
    pub fn free_count(&self) -> u128 {
        self.remains
            .iter()
            .fold(0, |acc: u128, r| acc.saturating_add(r.count()))
    }

    /// 割当済みのアドレスの総数を返す.
    pub fn allocated_count(&self) -> u128 {
        self.allocated_ranges()
            .iter()
            .fold(0, |acc: u128, r| acc.saturating_add(r.count()))
    }

    /// 割当済みの範囲群(全体範囲の中で、フリーリストに含まれない部分)を、始端の昇順で返す.
    ///
    /// 隣接する割当済み範囲は一つにまとめられるので、
    /// 個々の`allocate()`呼び出しの単位とは一致しないことがある.
    pub fn allocated_ranges(&self) -> Vec<Range> {
        // 空き領域の間隙を求めるだけなので、`CarryMode`に関わらず128bit全体で計算する
        let mut allocated = Vec::new();
        let mut cursor = Some(self.entire.first.as_u128());
        for free in &self.remains {
            let start = match cursor {
                Some(start) => start,
                None => break,
            };
            if start < free.first.as_u128() {
                allocated.push(Range::new(
                    Address::from(start),
                    Address::from(free.first.as_u128() - 1),
                ));
            }
            cursor = free.last.as_u128().checked_add(1);
        }
        if let Some(start) = cursor {
            if start <= self.entire.last.as_u128() {
                allocated.push(Range::new(Address::from(start), self.entire.last));
            }
        }
        allocated
    }

    /// `base`から始まる、プレフィックス長が`prefix_len`のブロックを返す.
    ///
    /// 終端の計算には、このプールの`CarryMode`が使われる.
    /// 詳細は`Range::from_prefix()`を参照のこと.
    pub fn prefix_range(&self, base: Address, prefix_len: u8) -> Result<Range> {
        track!(Range::from_prefix(base, prefix_len, self.carry_mode))
    }

    /// `range`が割当済みかどうかを判定する.
    ///
    /// 以下のいずれかに該当する場合には`false`が返される:
    ///
    /// - `range`が空、あるいは全体範囲に含まれていない
    /// - `range`全体を含む空き領域が存在する
    ///
    /// # 注意
    ///
    /// 判定は範囲単位で行われるので、空き領域と割当済み領域に跨る範囲は、割当済みとみなされる.
    pub fn is_allocated(&self, range: &Range) -> bool {
        if range.is_empty() || !self.entire.contains(range) {
            return false;
        }
        !self.remains.iter().any(|r| r.contains(range))
    }

    /// 先頭から空き領域を探索し、最初に見つかった、`size`分のアドレスを割当可能な範囲を返す.
    ///
    /// 返された範囲は、まだ割り当てられていないので、
    /// 実際に使用する場合には`allocate()`を呼び出す必要がある.
    ///
    /// 十分な空き領域が存在しない場合には`None`が返される.
    /// なお、デフォルトの`FitPolicy::Strict`では、サイズがちょうど`size`の空き領域は選択されない.
    ///
    /// # Errors
    ///
    /// - `size`が`0`の場合には`ErrorKind::InvalidInput`
    /// - 終端の計算が`CarryMode`の範囲を超える場合には`ErrorKind::ArithmeticOverflow`
    pub fn find_first(&self, size: u128) -> Result<Option<Range>> {
        track_assert_ne!(size, 0, ErrorKind::InvalidInput);
        for free in &self.remains {
            if self.fit_policy.fits(size, free.count()) {
                let last = track_assert_some!(
                    free.first.checked_add(size - 1, self.carry_mode),
                    ErrorKind::ArithmeticOverflow,
                    "size={}, free={}",
                    size,
                    free
                );
                return Ok(Some(Range::new(free.first, last)));
            }
        }
        self.metrics.nospace_failures.increment();
        Ok(None)
    }

    /// `find_first(size)`で見つかった範囲を割り当てる.
    ///
    /// 十分な空き領域が存在しない場合には`None`が返される.
    pub fn allocate_first(&mut self, size: u128) -> Result<Option<Range>> {
        if let Some(range) = track!(self.find_first(size))? {
            track!(self.allocate(range))?;
            Ok(Some(range))
        } else {
            Ok(None)
        }
    }

    /// `range`を割り当てる.
    ///
    /// `range`は、単一の空き領域に完全に含まれている必要がある.
    ///
    /// # Errors
    ///
    /// - `range`が空の場合には`ErrorKind::InvalidInput`
    /// - `range`が全体範囲に含まれていない場合には`ErrorKind::OutOfPoolRange`
    /// - `range`全体を含む空き領域が存在しない場合には`ErrorKind::AlreadyAllocated`
    /// - 空き領域の分割に伴う加減算が`CarryMode`の範囲を超える場合には`ErrorKind::ArithmeticOverflow`
    ///
    /// エラー時には、プールの状態は変更されない.
    pub fn allocate(&mut self, range: Range) -> Result<()> {
        track!(self.allocate_impl(range, false))
    }

    /// 割当済みの`range`を解放する.
    ///
    /// 解放された範囲は、そのままフリーリストに追加される.
    ///
    /// # Errors
    ///
    /// - `range`が空の場合には`ErrorKind::InvalidInput`
    /// - `range`が全体範囲に含まれていない場合には`ErrorKind::OutOfPoolRange`
    /// - `range`の一部でも空いている場合には`ErrorKind::NotYetAllocated`
    ///
    /// エラー時には、プールの状態は変更されない.
    pub fn deallocate(&mut self, range: Range) -> Result<()> {
        track!(self.check_request(&range))?;
        if self.overlaps_free(&range) {
            self.reject(ErrorKind::NotYetAllocated, &range);
            track_panic!(
                ErrorKind::NotYetAllocated,
                "{} is not yet allocated",
                range
            );
        }

        self.remains.push(range);
        self.clean();
        self.metrics.count_releasion(range.count());
        debug!(self.logger, "Deallocated";
               "range" => range.to_string(), "free_ranges" => self.remains.len());
        Ok(())
    }

    fn allocate_impl(&mut self, range: Range, starting: bool) -> Result<()> {
        track!(self.check_request(&range))?;
        let i = if let Some(i) = self.remains.iter().position(|r| r.contains(&range)) {
            i
        } else {
            self.reject(ErrorKind::AlreadyAllocated, &range);
            track_panic!(
                ErrorKind::AlreadyAllocated,
                "{} is already allocated",
                range
            );
        };

        // `free`を、`range`の前後の(空かもしれない)残りに分割する
        let free = self.remains[i];
        let head = if range.first == free.first {
            None
        } else {
            let last = track_assert_some!(
                range.first.checked_prev(self.carry_mode),
                ErrorKind::ArithmeticOverflow,
                "range={}, free={}",
                range,
                free
            );
            Some(Range::new(free.first, last))
        };
        let tail = if range.last == free.last {
            None
        } else {
            let first = track_assert_some!(
                range.last.checked_next(self.carry_mode),
                ErrorKind::ArithmeticOverflow,
                "range={}, free={}",
                range,
                free
            );
            Some(Range::new(first, free.last))
        };

        self.remains.swap_remove(i);
        self.remains.extend(head.into_iter().chain(tail));
        self.clean();
        self.metrics.count_allocation(range.count(), starting);
        debug!(self.logger, "Allocated";
               "range" => range.to_string(), "free_ranges" => self.remains.len());
        Ok(())
    }

    // 割当・解放要求に共通する事前条件を検査する.
    fn check_request(&self, range: &Range) -> Result<()> {
        track_assert!(
            !range.is_empty(),
            ErrorKind::InvalidInput,
            "Empty range: {}",
            range
        );
        if !self.entire.contains(range) {
            self.reject(ErrorKind::OutOfPoolRange, range);
            track_panic!(
                ErrorKind::OutOfPoolRange,
                "{} is out of pool range (entire={})",
                range,
                self.entire
            );
        }
        Ok(())
    }

    // `range`と一部でも重なる空き領域が存在するかどうか.
    fn overlaps_free(&self, range: &Range) -> bool {
        self.remains
            .iter()
            .any(|r| r.first <= range.last && range.first <= r.last)
    }

    fn reject(&self, kind: ErrorKind, range: &Range) {
        self.metrics.count_rejection(kind);
        debug!(self.logger, "Rejected";
               "range" => range.to_string(), "reason" => format!("{:?}", kind));
    }

    // フリーリストを正規化する.
    //
    // - 始端の昇順にソートする
    // - 空の範囲を取り除く
    // - (`coalesce`が有効なら) 隣接する範囲を結合する
    fn clean(&mut self) {
        self.remains.sort_by_key(|r| r.first);
        self.remains.retain(|r| !r.is_empty());
        if self.coalesce {
            let mut merged: Vec<Range> = Vec::with_capacity(self.remains.len());
            for r in self.remains.drain(..) {
                if let Some(prev) = merged.last_mut() {
                    if prev.last.as_u128().checked_add(1) == Some(r.first.as_u128()) {
                        prev.last = r.last;
                        continue;
                    }
                }
                merged.push(r);
            }
            self.remains = merged;
        }
        self.metrics.free_list_len.set(self.remains.len() as f64);
    }
}
