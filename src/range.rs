//! Address Range.
use std::fmt;

use crate::address::{Address, CarryMode};
use crate::{ErrorKind, Result};

/// アドレスの閉区間 `[first, last]`.
///
/// プール全体の範囲、空き領域、割当・解放の対象となる範囲、のいずれもこの構造体で表現される.
/// 単一のアドレスは、長さ`1`の範囲となる.
///
/// `first > last`の場合には空の範囲として扱われる.
/// 空の範囲がプールのフリーリストに残ることは無い.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Range {
    /// 範囲の始端（この位置を含む）
    pub first: Address,

    /// 範囲の終端（この位置を含む）
    pub last: Address,
}
impl Range {
    /// 新しい`Range`インスタンスを生成する.
    ///
    /// `first <= last`かどうかの検査は行わない.
    pub fn new(first: Address, last: Address) -> Self {
        Range { first, last }
    }

    /// `address`のみを含む範囲を生成する.
    pub fn single(address: Address) -> Self {
        Range::new(address, address)
    }

    /// `base`から始まる、CIDR形式のプレフィックス長が`prefix_len`のブロックを返す.
    ///
    /// ブロックの長さは`2^(width - prefix_len)`となる.
    /// `width`は、`base`がIPv4-mapped形式なら`32`、それ以外なら`128`.
    ///
    /// `base`がブロック境界に揃っているかどうかは検査しない.
    ///
    /// # Errors
    ///
    /// - `prefix_len`が`width`を超える場合には`ErrorKind::InvalidInput`
    /// - 終端の計算が`mode`の範囲を超える場合や、
    ///   IPv4のブロックがIPv4-mapped形式の範囲からはみ出す場合には`ErrorKind::ArithmeticOverflow`
    ///
    /// # Examples
    ///
    /// ```
    /// use std::net::Ipv4Addr;
    /// use ippool::address::{Address, CarryMode};
    /// use ippool::range::Range;
    ///
    /// let base = Address::from(Ipv4Addr::new(192, 168, 1, 0));
    /// let r = Range::from_prefix(base, 24, CarryMode::default()).unwrap();
    /// assert_eq!(r.to_string(), "192.168.1.0-192.168.1.255");
    /// assert_eq!(r.count(), 256);
    /// ```
    pub fn from_prefix(base: Address, prefix_len: u8, mode: CarryMode) -> Result<Self> {
        let width = if base.is_ipv4_mapped() { 32 } else { 128 };
        track_assert!(
            u32::from(prefix_len) <= width,
            ErrorKind::InvalidInput,
            "Too long prefix: {} (base={}, width={})",
            prefix_len,
            base,
            width
        );

        let host_bits = width - u32::from(prefix_len);
        let offset = if host_bits == 128 {
            u128::max_value()
        } else {
            (1u128 << host_bits) - 1
        };
        let last = track_assert_some!(
            base.checked_add(offset, mode),
            ErrorKind::ArithmeticOverflow,
            "{}/{} exceeds the address space",
            base,
            prefix_len
        );
        if width == 32 {
            track_assert!(
                last.is_ipv4_mapped(),
                ErrorKind::ArithmeticOverflow,
                "{}/{} exceeds the IPv4 address space",
                base,
                prefix_len
            );
        }
        Ok(Range::new(base, last))
    }

    /// 範囲の始端を返す.
    pub fn first(&self) -> Address {
        self.first
    }

    /// 範囲の終端を返す.
    pub fn last(&self) -> Address {
        self.last
    }

    /// 空の範囲(`first > last`)かどうかを判定する.
    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    /// 範囲に含まれるアドレスの数を返す.
    ///
    /// 空の範囲の場合は`0`となる.
    ///
    /// 128bitのアドレス空間全体を覆う範囲の場合のみ、
    /// 本来の値(`2^128`)は表現できないので、`u128::MAX`に丸められる.
    pub fn count(&self) -> u128 {
        if self.is_empty() {
            0
        } else {
            (self.last.as_u128() - self.first.as_u128()).saturating_add(1)
        }
    }

    /// `other`が`self`に完全に含まれているかどうかを判定する.
    pub fn contains(&self, other: &Range) -> bool {
        self.first <= other.first && other.last <= self.last
    }

    /// `address`が`self`に含まれているかどうかを判定する.
    pub fn contains_address(&self, address: Address) -> bool {
        self.contains(&Range::single(address))
    }
}
impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}
