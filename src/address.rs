//! Address and its arithmetic.
use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// IPv4-mapped形式のアドレスが持つ、上位96bitの値.
const IPV4_MAPPED_PREFIX: u128 = 0xFFFF;

/// アドレスの加減算における桁上がり(桁借り)の扱い.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CarryMode {
    /// 最上位バイトへの桁上がり(桁借り)を行わない.
    ///
    /// 演算は下位120bitの範囲内で行われ、それを超える場合にはオーバーフロー扱いとなる.
    /// すなわち、最上位バイトの値が演算によって変化することは無い.
    ///
    /// IPv4用のアドレス演算を、より広いアドレス幅にそのまま適用していた
    /// 既存のプールとの互換性のために、こちらがデフォルトとなっている.
    TruncateTopByte,

    /// 128bit全体で演算を行う.
    FullWidth,
}
impl CarryMode {
    fn mask(self) -> u128 {
        match self {
            CarryMode::TruncateTopByte => (1u128 << 120) - 1,
            CarryMode::FullWidth => u128::max_value(),
        }
    }
}
impl Default for CarryMode {
    fn default() -> Self {
        CarryMode::TruncateTopByte
    }
}

/// プール内のアドレス表現に使われている128bit幅の整数値.
///
/// IPv4アドレスはIPv4-mapped形式(`::ffff:a.b.c.d`)に正規化して保持される.
///
/// 順序は、ビッグエンディアンで並べたバイト列の辞書順と一致する.
#[derive(Debug, Clone, Copy, PartialOrd, Ord, PartialEq, Eq, Hash)]
pub struct Address(u128);
impl Address {
    /// 取り得るアドレスの最小値.
    pub const MIN: Address = Address(0);

    /// 取り得るアドレスの最大値.
    pub const MAX: Address = Address(u128::max_value());

    /// アドレスの値を返す.
    pub fn as_u128(self) -> u128 {
        self.0
    }

    /// アドレスをビッグエンディアンのバイト列に変換する.
    pub fn octets(self) -> [u8; 16] {
        let mut bytes = [0; 16];
        BigEndian::write_u128(&mut bytes, self.0);
        bytes
    }

    /// IPv4-mapped形式のアドレスかどうかを判定する.
    pub fn is_ipv4_mapped(self) -> bool {
        self.0 >> 32 == IPV4_MAPPED_PREFIX
    }

    /// IPv4-mapped形式のアドレスであれば、対応するIPv4アドレスを返す.
    pub fn to_ipv4(self) -> Option<Ipv4Addr> {
        if self.is_ipv4_mapped() {
            Some(Ipv4Addr::from(self.0 as u32))
        } else {
            None
        }
    }

    /// 次のアドレスを返す.
    ///
    /// 桁上がりが`mode`で許される範囲を超える場合には`None`が返される.
    pub fn checked_next(self, mode: CarryMode) -> Option<Self> {
        self.checked_add(1, mode)
    }

    /// 一つ前のアドレスを返す.
    ///
    /// 桁借りが`mode`で許される範囲を超える場合には`None`が返される.
    pub fn checked_prev(self, mode: CarryMode) -> Option<Self> {
        self.checked_sub(1, mode)
    }

    /// `n`だけ後ろのアドレスを返す.
    ///
    /// 桁上がりが`mode`で許される範囲を超える場合には`None`が返される.
    pub fn checked_add(self, n: u128, mode: CarryMode) -> Option<Self> {
        let mask = mode.mask();
        let low = self.0 & mask;
        if n > mask - low {
            None
        } else {
            Some(Address(self.0 + n))
        }
    }

    /// `n`だけ前のアドレスを返す.
    ///
    /// 桁借りが`mode`で許される範囲を超える場合には`None`が返される.
    pub fn checked_sub(self, n: u128, mode: CarryMode) -> Option<Self> {
        let low = self.0 & mode.mask();
        if n > low {
            None
        } else {
            Some(Address(self.0 - n))
        }
    }
}
impl From<u128> for Address {
    fn from(from: u128) -> Self {
        Address(from)
    }
}
impl From<[u8; 16]> for Address {
    fn from(from: [u8; 16]) -> Self {
        Address(BigEndian::read_u128(&from))
    }
}
impl From<Ipv4Addr> for Address {
    fn from(from: Ipv4Addr) -> Self {
        Address((IPV4_MAPPED_PREFIX << 32) | u128::from(u32::from(from)))
    }
}
impl From<Ipv6Addr> for Address {
    fn from(from: Ipv6Addr) -> Self {
        Address(u128::from(from))
    }
}
impl From<IpAddr> for Address {
    fn from(from: IpAddr) -> Self {
        match from {
            IpAddr::V4(a) => Address::from(a),
            IpAddr::V6(a) => Address::from(a),
        }
    }
}
impl From<Address> for Ipv6Addr {
    fn from(from: Address) -> Self {
        Ipv6Addr::from(from.0)
    }
}
impl From<Address> for IpAddr {
    fn from(from: Address) -> Self {
        if let Some(a) = from.to_ipv4() {
            IpAddr::V4(a)
        } else {
            IpAddr::V6(Ipv6Addr::from(from))
        }
    }
}
impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&IpAddr::from(*self), f)
    }
}
