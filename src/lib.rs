//! IP Address Pool.
//!
//! `ippool`は、固定幅(128bit)のアドレス空間上の有界な区間から、
//! 連続したアドレス範囲の割当と解放を管理するためのライブラリ.
//!
//! # 特徴
//!
//! - IPv4アドレスはIPv4-mapped形式(`::ffff:a.b.c.d`)に正規化して、IPv6アドレスと一様に扱う
//! - 空き領域は、互いに素な閉区間のリスト(フリーリスト)として管理される
//! - 割当・解放の単位は常に[Range]であり、単一アドレスは長さ`1`の[Range]として表現される
//! - 完全にメモリ上のデータ構造であり、状態の永続化は利用者側の責務となる
//!   - 永続化された割当済み範囲群から[Pool]を復元するための[PoolBuilder::build_with_allocated]は提供している
//! - 内部で排他制御は行わない (複数スレッドから利用する場合には、利用者側で直列化すること)
//!
//! # モジュールの依存関係
//!
//! ```text
//! pool => range => address
//! ```
//!
//! - [pool]モジュール:
//!   - 主に[Pool]構造体と、そのビルダである[PoolBuilder]を提供
//!   - `ippool`の利用者が直接触るのはこの構造体
//! - [range]モジュール:
//!   - アドレスの閉区間を表す[Range]を提供
//! - [address]モジュール:
//!   - 128bit幅のアドレスである[Address]と、その算術演算を提供
//!
//! [Range]: ./range/struct.Range.html
//! [Pool]: ./pool/struct.Pool.html
//! [PoolBuilder]: ./pool/struct.PoolBuilder.html
//! [PoolBuilder::build_with_allocated]: ./pool/struct.PoolBuilder.html#method.build_with_allocated
//! [pool]: ./pool/index.html
//! [range]: ./range/index.html
//! [address]: ./address/index.html
//! [Address]: ./address/struct.Address.html
#![warn(missing_docs)]
extern crate byteorder;
extern crate prometrics;
#[macro_use]
extern crate trackable;
#[macro_use]
extern crate slog;

pub use crate::error::{Error, ErrorKind};

pub mod address;
pub mod metrics;
pub mod pool;
pub mod range;

mod error;

/// crate固有の`Result`型.
pub type Result<T> = std::result::Result<T, Error>;
