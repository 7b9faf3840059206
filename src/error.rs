use trackable;

/// crate固有のエラー型.
#[derive(Debug, Clone, TrackableError)]
pub struct Error(trackable::error::TrackableError<ErrorKind>);

/// 発生し得るエラーの種別.
///
/// いずれのエラーも、発生時点でプールの状態は変更されていない.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// プールの全体範囲が不正(始端が終端よりも大きい).
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側の設定を修正して、始端と終端を正しく指定する
    InvalidUniverse,

    /// 指定された範囲がプールの全体範囲に収まっていない.
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側のプログラムを修正して入力を正しくする
    OutOfPoolRange,

    /// 指定された範囲の(少なくとも一部)が既に割当済み.
    ///
    /// 範囲内の全てのアドレスが空いていても、
    /// それらが複数の空き領域に跨っている場合にもこのエラーとなる.
    ///
    /// # 典型的な対応策
    ///
    /// - `Pool::find_first()`等を用いて、別の範囲を選び直す
    AlreadyAllocated,

    /// 指定された範囲(の少なくとも一部)が未割当.
    NotYetAllocated,

    /// アドレスの加減算がアドレス幅の表現可能な範囲を超えた.
    ///
    /// アドレスファミリの境界付近のアドレスを扱った場合に発生し得る.
    ArithmeticOverflow,

    /// 入力が不正.
    ///
    /// E.g., サイズ`0`の範囲の探索、アドレス幅を超えるプレフィックス長
    ///
    /// # 典型的な対応策
    ///
    /// - 利用者側のプログラムを修正して入力を正しくする
    InvalidInput,
}
impl trackable::error::ErrorKind for ErrorKind {}
