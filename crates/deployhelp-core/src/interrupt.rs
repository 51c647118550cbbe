//! 中断要求（Ctrl-C）の受け渡し
//!
//! シグナルを受けたスレッドが [`Interrupt::request`] を呼び、
//! 作業スレッドはステップの合間に [`Interrupt::is_requested`] を確認する。
//! 実行中の外部コマンドは止めず、終了を待ってから後片付けをして抜ける。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
struct State {
    requested: AtomicBool,
    /// 後片付けが必要な段階（生成ファイルの書き出しからパイプライン完了まで）
    critical: AtomicBool,
}

/// 作業スレッドと共有する中断フラグ
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    state: Arc<State>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// 中断を要求する
    ///
    /// 作業スレッドが後片付けの必要な段階にいれば `true` を返す。
    /// その場合、呼び出し側は作業スレッドの終了を待たなければならない。
    pub fn request(&self) -> bool {
        self.state.requested.store(true, Ordering::SeqCst);
        self.state.critical.load(Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.state.requested.load(Ordering::SeqCst)
    }

    /// 後片付けが必要な段階に入る
    ///
    /// すでに中断が要求されていれば `false`（段階には入らない）。
    pub(crate) fn enter_critical(&self) -> bool {
        self.state.critical.store(true, Ordering::SeqCst);
        if self.is_requested() {
            self.leave_critical();
            return false;
        }
        true
    }

    pub(crate) fn leave_critical(&self) {
        self.state.critical.store(false, Ordering::SeqCst);
    }
}
