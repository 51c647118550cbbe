pub mod deploy;
pub mod quickstart;

use crate::terminal::TerminalConsole;
use deployhelp_core::{Console, Interrupt};
use tokio::task::JoinHandle;
use tracing::debug;

/// Ctrl-C で中断したときの終了コード
pub const EXIT_SIGINT: i32 = 130;

/// 中断を報告して終了する
pub fn exit_interrupted(silent: bool, reason: &str, code: i32) -> ! {
    TerminalConsole::new(silent).error(&format!("中断しました: {}", reason));
    std::process::exit(code)
}

/// ブロッキング処理の終了を Ctrl-C と競わせて待つ
///
/// 後片付けの必要な段階で Ctrl-C を受けた場合は、実行中のコマンドが終わり
/// 生成ファイルが削除されるまで待ってから終了コード 130 で終了する。
/// 入力待ちなどそれ以外の段階ではすぐに終了する。
pub async fn wait_worker<T>(
    silent: bool,
    interrupt: &Interrupt,
    mut worker: JoinHandle<T>,
) -> anyhow::Result<T> {
    tokio::select! {
        result = &mut worker => return Ok(result?),
        _ = tokio::signal::ctrl_c() => {}
    }

    if interrupt.request() {
        debug!("Waiting for worker to clean up");
        TerminalConsole::new(silent).warn(
            "中断を受け付けました。実行中のコマンドの終了を待っています（もう一度 Ctrl-C で強制終了）",
        );
        tokio::select! {
            result = &mut worker => {
                result?;
            }
            _ = tokio::signal::ctrl_c() => {}
        }
    }

    exit_interrupted(silent, "Ctrl-C", EXIT_SIGINT)
}
