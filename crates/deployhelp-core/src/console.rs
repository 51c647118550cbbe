//! オペレーターとの入出力
//!
//! コアは直接標準出力に書かず、すべてこのトレイトを経由する。
//! 色付けやタイムスタンプなどの表示方法は実装側（CLI）の責務。

use std::io;

/// メッセージの重要度
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warn,
    Error,
}

/// オペレーター向けのメッセージ出力と入力
pub trait Console {
    /// 重要度付きのメッセージを出力
    fn message(&mut self, severity: Severity, text: &str);

    /// 装飾なしの補足行を出力（実行するコマンドなど）
    fn detail(&mut self, text: &str);

    /// プロンプトを表示して1行読む。入力が終了していれば `None`
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>>;

    fn info(&mut self, text: &str) {
        self.message(Severity::Info, text);
    }

    fn success(&mut self, text: &str) {
        self.message(Severity::Success, text);
    }

    fn warn(&mut self, text: &str) {
        self.message(Severity::Warn, text);
    }

    fn error(&mut self, text: &str) {
        self.message(Severity::Error, text);
    }
}
