//! 端末向けの Console 実装

use chrono::Local;
use colored::Colorize;
use deployhelp_core::{Console, Severity};
use std::io::{self, BufRead, Write};

/// 色付き・タイムスタンプ付きで標準出力に書く
///
/// サイレントモードではエラー以外を出力しない。
pub struct TerminalConsole {
    silent: bool,
}

impl TerminalConsole {
    pub fn new(silent: bool) -> Self {
        Self { silent }
    }
}

impl Console for TerminalConsole {
    fn message(&mut self, severity: Severity, text: &str) {
        if self.silent && severity != Severity::Error {
            return;
        }

        let timestamp = Local::now().format("%H:%M:%S").to_string();
        match severity {
            Severity::Info => println!("[{}] {} {}", timestamp.dimmed(), "▶".cyan(), text),
            Severity::Success => {
                println!("[{}] {} {}", timestamp.dimmed(), "✓".green().bold(), text.green())
            }
            Severity::Warn => {
                println!("[{}] {} {}", timestamp.dimmed(), "⚠".yellow(), text.yellow())
            }
            Severity::Error => eprintln!(
                "[{}] {} {}",
                timestamp.dimmed(),
                "✗".red().bold(),
                text.red()
            ),
        }
    }

    fn detail(&mut self, text: &str) {
        if self.silent {
            return;
        }
        let timestamp = Local::now().format("%H:%M:%S").to_string();
        println!("[{}]   → {}", timestamp.dimmed(), text.cyan());
    }

    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        print!("{}", prompt.bold());
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().lock().read_line(&mut input)? == 0 {
            println!();
            return Ok(None);
        }
        Ok(Some(input.trim_end_matches(['\r', '\n']).to_string()))
    }
}
