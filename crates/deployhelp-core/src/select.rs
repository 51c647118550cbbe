//! タスク・ターゲットの選択と実行確認
//!
//! フラグ指定 → サイレントモードの既定値 → 対話入力 の順に解決する。
//! 無効な入力は空の選択として扱わず、再入力を求める。

use crate::console::Console;
use crate::error::{DeployError, Result};
use tracing::debug;

/// 全候補を表すキーワード
pub const ALL: &str = "all";

/// 既定の選択
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultSelection {
    /// 最初の候補
    First,
    /// 全候補
    All,
}

/// 選択結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub items: Vec<String>,
    /// フラグ指定をそのまま採用した場合 true
    pub explicit: bool,
}

/// 候補の中から項目を選ぶ
///
/// `candidates` は空であってはならない（呼び出し前に検証済みであること）。
pub fn choose<C: Console + ?Sized>(
    console: &mut C,
    silent: bool,
    label: &str,
    candidates: &[String],
    default: DefaultSelection,
    explicit: &[String],
) -> Result<Selection> {
    debug_assert!(!candidates.is_empty(), "candidates must not be empty");

    if !explicit.is_empty() {
        if explicit.iter().all(|item| is_valid(item, candidates)) {
            let items = resolve(explicit.iter().map(String::as_str), candidates);
            debug!(label, ?items, "Using explicit selection");
            console.info(&format!("{}: {}", label, items.join(" ")));
            return Ok(Selection {
                items,
                explicit: true,
            });
        }

        let unknown: Vec<&str> = explicit
            .iter()
            .filter(|item| !is_valid(item, candidates))
            .map(String::as_str)
            .collect();
        console.warn(&format!(
            "不明な{}が指定されました: {}",
            label,
            unknown.join(", ")
        ));
    }

    let default_items = match default {
        DefaultSelection::First => candidates.iter().take(1).cloned().collect(),
        DefaultSelection::All => candidates.to_vec(),
    };

    if silent {
        return Ok(Selection {
            items: default_items,
            explicit: false,
        });
    }

    let prompt = build_prompt(label, candidates, default);
    loop {
        let Some(input) = console.read_line(&prompt).map_err(DeployError::Input)? else {
            return Err(DeployError::InputClosed);
        };

        let items = if input.trim().is_empty() {
            default_items.clone()
        } else {
            resolve(
                input.split(|c: char| c == ',' || c.is_whitespace()),
                candidates,
            )
        };

        if items.is_empty() {
            console.warn(&format!(
                "有効な{}がありません。次から選択してください: {} {}",
                label,
                ALL,
                candidates.join(" ")
            ));
            continue;
        }

        console.success(&format!("✓ {}: {}", label, items.join(" ")));
        return Ok(Selection {
            items,
            explicit: false,
        });
    }
}

/// 実行確認
///
/// サイレントモードでは確認しない。`no` なら [`DeployError::Declined`]。
pub fn confirm<C: Console + ?Sized>(console: &mut C, silent: bool) -> Result<()> {
    if silent {
        return Ok(());
    }

    loop {
        let Some(input) = console
            .read_line("処理を開始しますか？ (yes/no) [yes]: ")
            .map_err(DeployError::Input)?
        else {
            return Err(DeployError::InputClosed);
        };

        match input.trim().to_lowercase().as_str() {
            "" | "yes" | "y" => return Ok(()),
            "no" | "n" => return Err(DeployError::Declined),
            _ => console.warn("yes または no で答えてください"),
        }
    }
}

fn is_valid(item: &str, candidates: &[String]) -> bool {
    item.eq_ignore_ascii_case(ALL) || lookup(item, candidates).is_some()
}

/// 入力に対応する候補を探す
///
/// 完全一致を優先し、なければ大文字小文字を無視して一つに決まる候補を返す。
fn lookup<'c>(token: &str, candidates: &'c [String]) -> Option<&'c String> {
    if let Some(exact) = candidates.iter().find(|c| *c == token) {
        return Some(exact);
    }
    let mut folded = candidates.iter().filter(|c| c.eq_ignore_ascii_case(token));
    match (folded.next(), folded.next()) {
        (Some(found), None) => Some(found),
        _ => None,
    }
}

/// 入力を候補で絞り込む。`all` を含めば全候補
fn resolve<'a>(input: impl Iterator<Item = &'a str>, candidates: &[String]) -> Vec<String> {
    let mut items: Vec<String> = Vec::new();
    for token in input.map(str::trim).filter(|t| !t.is_empty()) {
        if token.eq_ignore_ascii_case(ALL) {
            return candidates.to_vec();
        }
        match lookup(token, candidates) {
            Some(found) if !items.contains(found) => items.push(found.clone()),
            _ => {}
        }
    }
    items
}

fn build_prompt(label: &str, candidates: &[String], default: DefaultSelection) -> String {
    let default_label = match default {
        DefaultSelection::First => candidates.first().map(String::as_str).unwrap_or(ALL),
        DefaultSelection::All => ALL,
    };
    format!(
        "{}を入力してください [{} | {}] (デフォルト: {}): ",
        label,
        ALL,
        candidates.join(" "),
        default_label
    )
}
