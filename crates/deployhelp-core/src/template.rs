//! プレースホルダ展開
//!
//! compose テンプレートとパイプラインのコマンドで共通の構文を使う:
//! `{NAME}`（NAME は英数字とアンダースコア、先頭は数字以外）。
//!
//! - `${NAME}` は compose やシェルの変数参照なのでそのまま残す
//! - `{{` はリテラルの `{` になる（`{{env}` → `{env}`）
//! - それ以外の波括弧（YAML のフローマッピング `{a: b}` など）はそのまま残る
//!
//! 未定義の変数は常にエラーとし、黙って素通しすることはない。

use crate::environment::Variables;
use regex::{Captures, Regex};
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{[^}]*\}|\{\{|\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap()
});

/// リテラルの `{` を表すエスケープ
const ESCAPED_BRACE: &str = "{{";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("未定義の変数: {}", .0.join(", "))]
    Undefined(Vec<String>),
}

/// テンプレート内の `{NAME}` を変数で置換する
pub fn render(template: &str, variables: &Variables) -> Result<String, TemplateError> {
    let mut undefined: Vec<String> = Vec::new();

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures| {
        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            return if &caps[0] == ESCAPED_BRACE {
                "{".to_string()
            } else {
                caps[0].to_string()
            };
        };

        match variables.get(name) {
            Some(value) => value_to_string(value),
            None => {
                if !undefined.iter().any(|u| u == name) {
                    undefined.push(name.to_string());
                }
                caps[0].to_string()
            }
        }
    });

    if undefined.is_empty() {
        Ok(rendered.into_owned())
    } else {
        Err(TemplateError::Undefined(undefined))
    }
}

/// テンプレートが参照する変数名（出現順、重複なし）
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in PLACEHOLDER
        .captures_iter(template)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
    {
        if !names.contains(&name) {
            names.push(name);
        }
    }
    names
}

pub(crate) fn value_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
