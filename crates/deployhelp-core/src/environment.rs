//! .env ファイルの読み込み
//!
//! 読み込んだ変数はテンプレート展開とコマンド展開の両方で使われる。

use crate::error::{DeployError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument};

/// 変数コンテキスト
pub type Variables = BTreeMap<String, Value>;

/// デプロイ種別を表すキー（ローダーが必ず注入する）
pub const ENV_KEY: &str = "env";

/// `.env` 内でデプロイ種別を指定するキー
pub const ENV_SOURCE_KEY: &str = "ENV";

pub const DEFAULT_ENV: &str = "latest";

/// 1回のデプロイで使う環境変数マップ
///
/// 構築後は読み取り専用。
#[derive(Debug, Clone, PartialEq)]
pub struct Environment {
    variables: Variables,
}

impl Environment {
    /// 変数マップから構築し、`env` を注入する
    pub fn new(mut variables: Variables) -> Self {
        let variant = variables
            .get(ENV_SOURCE_KEY)
            .map(crate::template::value_to_string)
            .unwrap_or_else(|| DEFAULT_ENV.to_string());
        variables.insert(ENV_KEY.to_string(), Value::String(variant));
        Self { variables }
    }

    /// ファイルから読み込む
    ///
    /// ファイルが存在しない場合は `None` を返す（呼び出し側で警告する）。
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("Env file not found");
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
        let variables = parse_env(&content);
        info!(variable_count = variables.len(), "Loaded variables from env file");

        Ok(Some(Self::new(variables)))
    }

    /// デプロイ種別（`env`）
    pub fn variant(&self) -> &str {
        self.variables
            .get(ENV_KEY)
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_ENV)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Variables::new())
    }
}

/// `KEY=VALUE` 形式の行をパース
///
/// - 空行、`#` で始まる行、`=` を含まない行は無視
/// - 値は前後の空白と、対になったクォート1組を除去
/// - `true` / `false`（大文字小文字を区別しない）は真偽値
/// - 同じキーは後勝ち
pub fn parse_env(content: &str) -> Variables {
    let mut variables = Variables::new();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }

        let value = strip_quotes(value.trim());
        let value = if value.eq_ignore_ascii_case("true") {
            Value::Bool(true)
        } else if value.eq_ignore_ascii_case("false") {
            Value::Bool(false)
        } else {
            Value::String(value.to_string())
        };

        variables.insert(key.to_string(), value);
    }

    variables
}

fn strip_quotes(s: &str) -> &str {
    if s.len() >= 2
        && ((s.starts_with('"') && s.ends_with('"')) || (s.starts_with('\'') && s.ends_with('\'')))
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}
