//! compose テンプレートの展開・絞り込み・書き出し

use crate::environment::Environment;
use crate::error::{DeployError, Result};
use crate::files;
use crate::template;
use serde_yaml::{Mapping, Value};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

const SERVICES_KEY: &str = "services";

/// サービス間参照を持つフィールド
const REFERENCE_KEYS: &[&str] = &["depends_on", "links"];

/// 展開済みの compose ドキュメント
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeDocument {
    root: Mapping,
}

impl ComposeDocument {
    /// YAML文字列からパース（services の検証はしない）
    ///
    /// マージキー（`<<: *anchor`）はここで展開する。
    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut value: Value = serde_yaml::from_str(content)?;
        value.apply_merge()?;
        let root: Option<Mapping> = serde_yaml::from_value(value)?;
        Ok(Self {
            root: root.unwrap_or_default(),
        })
    }

    /// テンプレートファイルを読み込み、変数を展開してパース
    ///
    /// ファイルが存在しない場合は `None`。
    #[instrument(skip(environment), fields(path = %path.display()))]
    pub fn render(path: &Path, environment: &Environment) -> Result<Option<Self>> {
        if !path.exists() {
            debug!("Compose template not found");
            return Ok(None);
        }

        let content = std::fs::read_to_string(path).map_err(|e| DeployError::io(path, e))?;
        debug!(
            placeholders = ?template::placeholders(&content),
            "Rendering compose template"
        );

        let rendered = template::render(&content, environment.variables()).map_err(|source| {
            DeployError::Template {
                file: path.to_path_buf(),
                source,
            }
        })?;

        let document =
            Self::from_yaml_str(&rendered).map_err(|source| DeployError::ComposeParse {
                file: path.to_path_buf(),
                source,
            })?;

        info!(services = document.service_names().len(), "Rendered compose template");
        Ok(Some(document))
    }

    /// services が1つ以上あることを確認
    pub fn ensure_services(&self, path: &Path) -> Result<()> {
        if self.service_names().is_empty() {
            return Err(DeployError::NoServices(path.to_path_buf()));
        }
        Ok(())
    }

    fn services(&self) -> Option<&Mapping> {
        self.root.get(SERVICES_KEY).and_then(Value::as_mapping)
    }

    /// ドキュメント順のサービス名
    pub fn service_names(&self) -> Vec<String> {
        self.services()
            .map(|services| services.keys().filter_map(key_to_string).collect())
            .unwrap_or_default()
    }

    pub fn service(&self, name: &str) -> Option<&Value> {
        self.services().and_then(|services| services.get(name))
    }

    /// 指定したサービスだけを残した新しいドキュメントを返す
    ///
    /// `depends_on` / `links` から除外されたサービスへの参照も取り除く。
    /// services 以外のトップレベルキーはそのまま残す。
    pub fn filtered(&self, targets: &[String]) -> Self {
        let keep = |name: &str| targets.iter().any(|t| t == name);

        let mut services = Mapping::new();
        if let Some(source) = self.services() {
            for (key, definition) in source {
                let Some(name) = key_to_string(key) else {
                    continue;
                };
                if !keep(&name) {
                    continue;
                }
                services.insert(key.clone(), prune_references(definition, &keep));
            }
        }

        let mut root = self.root.clone();
        root.insert(Value::String(SERVICES_KEY.to_string()), Value::Mapping(services));
        Self { root }
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.root)?)
    }

    /// 一時ファイルに書いてからリネームする（途中状態のファイルは見えない）
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn write_atomic(&self, path: &Path) -> Result<PathBuf> {
        let content = self.to_yaml_string()?;
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(|e| DeployError::io(dir, e))?;
        temp.write_all(content.as_bytes())
            .and_then(|_| temp.as_file().sync_all())
            .map_err(|e| DeployError::io(temp.path(), e))?;
        temp.persist(path)
            .map_err(|e| DeployError::io(path, e.error))?;

        info!(bytes = content.len(), "Wrote compose file");
        Ok(path.to_path_buf())
    }
}

impl Default for ComposeDocument {
    fn default() -> Self {
        Self {
            root: Mapping::new(),
        }
    }
}

/// 生成した compose ファイル
///
/// パイプライン実行後に [`GeneratedCompose::remove`] で削除する。
#[derive(Debug)]
pub struct GeneratedCompose {
    path: PathBuf,
}

impl GeneratedCompose {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn remove(self) -> std::io::Result<()> {
        files::remove_file(&self.path)
    }
}

/// 絞り込んだドキュメントを `path` に書き出す
pub fn write_filtered(
    document: &ComposeDocument,
    targets: &[String],
    path: &Path,
) -> Result<GeneratedCompose> {
    let path = document.filtered(targets).write_atomic(path)?;
    Ok(GeneratedCompose { path })
}

fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// サービス定義から除外サービスへの参照を取り除く
fn prune_references(definition: &Value, keep: &impl Fn(&str) -> bool) -> Value {
    let Value::Mapping(definition) = definition else {
        return definition.clone();
    };

    let mut pruned = Mapping::new();
    for (key, value) in definition {
        let is_reference = key
            .as_str()
            .is_some_and(|k| REFERENCE_KEYS.contains(&k));
        if !is_reference {
            pruned.insert(key.clone(), value.clone());
            continue;
        }

        match value {
            Value::Sequence(refs) => {
                let kept: Vec<Value> = refs
                    .iter()
                    .filter(|r| {
                        r.as_str()
                            .map(|s| keep(reference_target(s)))
                            .unwrap_or(false)
                    })
                    .cloned()
                    .collect();
                if !kept.is_empty() {
                    pruned.insert(key.clone(), Value::Sequence(kept));
                }
            }
            // depends_on: { db: { condition: service_healthy } }
            Value::Mapping(refs) => {
                let kept: Mapping = refs
                    .iter()
                    .filter(|(name, _)| key_to_string(name).is_some_and(|n| keep(&n)))
                    .map(|(name, cond)| (name.clone(), cond.clone()))
                    .collect();
                if !kept.is_empty() {
                    pruned.insert(key.clone(), Value::Mapping(kept));
                }
            }
            Value::Null => {}
            other => {
                pruned.insert(key.clone(), other.clone());
            }
        }
    }
    Value::Mapping(pruned)
}

/// `links` の `service:alias` 形式からサービス名を取り出す
fn reference_target(reference: &str) -> &str {
    reference
        .split_once(':')
        .map(|(service, _)| service)
        .unwrap_or(reference)
}
