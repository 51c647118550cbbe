//! config.yml のデータモデル
//!
//! ```yaml
//! context:
//!   env_file: .env
//!   compose: deploy/docker-compose-template.j2
//! tasks:
//!   build:
//!     - title: build all
//!       pipeline:
//!         - docker compose -f deploy/docker-compose-{env}.yml build
//! ```

use crate::error::{ConfigError, Result};
use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, instrument};

/// デプロイ設定（config.yml 全体）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default, deserialize_with = "null_as_default")]
    pub context: Context,
    #[serde(default, with = "task_list")]
    pub tasks: Vec<Task>,
}

/// 実行コンテキスト
///
/// `env_file` と `compose` 以外のキーもそのまま保持する。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compose: Option<PathBuf>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// 名前付きタスク（サブタスクの順序付きリスト）
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub subtasks: Vec<Subtask>,
}

/// サブタスク
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub title: String,
    /// `{KEY}` プレースホルダを含むコマンドテンプレート
    #[serde(default, deserialize_with = "null_as_default")]
    pub pipeline: Vec<String>,
}

impl Subtask {
    pub fn new(title: impl Into<String>, pipeline: Vec<String>) -> Self {
        Self {
            title: title.into(),
            pipeline,
        }
    }
}

impl DeployConfig {
    /// ファイルから読み込む
    ///
    /// ファイルが存在しない場合は [`ConfigError::NotFound`] を返す。
    /// タスクの有無はここでは検証しない（[`DeployConfig::ensure_tasks`] を参照）。
    #[instrument(fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config = Self::from_yaml_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        info!(tasks = config.tasks.len(), "Loaded deploy config");
        Ok(config)
    }

    /// YAML文字列からパース
    ///
    /// 空のドキュメントは空の設定として扱う。
    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            debug!("Empty config document");
            return Ok(Self::default());
        }
        let config: Option<Self> = serde_yaml::from_str(content)?;
        Ok(config.unwrap_or_default())
    }

    /// YAML文字列にシリアライズ
    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// ファイルに保存
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = self.to_yaml_string()?;
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// タスクが1つ以上定義されていることを確認
    pub fn ensure_tasks(&self) -> Result<()> {
        if self.tasks.is_empty() {
            return Err(ConfigError::NoTasks);
        }
        Ok(())
    }

    /// 宣言順のタスク名
    pub fn task_names(&self) -> Vec<String> {
        self.tasks.iter().map(|t| t.name.clone()).collect()
    }

    pub fn task(&self, name: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.name == name)
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// `tasks` マッピングを宣言順を保ったまま `Vec<Task>` として扱う
mod task_list {
    use super::{Subtask, Task};
    use serde::de::{Deserializer, MapAccess, Visitor};
    use serde::ser::{SerializeMap, Serializer};
    use serde::Deserialize;
    use std::fmt;

    pub fn serialize<S: Serializer>(tasks: &[Task], serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(tasks.len()))?;
        for task in tasks {
            map.serialize_entry(&task.name, &task.subtasks)?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Task>, D::Error> {
        Ok(Option::<TaskMap>::deserialize(deserializer)?
            .map(|m| m.0)
            .unwrap_or_default())
    }

    struct TaskMap(Vec<Task>);

    impl<'de> Deserialize<'de> for TaskMap {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_map(TaskMapVisitor)
        }
    }

    struct TaskMapVisitor;

    impl<'de> Visitor<'de> for TaskMapVisitor {
        type Value = TaskMap;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a mapping of task name to a list of subtasks")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut tasks: Vec<Task> = Vec::new();
            while let Some((name, subtasks)) =
                access.next_entry::<String, Option<Vec<Subtask>>>()?
            {
                let subtasks = subtasks.unwrap_or_default();
                // 重複キーは後勝ち（位置は最初の宣言を維持）
                match tasks.iter_mut().find(|t| t.name == name) {
                    Some(existing) => existing.subtasks = subtasks,
                    None => tasks.push(Task { name, subtasks }),
                }
            }
            Ok(TaskMap(tasks))
        }
    }
}
