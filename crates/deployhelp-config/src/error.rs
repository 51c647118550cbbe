use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("設定ファイルが見つかりません: {0}")]
    NotFound(PathBuf),

    #[error("設定ファイルの読み込みに失敗しました: {path}\n理由: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("設定ファイルの書き込みに失敗しました: {path}\n理由: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("YAMLパースエラー: {path}\n理由: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("YAMLシリアライズエラー: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error(
        "タスクが見つかりません\nヒント: config.yml の tasks に少なくとも1つのタスクを定義してください"
    )]
    NoTasks,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
