use crate::template::TemplateError;
use deployhelp_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

/// デプロイを中断させる致命的エラー
#[derive(Error, Debug)]
pub enum DeployError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO エラー: {path}\n理由: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("テンプレート展開エラー: {file}\n理由: {source}")]
    Template {
        file: PathBuf,
        #[source]
        source: TemplateError,
    },

    #[error("composeファイルのパースに失敗しました: {file}\n理由: {source}")]
    ComposeParse {
        file: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("composeファイルのシリアライズに失敗しました: {0}")]
    ComposeSerialize(#[from] serde_yaml::Error),

    #[error(
        "サービスが見つかりません: {0}\nヒント: テンプレートの services に少なくとも1つのサービスを定義してください"
    )]
    NoServices(PathBuf),

    #[error(
        "コンテナエンジンが利用できません: {0}\n\nヒント:\n  • Dockerが起動しているか確認してください\n  • DOCKER_BIN 環境変数でバイナリを指定できます"
    )]
    EngineUnavailable(String),

    #[error("無効なデプロイディレクトリ: {0}")]
    InvalidDeployDir(PathBuf),

    #[error("操作がキャンセルされました")]
    Declined,

    #[error("入力が終了しました")]
    InputClosed,

    #[error("中断要求を受け付けました")]
    Interrupted,

    #[error("入力の読み込みに失敗しました: {0}")]
    Input(#[source] std::io::Error),
}

impl DeployError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, DeployError>;

/// 1ステップの失敗（サブタスク内に閉じ込められ、デプロイは継続する）
#[derive(Error, Debug)]
pub enum StepError {
    #[error("コマンドの展開に失敗しました: {0}")]
    Interpolation(#[from] TemplateError),

    #[error("コマンドを起動できませんでした: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("終了コード {0} で失敗しました")]
    ExitCode(i32),

    #[error("シグナルにより終了しました")]
    Terminated,
}
