pub mod error;
pub mod model;

pub use error::*;
pub use model::*;

use std::path::{Path, PathBuf};

/// デプロイディレクトリのデフォルト名
pub const DEFAULT_DEPLOY_DIR: &str = "deploy";

/// デプロイディレクトリを指定する環境変数
pub const DEPLOY_DIR_ENV: &str = "DEPLOYHELP_DIR";

pub const CONFIG_FILE_NAME: &str = "config.yml";
pub const DEFAULT_ENV_FILE: &str = ".env";
pub const COMPOSE_TEMPLATE_NAME: &str = "docker-compose-template.j2";

/// プロジェクトルートとデプロイディレクトリから各ファイルのパスを解決する
///
/// `context` に書かれた相対パスはプロジェクトルート（作業ディレクトリ）基準。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployPaths {
    project_root: PathBuf,
    deploy_dir: PathBuf,
}

impl DeployPaths {
    pub fn new(project_root: impl Into<PathBuf>, deploy_dir: impl AsRef<Path>) -> Self {
        let project_root = project_root.into();
        let deploy_dir = project_root.join(deploy_dir.as_ref());
        Self {
            project_root,
            deploy_dir,
        }
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn deploy_dir(&self) -> &Path {
        &self.deploy_dir
    }

    /// `<deploydir>/config.yml`
    pub fn config_file(&self) -> PathBuf {
        self.deploy_dir.join(CONFIG_FILE_NAME)
    }

    /// `context.env_file`、未指定なら `.env`
    pub fn env_file(&self, context: &Context) -> PathBuf {
        match &context.env_file {
            Some(path) => self.resolve(path),
            None => self.project_root.join(DEFAULT_ENV_FILE),
        }
    }

    /// `context.compose`、未指定なら `<deploydir>/docker-compose-template.j2`
    pub fn compose_template(&self, context: &Context) -> PathBuf {
        match &context.compose {
            Some(path) => self.resolve(path),
            None => self.deploy_dir.join(COMPOSE_TEMPLATE_NAME),
        }
    }

    /// 生成される compose ファイル: `<deploydir>/docker-compose-<env>.yml`
    pub fn generated_compose(&self, env: &str) -> PathBuf {
        self.deploy_dir.join(format!("docker-compose-{}.yml", env))
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
