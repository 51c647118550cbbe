//! デプロイディレクトリの雛形作成
//!
//! config.yml・Dockerfile・compose テンプレートを生成する。
//! 生成物はそのまま `deploy` で読み込める。

use crate::console::Console;
use crate::error::{DeployError, Result};
use crate::files;
use crate::interrupt::Interrupt;
use crate::select::{self, DefaultSelection};
use deployhelp_config::{
    COMPOSE_TEMPLATE_NAME, CONFIG_FILE_NAME, Context, DEFAULT_DEPLOY_DIR, DEFAULT_ENV_FILE,
    DeployConfig, Subtask, Task,
};
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// 雛形に含めるタスク
pub const QUICKSTART_TASKS: &[&str] = &["build", "up", "down"];

const DEFAULT_PROJECT_NAME: &str = "app";
const DOCKERFILE_NAME: &str = "Dockerfile";

#[derive(Debug, Clone)]
pub struct QuickstartOptions {
    pub project_root: PathBuf,
    pub silent: bool,
    pub project_name: Option<String>,
    /// プロジェクトルートからの相対パス
    pub deploy_dir: Option<String>,
}

impl QuickstartOptions {
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            silent: false,
            project_name: None,
            deploy_dir: None,
        }
    }
}

/// 作成結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scaffold {
    pub project_name: String,
    pub deploy_dir: PathBuf,
    pub files: Vec<PathBuf>,
}

pub struct Quickstart<'a, C: ?Sized> {
    console: &'a mut C,
    interrupt: Interrupt,
}

impl<'a, C: Console + ?Sized> Quickstart<'a, C> {
    pub fn new(console: &'a mut C) -> Self {
        Self {
            console,
            interrupt: Interrupt::default(),
        }
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// 入力を受け付けて雛形を作成する
    #[instrument(skip_all, fields(project_root = %options.project_root.display()))]
    pub fn run(&mut self, options: &QuickstartOptions) -> Result<Scaffold> {
        let project_name = self.enter_project_name(options)?;
        let deploy_dir = self.enter_deploy_dir(options)?;

        let candidates: Vec<String> = QUICKSTART_TASKS.iter().map(|t| t.to_string()).collect();
        let tasks = select::choose(
            self.console,
            options.silent,
            "デプロイタスク",
            &candidates,
            DefaultSelection::All,
            &[],
        )?;
        select::confirm(self.console, options.silent)?;

        // 書き込みの途中で終了しないよう、ここからは中断要求を待たせる
        if !self.interrupt.enter_critical() {
            return Err(DeployError::Interrupted);
        }
        let written = self.write_scaffold(options, &project_name, &deploy_dir, &tasks.items);
        self.interrupt.leave_critical();
        let files = written?;

        info!(%project_name, %deploy_dir, "Quickstart completed");
        self.console.success("完了しました");

        Ok(Scaffold {
            project_name,
            deploy_dir: options.project_root.join(&deploy_dir),
            files,
        })
    }

    fn write_scaffold(
        &mut self,
        options: &QuickstartOptions,
        project_name: &str,
        deploy_dir: &str,
        tasks: &[String],
    ) -> Result<Vec<PathBuf>> {
        self.console.success(&format!(
            "プロジェクト \"{}\" のファイルを作成します: {}",
            project_name, deploy_dir
        ));

        let dir = options.project_root.join(deploy_dir);
        std::fs::create_dir_all(&dir).map_err(|e| DeployError::io(&dir, e))?;
        self.widen_permissions(&dir);

        let config_path = dir.join(CONFIG_FILE_NAME);
        quickstart_config(deploy_dir, tasks).save(&config_path)?;
        self.created(&config_path, "configs");

        let dockerfile_path = dir.join(DOCKERFILE_NAME);
        write_file(&dockerfile_path, &dockerfile(project_name))?;
        self.created(&dockerfile_path, "dockerfile");

        let compose_path = dir.join(COMPOSE_TEMPLATE_NAME);
        write_file(&compose_path, &compose_template(project_name, deploy_dir))?;
        self.created(&compose_path, "docker-compose");

        Ok(vec![config_path, dockerfile_path, compose_path])
    }

    fn enter_project_name(&mut self, options: &QuickstartOptions) -> Result<String> {
        if let Some(name) = &options.project_name {
            return Ok(name.clone());
        }

        let default = options
            .project_root
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_PROJECT_NAME.to_string());
        if options.silent {
            return Ok(default);
        }

        let prompt = format!("プロジェクト名を入力してください (デフォルト: {}): ", default);
        let input = self.read(&prompt)?;
        Ok(if input.is_empty() { default } else { input })
    }

    fn enter_deploy_dir(&mut self, options: &QuickstartOptions) -> Result<String> {
        let mut candidate = options.deploy_dir.clone();

        loop {
            let deploy_dir = match candidate.take() {
                Some(dir) => dir,
                None if options.silent => DEFAULT_DEPLOY_DIR.to_string(),
                None => {
                    let prompt = format!(
                        "デプロイ用ファイルを作成するディレクトリを入力してください (デフォルト: {}): ",
                        DEFAULT_DEPLOY_DIR
                    );
                    let input = self.read(&prompt)?;
                    if input.is_empty() {
                        DEFAULT_DEPLOY_DIR.to_string()
                    } else {
                        input
                    }
                }
            };

            let path = options.project_root.join(&deploy_dir);
            if !path.exists() || path.is_dir() {
                return Ok(deploy_dir);
            }

            self.console.error(&format!(
                "\"{}\" は有効なディレクトリではありません。もう一度入力してください",
                deploy_dir
            ));
            if options.silent {
                return Err(DeployError::InvalidDeployDir(path));
            }
        }
    }

    fn read(&mut self, prompt: &str) -> Result<String> {
        match self.console.read_line(prompt).map_err(DeployError::Input)? {
            Some(input) => Ok(input.trim().to_string()),
            None => Err(DeployError::InputClosed),
        }
    }

    fn created(&mut self, path: &Path, label: &str) {
        self.widen_permissions(path);
        self.console.success(&format!("  {:<16} ✓", label));
    }

    fn widen_permissions(&mut self, path: &Path) {
        if let Err(e) = files::add_permissions(path) {
            warn!(path = %path.display(), error = %e, "Failed to add permissions");
            self.console.warn(&format!(
                "権限の変更に失敗しました: {} ({})",
                path.display(),
                e
            ));
        }
    }
}

/// タスクごとに1つのサブタスクを持つ設定
pub fn quickstart_config(deploy_dir: &str, tasks: &[String]) -> DeployConfig {
    let tasks = tasks
        .iter()
        .map(|task| {
            let action = if task == "up" { "up -d" } else { task.as_str() };
            let command = format!(
                "docker compose -f {}/docker-compose-{{env}}.yml {}",
                deploy_dir, action
            );
            Task {
                name: task.clone(),
                subtasks: vec![Subtask::new(format!("{} all", task), vec![command])],
            }
        })
        .collect();

    DeployConfig {
        context: Context {
            env_file: Some(PathBuf::from(DEFAULT_ENV_FILE)),
            compose: Some(PathBuf::from(format!(
                "{}/{}",
                deploy_dir, COMPOSE_TEMPLATE_NAME
            ))),
            ..Default::default()
        },
        tasks,
    }
}

fn dockerfile(project_name: &str) -> String {
    format!(
        r#"# ベースイメージ
FROM debian:bookworm-slim

# 作業ディレクトリ
WORKDIR /{project_name}

# ホストからファイルをコピー
COPY . .
"#
    )
}

fn compose_template(project_name: &str, deploy_dir: &str) -> String {
    format!(
        r#"version: "3"
services:
  {project_name}-{{env}}:
    build:
      context: ..
      dockerfile: {deploy_dir}/{DOCKERFILE_NAME}
    image: {project_name}:{{env}}
    container_name: {project_name}-{{env}}
"#
    )
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content).map_err(|e| DeployError::io(path, e))
}
