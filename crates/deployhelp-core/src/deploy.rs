//! デプロイの実行制御
//!
//! 設定の読み込みから compose ファイルの削除までを順に行う。
//! compose ファイルを書き出す前のエラー・キャンセルは副作用を残さずに中断する。
//! 書き出した後はサブタスクの結果や中断要求にかかわらず必ず削除を試みる。

use crate::compose::{self, ComposeDocument};
use crate::console::Console;
use crate::engine;
use crate::environment::Environment;
use crate::error::{DeployError, Result};
use crate::files;
use crate::interrupt::Interrupt;
use crate::pipeline::{self, CommandRunner, PipelineReport};
use crate::select::{self, DefaultSelection, Selection};
use deployhelp_config::{ConfigError, DeployConfig, DeployPaths};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// デプロイの実行オプション
#[derive(Debug, Clone)]
pub struct DeployOptions {
    pub paths: DeployPaths,
    /// 対話せず既定値で進める
    pub silent: bool,
    pub tasks: Vec<String>,
    pub targets: Vec<String>,
    /// エンジンの事前チェックに使うバイナリ（`None` ならチェックしない）
    pub engine: Option<String>,
}

impl DeployOptions {
    pub fn new(paths: DeployPaths) -> Self {
        Self {
            paths,
            silent: false,
            tasks: Vec::new(),
            targets: Vec::new(),
            engine: None,
        }
    }
}

/// デプロイの結果
#[derive(Debug)]
pub enum DeployOutcome {
    Completed {
        elapsed: Duration,
        report: PipelineReport,
    },
    /// compose ファイルを書き出す前に中断した（中断要求の場合は後片付けを済ませている）
    Interrupted(DeployError),
}

impl DeployOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }
}

/// 書き出し前に確定する実行計画
#[derive(Debug)]
struct Plan {
    config: DeployConfig,
    environment: Environment,
    document: ComposeDocument,
    tasks: Selection,
    targets: Selection,
    compose_path: PathBuf,
}

/// デプロイ実行器
pub struct Deployer<'a, C: ?Sized, R: ?Sized> {
    console: &'a mut C,
    runner: &'a mut R,
    interrupt: Interrupt,
}

impl<'a, C, R> Deployer<'a, C, R>
where
    C: Console + ?Sized,
    R: CommandRunner + ?Sized,
{
    pub fn new(console: &'a mut C, runner: &'a mut R) -> Self {
        Self {
            console,
            runner,
            interrupt: Interrupt::default(),
        }
    }

    /// Ctrl-C を受けるスレッドと共有する中断フラグを設定する
    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// デプロイを実行する
    #[instrument(skip_all, fields(deploy_dir = %options.paths.deploy_dir().display()))]
    pub fn run(&mut self, options: &DeployOptions) -> DeployOutcome {
        let start = Instant::now();

        let plan = match self.prepare(options) {
            Ok(plan) => plan,
            Err(e) => {
                debug!(error = %e, "Deploy interrupted before writing compose file");
                return DeployOutcome::Interrupted(e);
            }
        };

        // ここから生成ファイルの削除までは中断されても後片付けを行う
        if !self.interrupt.enter_critical() {
            debug!("Interrupt requested before writing compose file");
            return DeployOutcome::Interrupted(DeployError::Interrupted);
        }
        let generated =
            match compose::write_filtered(&plan.document, &plan.targets.items, &plan.compose_path)
            {
                Ok(generated) => generated,
                Err(e) => {
                    self.interrupt.leave_critical();
                    return DeployOutcome::Interrupted(e);
                }
            };
        self.console.info(&format!(
            "composeファイルを生成しました: {}",
            generated.path().display()
        ));
        if let Err(e) = files::add_permissions(generated.path()) {
            warn!(error = %e, "Failed to add permissions");
            self.console
                .warn(&format!("権限の変更に失敗しました: {}", e));
        }

        let report = pipeline::execute(
            self.console,
            self.runner,
            &plan.environment,
            &plan.config,
            &plan.tasks.items,
            &self.interrupt,
        );
        report.print_summary(self.console);

        let path = generated.path().to_path_buf();
        match generated.remove() {
            Ok(()) => debug!(path = %path.display(), "Removed generated compose file"),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to remove compose file");
                self.console.warn(&format!(
                    "composeファイルの削除に失敗しました: {} ({})",
                    path.display(),
                    e
                ));
            }
        }
        self.interrupt.leave_critical();

        if report.interrupted {
            info!("Deploy interrupted by request");
            return DeployOutcome::Interrupted(DeployError::Interrupted);
        }

        let elapsed = start.elapsed();
        info!(elapsed_ms = elapsed.as_millis() as u64, "Deploy completed");
        DeployOutcome::Completed { elapsed, report }
    }

    /// 書き出し前の全段階（読み込み・展開・選択・確認）
    fn prepare(&mut self, options: &DeployOptions) -> Result<Plan> {
        if let Some(binary) = &options.engine {
            let info = engine::check(binary)?;
            self.console
                .info(&format!("{} / {}", info.version, info.compose_version));
        }

        let paths = &options.paths;
        let config = match DeployConfig::load(&paths.config_file()) {
            Ok(config) => config,
            Err(ConfigError::NotFound(path)) => {
                self.console.warn(&format!(
                    "設定ファイルが見つかりません: {}",
                    path.display()
                ));
                DeployConfig::default()
            }
            Err(e) => return Err(e.into()),
        };
        config.ensure_tasks()?;

        let env_file = paths.env_file(&config.context);
        let environment = match Environment::load(&env_file)? {
            Some(environment) => environment,
            None => {
                self.console.warn(&format!(
                    "envファイルが見つかりません: {}",
                    env_file.display()
                ));
                Environment::default()
            }
        };
        info!(env = environment.variant(), "Resolved environment variant");

        let template = paths.compose_template(&config.context);
        let document = match ComposeDocument::render(&template, &environment)? {
            Some(document) => document,
            None => {
                self.console.warn(&format!(
                    "composeテンプレートが見つかりません: {}",
                    template.display()
                ));
                ComposeDocument::default()
            }
        };
        document.ensure_services(&template)?;

        let tasks = select::choose(
            self.console,
            options.silent,
            "デプロイタスク",
            &config.task_names(),
            DefaultSelection::First,
            &options.tasks,
        )?;
        let targets = select::choose(
            self.console,
            options.silent,
            "デプロイターゲット",
            &document.service_names(),
            DefaultSelection::All,
            &options.targets,
        )?;

        if !(tasks.explicit && targets.explicit) {
            select::confirm(self.console, options.silent)?;
        }

        let compose_path = paths.generated_compose(environment.variant());
        Ok(Plan {
            config,
            environment,
            document,
            tasks,
            targets,
            compose_path,
        })
    }
}
