use super::{EXIT_SIGINT, exit_interrupted, wait_worker};
use crate::terminal::TerminalConsole;
use deployhelp_config::DeployPaths;
use deployhelp_core::{
    Console, DeployError, DeployOptions, DeployOutcome, Deployer, Interrupt, ShellRunner,
    format_duration,
};
use std::path::PathBuf;
use tracing::debug;

pub async fn handle(
    deploy_dir: PathBuf,
    silent: bool,
    tasks: Vec<String>,
    targets: Vec<String>,
    engine: Option<String>,
) -> anyhow::Result<()> {
    let project_root = std::env::current_dir()?;
    let options = DeployOptions {
        paths: DeployPaths::new(&project_root, &deploy_dir),
        silent,
        tasks,
        targets,
        engine,
    };
    debug!(?options, "Starting deploy");

    // コアは同期処理なのでブロッキングスレッドで実行し、Ctrl-C と競わせる
    let interrupt = Interrupt::new();
    let worker = tokio::task::spawn_blocking({
        let interrupt = interrupt.clone();
        move || {
            let mut console = TerminalConsole::new(options.silent);
            let mut runner = ShellRunner::new(options.paths.project_root());
            Deployer::new(&mut console, &mut runner)
                .with_interrupt(interrupt)
                .run(&options)
        }
    });

    let outcome = wait_worker(silent, &interrupt, worker).await?;

    match outcome {
        DeployOutcome::Completed { elapsed, report } => {
            let mut console = TerminalConsole::new(silent);
            if report.all_finished() {
                console.success(&format!(
                    "デプロイが完了しました (経過時間: {})",
                    format_duration(elapsed)
                ));
            } else {
                console.warn(&format!(
                    "デプロイが完了しました。{} 個のサブタスクをスキップしました (経過時間: {})",
                    report.skipped_count(),
                    format_duration(elapsed)
                ));
            }
            Ok(())
        }
        DeployOutcome::Interrupted(DeployError::Interrupted) => {
            exit_interrupted(silent, "Ctrl-C", EXIT_SIGINT)
        }
        DeployOutcome::Interrupted(e) => exit_interrupted(silent, &e.to_string(), 1),
    }
}
