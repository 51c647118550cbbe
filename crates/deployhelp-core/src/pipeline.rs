//! タスクパイプラインの実行
//!
//! `task → subtask → step` の順に1つずつ実行する。
//! ステップが失敗するとそのサブタスクの残りのステップだけをスキップし、
//! 次のサブタスクへ進む。中断要求がない限り、実行は常に最後のタスクまで到達する。

use crate::console::Console;
use crate::environment::Environment;
use crate::error::StepError;
use crate::interrupt::Interrupt;
use crate::template;
use deployhelp_config::{DeployConfig, Subtask};
use std::io;
use std::path::PathBuf;
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// シェルコマンドの実行手段
pub trait CommandRunner {
    /// コマンドを実行して終了を待つ。終了コードを返す（シグナル終了なら `None`）
    fn run(&mut self, command: &str) -> io::Result<Option<i32>>;
}

/// プラットフォームのシェル（`sh -c` / `cmd /C`）で実行する
///
/// 作業ディレクトリはプロジェクトルート、標準入出力は親プロセスから継承する。
#[derive(Debug, Clone)]
pub struct ShellRunner {
    cwd: PathBuf,
}

impl ShellRunner {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self { cwd: cwd.into() }
    }
}

impl CommandRunner for ShellRunner {
    fn run(&mut self, command: &str) -> io::Result<Option<i32>> {
        let mut cmd = if cfg!(windows) {
            let mut cmd = Command::new("cmd");
            cmd.arg("/C").arg(command);
            cmd
        } else {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg(command);
            cmd
        };

        debug!(command, cwd = %self.cwd.display(), "Spawning shell");
        let status = cmd.current_dir(&self.cwd).status()?;
        Ok(status.code())
    }
}

/// サブタスクの結果
#[derive(Debug)]
pub enum SubtaskStatus {
    Finished,
    /// `step` 番目（1始まり）で失敗し、残りをスキップした
    Skipped { step: usize, error: StepError },
    /// 中断要求により `step` 番目以降を実行しなかった
    Interrupted { step: usize },
}

#[derive(Debug)]
pub struct SubtaskOutcome {
    pub task: String,
    pub title: String,
    pub status: SubtaskStatus,
    pub duration: Duration,
}

impl SubtaskOutcome {
    /// `"<task>/<title>"`
    pub fn label(&self) -> String {
        format!("{}/{}", self.task, self.title)
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.status, SubtaskStatus::Finished)
    }
}

/// パイプライン全体の実行結果
#[derive(Debug, Default)]
pub struct PipelineReport {
    pub outcomes: Vec<SubtaskOutcome>,
    pub duration: Duration,
    /// 中断要求で途中終了した
    pub interrupted: bool,
}

impl PipelineReport {
    pub fn finished_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_finished()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, SubtaskStatus::Skipped { .. }))
            .count()
    }

    pub fn all_finished(&self) -> bool {
        !self.interrupted && self.skipped_count() == 0
    }

    /// サマリーを出力
    pub fn print_summary<C: Console + ?Sized>(&self, console: &mut C) {
        let slowest = self.outcomes.iter().max_by_key(|o| o.duration);

        console.detail(&"═".repeat(44));
        console.detail("Deploy Summary");
        console.detail(&"─".repeat(44));
        console.detail(&format!("Total time:    {}", format_duration(self.duration)));
        if let Some(outcome) = slowest {
            console.detail(&format!(
                "Slowest:       {} ({})",
                outcome.label(),
                format_duration(outcome.duration)
            ));
        }
        console.detail(&format!("Finished:      {}", self.finished_count()));
        console.detail(&format!("Skipped:       {}", self.skipped_count()));
        if self.interrupted {
            console.detail("Interrupted:   yes");
        }
        console.detail(&"═".repeat(44));

        for outcome in &self.outcomes {
            if let SubtaskStatus::Skipped { step, error } = &outcome.status {
                console.warn(&format!(
                    "サブタスク \"{}\" は Step {} で失敗しました: {}",
                    outcome.label(),
                    step,
                    error
                ));
            }
        }
    }
}

/// 選択されたタスクを順に実行する
#[instrument(skip_all, fields(tasks = ?tasks))]
pub fn execute<C, R>(
    console: &mut C,
    runner: &mut R,
    environment: &Environment,
    config: &DeployConfig,
    tasks: &[String],
    interrupt: &Interrupt,
) -> PipelineReport
where
    C: Console + ?Sized,
    R: CommandRunner + ?Sized,
{
    let start = Instant::now();
    let mut report = PipelineReport::default();

    'tasks: for name in tasks {
        let Some(task) = config.task(name) else {
            warn!(task = %name, "Task not found in config");
            console.warn(&format!("タスク \"{}\" が見つかりません", name));
            continue;
        };

        console.info(&format!("タスク \"{}\" を開始します", task.name));
        for subtask in &task.subtasks {
            if interrupt.is_requested() {
                report.interrupted = true;
                break 'tasks;
            }

            let outcome = run_subtask(console, runner, environment, &task.name, subtask, interrupt);
            let stopped = matches!(outcome.status, SubtaskStatus::Interrupted { .. });
            report.outcomes.push(outcome);
            if stopped {
                report.interrupted = true;
                break 'tasks;
            }
        }
        console.success(&format!("タスク \"{}\" が終了しました", task.name));
    }

    if report.interrupted {
        warn!("Pipeline interrupted");
        console.warn("中断要求により残りのステップを実行しませんでした");
    }

    report.duration = start.elapsed();
    info!(
        finished = report.finished_count(),
        skipped = report.skipped_count(),
        "Pipeline completed"
    );
    report
}

fn run_subtask<C, R>(
    console: &mut C,
    runner: &mut R,
    environment: &Environment,
    task: &str,
    subtask: &Subtask,
    interrupt: &Interrupt,
) -> SubtaskOutcome
where
    C: Console + ?Sized,
    R: CommandRunner + ?Sized,
{
    let label = format!("{}/{}", task, subtask.title);
    let start = Instant::now();
    console.info(&format!("サブタスク \"{}\" を開始します", label));

    let mut status = SubtaskStatus::Finished;
    for (index, step) in subtask.pipeline.iter().enumerate() {
        let number = index + 1;
        if interrupt.is_requested() {
            status = SubtaskStatus::Interrupted { step: number };
            break;
        }
        if let Err(error) = run_step(console, runner, environment, number, step) {
            warn!(subtask = %label, step = number, %error, "Step failed");
            console.error(&format!("Step {} が失敗しました: {}", number, error));
            status = SubtaskStatus::Skipped {
                step: number,
                error,
            };
            break;
        }
    }

    match &status {
        SubtaskStatus::Finished => {
            console.success(&format!("サブタスク \"{}\" が終了しました", label));
        }
        SubtaskStatus::Skipped { .. } => {
            console.warn(&format!(
                "サブタスク \"{}\" の残りのステップをスキップしました",
                label
            ));
        }
        SubtaskStatus::Interrupted { step } => {
            console.warn(&format!(
                "サブタスク \"{}\" を Step {} の前で中断しました",
                label, step
            ));
        }
    }

    SubtaskOutcome {
        task: task.to_string(),
        title: subtask.title.clone(),
        status,
        duration: start.elapsed(),
    }
}

fn run_step<C, R>(
    console: &mut C,
    runner: &mut R,
    environment: &Environment,
    number: usize,
    step: &str,
) -> Result<(), StepError>
where
    C: Console + ?Sized,
    R: CommandRunner + ?Sized,
{
    let command = template::render(step, environment.variables())?;
    console.detail(&format!("Step {}: {}", number, command));

    match runner.run(&command).map_err(StepError::Spawn)? {
        Some(0) => Ok(()),
        Some(code) => Err(StepError::ExitCode(code)),
        None => Err(StepError::Terminated),
    }
}

/// Duration を読みやすい形式にフォーマット
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let millis = duration.subsec_millis();

    if total_secs >= 60 {
        let minutes = total_secs / 60;
        let secs = total_secs % 60;
        format!("{}m {}s", minutes, secs)
    } else if total_secs >= 1 {
        format!("{}.{}s", total_secs, millis / 100)
    } else {
        format!("{}ms", millis)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingRunner;
    use super::*;
    use crate::console::Severity;
    use crate::console::testing::RecordingConsole;
    use crate::environment::parse_env;
    use crate::interrupt::Interrupt;

    const CONFIG: &str = r#"
tasks:
  build:
    - title: a
      pipeline:
        - step-a1 {env}
        - fail-a2
        - step-a3
    - title: b
      pipeline:
        - step-b1
  up:
    - title: c
      pipeline:
        - step-c1 {MISSING}
        - step-c2
    - title: d
      pipeline:
        - step-d1
"#;

    fn config() -> DeployConfig {
        DeployConfig::from_yaml_str(CONFIG).unwrap()
    }

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_failed_step_skips_rest_of_subtask_only() {
        let mut console = RecordingConsole::default();
        let mut runner = RecordingRunner::failing_on(&["fail"]);
        let environment = Environment::new(parse_env("ENV=prod\n"));

        let report = execute(
            &mut console,
            &mut runner,
            &environment,
            &config(),
            &names(&["build", "up"]),
            &Interrupt::default(),
        );

        // a3 と c2 は実行されない
        assert_eq!(
            runner.commands,
            names(&["step-a1 prod", "fail-a2", "step-b1", "step-d1"])
        );
        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(report.finished_count(), 2);
        assert_eq!(report.skipped_count(), 2);
        assert!(!report.all_finished());

        assert!(matches!(
            report.outcomes[0].status,
            SubtaskStatus::Skipped {
                step: 2,
                error: StepError::ExitCode(1)
            }
        ));
        assert!(matches!(
            report.outcomes[2].status,
            SubtaskStatus::Skipped {
                step: 1,
                error: StepError::Interpolation(_)
            }
        ));
        assert_eq!(report.outcomes[2].label(), "up/c");

        assert!(console.has_message(Severity::Warn, "build/a"));
        assert!(console.has_message(Severity::Success, "build/b"));
        assert!(console.has_message(Severity::Success, "タスク \"up\" が終了しました"));
    }

    #[test]
    fn test_reports_steps_with_one_based_index() {
        let mut console = RecordingConsole::default();
        let mut runner = RecordingRunner::default();
        let environment = Environment::default();
        let config = DeployConfig::from_yaml_str(
            "tasks:\n  t:\n    - title: s\n      pipeline:\n        - echo {env}\n        - echo done\n",
        )
        .unwrap();

        let report = execute(
            &mut console,
            &mut runner,
            &environment,
            &config,
            &names(&["t"]),
            &Interrupt::default(),
        );

        assert!(report.all_finished());
        assert_eq!(console.details, names(&["Step 1: echo latest", "Step 2: echo done"]));
    }

    #[test]
    fn test_tasks_run_in_selection_order() {
        let mut console = RecordingConsole::default();
        let mut runner = RecordingRunner::default();

        execute(
            &mut console,
            &mut runner,
            &Environment::default(),
            &config(),
            &names(&["up", "build"]),
            &Interrupt::default(),
        );

        assert_eq!(runner.commands.first().map(String::as_str), Some("step-d1"));
        assert_eq!(runner.commands.last().map(String::as_str), Some("step-b1"));
    }

    #[test]
    fn test_spawn_error_and_signal_are_isolated() {
        let mut console = RecordingConsole::default();
        let mut runner = RecordingRunner {
            spawn_error_on: names(&["step-a1"]),
            ..Default::default()
        };
        runner.codes.insert("step-b1".to_string(), None);

        let report = execute(
            &mut console,
            &mut runner,
            &Environment::default(),
            &config(),
            &names(&["build"]),
            &Interrupt::default(),
        );

        assert!(matches!(
            report.outcomes[0].status,
            SubtaskStatus::Skipped {
                error: StepError::Spawn(_),
                ..
            }
        ));
        assert!(matches!(
            report.outcomes[1].status,
            SubtaskStatus::Skipped {
                error: StepError::Terminated,
                ..
            }
        ));
    }

    #[test]
    fn test_empty_pipeline_finishes() {
        let mut console = RecordingConsole::default();
        let mut runner = RecordingRunner::default();
        let config = DeployConfig::from_yaml_str("tasks:\n  t:\n    - title: noop\n").unwrap();

        let report = execute(
            &mut console,
            &mut runner,
            &Environment::default(),
            &config,
            &names(&["t"]),
            &Interrupt::default(),
        );

        assert!(runner.commands.is_empty());
        assert!(report.all_finished());
    }

    #[test]
    fn test_shell_variables_pass_through_to_commands() {
        let config = DeployConfig::from_yaml_str(
            r#"
tasks:
  build:
    - title: shell
      pipeline:
        - docker build -t app:{env} --build-arg TOKEN=${TOKEN} .
        - echo {{env} $${HOME}
"#,
        )
        .unwrap();
        let mut console = RecordingConsole::default();
        let mut runner = RecordingRunner::default();
        let environment = Environment::new(parse_env("ENV=prod
TOKEN=secret
"));

        let report = execute(
            &mut console,
            &mut runner,
            &environment,
            &config,
            &names(&["build"]),
            &Interrupt::default(),
        );

        assert!(report.all_finished());
        // ${...} はシェルに任せる
        assert_eq!(
            runner.commands,
            names(&[
                "docker build -t app:prod --build-arg TOKEN=${TOKEN} .",
                "echo {env} $${HOME}",
            ])
        );
    }

    #[test]
    fn test_print_summary() {
        let mut console = RecordingConsole::default();
        let mut runner = RecordingRunner::failing_on(&["fail"]);
        let report = execute(
            &mut console,
            &mut runner,
            &Environment::default(),
            &config(),
            &names(&["build"]),
            &Interrupt::default(),
        );

        let mut summary = RecordingConsole::default();
        report.print_summary(&mut summary);

        assert!(summary.details.iter().any(|d| d.contains("Finished:      1")));
        assert!(summary.details.iter().any(|d| d.contains("Skipped:       1")));
        assert!(summary.has_message(Severity::Warn, "Step 2"));
    }

    #[test]
    fn test_interpolation_error_on_second_step_isolates_subtask() {
        let config = DeployConfig::from_yaml_str(
            r#"
tasks:
  release:
    - title: first
      pipeline:
        - echo first-1
        - echo first-2 {UNDEFINED}
        - echo first-3
    - title: second
      pipeline:
        - echo second-1 {env}
        - echo second-2
"#,
        )
        .unwrap();
        let mut console = RecordingConsole::default();
        let mut runner = RecordingRunner::default();

        let report = execute(
            &mut console,
            &mut runner,
            &Environment::default(),
            &config,
            &names(&["release"]),
            &Interrupt::default(),
        );

        assert_eq!(
            runner.commands,
            names(&["echo first-1", "echo second-1 latest", "echo second-2"])
        );
        assert!(matches!(
            report.outcomes[0].status,
            SubtaskStatus::Skipped {
                step: 2,
                error: StepError::Interpolation(_)
            }
        ));
        assert!(report.outcomes[1].is_finished());

        assert!(console.has_message(Severity::Error, "UNDEFINED"));
        assert!(console.has_message(Severity::Info, "サブタスク \"release/second\" を開始します"));
        assert!(console.has_message(
            Severity::Success,
            "サブタスク \"release/second\" が終了しました"
        ));
        assert!(console.has_message(Severity::Success, "タスク \"release\" が終了しました"));
    }

    #[test]
    fn test_interrupt_stops_after_running_step() {
        let interrupt = Interrupt::new();
        let mut console = RecordingConsole::default();
        let mut runner = RecordingRunner {
            on_run: Some(Box::new({
                let interrupt = interrupt.clone();
                move |command: &str| {
                    if command == "step-a1 latest" {
                        interrupt.request();
                    }
                }
            })),
            ..Default::default()
        };

        let report = execute(
            &mut console,
            &mut runner,
            &Environment::default(),
            &config(),
            &names(&["build", "up"]),
            &interrupt,
        );

        // 実行中のステップは完了させ、次のステップからは実行しない
        assert_eq!(runner.commands, names(&["step-a1 latest"]));
        assert!(report.interrupted);
        assert!(!report.all_finished());
        assert_eq!(report.outcomes.len(), 1);
        assert!(matches!(
            report.outcomes[0].status,
            SubtaskStatus::Interrupted { step: 2 }
        ));
        assert!(!console.has_message(Severity::Success, "タスク \"build\" が終了しました"));
        assert!(!console.has_message(Severity::Info, "タスク \"up\" を開始します"));
    }

    #[cfg(unix)]
    #[test]
    fn test_shell_runner_exit_codes() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut runner = ShellRunner::new(temp_dir.path());

        assert_eq!(runner.run("true").unwrap(), Some(0));
        assert_eq!(runner.run("exit 3").unwrap(), Some(3));

        // 作業ディレクトリはプロジェクトルート
        runner.run("touch marker").unwrap();
        assert!(temp_dir.path().join("marker").exists());
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(450)), "450ms");
        assert_eq!(format_duration(Duration::from_millis(2350)), "2.3s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }
}
