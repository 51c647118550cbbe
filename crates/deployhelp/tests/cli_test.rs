#![allow(deprecated)] // TODO: cargo_bin → cargo_bin_cmd! へ移行

mod common;

use assert_cmd::Command;
use common::TestProject;
use predicates::prelude::*;

const CONFIG: &str = r#"
context:
  env_file: .env
tasks:
  build:
    - title: echo
      pipeline:
        - echo {env}
  check:
    - title: broken
      pipeline:
        - exit 3
        - echo never
    - title: after
      pipeline:
        - echo after-{env}
"#;

const TEMPLATE: &str = r#"
services:
  web:
    image: shop-web:{env}
    depends_on:
      - db
  db:
    image: postgres:16
"#;

fn deployhelp() -> Command {
    let mut cmd = Command::cargo_bin("deployhelp").unwrap();
    cmd.env_remove("DEPLOYHELP_DIR").env_remove("RUST_LOG");
    cmd
}

fn project() -> TestProject {
    let project = TestProject::new();
    project.write_deploy_file("config.yml", CONFIG);
    project.write_deploy_file("docker-compose-template.j2", TEMPLATE);
    project
}

/// CLIヘルプが正しく表示されることを確認
#[test]
fn test_cli_help() {
    deployhelp()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("deploy"))
        .stdout(predicate::str::contains("quickstart"))
        .stdout(predicate::str::contains("version"));
}

/// バージョン表示が正しく動作することを確認
#[test]
fn test_cli_version() {
    deployhelp()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("deployhelp"));
}

/// deployコマンドのヘルプにフラグが表示されることを確認
#[test]
fn test_deploy_help() {
    deployhelp()
        .arg("deploy")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--deploydir"))
        .stdout(predicate::str::contains("--task"))
        .stdout(predicate::str::contains("--target"))
        .stdout(predicate::str::contains("--skip-engine-check"));
}

/// 不正なコマンドでエラーになることを確認
#[test]
fn test_invalid_command() {
    deployhelp().arg("invalid-command").assert().failure();
}

/// サイレントモードで最初のタスクが実行され、生成ファイルが削除されることを確認
#[cfg(unix)]
#[test]
fn test_silent_deploy() {
    let project = project();

    deployhelp()
        .current_dir(project.path())
        .args(["deploy", "--silent", "--skip-engine-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("latest"));

    assert!(!project.path().join("deploy/docker-compose-latest.yml").exists());
}

/// 失敗したサブタスクの後も次のサブタスクが実行されることを確認
#[cfg(unix)]
#[test]
fn test_failed_subtask_is_isolated() {
    let project = project();
    project.write_env("ENV=stg\n");

    deployhelp()
        .current_dir(project.path())
        .args(["deploy", "-s", "--skip-engine-check", "-t", "check", "-T", "web"])
        .assert()
        .success()
        .stdout(predicate::str::contains("after-stg"))
        .stdout(predicate::str::contains("never").not());

    assert!(!project.path().join("deploy/docker-compose-stg.yml").exists());
}

/// フラグで両方指定した場合は確認なしで実行されることを確認
#[cfg(unix)]
#[test]
fn test_explicit_selection_runs_without_prompt() {
    let project = project();

    deployhelp()
        .current_dir(project.path())
        .args(["deploy", "--skip-engine-check", "--task", "build", "--target", "web,db"])
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::contains("Step 1: echo latest"));
}

/// 確認で no と答えると中断されることを確認
#[test]
fn test_declined_deploy_is_interrupted() {
    let project = project();

    deployhelp()
        .current_dir(project.path())
        .args(["deploy", "--skip-engine-check"])
        .write_stdin("\n\nno\n")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("中断しました"));

    assert!(!project.path().join("deploy/docker-compose-latest.yml").exists());
}

/// タスクが無い場合は中断されることを確認
#[test]
fn test_deploy_without_tasks() {
    let project = TestProject::new();
    project.write_deploy_file("config.yml", "tasks: {}\n");
    project.write_deploy_file("docker-compose-template.j2", TEMPLATE);

    deployhelp()
        .current_dir(project.path())
        .args(["deploy", "-s", "--skip-engine-check"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("タスクが見つかりません"));
}

/// DEPLOYHELP_DIR でデプロイディレクトリを変更できることを確認
#[cfg(unix)]
#[test]
fn test_deploy_dir_from_env() {
    let project = TestProject::new();
    let dir = project.path().join("ops");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("config.yml"), CONFIG).unwrap();
    std::fs::write(dir.join("docker-compose-template.j2"), TEMPLATE).unwrap();

    deployhelp()
        .current_dir(project.path())
        .env("DEPLOYHELP_DIR", "ops")
        .args(["deploy", "-s", "--skip-engine-check"])
        .assert()
        .success()
        .stdout(predicate::str::contains("latest"));
}

/// エンジンが見つからない場合は中断されることを確認
#[test]
fn test_engine_unavailable() {
    let project = project();

    deployhelp()
        .current_dir(project.path())
        .env("DOCKER_BIN", "deployhelp-no-such-engine")
        .args(["deploy", "-s"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("コンテナエンジンが利用できません"));
}

/// quickstart で作成したファイルがそのまま deploy で使えることを確認
#[test]
fn test_quickstart_silent() {
    let project = TestProject::new();

    deployhelp()
        .current_dir(project.path())
        .args(["quickstart", "--silent", "--name", "shop"])
        .assert()
        .success();

    let deploy = project.path().join("deploy");
    assert!(deploy.join("config.yml").exists());
    assert!(deploy.join("Dockerfile").exists());

    let template = std::fs::read_to_string(deploy.join("docker-compose-template.j2")).unwrap();
    assert!(template.contains("shop-{env}"));

    let config = std::fs::read_to_string(deploy.join("config.yml")).unwrap();
    assert!(config.contains("docker compose -f deploy/docker-compose-{env}.yml up -d"));
}

/// Ctrl-C を受けても実行中のステップは最後まで走り、残りは実行せず生成ファイルを削除することを確認
#[cfg(unix)]
#[test]
fn test_ctrl_c_waits_for_running_step() {
    use std::process::Stdio;
    use std::time::{Duration, Instant};

    let config = r#"
tasks:
  build:
    - title: slow
      pipeline:
        - sleep 2 && touch finished
        - touch never-1
    - title: next
      pipeline:
        - touch never-2
"#;
    let project = TestProject::new();
    project.write_deploy_file("config.yml", config);
    project.write_deploy_file("docker-compose-template.j2", TEMPLATE);
    let generated = project.path().join("deploy/docker-compose-latest.yml");

    let mut child = std::process::Command::new(assert_cmd::cargo::cargo_bin("deployhelp"))
        .current_dir(project.path())
        .env_remove("DEPLOYHELP_DIR")
        .env_remove("RUST_LOG")
        .args(["deploy", "-s", "--skip-engine-check"])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    let deadline = Instant::now() + Duration::from_secs(10);
    while !generated.exists() {
        assert!(Instant::now() < deadline, "compose file was never written");
        std::thread::sleep(Duration::from_millis(20));
    }
    std::thread::sleep(Duration::from_millis(200));

    let status = std::process::Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());

    let status = child.wait().unwrap();
    assert_eq!(status.code(), Some(130));
    assert!(project.path().join("finished").exists());
    assert!(!project.path().join("never-1").exists());
    assert!(!project.path().join("never-2").exists());
    assert!(!generated.exists());
}
