mod commands;
mod terminal;

use clap::{Parser, Subcommand};
use deployhelp_config::{DEFAULT_DEPLOY_DIR, DEPLOY_DIR_ENV};
use deployhelp_core::{DEFAULT_DOCKER_BIN, DOCKER_BIN_ENV};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "deployhelp")]
#[command(version)]
#[command(
    about = "compose テンプレートを展開し、選んだタスクとターゲットでデプロイする",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// タスクとターゲットを選んでデプロイ
    Deploy {
        /// デプロイディレクトリ（config.yml と compose テンプレートの置き場所）
        #[arg(short = 'd', long = "deploydir", env = DEPLOY_DIR_ENV, default_value = DEFAULT_DEPLOY_DIR)]
        deploy_dir: PathBuf,
        /// 対話せず既定値で実行する
        #[arg(short, long)]
        silent: bool,
        /// 実行するタスク（複数指定・カンマ区切り可、all で全タスク）
        #[arg(short = 't', long = "task", value_delimiter = ',')]
        tasks: Vec<String>,
        /// 対象サービス（複数指定・カンマ区切り可、all で全サービス）
        #[arg(short = 'T', long = "target", value_delimiter = ',')]
        targets: Vec<String>,
        /// コンテナエンジンの事前チェックを省略する
        #[arg(long)]
        skip_engine_check: bool,
        /// コンテナエンジンのバイナリ
        #[arg(long, env = DOCKER_BIN_ENV, default_value = DEFAULT_DOCKER_BIN)]
        docker_bin: String,
    },
    /// デプロイディレクトリの雛形を作成
    Quickstart {
        /// 対話せず既定値で作成する
        #[arg(short, long)]
        silent: bool,
        /// プロジェクト名（デフォルト: カレントディレクトリ名）
        #[arg(long)]
        name: Option<String>,
        /// 作成先のディレクトリ（デフォルト: deploy）
        #[arg(short = 'd', long = "deploydir")]
        deploy_dir: Option<String>,
    },
    /// バージョン情報を表示
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // 診断ログは stderr（RUST_LOG で制御）
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match cli.command {
        Commands::Deploy {
            deploy_dir,
            silent,
            tasks,
            targets,
            skip_engine_check,
            docker_bin,
        } => {
            let engine = (!skip_engine_check).then_some(docker_bin);
            commands::deploy::handle(deploy_dir, silent, tasks, targets, engine).await?;
        }
        Commands::Quickstart {
            silent,
            name,
            deploy_dir,
        } => {
            commands::quickstart::handle(silent, name, deploy_dir).await?;
        }
        Commands::Version => {
            println!("deployhelp {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
