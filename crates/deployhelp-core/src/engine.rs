//! コンテナエンジンの事前チェック

use crate::error::{DeployError, Result};
use std::process::{Command, Stdio};
use tracing::{debug, info, instrument};

/// エンジンのバイナリを指定する環境変数
pub const DOCKER_BIN_ENV: &str = "DOCKER_BIN";

pub const DEFAULT_DOCKER_BIN: &str = "docker";

/// スタンドアロン版 compose のバイナリ
const LEGACY_COMPOSE_BIN: &str = "docker-compose";

/// 利用可能なエンジン
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineInfo {
    pub binary: String,
    pub version: String,
    pub compose_version: String,
}

/// エンジンと compose が使えることを確認する
///
/// `<binary> compose version` が失敗した場合は `docker-compose --version` を試す。
#[instrument]
pub fn check(binary: &str) -> Result<EngineInfo> {
    let version = query_version(binary, &["--version"])
        .ok_or_else(|| DeployError::EngineUnavailable(format!("{} --version", binary)))?;

    let compose_version = query_version(binary, &["compose", "version"])
        .or_else(|| {
            debug!("Falling back to standalone docker-compose");
            query_version(LEGACY_COMPOSE_BIN, &["--version"])
        })
        .ok_or_else(|| {
            DeployError::EngineUnavailable(format!(
                "{} compose version / {} --version",
                binary, LEGACY_COMPOSE_BIN
            ))
        })?;

    info!(%version, %compose_version, "Container engine available");
    Ok(EngineInfo {
        binary: binary.to_string(),
        version,
        compose_version,
    })
}

/// 成功すれば標準出力の1行目を返す
fn query_version(binary: &str, args: &[&str]) -> Option<String> {
    let output = Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .ok()?;

    if !output.status.success() {
        debug!(binary, ?args, status = ?output.status, "Version query failed");
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    Some(stdout.lines().next().unwrap_or_default().trim().to_string())
}
