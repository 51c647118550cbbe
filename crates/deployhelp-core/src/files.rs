//! 生成ファイルの権限変更と削除

use std::io;
use std::path::Path;
use tracing::debug;

/// 全ユーザーに rwx を付与する
///
/// コンテナ内から作成・削除されるファイルでも扱えるようにするため。
#[cfg(unix)]
pub fn add_permissions(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    debug!(path = %path.display(), "Adding permissions");
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o777))
}

#[cfg(not(unix))]
pub fn add_permissions(path: &Path) -> io::Result<()> {
    let mut permissions = std::fs::metadata(path)?.permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    permissions.set_readonly(false);
    std::fs::set_permissions(path, permissions)
}

pub fn remove_file(path: &Path) -> io::Result<()> {
    debug!(path = %path.display(), "Removing file");
    std::fs::remove_file(path)
}
