use std::env;
use std::ffi::OsString;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Finds programs the way `execvp` does, without running them.
pub struct PathResolver {
    path: Option<OsString>,
}

impl PathResolver {
    pub fn from_env() -> Self {
        PathResolver { path: env::var_os("PATH") }
    }

    pub fn with_path(path: impl Into<OsString>) -> Self {
        PathResolver { path: Some(path.into()) }
    }

    pub fn resolve(&self, command: &str) -> Option<PathBuf> {
        if command.is_empty() {
            return None;
        }

        if command.contains('/') {
            let path = Path::new(command);
            return is_executable(path).then(|| path.to_path_buf());
        }

        let paths = self.path.as_ref()?;
        env::split_paths(paths)
            .map(|dir| dir.join(command))
            .find(|full_path| is_executable(full_path))
    }
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}
