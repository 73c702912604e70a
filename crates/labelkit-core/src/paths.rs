use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment variable overriding the app directory (primarily for tests
/// and portable installs).
pub const HOME_ENV_VAR: &str = "LABELKIT_HOME";

/// Resolve the app directory: `LABELKIT_HOME` if set, otherwise the
/// directory containing the running executable.
///
/// The runtime environment lives directly under this directory, and it is
/// the working directory the annotation tool is launched with.
pub fn app_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV_VAR)
        && !home.is_empty()
    {
        return Ok(PathBuf::from(home));
    }
    let exe = std::env::current_exe().context("Failed to locate the running executable")?;
    let dir = exe
        .parent()
        .context("Executable path has no parent directory")?;
    Ok(dir.to_path_buf())
}

/// Directory of the named runtime environment under the app dir.
pub fn env_dir(app_dir: &Path, env_name: &str) -> PathBuf {
    app_dir.join(env_name)
}

/// Platform binary directory inside an environment
/// (`Scripts` on Windows, `bin` elsewhere).
pub fn bin_dir(env_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        env_dir.join("Scripts")
    } else {
        env_dir.join("bin")
    }
}

/// Path of the environment's interpreter binary.
pub fn interpreter_path(env_dir: &Path) -> PathBuf {
    if cfg!(windows) {
        env_dir.join("python.exe")
    } else {
        env_dir.join("bin").join("python")
    }
}

/// Path of the annotation tool executable inside an environment.
pub fn tool_executable(env_dir: &Path, executable: &str) -> PathBuf {
    bin_dir(env_dir).join(format!("{executable}{}", std::env::consts::EXE_SUFFIX))
}

/// True when both the environment directory and the tool executable exist.
///
/// This is the idempotent fast-path check: when it holds, provisioning is
/// skipped entirely and the tool is launched directly.
pub fn tool_installed(env_dir: &Path, executable: &str) -> bool {
    env_dir.is_dir() && tool_executable(env_dir, executable).is_file()
}
