//! Build-script runner subprocess invocation (`spec.md` §4.4.3).
//!
//! Synchronously spawns the configured compiler executable to query a build
//! script's packages and include directories. Modeled on the `Command`
//! invocations `loctree::snapshot::get_git_info` makes for `git` — capture
//! stdout, check exit status, treat any I/O error or nonzero exit as a
//! swallowed, logged failure at the call site (`spec.md` §4.4.2: "Runner
//! failures are logged but do not fail descriptor creation").

use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use serde::Deserialize;
use url::Url;

use crate::build_file::{BuildFileConfig, BuildOption, PackageRecord};
use crate::config::StoreConfig;
use crate::error::Error;
use crate::uri::path_to_uri;

#[derive(Debug, Deserialize)]
struct RunnerPackage {
    name: String,
    path: String,
}

#[derive(Debug, Deserialize)]
struct RunnerOutput {
    #[serde(default)]
    packages: Vec<RunnerPackage>,
    #[serde(default)]
    include_dirs: Vec<String>,
}

/// Invoke the build-script runner for `build_file_path` and parse its JSON
/// output into a [`BuildFileConfig`].
///
/// Returns `Err` for any reason the runner could not be consulted
/// (unconfigured compiler, spawn failure, nonzero exit, malformed JSON).
/// Callers treat every `Err` the same way: log and fall back to an empty
/// configuration.
pub fn run_build_runner(
    config: &StoreConfig,
    build_file_path: &Path,
    build_options: &[BuildOption],
) -> Result<BuildFileConfig, Error> {
    let zig_exe = config
        .zig_exe_path
        .as_ref()
        .ok_or_else(|| Error::RunFailed("zig_exe_path is not configured".to_string()))?;
    let build_runner = config
        .build_runner_path
        .as_ref()
        .ok_or_else(|| Error::RunFailed("build_runner_path is not configured".to_string()))?;
    let global_cache = config
        .global_cache_path
        .as_ref()
        .ok_or_else(|| Error::RunFailed("global_cache_path is not configured".to_string()))?;

    let script_directory = build_file_path
        .parent()
        .ok_or_else(|| Error::RunFailed(format!("{} has no parent directory", build_file_path.display())))?;

    let mut cmd = Command::new(zig_exe);
    cmd.arg("run")
        .arg(build_runner)
        .arg("--cache-dir")
        .arg(global_cache)
        .arg("--pkg-begin")
        .arg("@build@")
        .arg(build_file_path)
        .arg("--pkg-end")
        .arg("--")
        .arg(zig_exe)
        .arg(script_directory)
        .arg(StoreConfig::LOCAL_CACHE_ROOT)
        .arg(StoreConfig::GLOBAL_CACHE_ROOT)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    for option in build_options {
        cmd.arg(&option.flag);
        if let Some(value) = &option.value {
            cmd.arg(value);
        }
    }

    let output = cmd
        .output()
        .map_err(|e| Error::RunFailed(format!("failed to spawn {}: {e}", zig_exe.display())))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::RunFailed(format!(
            "runner exited with {}: {stderr}",
            output.status
        )));
    }

    let parsed: RunnerOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| Error::RunFailed(format!("malformed runner output: {e}")))?;

    let mut packages = Vec::with_capacity(parsed.packages.len());
    for pkg in parsed.packages {
        let abs = resolve_against(script_directory, &pkg.path);
        let uri = path_to_uri(&abs)?;
        packages.push(PackageRecord { name: pkg.name, uri });
    }

    Ok(BuildFileConfig {
        packages,
        include_dirs: parsed.include_dirs.into_iter().map(PathBuf::from).collect(),
    })
}

fn resolve_against(base: &Path, maybe_relative: &str) -> PathBuf {
    let candidate = Path::new(maybe_relative);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}
