use anyhow::{bail, Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Resolve a tool binary: paths containing a separator are used as-is,
/// bare names are searched on PATH.
pub fn find(name: &str) -> Option<PathBuf> {
    if name.contains(std::path::MAIN_SEPARATOR) {
        let path = PathBuf::from(name);
        return path.is_file().then_some(path);
    }
    find_in_path(name)
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    std::env::var_os("PATH").and_then(|paths| {
        std::env::split_paths(&paths)
            .map(|dir| dir.join(name))
            .find(|path| path.is_file())
    })
}

/// Like `find`, but a missing tool is an error naming the config key that
/// points at it.
pub fn require(name: &str, config_key: &str) -> Result<PathBuf> {
    find(name).with_context(|| {
        format!("{name} not found on PATH (set `{config_key}` in config to point at it)")
    })
}

/// Run a command to completion and return its stdout. A non-zero exit is an
/// error carrying the command's stderr.
pub fn run(cmd: &mut Command) -> Result<Vec<u8>> {
    run_with_input(cmd, None)
}

/// `run`, feeding `input` on stdin.
pub fn run_with_input(cmd: &mut Command, input: Option<&[u8]>) -> Result<Vec<u8>> {
    let program = describe(cmd);

    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    if input.is_some() {
        cmd.stdin(Stdio::piped());
    }

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to run {program}"))?;

    if let Some(input) = input {
        let mut stdin = child
            .stdin
            .take()
            .with_context(|| format!("{program}: stdin unavailable"))?;
        stdin
            .write_all(input)
            .with_context(|| format!("writing to {program}"))?;
    }

    let output = child
        .wait_with_output()
        .with_context(|| format!("waiting for {program}"))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "{} exited with status {}: {}",
            program,
            output.status,
            stderr.trim()
        );
    }

    Ok(output.stdout)
}

fn describe(cmd: &Command) -> String {
    let program = Path::new(cmd.get_program())
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let args: Vec<String> = cmd
        .get_args()
        .take(2)
        .map(|a| a.to_string_lossy().into_owned())
        .collect();
    format!("`{} {}`", program, args.join(" "))
}
