use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Command, ExitStatus};

/// Spawn the worker with `[action, params...]` and wait for it to finish.
///
/// Params are whitespace-split into positional argv items; an id containing
/// spaces would be mis-parsed, which is a documented limitation of the argv
/// contract, not something guarded here. The worker inherits our stdout, so
/// when we run under the monitor its output flows down the result pipe.
///
/// Returns the classified exit code, or `None` when the process could not be
/// created at all (logged, treated as a no-op completion by callers).
pub fn invoke(worker_bin: &Path, action: &str, params: Option<&str>) -> Option<i32> {
    let mut cmd = Command::new(worker_bin);
    cmd.arg(action);
    if let Some(params) = params {
        cmd.args(params.split_whitespace());
    }

    match cmd.status() {
        Ok(status) => Some(exit_code(status)),
        Err(e) => {
            tracing::error!(worker = %worker_bin.display(), action, "failed to spawn worker: {e}");
            None
        }
    }
}

/// Normal exit maps to its code; signal termination maps to 128 + signo.
pub fn exit_code(status: ExitStatus) -> i32 {
    match status.code() {
        Some(code) => code,
        None => 128 + status.signal().unwrap_or(0),
    }
}
