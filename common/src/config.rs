use std::env;
use std::path::PathBuf;

/// Idle sleep of the monitor's polling loop.
pub const DEFAULT_POLL_MS: u64 = 100;
/// How long the hub waits before draining the result pipe after a send.
pub const DEFAULT_SETTLE_MS: u64 = 100;
/// How long the monitor lingers after accepting `stop`, so in-flight result
/// bytes can still be drained before the pipe's write end goes away.
pub const DEFAULT_GRACE_MS: u64 = 2000;

pub const HUNTS_ROOT_ENV: &str = "HUNTS_ROOT";
pub const CHANNEL_DIR_ENV: &str = "THUNT_CHANNEL_DIR";

/// Root directory holding one subdirectory per hunt.
pub fn default_hunts_root() -> PathBuf {
    env::var_os(HUNTS_ROOT_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("./hunts"))
}

/// Directory holding the command channel files.
pub fn default_channel_dir() -> PathBuf {
    env::var_os(CHANNEL_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Locate a helper binary next to the current executable, falling back to a
/// bare name so PATH lookup still works in ad hoc setups.
pub fn sibling_binary(name: &str) -> PathBuf {
    if let Ok(exe) = env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let candidate = dir.join(name);
        if candidate.exists() {
            return candidate;
        }
    }
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sibling_binary_falls_back_to_bare_name() {
        let path = sibling_binary("definitely-not-a-real-binary");
        assert_eq!(path, PathBuf::from("definitely-not-a-real-binary"));
    }
}
