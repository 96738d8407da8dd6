use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

/// File holding the most recently sent command name.
pub const COMMAND_FILE: &str = "monitor_command.txt";
/// File holding the params of the most recently sent command, if any.
pub const PARAM_FILE: &str = "monitor_params.txt";

/// Commands the hub may place in the channel for the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelCommand {
    ListHunts,
    ListTreasures,
    ViewTreasure,
    Stop,
}

impl ChannelCommand {
    pub fn wire_name(&self) -> &'static str {
        match self {
            ChannelCommand::ListHunts => "list_hunts",
            ChannelCommand::ListTreasures => "list_treasures",
            ChannelCommand::ViewTreasure => "view_treasure",
            ChannelCommand::Stop => "stop",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "list_hunts" => Some(ChannelCommand::ListHunts),
            "list_treasures" => Some(ChannelCommand::ListTreasures),
            "view_treasure" => Some(ChannelCommand::ViewTreasure),
            "stop" => Some(ChannelCommand::Stop),
            _ => None,
        }
    }
}

/// A command as read back from the channel. The name is kept as raw text so
/// the receiver can report unrecognized commands instead of failing on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelMessage {
    pub name: String,
    pub params: Option<String>,
}

/// One-slot file mailbox paired with a SIGUSR1 wake-up.
///
/// The command name and its params live in two independent files; a sender
/// always overwrites whatever is currently stored (last-writer-wins, no
/// queueing, no acknowledgement). The two writes are not atomic as a pair:
/// a receiver racing a sender can observe a fresh command with stale params.
/// That window is part of the protocol, so no locking is done here.
#[derive(Debug, Clone)]
pub struct CommandChannel {
    dir: PathBuf,
}

impl CommandChannel {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        CommandChannel { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn command_path(&self) -> PathBuf {
        self.dir.join(COMMAND_FILE)
    }

    pub fn params_path(&self) -> PathBuf {
        self.dir.join(PARAM_FILE)
    }

    /// Persist `name` (and `params` when present) in the slot, then wake the
    /// receiver if its pid is known. The params file is only touched when
    /// params are given; a previous params file may therefore linger and the
    /// receiver must only consult it for commands that take params.
    pub fn send(&self, name: &str, params: Option<&str>, receiver: Option<Pid>) -> Result<()> {
        fs::write(self.command_path(), name).with_context(|| {
            format!("failed to write command file {}", self.command_path().display())
        })?;

        if let Some(params) = params {
            fs::write(self.params_path(), params).with_context(|| {
                format!("failed to write params file {}", self.params_path().display())
            })?;
        }

        if let Some(pid) = receiver
            && let Err(e) = kill(pid, Signal::SIGUSR1)
        {
            // The receiver may have died between our liveness check and the
            // kill. The slot stays written either way.
            tracing::warn!(%pid, "failed to notify channel receiver: {e}");
        }

        Ok(())
    }

    /// Non-blocking read of the slot. Returns whatever was stored most
    /// recently; an absent params file means the command carries no params.
    pub fn receive(&self) -> Result<ChannelMessage> {
        let name = fs::read_to_string(self.command_path()).with_context(|| {
            format!("failed to read command file {}", self.command_path().display())
        })?;
        let name = first_line(&name);

        let params = match fs::read_to_string(self.params_path()) {
            Ok(raw) => {
                let line = first_line(&raw);
                if line.is_empty() { None } else { Some(line) }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                return Err(e).with_context(|| {
                    format!("failed to read params file {}", self.params_path().display())
                });
            }
        };

        Ok(ChannelMessage { name, params })
    }
}

fn first_line(raw: &str) -> String {
    raw.lines().next().unwrap_or("").trim_end().to_string()
}
