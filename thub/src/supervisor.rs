use std::io::{self, ErrorKind, Read, Write};
use std::path::PathBuf;
use std::process::{ChildStdout, Command, Stdio};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use nix::fcntl::{FcntlArg, OFlag, fcntl};
use nix::unistd::Pid;
use std::os::fd::AsRawFd;

use common::channel::{ChannelCommand, CommandChannel};
use common::config;

use crate::reaper;

/// Monitor lifecycle as seen from the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    NotRunning,
    Running,
    /// `stop` was issued; the monitor is in its grace window.
    Exiting,
}

/// Owns the monitor's lifecycle, the sending side of the command channel and
/// the reading side of the result pipe. Updated only at defined points of the
/// hub's single-threaded loop; the SIGCHLD reaper never touches it directly.
pub struct Supervisor {
    state: MonitorState,
    pid: Option<Pid>,
    output: Option<ChildStdout>,
    channel: CommandChannel,
    monitor_bin: PathBuf,
    hunts_root: PathBuf,
    settle: Duration,
}

impl Supervisor {
    pub fn new(
        channel: CommandChannel,
        monitor_bin: PathBuf,
        hunts_root: PathBuf,
        settle: Duration,
    ) -> Self {
        Supervisor {
            state: MonitorState::NotRunning,
            pid: None,
            output: None,
            channel,
            monitor_bin,
            hunts_root,
            settle,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn monitor_active(&self) -> bool {
        !matches!(self.state, MonitorState::NotRunning)
    }

    /// Start the monitor with its stdout redirected into a fresh result
    /// pipe. Returns whether a monitor was actually started.
    pub fn start(&mut self) -> bool {
        if self.monitor_active() {
            match self.pid {
                Some(pid) => println!("Monitor is already running (PID: {pid})"),
                None => println!("Monitor is already running"),
            }
            return false;
        }

        match self.spawn_monitor() {
            Ok(pid) => {
                println!("Monitor started (PID: {pid})");
                true
            }
            Err(e) => {
                println!("Failed to start monitor: {e:#}");
                false
            }
        }
    }

    fn spawn_monitor(&mut self) -> Result<Pid> {
        let mut child = Command::new(&self.monitor_bin)
            .arg("--channel-dir")
            .arg(self.channel.dir())
            .env(config::HUNTS_ROOT_ENV, &self.hunts_root)
            .stdout(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {}", self.monitor_bin.display()))?;

        let stdout = child.stdout.take().context("monitor stdout was not piped")?;
        set_nonblocking(&stdout)?;

        let pid = Pid::from_raw(child.id() as i32);
        // The child could in principle exit before this registration; like
        // the rest of the channel, monitor startup is best-effort.
        reaper::watch(pid);
        self.pid = Some(pid);
        self.output = Some(stdout);
        self.state = MonitorState::Running;
        Ok(pid)
    }

    /// Ask the monitor to terminate. The state flips to Exiting immediately;
    /// NotRunning is only reached once the reaper observes the child exit.
    pub fn stop(&mut self) -> bool {
        if !self.guard("stop") {
            return false;
        }
        self.state = MonitorState::Exiting;
        self.send(ChannelCommand::Stop, None);
        self.drain_output();
        println!("Stopping monitor...");
        true
    }

    pub fn list_hunts(&mut self) -> bool {
        self.forward(ChannelCommand::ListHunts, None)
    }

    pub fn list_treasures(&mut self, hunt_id: &str) -> bool {
        self.forward(ChannelCommand::ListTreasures, Some(hunt_id.to_string()))
    }

    pub fn view_treasure(&mut self, hunt_id: &str, treasure_id: &str) -> bool {
        self.forward(
            ChannelCommand::ViewTreasure,
            Some(format!("{hunt_id} {treasure_id}")),
        )
    }

    fn forward(&mut self, cmd: ChannelCommand, params: Option<String>) -> bool {
        if !self.guard(cmd.wire_name()) {
            return false;
        }
        self.send(cmd, params.as_deref());
        self.drain_output();
        true
    }

    fn guard(&self, verb: &str) -> bool {
        match self.state {
            MonitorState::Running => true,
            MonitorState::NotRunning => {
                println!("Error: Monitor is not running");
                false
            }
            MonitorState::Exiting => {
                if verb == "stop" {
                    println!("Error: Monitor is already in the process of exiting");
                } else {
                    println!("Error: Monitor is in the process of exiting");
                }
                false
            }
        }
    }

    fn send(&mut self, cmd: ChannelCommand, params: Option<&str>) {
        // Channel I/O failure is logged and otherwise ignored; there is no
        // retry and no acknowledgement either way.
        if let Err(e) = self.channel.send(cmd.wire_name(), params, self.pid) {
            println!("Failed to send command to monitor: {e:#}");
        }
    }

    /// Bounded drain of the result pipe: give the monitor a settle interval
    /// to react, then read whatever has arrived. A response racing past the
    /// window shows up in the next drain instead.
    pub fn drain_output(&mut self) {
        let Some(output) = self.output.as_mut() else {
            return;
        };
        thread::sleep(self.settle);

        let mut stdout = io::stdout().lock();
        let mut buf = [0u8; 4096];
        loop {
            match output.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    let _ = stdout.write_all(&buf[..n]);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!("result pipe read failed: {e}");
                    break;
                }
            }
        }
        let _ = stdout.flush();
    }

    /// Called once per interactive iteration: if the reaper recorded the
    /// monitor's exit, drain any last output, report the status once and
    /// fall back to NotRunning.
    pub fn poll_exit(&mut self) {
        let Some(status) = reaper::take_exit() else {
            return;
        };
        self.drain_output();
        println!("Monitor has terminated with status {status}");
        self.pid = None;
        self.output = None;
        self.state = MonitorState::NotRunning;
    }
}

fn set_nonblocking(stdout: &ChildStdout) -> Result<()> {
    let fd = stdout.as_raw_fd();
    let flags = fcntl(fd, FcntlArg::F_GETFL).context("F_GETFL on result pipe failed")?;
    let flags = OFlag::from_bits_truncate(flags) | OFlag::O_NONBLOCK;
    fcntl(fd, FcntlArg::F_SETFL(flags)).context("F_SETFL on result pipe failed")?;
    Ok(())
}
