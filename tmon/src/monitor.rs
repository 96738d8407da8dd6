use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, Signal, sigaction};

use common::channel::{ChannelCommand, ChannelMessage, CommandChannel};

use crate::invoker;

/// Set by the SIGUSR1 handler, consumed by the polling loop. Coalescing is
/// inherent: two signals before a poll tick look like one.
static PENDING: AtomicBool = AtomicBool::new(false);

extern "C" fn on_wake(_: nix::libc::c_int) {
    PENDING.store(true, Ordering::SeqCst);
}

fn install_wake_handler() -> Result<()> {
    let action = SigAction::new(
        SigHandler::Handler(on_wake),
        SaFlags::SA_RESTART,
        SigSet::empty(),
    );
    unsafe { sigaction(Signal::SIGUSR1, &action) }?;
    Ok(())
}

fn take_pending() -> bool {
    PENDING.swap(false, Ordering::SeqCst)
}

/// What a received channel message asks of the monitor.
#[derive(Debug, PartialEq, Eq)]
pub enum Dispatch {
    /// Run the worker with the given action and forwarded params.
    Invoke {
        action: &'static str,
        params: Option<String>,
    },
    /// Begin the termination sequence.
    Stop,
    /// Reported, never fatal.
    Unknown(String),
}

/// Map a channel message onto a worker action. Params are forwarded as-is
/// for commands that take them and ignored for those that don't, since a
/// stale params file may linger in the channel.
pub fn plan(msg: &ChannelMessage) -> Dispatch {
    match ChannelCommand::from_wire(&msg.name) {
        Some(ChannelCommand::ListHunts) => Dispatch::Invoke {
            action: "list",
            params: None,
        },
        Some(ChannelCommand::ListTreasures) => Dispatch::Invoke {
            action: "show",
            params: msg.params.clone(),
        },
        Some(ChannelCommand::ViewTreasure) => Dispatch::Invoke {
            action: "view",
            params: msg.params.clone(),
        },
        Some(ChannelCommand::Stop) => Dispatch::Stop,
        None => Dispatch::Unknown(msg.name.clone()),
    }
}

/// The monitor's polling command loop.
///
/// Single-threaded by design: while a worker runs, no further command is
/// picked up, which is the only backpressure the channel has.
pub struct Monitor {
    channel: CommandChannel,
    worker_bin: PathBuf,
    poll: Duration,
    grace: Duration,
    exiting: bool,
}

impl Monitor {
    pub fn new(
        channel: CommandChannel,
        worker_bin: PathBuf,
        poll: Duration,
        grace: Duration,
    ) -> Self {
        Monitor {
            channel,
            worker_bin,
            poll,
            grace,
            exiting: false,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        install_wake_handler()?;
        println!("Monitor started (PID: {})", std::process::id());

        while !self.exiting {
            if take_pending() {
                self.handle_command();
            }
            thread::sleep(self.poll);
        }

        // Give the hub a chance to drain any response still sitting in the
        // result pipe before our exit closes its write end.
        println!("Monitor: delaying before exit...");
        thread::sleep(self.grace);
        println!("Monitor: exiting now");
        Ok(())
    }

    fn handle_command(&mut self) {
        let msg = match self.channel.receive() {
            Ok(msg) => msg,
            Err(e) => {
                tracing::error!("failed to read command channel: {e:#}");
                return;
            }
        };

        match plan(&msg) {
            Dispatch::Invoke { action, params } => {
                self.announce(action, params.as_deref());
                if let Some(code) = invoker::invoke(&self.worker_bin, action, params.as_deref())
                    && code != 0
                {
                    println!("Worker exited with status {code}");
                }
            }
            Dispatch::Stop => {
                println!("Monitor received stop command. Preparing to exit...");
                self.exiting = true;
            }
            Dispatch::Unknown(name) => {
                println!("Monitor: unknown command '{name}'");
            }
        }
    }

    fn announce(&self, action: &str, params: Option<&str>) {
        match (action, params) {
            ("list", _) => println!("Monitor: listing all hunts"),
            ("show", Some(hunt)) => println!("Monitor: listing treasures for hunt {hunt}"),
            ("view", Some(ids)) => println!("Monitor: viewing treasure ({ids})"),
            (action, _) => println!("Monitor: running worker action {action}"),
        }
    }
}
