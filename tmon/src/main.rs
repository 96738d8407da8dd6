use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use common::channel::CommandChannel;
use common::config;
use tmon::monitor::Monitor;

#[derive(Parser)]
#[command(name = "tmon", version, about = "Treasure hunt monitor daemon")]
struct Cli {
    /// Directory holding the command channel files
    #[arg(long, value_name = "DIR")]
    channel_dir: Option<PathBuf>,

    /// Worker binary dispatched for received commands
    #[arg(long, value_name = "PATH")]
    worker_bin: Option<PathBuf>,

    /// Idle sleep between polls of the pending-command flag
    #[arg(long, value_name = "MS", default_value_t = config::DEFAULT_POLL_MS)]
    poll_ms: u64,

    /// Delay between accepting `stop` and actually exiting
    #[arg(long, value_name = "MS", default_value_t = config::DEFAULT_GRACE_MS)]
    grace_ms: u64,
}

fn main() -> anyhow::Result<()> {
    // Stdout is the result pipe back to the hub; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let channel = CommandChannel::new(cli.channel_dir.unwrap_or_else(config::default_channel_dir));
    let worker_bin = cli
        .worker_bin
        .unwrap_or_else(|| config::sibling_binary("tman"));

    Monitor::new(
        channel,
        worker_bin,
        Duration::from_millis(cli.poll_ms),
        Duration::from_millis(cli.grace_ms),
    )
    .run()
}
