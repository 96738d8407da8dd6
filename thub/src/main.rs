use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use common::channel::CommandChannel;
use common::config;
use thub::repl::Hub;
use thub::{reaper, supervisor::Supervisor};

#[derive(Parser)]
#[command(name = "thub", version, about = "Interactive treasure hunt hub")]
struct Cli {
    /// Root directory holding one subdirectory per hunt
    #[arg(long, value_name = "DIR")]
    hunts_root: Option<PathBuf>,

    /// Directory holding the command channel files
    #[arg(long, value_name = "DIR")]
    channel_dir: Option<PathBuf>,

    /// Monitor binary started by `start_monitor`
    #[arg(long, value_name = "PATH")]
    monitor_bin: Option<PathBuf>,

    /// Score reducer binary used by `calculate_score`
    #[arg(long, value_name = "PATH")]
    score_bin: Option<PathBuf>,

    /// Delay before draining the result pipe after each command
    #[arg(long, value_name = "MS", default_value_t = config::DEFAULT_SETTLE_MS)]
    settle_ms: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    reaper::install()?;

    let hunts_root = cli.hunts_root.unwrap_or_else(config::default_hunts_root);
    let channel = CommandChannel::new(cli.channel_dir.unwrap_or_else(config::default_channel_dir));
    let monitor_bin = cli
        .monitor_bin
        .unwrap_or_else(|| config::sibling_binary("tmon"));
    let score_bin = cli
        .score_bin
        .unwrap_or_else(|| config::sibling_binary("tscore"));

    let supervisor = Supervisor::new(
        channel,
        monitor_bin,
        hunts_root.clone(),
        Duration::from_millis(cli.settle_ms),
    );
    Hub::new(supervisor, hunts_root, score_bin).run()
}
