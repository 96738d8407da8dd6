use std::io;
use std::path::PathBuf;

use clap::{Parser, Subcommand};

use common::config;
use common::store::HuntStore;
use tman::ops;

#[derive(Parser)]
#[command(name = "tman", version, about = "Treasure hunt worker: one record action per invocation")]
struct Cli {
    /// Root directory holding one subdirectory per hunt
    #[arg(long, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all hunts with their active treasure counts
    List,
    /// Show a hunt's active treasures
    Show {
        #[arg(value_name = "HUNT_ID")]
        hunt_id: String,
    },
    /// View one treasure in full
    View {
        #[arg(value_name = "HUNT_ID")]
        hunt_id: String,
        #[arg(value_name = "TREASURE_ID")]
        treasure_id: u32,
    },
    /// Add a treasure to a hunt, prompting for its fields
    Add {
        #[arg(value_name = "HUNT_ID")]
        hunt_id: String,
    },
    /// Remove a treasure (the record is kept, marked inactive)
    #[command(name = "remove_treasure")]
    RemoveTreasure {
        #[arg(value_name = "HUNT_ID")]
        hunt_id: String,
        #[arg(value_name = "TREASURE_ID")]
        treasure_id: u32,
    },
    /// Remove a hunt and everything in it
    #[command(name = "remove_hunt")]
    RemoveHunt {
        #[arg(value_name = "HUNT_ID")]
        hunt_id: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let store = HuntStore::new(cli.root.unwrap_or_else(config::default_hunts_root));
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::List => ops::list(&store, &mut out),
        Commands::Show { hunt_id } => ops::show(&store, &hunt_id, &mut out),
        Commands::View {
            hunt_id,
            treasure_id,
        } => ops::view(&store, &hunt_id, treasure_id, &mut out),
        Commands::Add { hunt_id } => {
            let mut input = io::stdin().lock();
            ops::add(&store, &hunt_id, &mut input, &mut out)
        }
        Commands::RemoveTreasure {
            hunt_id,
            treasure_id,
        } => ops::remove_treasure(&store, &hunt_id, treasure_id, &mut out),
        Commands::RemoveHunt { hunt_id } => ops::remove_hunt(&store, &hunt_id, &mut out),
    }
}
