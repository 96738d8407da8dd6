use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;

use crate::score;
use crate::supervisor::Supervisor;

const AVAILABLE: &str = "Available commands: start_monitor, list_hunts, list_treasures, \
                         view_treasure, calculate_score, stop_monitor, exit";

/// The interactive command surface: a supervisor plus the bits the hub needs
/// for the score fan-out.
pub struct Hub {
    pub supervisor: Supervisor,
    hunts_root: PathBuf,
    score_bin: PathBuf,
}

impl Hub {
    pub fn new(supervisor: Supervisor, hunts_root: PathBuf, score_bin: PathBuf) -> Self {
        Hub {
            supervisor,
            hunts_root,
            score_bin,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        println!("Treasure Hunt Hub");
        println!("=================");
        println!("Type 'start_monitor' to begin");

        let stdin = io::stdin();
        let mut line = String::new();
        loop {
            // Deferred consequence of a SIGCHLD: report a monitor exit once,
            // at the top of the iteration, never from the handler itself.
            self.supervisor.poll_exit();

            print!("> ");
            io::stdout().flush()?;

            line.clear();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => {
                    println!();
                    println!("End of input. Exiting.");
                    break;
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::error!("failed to read command: {e}");
                    continue;
                }
            }

            if !self.process_line(&line) {
                break;
            }
        }
        Ok(())
    }

    /// Handle one input line. Returns false when the hub should exit.
    pub fn process_line(&mut self, line: &str) -> bool {
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return true;
        };

        match command {
            "start_monitor" => {
                self.supervisor.start();
            }
            "list_hunts" => {
                self.supervisor.list_hunts();
            }
            "list_treasures" => match parts.next() {
                Some(hunt_id) => {
                    self.supervisor.list_treasures(hunt_id);
                }
                None => {
                    println!("Error: Missing hunt ID");
                    println!("Usage: list_treasures <hunt_id>");
                }
            },
            "view_treasure" => match (parts.next(), parts.next()) {
                (Some(hunt_id), Some(treasure_id)) => {
                    self.supervisor.view_treasure(hunt_id, treasure_id);
                }
                _ => {
                    println!("Error: Missing hunt ID or treasure ID");
                    println!("Usage: view_treasure <hunt_id> <treasure_id>");
                }
            },
            "calculate_score" => score::calculate_score(&self.hunts_root, &self.score_bin),
            "stop_monitor" => {
                self.supervisor.stop();
            }
            "exit" => {
                if self.supervisor.monitor_active() {
                    println!("Error: Monitor is still running. Stop it first with 'stop_monitor'");
                } else {
                    println!("Exiting treasure hub");
                    return false;
                }
            }
            other => {
                println!("Unknown command: {other}");
                println!("{AVAILABLE}");
            }
        }
        true
    }
}
