//! Score fan-out: one reducer subprocess per hunt directory.
//!
//! Bounded sequential iteration, one pipe pair per child; a failing hunt is
//! reported and the remaining hunts still run.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result};

use common::store::HuntStore;

pub fn calculate_score(hunts_root: &Path, score_bin: &Path) {
    let store = HuntStore::new(hunts_root);
    let hunts = match store.list_hunts() {
        Ok(hunts) => hunts,
        Err(e) => {
            println!("Failed to read hunts directory: {e:#}");
            return;
        }
    };

    println!("Calculating scores for all hunts...");
    for hunt in hunts {
        if let Err(e) = score_one(&store, score_bin, &hunt) {
            println!("Score calculation for hunt '{hunt}' failed: {e:#}");
        }
    }
    println!("Score calculation complete.");
}

/// Feed one hunt's active records to the reducer as `name,value,owner` lines
/// and echo whatever it prints back.
fn score_one(store: &HuntStore, score_bin: &Path, hunt: &str) -> Result<()> {
    let treasures = store.load(hunt)?;

    let mut child = Command::new(score_bin)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {}", score_bin.display()))?;

    {
        let mut stdin = child.stdin.take().context("score stdin was not piped")?;
        for t in treasures.iter().filter(|t| t.active) {
            writeln!(stdin, "{},{},{}", t.id, t.value, t.username)?;
        }
        // Dropping the handle closes the pipe so the reducer sees EOF.
    }

    let mut output = String::new();
    child
        .stdout
        .take()
        .context("score stdout was not piped")?
        .read_to_string(&mut output)?;

    // The hub's SIGCHLD reaper may have collected this child already; a
    // failed wait here just means it raced us.
    let _ = child.wait();

    println!("Scores for hunt '{hunt}':");
    print!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::store::Treasure;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;

    fn stub_reducer(dir: &Path, capture: &Path) -> PathBuf {
        let path = dir.join("stub-score");
        fs::write(&path, format!("#!/bin/sh\ncat > {}\n", capture.display())).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn feeds_only_active_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = HuntStore::new(dir.path().join("hunts"));
        for (id, active) in [(1, true), (2, false), (3, true)] {
            store
                .append(
                    "pirates",
                    &Treasure {
                        id,
                        username: "alice".to_string(),
                        latitude: 0.0,
                        longitude: 0.0,
                        clue: String::new(),
                        value: 5,
                        active,
                    },
                )
                .unwrap();
        }

        let capture = dir.path().join("fed.csv");
        let reducer = stub_reducer(dir.path(), &capture);
        score_one(&store, &reducer, "pirates").unwrap();
        assert_eq!(
            fs::read_to_string(capture).unwrap(),
            "1,5,alice\n3,5,alice\n"
        );
    }

    #[test]
    fn missing_reducer_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let store = HuntStore::new(dir.path().join("hunts"));
        fs::create_dir_all(store.hunt_dir("pirates")).unwrap();
        assert!(score_one(&store, Path::new("/no/such/reducer"), "pirates").is_err());
    }
}
