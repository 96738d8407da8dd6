use std::fs;
use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local};
use tabwriter::TabWriter;

use common::store::{HuntStore, Treasure};

const SEPARATOR: &str = "--------------------------------------------------";

/// `list`: every hunt under the root with its active treasure count.
pub fn list(store: &HuntStore, out: &mut dyn Write) -> Result<()> {
    let hunts = store.list_hunts()?;
    if hunts.is_empty() {
        writeln!(out, "No hunts found.")?;
        return Ok(());
    }

    writeln!(out, "Hunts:")?;
    let mut tw = TabWriter::new(&mut *out);
    writeln!(tw, "NAME\tACTIVE TREASURES")?;
    for hunt in &hunts {
        let count = store.load(hunt)?.iter().filter(|t| t.active).count();
        writeln!(tw, "{hunt}\t{count}")?;
    }
    tw.flush()?;
    Ok(())
}

/// `show <hunt>`: hunt header plus a table of its active treasures.
pub fn show(store: &HuntStore, hunt: &str, out: &mut dyn Write) -> Result<()> {
    if !store.has_records(hunt) {
        writeln!(out, "Hunt '{hunt}' has no treasures or does not exist.")?;
        return Ok(());
    }

    let path = store.treasure_path(hunt);
    let meta = fs::metadata(&path)
        .with_context(|| format!("failed to stat treasure file {}", path.display()))?;
    let modified: DateTime<Local> = meta.modified()?.into();

    writeln!(out, "Hunt: {hunt}")?;
    writeln!(out, "Total file size: {} bytes", meta.len())?;
    writeln!(out, "Last modified: {}", modified.format("%Y-%m-%d %H:%M:%S"))?;
    writeln!(out)?;
    writeln!(out, "Treasures:")?;
    writeln!(out, "{SEPARATOR}")?;

    let treasures = store.load(hunt)?;
    let active: Vec<_> = treasures.iter().filter(|t| t.active).collect();
    if active.is_empty() {
        writeln!(out, "No active treasures found in this hunt.")?;
    } else {
        let mut tw = TabWriter::new(&mut *out);
        writeln!(tw, "ID\tUSER\tVALUE")?;
        for t in &active {
            writeln!(tw, "{}\t{}\t{}", t.id, t.username, t.value)?;
        }
        tw.flush()?;
    }

    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "Total treasures: {}", active.len())?;

    store.log_operation(hunt, &format!("Listed treasures for hunt '{hunt}'"))?;
    Ok(())
}

/// `view <hunt> <id>`: full details of one active treasure.
pub fn view(store: &HuntStore, hunt: &str, id: u32, out: &mut dyn Write) -> Result<()> {
    if !store.has_records(hunt) {
        writeln!(out, "Hunt '{hunt}' has no treasures or does not exist.")?;
        return Ok(());
    }

    let treasures = store.load(hunt)?;
    let Some(t) = treasures.iter().find(|t| t.active && t.id == id) else {
        writeln!(out, "Treasure with ID {id} not found in hunt '{hunt}'.")?;
        return Ok(());
    };

    writeln!(out, "Treasure Details:")?;
    writeln!(out, "{SEPARATOR}")?;
    writeln!(out, "ID: {}", t.id)?;
    writeln!(out, "User: {}", t.username)?;
    writeln!(out, "Location: {:.6}, {:.6}", t.latitude, t.longitude)?;
    writeln!(out, "Clue: {}", t.clue)?;
    writeln!(out, "Value: {}", t.value)?;
    writeln!(out, "{SEPARATOR}")?;

    store.log_operation(hunt, &format!("Viewed treasure ID {id} from hunt '{hunt}'"))?;
    Ok(())
}

/// `add <hunt>`: prompt for the record fields on `input`, then append.
pub fn add(
    store: &HuntStore,
    hunt: &str,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<()> {
    let username = prompt(input, out, "Enter username: ")?;
    let latitude: f64 = parse_field(&prompt(input, out, "Enter latitude: ")?, "latitude")?;
    let longitude: f64 = parse_field(&prompt(input, out, "Enter longitude: ")?, "longitude")?;
    let clue = prompt(input, out, "Enter clue: ")?;
    let value: i64 = parse_field(&prompt(input, out, "Enter value: ")?, "value")?;

    let id = store.next_id(hunt)?;
    let treasure = Treasure {
        id,
        username: username.clone(),
        latitude,
        longitude,
        clue,
        value,
        active: true,
    };
    store.append(hunt, &treasure)?;
    store.log_operation(hunt, &format!("Added treasure ID {id} by {username}"))?;

    writeln!(out, "Treasure added successfully with ID {id}")?;
    Ok(())
}

/// `remove_treasure <hunt> <id>`: logical delete.
pub fn remove_treasure(store: &HuntStore, hunt: &str, id: u32, out: &mut dyn Write) -> Result<()> {
    if !store.has_records(hunt) {
        writeln!(out, "Hunt '{hunt}' has no treasures or does not exist.")?;
        return Ok(());
    }

    if store.deactivate(hunt, id)? {
        writeln!(out, "Treasure with ID {id} removed successfully.")?;
        store.log_operation(hunt, &format!("Removed treasure ID {id} from hunt '{hunt}'"))?;
    } else {
        writeln!(out, "Treasure with ID {id} not found in hunt '{hunt}'.")?;
    }
    Ok(())
}

/// `remove_hunt <hunt>`: delete the hunt's files, log link and directory.
pub fn remove_hunt(store: &HuntStore, hunt: &str, out: &mut dyn Write) -> Result<()> {
    if !store.hunt_dir(hunt).exists() {
        writeln!(out, "Hunt '{hunt}' does not exist.")?;
        return Ok(());
    }

    // Logged before removal, like every other operation; the log itself is
    // deleted right after.
    store.log_operation(hunt, &format!("Removing hunt '{hunt}'"))?;
    store.remove_hunt(hunt)?;
    writeln!(out, "Hunt '{hunt}' removed successfully.")?;
    Ok(())
}

fn parse_field<T: std::str::FromStr>(raw: &str, field: &'static str) -> Result<T> {
    match raw.parse() {
        Ok(value) => Ok(value),
        Err(_) => {
            tracing::warn!(field, input = raw, "rejecting non-numeric field");
            bail!("{field} must be a number, got '{raw}'")
        }
    }
}

fn prompt(input: &mut dyn BufRead, out: &mut dyn Write, label: &str) -> Result<String> {
    write!(out, "{label}")?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_string())
}
