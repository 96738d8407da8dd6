use std::io::{self, Read, Write};

use anyhow::{Context, Result};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .context("failed to read records from stdin")?;

    let totals = tscore::reduce(&input);
    io::stdout()
        .write_all(tscore::render(&totals).as_bytes())
        .context("failed to write scores")?;
    Ok(())
}
