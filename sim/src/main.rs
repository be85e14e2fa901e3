use std::{
    fs,
    io::{self, Read as _, Write as _},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use sim::{AnyResult, Session, script};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Runs the key cabinet panel on simulated hardware.
#[derive(Debug, Parser)]
#[command(name = "sim", version)]
struct Cli {
    /// Script to run, read from stdin when omitted.
    script: Option<PathBuf>,

    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, default_value = "info", value_name = "FILTER")]
    log_level: String,

    /// Print every LCD redraw.
    #[arg(long)]
    frames: bool,
}

fn main() -> AnyResult<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .context("invalid log filter")?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let text = match &cli.script {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?,
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("unable to read the script from stdin")?;
            text
        }
    };

    let actions = script::parse(&text)?;
    let mut session = Session::new(cli.frames);
    let mut stdout = io::stdout().lock();

    for (line, action) in &actions {
        let result = session.run(action);
        stdout.write_all(session.take_output().as_bytes())?;
        result.with_context(|| format!("line {line}"))?;

        if session.bootloader_requested() {
            info!(line, "panel left for the bootloader, stopping");
            break;
        }
    }

    Ok(())
}
