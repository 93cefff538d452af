//! Load a layer stack from a JSON file and print the records sent to the traffic generator.
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use log::{info, LevelFilter};
use ostinato_protocols::config::StackConfig;
use ostinato_protocols::utilities::configure_logger;
use ostinato_protocols::LayerStack;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON file describing the layers.
    #[arg(short = 'i', long)]
    input_file: PathBuf,
    /// File to which the layers read back from the records will be written.
    #[arg(short = 'o', long)]
    output_file: Option<PathBuf>,
    /// Print the records as JSON.
    #[arg(long, default_value_t = false)]
    records: bool,
    /// Minimum log level.
    #[arg(short = 'L', long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

fn main() -> Result<()> {
    let args = Args::parse();
    configure_logger(args.log_level);

    let config = StackConfig::from_file(&args.input_file)?;
    let stack = config.to_stack()?;
    if stack.is_empty() {
        bail!("{} has no layers", args.input_file.display());
    }

    for layer in &stack {
        println!("{}", layer);
    }

    let records = stack.save();
    if args.records {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    let fetched = LayerStack::from_records(&records)?;
    if fetched != stack {
        bail!("layers read back from the records differ");
    }
    info!("{} layer(s) saved and fetched", fetched.len());

    if let Some(path) = args.output_file {
        StackConfig::from_stack(&config.name, &fetched).to_file(&path)?;
        info!("wrote {}", path.display());
    }

    Ok(())
}
