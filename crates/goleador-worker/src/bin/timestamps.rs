//! Run goal extraction once over an existing frame directory.
//!
//! Writes `score-frames.txt` and the timestamps file into the directory and
//! prints the report as JSON.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use goleador_score::process_directory;

#[derive(Parser)]
#[command(name = "goleador-timestamps")]
#[command(about = "Extract goal timestamps from a directory of OCR frame files")]
struct Cli {
    /// Directory holding `<frame><suffix>.txt` files
    dir: PathBuf,

    /// Suffix between the frame number and `.txt`
    #[arg(default_value = "", allow_hyphen_values = true)]
    suffix: String,

    /// Timestamps file written into the directory
    #[arg(default_value = "timestamps.txt")]
    out_file: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let report = process_directory(cli.dir, &cli.suffix, &cli.out_file).await?;
    println!("{}", report.to_json_pretty()?);
    Ok(())
}
