//! navlink - replay car session scenarios through the coordination core
//!
//! This is the binary entry point. All logic lives in the library.

use std::path::PathBuf;

use clap::Parser;

/// navlink - headless driver for the navigation coordination core
#[derive(Parser, Debug)]
#[command(name = "navlink")]
#[command(about = "Replay car session scenarios and print domain events as JSON", long_about = None)]
struct Args {
    /// Scenario file to replay
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,

    /// Project directory containing .navlink/config.toml
    #[arg(long, value_name = "DIR")]
    config: Option<PathBuf>,

    /// Log to stderr instead of the log file
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let args = Args::parse();

    if args.verbose {
        navlink_core::logging::init_stderr();
    } else {
        navlink_core::logging::init()?;
    }

    let project_path = args
        .config
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    navlink::run_headless(&project_path, &args.scenario).await?;
    Ok(())
}
