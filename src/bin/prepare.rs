use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fda483::{prepare, Config};

#[derive(Parser, Debug)]
#[command(name = "prepare")]
#[command(version = "0.1.0")]
#[command(about = "Merge and clean raw FDA 483 source tables into the analysis dataset")]
struct Args {
    /// Override the merged dataset output path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("fda483=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    let mut config = Config::from_env();
    if let Some(output) = args.output {
        config.merged_file = output;
    }

    let summary = prepare::run(&config)?;

    println!("Data preparation complete.");
    println!("  Inspections loaded:     {}", summary.inspections_loaded);
    println!("  Citations loaded:       {}", summary.citations_loaded);
    println!("  Observations written:   {}", summary.observations_written);
    println!("  Dropped (join key):     {}", summary.dropped_unmatched_join);
    println!("  Dropped (product type): {}", summary.dropped_product_type);
    println!("  Dropped (bad date):     {}", summary.dropped_missing_date);
    println!("  Dropped (duplicates):   {}", summary.dropped_duplicates);
    println!("Output: {}", config.merged_file.display());

    Ok(())
}
