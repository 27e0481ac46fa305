use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fda483::{report, Config};

#[derive(Parser, Debug)]
#[command(name = "report")]
#[command(version = "0.1.0")]
#[command(about = "Render frequency, co-occurrence, and trend charts from the classified dataset")]
struct Args {
    /// Override the classified dataset input path
    #[arg(short, long)]
    input: Option<PathBuf>,
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
    if let Some(input) = args.input {
        config.classified_file = input;
    }

    let summary = report::run(&config)?;

    println!("Report generation complete.");
    println!("  Observations analyzed: {}", summary.total_observations);
    for path in &summary.rendered {
        println!("  Rendered: {}", path.display());
    }
    for (name, error) in &summary.failures {
        eprintln!("  Failed:   {} ({})", name, error);
    }

    // Chart failures are isolated, but surface them in the exit code once
    // every chart has been attempted.
    if !summary.failures.is_empty() {
        std::process::exit(1);
    }

    Ok(())
}
