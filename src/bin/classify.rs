use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fda483::{Classifier, ClassifierConfig, Config, GeminiProvider, RunnerOptions};

#[derive(Parser, Debug)]
#[command(name = "classify")]
#[command(version = "0.1.0")]
#[command(about = "Classify 483 observations into deficiency categories via the Gemini API")]
struct Args {
    /// Override the merged dataset input path
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Override the classified dataset output path
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("fda483=info".parse()?)
                .add_directive("reqwest=warn".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Credential check happens before any file I/O.
    let classifier_config = ClassifierConfig::from_env()?;

    let mut config = Config::from_env();
    if let Some(input) = args.input {
        config.merged_file = input;
    }
    if let Some(output) = args.output {
        config.classified_file = output;
    }

    let provider = GeminiProvider::new(
        classifier_config.api_key.clone(),
        classifier_config.model.clone(),
    );
    let classifier = Classifier::new(provider, RunnerOptions::from(&classifier_config));

    let summary = classifier
        .run(&config.merged_file, &config.classified_file)
        .await?;

    println!("Classification complete.");
    println!("  Observations:  {}", summary.total);
    println!("  Classified:    {}", summary.classified);
    println!("  Empty text:    {}", summary.empty_text);
    println!("  Failed:        {}", summary.failed);
    println!("Per-category counts:");
    for (category, count) in &summary.category_counts {
        println!("  {:<50} {}", category.label(), count);
    }
    println!("Output: {}", config.classified_file.display());

    Ok(())
}
