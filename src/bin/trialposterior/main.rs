use anyhow::{Result, anyhow};
use clap::Parser;
use env_logger::Env;
use log::info;
use std::path::Path;
use std::time::Instant;
use trialposterior_utils::report::create_report_sinks;
use trialposterior_utils::subject::{ColumnMapping, CsvSubjectSource, SubjectSource};

mod analysis;
mod cli;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    // Set up logging level
    env_logger::Builder::from_env(Env::default().default_filter_or(args.verbosity.filter())).init();

    let timer = Instant::now();
    info!("Running treatment posterior comparison");
    let config = analysis::ReportConfig::from_cli(&args)?;

    // Create output directory
    let out_path = Path::new(&args.out);
    if out_path.exists() {
        return Err(anyhow!("Output directory already exists: {}", args.out));
    }
    std::fs::create_dir(out_path)
        .map_err(|e| anyhow!("Could not create output directory {}: {}", args.out, e))?;
    info!("Created output directory");

    let delimiter = u8::try_from(args.delimiter)
        .map_err(|_| anyhow!("Delimiter must be a single-byte character: {:?}", args.delimiter))?;
    let source = CsvSubjectSource::new(&args.subjects)
        .with_delimiter(delimiter)
        .with_columns(ColumnMapping {
            outcome: args.outcome_column.clone(),
            treatment: args.treatment_column.clone(),
            age: args.age_column.clone(),
        });
    let subjects = source
        .subjects()
        .map_err(|e| anyhow!("Error reading subjects from {}: {}", args.subjects, e))?;

    let mut sinks = create_report_sinks(out_path, config.precision, args.json)?;
    analysis::run_report(&subjects, &config, &mut sinks)?;
    info!("Finished report in {:.2?}", timer.elapsed());
    Ok(())
}
