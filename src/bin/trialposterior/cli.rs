use clap::{Parser, ValueEnum};
use trialposterior_utils::prior::PriorPreset;

/// Bayesian comparison of treatment response rates.
#[derive(Parser, Debug)]
#[command(name = "trialposterior", version, about = "Beta-Binomial posterior comparison of treatment arms")]
pub struct Cli {
    #[arg(
        value_name = "SUBJECTS",
        help = "File path to the subject table (outcome, treatment, age)"
    )]
    pub subjects: String,

    #[arg(
        long,
        short,
        default_value = "trialposterior",
        value_name = "OUT",
        help = "Output directory"
    )]
    pub out: String,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "IXE_Q2W,UST",
        help = "Treatment labels to compare; the first is compared against the rest"
    )]
    pub treatments: Vec<String>,

    #[arg(long, default_value = "50", help = "Age splitting the two subgroups")]
    pub age_threshold: f64,

    #[arg(
        long,
        default_value = "1000000",
        help = "Monte Carlo draws per posterior"
    )]
    pub n_samples: usize,

    #[arg(long, default_value = "20", help = "Random seed")]
    pub seed: u64,

    #[arg(long, default_value = "1.0", help = "Prior alpha hyperparameter")]
    pub prior_a: f64,

    #[arg(long, default_value = "1.0", help = "Prior beta hyperparameter")]
    pub prior_b: f64,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "uniform,jeffreys,weak,skeptical",
        help = "Prior presets for the sensitivity table (uniform, jeffreys, weak, skeptical)"
    )]
    pub sensitivity_priors: Vec<PriorPreset>,

    #[arg(long, default_value = "3", help = "Decimals for reported probabilities")]
    pub precision: usize,

    #[arg(
        long,
        default_value = "201",
        help = "Number of grid points for posterior density curves"
    )]
    pub density_points: usize,

    #[arg(long, default_value = ",", help = "Delimiter of the subject table")]
    pub delimiter: char,

    #[arg(long, default_value = "outcome")]
    pub outcome_column: String,

    #[arg(long, default_value = "treatment")]
    pub treatment_column: String,

    #[arg(long, default_value = "age")]
    pub age_column: String,

    #[arg(long, help = "Also write report.json")]
    pub json: bool,

    #[arg(
        value_enum,
        long,
        default_value = "normal",
        value_name = "VERBOSITY",
        help = "Verbosity level"
    )]
    pub verbosity: LogLevel,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum LogLevel {
    Verbose,
    Normal,
    Silent,
}

impl LogLevel {
    pub fn filter(&self) -> &'static str {
        match self {
            LogLevel::Verbose => "debug",
            LogLevel::Normal => "info",
            LogLevel::Silent => "off",
        }
    }
}
