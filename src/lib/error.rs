/// Errors raised while fitting or comparing posteriors.
#[derive(Debug, thiserror::Error)]
pub enum PosteriorError {
    #[error("invalid counts: {successes} successes out of {trials} trials")]
    InvalidCount { successes: u64, trials: u64 },

    #[error("invalid Monte Carlo sample size: {n_samples}")]
    InvalidSampleSize { n_samples: usize },

    #[error("invalid prior: a0 = {a0}, b0 = {b0} (both must be positive and finite)")]
    InvalidPrior { a0: f64, b0: f64 },

    #[error("treatment label '{label}' is listed more than once")]
    DuplicateLabel { label: String },

    #[error("at least two groups are needed for a comparison, found {found}")]
    InsufficientGroups { found: usize },

    #[error("density grid needs at least two points, got {points}")]
    InvalidGrid { points: usize },

    #[error("credible level must lie in (0, 1), got {level}")]
    InvalidLevel { level: f64 },

    #[error("bad subject record at row {row}: {reason}")]
    Data { row: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PosteriorError>;
