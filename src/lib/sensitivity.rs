use crate::error::Result;
use crate::posterior::fit_posterior;
use crate::prior::{BetaPrior, PriorPreset};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensitivityRow {
    pub prior: String,
    pub a0: f64,
    pub b0: f64,
    pub alpha: f64,
    pub beta: f64,
    pub mean: f64,
    pub sd: f64,
}

/// Posterior mean and sd of a single arm under each of `priors`.
pub fn sensitivity(
    successes: u64,
    trials: u64,
    priors: &[(String, BetaPrior)],
) -> Result<Vec<SensitivityRow>> {
    priors
        .iter()
        .map(|(label, prior)| {
            let post = fit_posterior(successes, trials, prior)?;
            Ok(SensitivityRow {
                prior: label.clone(),
                a0: prior.a0(),
                b0: prior.b0(),
                alpha: post.alpha,
                beta: post.beta,
                mean: post.mean(),
                sd: post.standard_deviation(),
            })
        })
        .collect()
}

/// Label and prior for each of `presets`, in the given order.
pub fn named_priors(presets: &[PriorPreset]) -> Vec<(String, BetaPrior)> {
    presets
        .iter()
        .map(|p| (p.label().to_string(), p.prior()))
        .collect()
}

pub fn preset_priors() -> Vec<(String, BetaPrior)> {
    named_priors(&PriorPreset::all())
}
