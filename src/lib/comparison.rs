use crate::error::{PosteriorError, Result};
use crate::group::Group;
use crate::posterior::BetaPosterior;
use crate::prior::BetaPrior;
use itertools::Itertools;
use log::{debug, info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::cmp::Ordering;

/// Monte Carlo draws used by the reference report.
pub const DEFAULT_N_SAMPLES: usize = 1_000_000;

/// A group together with its fitted posterior.
#[derive(Debug, Clone)]
pub struct FittedGroup {
    pub group: Group,
    pub posterior: BetaPosterior,
}

impl FittedGroup {
    pub fn fit(group: Group, prior: &BetaPrior) -> Result<Self> {
        let posterior = group.posterior(prior)?;
        Ok(Self { group, posterior })
    }

    pub fn label(&self) -> &str {
        self.group.label()
    }
}

/// Ordered draws from one group's posterior.
#[derive(Debug, Clone)]
pub struct PosteriorSample {
    pub label: String,
    pub draws: Vec<f64>,
}

impl PosteriorSample {
    pub fn draw(fitted: &FittedGroup, n_samples: usize, rng: &mut ChaCha8Rng) -> Self {
        Self {
            label: fitted.label().to_string(),
            draws: fitted.posterior.sample(n_samples, rng),
        }
    }

    pub fn len(&self) -> usize {
        self.draws.len()
    }

    pub fn is_empty(&self) -> bool {
        self.draws.is_empty()
    }
}

/// Tally of index-wise comparisons between the draws of group A and group B.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub label_a: String,
    pub label_b: String,
    pub n_samples: usize,
    /// Draws with θ_A > θ_B
    pub greater: usize,
    /// Draws with θ_A < θ_B
    pub less: usize,
}

impl ComparisonResult {
    /// Compare `a[i]` against `b[i]`. Ties count in neither direction.
    ///
    /// Only the common prefix of the two samples is used.
    pub fn from_samples(a: &PosteriorSample, b: &PosteriorSample) -> Result<Self> {
        let n_samples = a.len().min(b.len());
        if n_samples == 0 {
            return Err(PosteriorError::InvalidSampleSize { n_samples });
        }
        let (mut greater, mut less) = (0, 0);
        for (x, y) in a.draws.iter().zip(b.draws.iter()) {
            match x.partial_cmp(y) {
                Some(Ordering::Greater) => greater += 1,
                Some(Ordering::Less) => less += 1,
                _ => {}
            }
        }
        Ok(Self {
            label_a: a.label.clone(),
            label_b: b.label.clone(),
            n_samples,
            greater,
            less,
        })
    }

    /// Estimate of P(θ_A > θ_B)
    pub fn p_greater(&self) -> f64 {
        self.greater as f64 / self.n_samples as f64
    }

    /// Estimate of P(θ_A < θ_B)
    pub fn p_less(&self) -> f64 {
        self.less as f64 / self.n_samples as f64
    }

    pub fn ties(&self) -> usize {
        self.n_samples - self.greater - self.less
    }
}

/// Draw `n_samples` values from each posterior and tabulate which is larger.
///
/// A fresh ChaCha8 stream is seeded from `seed` for every call; all of A's
/// draws are taken before B's.
pub fn compare(
    a: &FittedGroup,
    b: &FittedGroup,
    n_samples: usize,
    seed: u64,
) -> Result<ComparisonResult> {
    if n_samples == 0 {
        return Err(PosteriorError::InvalidSampleSize { n_samples });
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let sample_a = PosteriorSample::draw(a, n_samples, &mut rng);
    let sample_b = PosteriorSample::draw(b, n_samples, &mut rng);
    let result = ComparisonResult::from_samples(&sample_a, &sample_b)?;
    debug!(
        "{} vs {}: {} greater, {} less out of {}",
        result.label_a, result.label_b, result.greater, result.less, result.n_samples
    );
    Ok(result)
}

/// Monte Carlo settings shared by every comparison in a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PosteriorComparator {
    n_samples: usize,
    seed: u64,
}

impl PosteriorComparator {
    pub fn new(n_samples: usize, seed: u64) -> Result<Self> {
        if n_samples == 0 {
            return Err(PosteriorError::InvalidSampleSize { n_samples });
        }
        Ok(Self { n_samples, seed })
    }

    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn compare(&self, a: &FittedGroup, b: &FittedGroup) -> Result<ComparisonResult> {
        compare(a, b, self.n_samples, self.seed)
    }

    /// Every pair (i, j) with i < j, in input order.
    pub fn compare_all(&self, groups: &[FittedGroup]) -> Result<Vec<ComparisonResult>> {
        if groups.len() < 2 {
            return Err(PosteriorError::InsufficientGroups {
                found: groups.len(),
            });
        }
        info!(
            "Comparing {} groups pairwise with {} draws each (seed {})",
            groups.len(),
            self.n_samples,
            self.seed
        );
        groups
            .iter()
            .tuple_combinations()
            .map(|(a, b)| self.compare(a, b))
            .collect()
    }

    /// The first group against each of the others.
    pub fn compare_reference(&self, groups: &[FittedGroup]) -> Result<Vec<ComparisonResult>> {
        match groups.split_first() {
            Some((reference, others)) if !others.is_empty() => others
                .iter()
                .map(|other| self.compare(reference, other))
                .collect(),
            _ => Err(PosteriorError::InsufficientGroups {
                found: groups.len(),
            }),
        }
    }
}
