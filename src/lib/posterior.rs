use crate::error::{PosteriorError, Result};
use crate::prior::BetaPrior;
use log::debug;
use rand::Rng;
use rand::distributions::Distribution;
use statrs::distribution::{Beta, Continuous, ContinuousCDF};

/// Fit the conjugate posterior for `successes` out of `trials` Bernoulli outcomes.
///
/// With a Beta(a0, b0) prior the posterior is Beta(Y + a0, n - Y + b0).
pub fn fit_posterior(successes: u64, trials: u64, prior: &BetaPrior) -> Result<BetaPosterior> {
    if successes > trials {
        return Err(PosteriorError::InvalidCount { successes, trials });
    }
    let alpha = successes as f64 + prior.a0();
    let beta = (trials - successes) as f64 + prior.b0();
    debug!(
        "Fitted posterior for {}/{} under {}: α = {}, β = {}",
        successes, trials, prior, alpha, beta
    );
    BetaPosterior::new(alpha, beta)
}

/// Beta posterior over a latent success rate.
#[derive(Debug, Clone)]
pub struct BetaPosterior {
    pub alpha: f64,
    pub beta: f64,
    dist: Beta,
}

impl BetaPosterior {
    pub fn new(alpha: f64, beta: f64) -> Result<Self> {
        let dist =
            Beta::new(alpha, beta).map_err(|_| PosteriorError::InvalidPrior { a0: alpha, b0: beta })?;
        Ok(Self { alpha, beta, dist })
    }

    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn variance(&self) -> f64 {
        let numerator = self.alpha * self.beta;
        let denominator = (self.alpha + self.beta).powf(2.0) * (self.alpha + self.beta + 1.0);
        numerator / denominator
    }

    pub fn standard_deviation(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn pdf(&self, x: f64) -> f64 {
        if !(0.0..=1.0).contains(&x) {
            return 0.0;
        }
        self.dist.pdf(x)
    }

    pub fn ln_pdf(&self, x: f64) -> f64 {
        if !(0.0..=1.0).contains(&x) {
            return f64::NEG_INFINITY;
        }
        self.dist.ln_pdf(x)
    }

    /// Equal-tailed credible interval holding `level` of the posterior mass.
    pub fn credible_interval(&self, level: f64) -> Result<(f64, f64)> {
        if !(level > 0.0 && level < 1.0) {
            return Err(PosteriorError::InvalidLevel { level });
        }
        let tail = (1.0 - level) / 2.0;
        Ok((self.dist.inverse_cdf(tail), self.dist.inverse_cdf(1.0 - tail)))
    }

    /// Draw `n` values from the posterior, consuming `rng` in order.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<f64> {
        (0..n).map(|_| self.dist.sample(rng)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_fit_posterior_uniform() {
        let post = fit_posterior(90, 118, &BetaPrior::uniform()).unwrap();
        assert_eq!(post.alpha, 91.0);
        assert_eq!(post.beta, 29.0);
        assert!((post.mean() - 91.0 / 120.0).abs() < 1e-12);
        assert!((post.mean() - 0.758).abs() < 1e-3);

        let post = fit_posterior(64, 142, &BetaPrior::uniform()).unwrap();
        assert_eq!(post.alpha, 65.0);
        assert_eq!(post.beta, 79.0);
        assert!((post.mean() - 0.451).abs() < 1e-3);
    }

    #[test]
    fn test_fit_posterior_parameters_positive() {
        for prior in vec![
            BetaPrior::uniform(),
            BetaPrior::new(0.5, 0.5).unwrap(),
            BetaPrior::new(3.0, 7.0).unwrap(),
        ] {
            for n in 0..20u64 {
                for y in 0..=n {
                    let post = fit_posterior(y, n, &prior).unwrap();
                    assert_eq!(post.alpha, y as f64 + prior.a0());
                    assert_eq!(post.beta, (n - y) as f64 + prior.b0());
                    assert!(post.alpha > 0.0 && post.beta > 0.0);
                }
            }
        }
    }

    #[test]
    fn test_fit_posterior_invalid_count() {
        let result = fit_posterior(11, 10, &BetaPrior::uniform());
        assert!(matches!(
            result,
            Err(PosteriorError::InvalidCount { successes: 11, trials: 10 })
        ));
    }

    #[test]
    fn test_boundary_counts_are_proper() {
        let none = fit_posterior(0, 25, &BetaPrior::uniform()).unwrap();
        let all = fit_posterior(25, 25, &BetaPrior::uniform()).unwrap();
        for post in [&none, &all] {
            assert!(post.mean().is_finite());
            assert!(post.standard_deviation().is_finite());
            assert!(post.standard_deviation() > 0.0);
            assert!(post.pdf(0.5).is_finite());
        }
        assert!((none.mean() - 1.0 / 27.0).abs() < 1e-12);
        assert!((all.mean() - 26.0 / 27.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_group_returns_prior() {
        let post = fit_posterior(0, 0, &BetaPrior::uniform()).unwrap();
        assert_eq!((post.alpha, post.beta), (1.0, 1.0));
        assert!((post.pdf(0.3) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_standard_deviation() {
        let post = BetaPosterior::new(2.0, 3.0).unwrap();
        // αβ / ((α+β)²(α+β+1)) = 6 / (25 * 6)
        assert!((post.variance() - 0.04).abs() < 1e-12);
        assert!((post.standard_deviation() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_pdf_outside_support() {
        let post = BetaPosterior::new(2.0, 2.0).unwrap();
        assert_eq!(post.pdf(-0.1), 0.0);
        assert_eq!(post.pdf(1.1), 0.0);
        assert_eq!(post.ln_pdf(1.1), f64::NEG_INFINITY);
        // Beta(2,2) density is 6x(1-x)
        assert!((post.pdf(0.5) - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_credible_interval() {
        let small = fit_posterior(9, 12, &BetaPrior::uniform()).unwrap();
        let large = fit_posterior(90, 120, &BetaPrior::uniform()).unwrap();
        let (lo_s, hi_s) = small.credible_interval(0.95).unwrap();
        let (lo_l, hi_l) = large.credible_interval(0.95).unwrap();
        assert!(lo_s < small.mean() && small.mean() < hi_s);
        assert!(lo_l < large.mean() && large.mean() < hi_l);
        assert!(hi_l - lo_l < hi_s - lo_s);
        assert!(small.credible_interval(1.0).is_err());
        assert!(small.credible_interval(0.0).is_err());
    }

    #[test]
    fn test_sample_within_support_and_seeded() {
        let post = BetaPosterior::new(91.0, 29.0).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let draws = post.sample(20_000, &mut rng);
        assert_eq!(draws.len(), 20_000);
        assert!(draws.iter().all(|&x| (0.0..=1.0).contains(&x)));
        let mean = draws.iter().sum::<f64>() / draws.len() as f64;
        assert!((mean - post.mean()).abs() < 0.005);

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(post.sample(20_000, &mut rng), draws);
    }
}
