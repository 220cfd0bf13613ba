use crate::error::{PosteriorError, Result};
use serde::Serialize;
use std::{fmt, str::FromStr};
use strum::IntoEnumIterator;
use strum_macros::EnumIter;

/// Beta(a0, b0) prior on a success probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BetaPrior {
    a0: f64,
    b0: f64,
}

impl BetaPrior {
    pub fn new(a0: f64, b0: f64) -> Result<Self> {
        let valid = |x: f64| x.is_finite() && x > 0.0;
        if !valid(a0) || !valid(b0) {
            return Err(PosteriorError::InvalidPrior { a0, b0 });
        }
        Ok(Self { a0, b0 })
    }

    /// Uniform prior on [0, 1]
    pub fn uniform() -> Self {
        Self { a0: 1.0, b0: 1.0 }
    }

    pub fn a0(&self) -> f64 {
        self.a0
    }

    pub fn b0(&self) -> f64 {
        self.b0
    }
}

impl Default for BetaPrior {
    fn default() -> Self {
        Self::uniform()
    }
}

impl fmt::Display for BetaPrior {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Beta({}, {})", self.a0, self.b0)
    }
}

/// Named priors used for the sensitivity table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
pub enum PriorPreset {
    Uniform,
    Jeffreys,
    Weak,
    Skeptical,
}

impl PriorPreset {
    pub fn prior(&self) -> BetaPrior {
        let (a0, b0) = match self {
            PriorPreset::Uniform => (1.0, 1.0),
            PriorPreset::Jeffreys => (0.5, 0.5),
            PriorPreset::Weak => (2.0, 2.0),
            PriorPreset::Skeptical => (10.0, 10.0),
        };
        BetaPrior { a0, b0 }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PriorPreset::Uniform => "uniform",
            PriorPreset::Jeffreys => "jeffreys",
            PriorPreset::Weak => "weak",
            PriorPreset::Skeptical => "skeptical",
        }
    }

    pub fn all() -> Vec<PriorPreset> {
        PriorPreset::iter().collect()
    }
}

impl fmt::Display for PriorPreset {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.label(), self.prior())
    }
}

impl FromStr for PriorPreset {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        PriorPreset::iter()
            .find(|p| p.label() == s.to_ascii_lowercase())
            .ok_or_else(|| anyhow::anyhow!("Invalid prior preset: {}", s))
    }
}
