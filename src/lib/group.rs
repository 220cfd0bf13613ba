use crate::error::{PosteriorError, Result};
use crate::posterior::{BetaPosterior, fit_posterior};
use crate::prior::BetaPrior;
use crate::subject::Subject;
use ahash::{HashMap, HashMapExt};
use log::{debug, warn};
use serde::Serialize;

/// Success/trial counts for one treatment arm. Always `successes <= trials`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Group {
    label: String,
    trials: u64,
    successes: u64,
}

impl Group {
    pub fn new(label: &str, successes: u64, trials: u64) -> Result<Self> {
        if successes > trials {
            return Err(PosteriorError::InvalidCount { successes, trials });
        }
        Ok(Self {
            label: label.to_string(),
            trials,
            successes,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn trials(&self) -> u64 {
        self.trials
    }

    pub fn successes(&self) -> u64 {
        self.successes
    }

    pub fn failures(&self) -> u64 {
        self.trials - self.successes
    }

    /// Observed success fraction, `None` for an empty group.
    pub fn observed_rate(&self) -> Option<f64> {
        match self.trials {
            0 => None,
            n => Some(self.successes as f64 / n as f64),
        }
    }

    pub fn posterior(&self, prior: &BetaPrior) -> Result<BetaPosterior> {
        fit_posterior(self.successes, self.trials, prior)
    }
}

/// Count trials and successes per treatment label, in the order of `labels`.
///
/// Each label may appear only once.
pub fn tally_groups(subjects: &[Subject], labels: &[String]) -> Result<Vec<Group>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Group> = Vec::with_capacity(labels.len());
    for (i, label) in labels.iter().enumerate() {
        if index.insert(label.as_str(), i).is_some() {
            return Err(PosteriorError::DuplicateLabel {
                label: label.clone(),
            });
        }
        groups.push(Group {
            label: label.clone(),
            trials: 0,
            successes: 0,
        });
    }

    for subject in subjects {
        if let Some(&i) = index.get(subject.treatment.as_str()) {
            groups[i].trials += 1;
            if subject.outcome {
                groups[i].successes += 1;
            }
        }
    }
    for group in &groups {
        if group.trials == 0 {
            warn!("No subjects found for treatment {}", group.label);
        }
        debug!("{}: {}/{} successes", group.label, group.successes, group.trials);
    }
    Ok(groups)
}
