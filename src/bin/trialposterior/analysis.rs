use crate::cli::Cli;
use anyhow::{Result, anyhow};
use itertools::Itertools;
use log::{debug, info, warn};
use trialposterior_utils::comparison::{ComparisonResult, FittedGroup, PosteriorComparator};
use trialposterior_utils::group::tally_groups;
use trialposterior_utils::prior::BetaPrior;
use trialposterior_utils::report::{
    self, CREDIBLE_LEVEL, DensityCurve, PosteriorSummary, ReportSink,
};
use trialposterior_utils::sensitivity::{named_priors, sensitivity};
use trialposterior_utils::subject::{AgeBand, Subject, filter_age_band, filter_treatments};

pub const OVERALL: &str = "overall";

/// Everything that parameterises one report run.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub treatments: Vec<String>,
    pub age_threshold: f64,
    pub prior: BetaPrior,
    pub comparator: PosteriorComparator,
    pub precision: usize,
    pub density_points: usize,
    pub sensitivity_priors: Vec<(String, BetaPrior)>,
}

impl ReportConfig {
    pub fn from_cli(args: &Cli) -> Result<Self> {
        if args.treatments.len() < 2 {
            return Err(anyhow!(
                "At least two treatments are needed, got {:?}",
                args.treatments
            ));
        }
        if let Some(label) = args.treatments.iter().duplicates().next() {
            return Err(anyhow!("Treatment {} is listed more than once", label));
        }
        Ok(Self {
            treatments: args.treatments.clone(),
            age_threshold: args.age_threshold,
            prior: BetaPrior::new(args.prior_a, args.prior_b)?,
            comparator: PosteriorComparator::new(args.n_samples, args.seed)?,
            precision: args.precision,
            density_points: args.density_points,
            sensitivity_priors: named_priors(&args.sensitivity_priors),
        })
    }
}

/// Comparisons produced by a run, keyed by section.
#[derive(Debug, Clone)]
pub struct ReportOutcome {
    pub sections: Vec<(String, Vec<ComparisonResult>)>,
}

impl ReportOutcome {
    pub fn section(&self, name: &str) -> Option<&[ComparisonResult]> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, results)| results.as_slice())
    }
}

fn fit_section(subjects: &[Subject], config: &ReportConfig) -> Result<Vec<FittedGroup>> {
    let fitted = tally_groups(subjects, &config.treatments)?
        .into_iter()
        .map(|group| FittedGroup::fit(group, &config.prior))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fitted)
}

fn run_section(
    section: &str,
    subjects: &[Subject],
    config: &ReportConfig,
    sinks: &mut [Box<dyn ReportSink>],
) -> Result<(Vec<FittedGroup>, Vec<ComparisonResult>)> {
    info!("Section {}: {} subjects", section, subjects.len());
    let fitted = fit_section(subjects, config)?;
    let summaries = fitted
        .iter()
        .map(|f| PosteriorSummary::from_fitted(f, CREDIBLE_LEVEL))
        .collect::<Result<Vec<_>, _>>()?;
    for summary in &summaries {
        info!("{}", report::posterior_narrative(summary, config.precision));
    }

    let results = config.comparator.compare_reference(&fitted)?;
    for result in &results {
        info!("{}", report::narrative(result, config.precision));
    }

    for sink in sinks.iter_mut() {
        sink.write_posteriors(section, &summaries)?;
        sink.write_comparisons(section, &results)?;
    }
    Ok((fitted, results))
}

/// Fit, compare and emit the overall and age-subgroup sections.
pub fn run_report(
    subjects: &[Subject],
    config: &ReportConfig,
    sinks: &mut [Box<dyn ReportSink>],
) -> Result<ReportOutcome> {
    let subjects = filter_treatments(subjects, &config.treatments);
    if subjects.is_empty() {
        warn!("No subjects on treatments {:?}", config.treatments);
    }
    debug!("{} subjects kept after treatment filter", subjects.len());

    for sink in sinks.iter_mut() {
        sink.write_count("n_subjects", subjects.len() as u64)?;
        sink.write_count("n_samples", config.comparator.n_samples() as u64)?;
        sink.write_count("seed", config.comparator.seed())?;
        sink.write_scalar("prior_a", config.prior.a0())?;
        sink.write_scalar("prior_b", config.prior.b0())?;
        sink.write_scalar("age_threshold", config.age_threshold)?;
    }

    let mut sections = Vec::new();
    let (fitted, results) = run_section(OVERALL, &subjects, config, sinks)?;
    sections.push((OVERALL.to_string(), results));

    let curves = fitted
        .iter()
        .map(|f| report::density_curve(f.label(), &f.posterior, config.density_points))
        .collect::<Result<Vec<DensityCurve>, _>>()?;
    for sink in sinks.iter_mut() {
        sink.write_density(&curves)?;
        for f in &fitted {
            let rows = sensitivity(
                f.group.successes(),
                f.group.trials(),
                &config.sensitivity_priors,
            )?;
            sink.write_sensitivity(f.label(), &rows)?;
        }
    }

    for band in [
        AgeBand::AtLeast(config.age_threshold),
        AgeBand::Under(config.age_threshold),
    ] {
        let label = band.label();
        let band_subjects = filter_age_band(&subjects, band);
        let (_, results) = run_section(&label, &band_subjects, config, sinks)?;
        sections.push((label, results));
    }

    for sink in sinks.iter_mut() {
        sink.finish()?;
    }
    Ok(ReportOutcome { sections })
}
