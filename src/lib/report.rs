use crate::comparison::{ComparisonResult, FittedGroup};
use crate::error::{PosteriorError, Result};
use crate::posterior::BetaPosterior;
use crate::sensitivity::SensitivityRow;
use csv::{Writer, WriterBuilder};
use log::{debug, info};
use serde::Serialize;
use serde_json::{Value, json};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Credible level reported next to each posterior.
pub const CREDIBLE_LEVEL: f64 = 0.95;

/// One row of the posterior table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PosteriorSummary {
    pub label: String,
    pub trials: u64,
    pub successes: u64,
    pub alpha: f64,
    pub beta: f64,
    pub mean: f64,
    pub sd: f64,
    pub ci_lower: f64,
    pub ci_upper: f64,
}

impl PosteriorSummary {
    pub fn from_fitted(fitted: &FittedGroup, level: f64) -> Result<Self> {
        let (ci_lower, ci_upper) = fitted.posterior.credible_interval(level)?;
        Ok(Self {
            label: fitted.group.label().to_string(),
            trials: fitted.group.trials(),
            successes: fitted.group.successes(),
            alpha: fitted.posterior.alpha,
            beta: fitted.posterior.beta,
            mean: fitted.posterior.mean(),
            sd: fitted.posterior.standard_deviation(),
            ci_lower,
            ci_upper,
        })
    }
}

/// Posterior density evaluated at the midpoints of `points` equal cells over [0, 1].
///
/// The endpoints are left out: with a prior below 1 and an all-or-nothing
/// outcome the density diverges there.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DensityCurve {
    pub label: String,
    pub points: Vec<(f64, f64)>,
}

pub fn density_curve(label: &str, posterior: &BetaPosterior, points: usize) -> Result<DensityCurve> {
    if points < 2 {
        return Err(PosteriorError::InvalidGrid { points });
    }
    let step = 1.0 / points as f64;
    let points = (0..points)
        .map(|i| {
            let theta = (i as f64 + 0.5) * step;
            (theta, posterior.pdf(theta))
        })
        .collect();
    Ok(DensityCurve {
        label: label.to_string(),
        points,
    })
}

pub fn format_probability(value: f64, precision: usize) -> String {
    format!("{:.*}", precision, value)
}

/// Plain-language sentence for one comparison.
pub fn narrative(result: &ComparisonResult, precision: usize) -> String {
    format!(
        "P(θ_{} > θ_{}) = {} ({} of {} posterior draws)",
        result.label_a,
        result.label_b,
        format_probability(result.p_greater(), precision),
        result.greater,
        result.n_samples
    )
}

pub fn posterior_narrative(summary: &PosteriorSummary, precision: usize) -> String {
    format!(
        "{}: {}/{} successes, posterior Beta({}, {}) with mean {} and {:.0}% credible interval [{}, {}]",
        summary.label,
        summary.successes,
        summary.trials,
        summary.alpha,
        summary.beta,
        format_probability(summary.mean, precision),
        CREDIBLE_LEVEL * 100.0,
        format_probability(summary.ci_lower, precision),
        format_probability(summary.ci_upper, precision)
    )
}

/// Destination for the computed report values.
pub trait ReportSink {
    /// Exact integer values such as the seed and sample counts
    fn write_count(&mut self, name: &str, value: u64) -> Result<()>;
    fn write_scalar(&mut self, name: &str, value: f64) -> Result<()>;
    fn write_posteriors(&mut self, section: &str, rows: &[PosteriorSummary]) -> Result<()>;
    fn write_comparisons(&mut self, section: &str, results: &[ComparisonResult]) -> Result<()>;
    fn write_sensitivity(&mut self, label: &str, rows: &[SensitivityRow]) -> Result<()>;
    fn write_density(&mut self, curves: &[DensityCurve]) -> Result<()>;
    fn finish(&mut self) -> Result<()>;
}

fn tsv_writer(path: &Path, header: &[&str]) -> Result<Writer<File>> {
    let mut writer = WriterBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;
    writer.write_record(header)?;
    Ok(writer)
}

/// One tab-separated file per table inside an output directory.
pub struct TsvReportWriter {
    precision: usize,
    scalars: Writer<File>,
    posteriors: Writer<File>,
    comparisons: Writer<File>,
    sensitivity: Writer<File>,
    density: Writer<File>,
}

impl TsvReportWriter {
    pub fn new(out_dir: &Path, precision: usize) -> Result<Self> {
        debug!("Writing TSV tables to {}", out_dir.display());
        Ok(Self {
            precision,
            scalars: tsv_writer(&out_dir.join("summary.tsv"), &["name", "value"])?,
            posteriors: tsv_writer(
                &out_dir.join("posteriors.tsv"),
                &[
                    "section", "label", "trials", "successes", "alpha", "beta", "mean", "sd",
                    "ci_lower", "ci_upper",
                ],
            )?,
            comparisons: tsv_writer(
                &out_dir.join("comparisons.tsv"),
                &[
                    "section", "group_a", "group_b", "n_samples", "n_greater", "n_less",
                    "p_greater", "p_less",
                ],
            )?,
            sensitivity: tsv_writer(
                &out_dir.join("sensitivity.tsv"),
                &["group", "prior", "a0", "b0", "alpha", "beta", "mean", "sd"],
            )?,
            density: tsv_writer(&out_dir.join("density.tsv"), &["label", "theta", "density"])?,
        })
    }

    fn fmt(&self, value: f64) -> String {
        format_probability(value, self.precision)
    }
}

impl ReportSink for TsvReportWriter {
    fn write_count(&mut self, name: &str, value: u64) -> Result<()> {
        self.scalars.write_record([name, value.to_string().as_str()])?;
        Ok(())
    }

    fn write_scalar(&mut self, name: &str, value: f64) -> Result<()> {
        let value = match value.fract() == 0.0 {
            true => format!("{}", value),
            false => self.fmt(value),
        };
        self.scalars.write_record([name, value.as_str()])?;
        Ok(())
    }

    fn write_posteriors(&mut self, section: &str, rows: &[PosteriorSummary]) -> Result<()> {
        for row in rows {
            let fields = vec![
                section.to_string(),
                row.label.clone(),
                row.trials.to_string(),
                row.successes.to_string(),
                row.alpha.to_string(),
                row.beta.to_string(),
                self.fmt(row.mean),
                self.fmt(row.sd),
                self.fmt(row.ci_lower),
                self.fmt(row.ci_upper),
            ];
            self.posteriors.write_record(&fields)?;
        }
        Ok(())
    }

    fn write_comparisons(&mut self, section: &str, results: &[ComparisonResult]) -> Result<()> {
        for result in results {
            let fields = vec![
                section.to_string(),
                result.label_a.clone(),
                result.label_b.clone(),
                result.n_samples.to_string(),
                result.greater.to_string(),
                result.less.to_string(),
                self.fmt(result.p_greater()),
                self.fmt(result.p_less()),
            ];
            self.comparisons.write_record(&fields)?;
        }
        Ok(())
    }

    fn write_sensitivity(&mut self, label: &str, rows: &[SensitivityRow]) -> Result<()> {
        for row in rows {
            let fields = vec![
                label.to_string(),
                row.prior.clone(),
                row.a0.to_string(),
                row.b0.to_string(),
                row.alpha.to_string(),
                row.beta.to_string(),
                self.fmt(row.mean),
                self.fmt(row.sd),
            ];
            self.sensitivity.write_record(&fields)?;
        }
        Ok(())
    }

    fn write_density(&mut self, curves: &[DensityCurve]) -> Result<()> {
        for curve in curves {
            for (theta, density) in &curve.points {
                self.density.write_record([
                    curve.label.as_str(),
                    format!("{:.4}", theta).as_str(),
                    format!("{:.6}", density).as_str(),
                ])?;
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for writer in [
            &mut self.scalars,
            &mut self.posteriors,
            &mut self.comparisons,
            &mut self.sensitivity,
            &mut self.density,
        ] {
            writer.flush()?;
        }
        Ok(())
    }
}

/// Collects every table into a single JSON document written on `finish`.
pub struct JsonReportWriter {
    path: PathBuf,
    scalars: serde_json::Map<String, Value>,
    posteriors: Vec<Value>,
    comparisons: Vec<Value>,
    sensitivity: Vec<Value>,
    density: Vec<Value>,
}

impl JsonReportWriter {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            scalars: serde_json::Map::new(),
            posteriors: Vec::new(),
            comparisons: Vec::new(),
            sensitivity: Vec::new(),
            density: Vec::new(),
        }
    }

    pub fn document(&self) -> Value {
        json!({
            "summary": self.scalars,
            "posteriors": self.posteriors,
            "comparisons": self.comparisons,
            "sensitivity": self.sensitivity,
            "density": self.density,
        })
    }
}

impl ReportSink for JsonReportWriter {
    fn write_count(&mut self, name: &str, value: u64) -> Result<()> {
        self.scalars.insert(name.to_string(), json!(value));
        Ok(())
    }

    fn write_scalar(&mut self, name: &str, value: f64) -> Result<()> {
        self.scalars.insert(name.to_string(), json!(value));
        Ok(())
    }

    fn write_posteriors(&mut self, section: &str, rows: &[PosteriorSummary]) -> Result<()> {
        for row in rows {
            let mut value = serde_json::to_value(row)?;
            value["section"] = json!(section);
            self.posteriors.push(value);
        }
        Ok(())
    }

    fn write_comparisons(&mut self, section: &str, results: &[ComparisonResult]) -> Result<()> {
        for result in results {
            let mut value = serde_json::to_value(result)?;
            value["section"] = json!(section);
            value["p_greater"] = json!(result.p_greater());
            value["p_less"] = json!(result.p_less());
            self.comparisons.push(value);
        }
        Ok(())
    }

    fn write_sensitivity(&mut self, label: &str, rows: &[SensitivityRow]) -> Result<()> {
        for row in rows {
            let mut value = serde_json::to_value(row)?;
            value["group"] = json!(label);
            self.sensitivity.push(value);
        }
        Ok(())
    }

    fn write_density(&mut self, curves: &[DensityCurve]) -> Result<()> {
        for curve in curves {
            self.density.push(serde_json::to_value(curve)?);
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let file = File::create(&self.path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &self.document())?;
        writer.flush()?;
        info!("Wrote JSON report to {}", self.path.display());
        Ok(())
    }
}

/// Human-readable summary lines.
pub struct NarrativeWriter {
    precision: usize,
    writer: BufWriter<File>,
}

impl NarrativeWriter {
    pub fn new(path: &Path, precision: usize) -> Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            precision,
            writer: BufWriter::new(file),
        })
    }
}

impl ReportSink for NarrativeWriter {
    fn write_count(&mut self, name: &str, value: u64) -> Result<()> {
        writeln!(self.writer, "{}: {}", name, value)?;
        Ok(())
    }

    fn write_scalar(&mut self, name: &str, value: f64) -> Result<()> {
        writeln!(self.writer, "{}: {}", name, value)?;
        Ok(())
    }

    fn write_posteriors(&mut self, section: &str, rows: &[PosteriorSummary]) -> Result<()> {
        writeln!(self.writer, "\n[{}] posteriors", section)?;
        for row in rows {
            writeln!(self.writer, "{}", posterior_narrative(row, self.precision))?;
        }
        Ok(())
    }

    fn write_comparisons(&mut self, section: &str, results: &[ComparisonResult]) -> Result<()> {
        writeln!(self.writer, "\n[{}] comparisons", section)?;
        for result in results {
            writeln!(self.writer, "{}", narrative(result, self.precision))?;
        }
        Ok(())
    }

    fn write_sensitivity(&mut self, label: &str, rows: &[SensitivityRow]) -> Result<()> {
        writeln!(self.writer, "\n[prior sensitivity] {}", label)?;
        for row in rows {
            writeln!(
                self.writer,
                "{} Beta({}, {}): mean {}, sd {}",
                row.prior,
                row.a0,
                row.b0,
                format_probability(row.mean, self.precision),
                format_probability(row.sd, self.precision)
            )?;
        }
        Ok(())
    }

    // Curves only go to the tabular sinks
    fn write_density(&mut self, _curves: &[DensityCurve]) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

pub fn create_report_sinks(
    out_dir: &Path,
    precision: usize,
    json: bool,
) -> Result<Vec<Box<dyn ReportSink>>> {
    let mut sinks: Vec<Box<dyn ReportSink>> = vec![
        Box::new(TsvReportWriter::new(out_dir, precision)?),
        Box::new(NarrativeWriter::new(&out_dir.join("report.txt"), precision)?),
    ];
    if json {
        sinks.push(Box::new(JsonReportWriter::new(&out_dir.join("report.json"))));
    }
    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::Group;
    use crate::posterior::fit_posterior;
    use crate::prior::{BetaPrior, PriorPreset};
    use crate::sensitivity::{preset_priors, sensitivity};
    use std::fs;
    use tempfile::tempdir;

    fn comparison() -> ComparisonResult {
        ComparisonResult {
            label_a: "IXE_Q2W".to_string(),
            label_b: "UST".to_string(),
            n_samples: 1000,
            greater: 999,
            less: 1,
        }
    }

    fn summary() -> PosteriorSummary {
        let fitted =
            FittedGroup::fit(Group::new("IXE_Q2W", 90, 118).unwrap(), &BetaPrior::uniform()).unwrap();
        PosteriorSummary::from_fitted(&fitted, CREDIBLE_LEVEL).unwrap()
    }

    #[test]
    fn test_density_curve() {
        let post = BetaPosterior::new(91.0, 29.0).unwrap();
        let curve = density_curve("IXE_Q2W", &post, 1001).unwrap();
        assert_eq!(curve.points.len(), 1001);
        assert!((curve.points[0].0 - 0.5 / 1001.0).abs() < 1e-12);
        assert!((curve.points[1000].0 - (1.0 - 0.5 / 1001.0)).abs() < 1e-12);
        let integral: f64 = curve.points.iter().map(|(_, d)| d / 1001.0).sum();
        assert!((integral - 1.0).abs() < 1e-3);
        assert!(matches!(
            density_curve("x", &post, 1),
            Err(PosteriorError::InvalidGrid { points: 1 })
        ));
    }

    #[test]
    fn test_density_curve_finite_at_boundary() {
        // Jeffreys prior with no successes in 10 trials
        let post = fit_posterior(0, 10, &PriorPreset::Jeffreys.prior()).unwrap();
        assert_eq!((post.alpha, post.beta), (0.5, 10.5));
        let curve = density_curve("none", &post, 201).unwrap();
        assert!(curve.points.iter().all(|(theta, d)| *theta > 0.0 && *theta < 1.0 && d.is_finite()));
        // Mirror image: every trial a success
        let post = fit_posterior(10, 10, &PriorPreset::Jeffreys.prior()).unwrap();
        let curve = density_curve("all", &post, 201).unwrap();
        assert!(curve.points.iter().all(|(_, d)| d.is_finite()));
    }

    #[test]
    fn test_narrative() {
        assert_eq!(
            narrative(&comparison(), 3),
            "P(θ_IXE_Q2W > θ_UST) = 0.999 (999 of 1000 posterior draws)"
        );
        let text = posterior_narrative(&summary(), 3);
        assert!(text.starts_with("IXE_Q2W: 90/118 successes, posterior Beta(91, 29) with mean 0.758"));
    }

    #[test]
    fn test_posterior_summary() {
        let summary = summary();
        assert_eq!(summary.trials, 118);
        assert!(summary.ci_lower < summary.mean && summary.mean < summary.ci_upper);
    }

    #[test]
    fn test_tsv_report_writer() {
        let dir = tempdir().unwrap();
        let mut writer = TsvReportWriter::new(dir.path(), 3).unwrap();
        writer.write_count("n_subjects", 260).unwrap();
        writer.write_posteriors("overall", &[summary()]).unwrap();
        writer.write_comparisons("overall", &[comparison()]).unwrap();
        let rows = sensitivity(90, 118, &preset_priors()).unwrap();
        writer.write_sensitivity("IXE_Q2W", &rows).unwrap();
        let post = BetaPosterior::new(2.0, 2.0).unwrap();
        writer
            .write_density(&[density_curve("A", &post, 3).unwrap()])
            .unwrap();
        writer.finish().unwrap();

        let comparisons = fs::read_to_string(dir.path().join("comparisons.tsv")).unwrap();
        let lines: Vec<&str> = comparisons.lines().collect();
        assert_eq!(
            lines[0],
            "section\tgroup_a\tgroup_b\tn_samples\tn_greater\tn_less\tp_greater\tp_less"
        );
        assert_eq!(lines[1], "overall\tIXE_Q2W\tUST\t1000\t999\t1\t0.999\t0.001");

        let scalars = fs::read_to_string(dir.path().join("summary.tsv")).unwrap();
        assert_eq!(scalars.lines().nth(1), Some("n_subjects\t260"));

        let sensitivity = fs::read_to_string(dir.path().join("sensitivity.tsv")).unwrap();
        assert_eq!(sensitivity.lines().count(), 5);

        let density = fs::read_to_string(dir.path().join("density.tsv")).unwrap();
        let lines: Vec<&str> = density.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[2], "A\t0.5000\t1.500000");
    }

    #[test]
    fn test_json_report_writer() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut writer = JsonReportWriter::new(&path);
        writer.write_count("seed", 20).unwrap();
        writer.write_scalar("prior_a", 0.5).unwrap();
        writer.write_comparisons("age >= 50", &[comparison()]).unwrap();
        writer.finish().unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let doc: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(doc["summary"]["seed"], json!(20));
        assert_eq!(doc["summary"]["prior_a"], json!(0.5));
        assert_eq!(doc["comparisons"][0]["section"], json!("age >= 50"));
        assert_eq!(doc["comparisons"][0]["greater"], json!(999));
        assert_eq!(doc["comparisons"][0]["p_greater"], json!(0.999));
    }

    #[test]
    fn test_large_seed_written_exactly() {
        let seed: u64 = 12_345_678_901_234_567_891;
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut writer = JsonReportWriter::new(&path);
        writer.write_count("seed", seed).unwrap();
        writer.finish().unwrap();
        let doc: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["summary"]["seed"].as_u64(), Some(seed));

        let mut writer = TsvReportWriter::new(dir.path(), 3).unwrap();
        writer.write_count("seed", seed).unwrap();
        writer.finish().unwrap();
        let scalars = fs::read_to_string(dir.path().join("summary.tsv")).unwrap();
        assert_eq!(scalars.lines().nth(1), Some("seed\t12345678901234567891"));

        let mut writer = NarrativeWriter::new(&dir.path().join("report.txt"), 3).unwrap();
        writer.write_count("seed", seed).unwrap();
        writer.finish().unwrap();
        let text = fs::read_to_string(dir.path().join("report.txt")).unwrap();
        assert!(text.contains("seed: 12345678901234567891"));
    }

    #[test]
    fn test_create_report_sinks() {
        let dir = tempdir().unwrap();
        let mut sinks = create_report_sinks(dir.path(), 3, true).unwrap();
        assert_eq!(sinks.len(), 3);
        for sink in sinks.iter_mut() {
            sink.write_comparisons("overall", &[comparison()]).unwrap();
            sink.finish().unwrap();
        }
        assert!(dir.path().join("report.json").exists());
        let text = fs::read_to_string(dir.path().join("report.txt")).unwrap();
        assert!(text.contains("P(θ_IXE_Q2W > θ_UST) = 0.999"));
    }
}
