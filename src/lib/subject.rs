use crate::error::{PosteriorError, Result};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info};
use serde::Serialize;
use std::fs::File;
use std::io::Read as IoRead;
use std::path::{Path, PathBuf};

/// One trial participant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Subject {
    /// Whether the binary endpoint (e.g. PASI90) was reached
    pub outcome: bool,
    pub treatment: String,
    pub age: f64,
}

impl Subject {
    pub fn new(outcome: bool, treatment: &str, age: f64) -> Self {
        Self {
            outcome,
            treatment: treatment.to_string(),
            age,
        }
    }
}

/// Anything that can hand over the subject table.
pub trait SubjectSource {
    fn subjects(&self) -> Result<Vec<Subject>>;
}

pub struct InMemorySubjects {
    subjects: Vec<Subject>,
}

impl InMemorySubjects {
    pub fn new(subjects: Vec<Subject>) -> Self {
        Self { subjects }
    }
}

impl SubjectSource for InMemorySubjects {
    fn subjects(&self) -> Result<Vec<Subject>> {
        Ok(self.subjects.clone())
    }
}

/// Names of the columns holding each subject field.
#[derive(Debug, Clone)]
pub struct ColumnMapping {
    pub outcome: String,
    pub treatment: String,
    pub age: String,
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self {
            outcome: "outcome".to_string(),
            treatment: "treatment".to_string(),
            age: "age".to_string(),
        }
    }
}

/// Delimited text file with a header row.
pub struct CsvSubjectSource {
    path: PathBuf,
    delimiter: u8,
    columns: ColumnMapping,
}

impl CsvSubjectSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: b',',
            columns: ColumnMapping::default(),
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_columns(mut self, columns: ColumnMapping) -> Self {
        self.columns = columns;
        self
    }
}

impl SubjectSource for CsvSubjectSource {
    fn subjects(&self) -> Result<Vec<Subject>> {
        info!("Loading subjects from {}", self.path.display());
        let file = File::open(&self.path)?;
        let subjects = read_subjects(file, self.delimiter, &self.columns)?;
        info!("Loaded {} subjects", subjects.len());
        Ok(subjects)
    }
}

/// Parse subjects from any reader. Rows are numbered from 1, not counting the header.
pub fn read_subjects<R: IoRead>(
    inner: R,
    delimiter: u8,
    columns: &ColumnMapping,
) -> Result<Vec<Subject>> {
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(inner);
    let headers = reader.headers()?.clone();
    let column_idx = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| PosteriorError::Data {
                row: 0,
                reason: format!("missing column '{}'", name),
            })
    };
    let outcome_idx = column_idx(&columns.outcome)?;
    let treatment_idx = column_idx(&columns.treatment)?;
    let age_idx = column_idx(&columns.age)?;

    let mut subjects = Vec::new();
    let mut record = StringRecord::new();
    let mut row = 0;
    while reader.read_record(&mut record)? {
        row += 1;
        let field = |idx: usize| {
            record.get(idx).ok_or_else(|| PosteriorError::Data {
                row,
                reason: format!("missing field {}", idx + 1),
            })
        };
        let outcome = parse_outcome(field(outcome_idx)?).ok_or_else(|| PosteriorError::Data {
            row,
            reason: format!("unrecognised outcome '{}'", field(outcome_idx).unwrap_or("")),
        })?;
        let treatment = field(treatment_idx)?;
        if treatment.is_empty() {
            return Err(PosteriorError::Data {
                row,
                reason: "empty treatment label".to_string(),
            });
        }
        let age_str = field(age_idx)?;
        let age = age_str
            .parse::<f64>()
            .ok()
            .filter(|a| a.is_finite())
            .ok_or_else(|| PosteriorError::Data {
                row,
                reason: format!("invalid age '{}'", age_str),
            })?;
        subjects.push(Subject::new(outcome, treatment, age));
    }
    debug!("Parsed {} subject rows", row);
    Ok(subjects)
}

fn parse_outcome(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// Age subgroup bounded by a threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AgeBand {
    Under(f64),
    AtLeast(f64),
}

impl AgeBand {
    pub fn contains(&self, age: f64) -> bool {
        match self {
            AgeBand::Under(threshold) => age < *threshold,
            AgeBand::AtLeast(threshold) => age >= *threshold,
        }
    }

    pub fn label(&self) -> String {
        match self {
            AgeBand::Under(threshold) => format!("age < {}", threshold),
            AgeBand::AtLeast(threshold) => format!("age >= {}", threshold),
        }
    }
}

pub fn filter_age_band(subjects: &[Subject], band: AgeBand) -> Vec<Subject> {
    subjects
        .iter()
        .filter(|s| band.contains(s.age))
        .cloned()
        .collect()
}

/// Split into (`age < threshold`, `age >= threshold`).
pub fn partition_by_age(subjects: &[Subject], threshold: f64) -> (Vec<Subject>, Vec<Subject>) {
    (
        filter_age_band(subjects, AgeBand::Under(threshold)),
        filter_age_band(subjects, AgeBand::AtLeast(threshold)),
    )
}

/// Keep only subjects on one of `labels`.
pub fn filter_treatments(subjects: &[Subject], labels: &[String]) -> Vec<Subject> {
    subjects
        .iter()
        .filter(|s| labels.iter().any(|l| *l == s.treatment))
        .cloned()
        .collect()
}
