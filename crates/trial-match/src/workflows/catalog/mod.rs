//! File based inputs for the matcher: the registry's CSV trial export and
//! patient profiles serialised as JSON.

mod parser;

use crate::workflows::matching::{
    AgeRange, PatientProfile, RepositoryError, TrialCatalog, TrialId, TrialRecord, TrialStatus,
};
use parser::{parse_rows, split_list, CatalogRow};
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Upper bound used when a row only publishes a minimum age.
pub const OPEN_MAX_AGE: u32 = 120;

#[derive(Debug)]
pub enum CatalogImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Json(serde_json::Error),
    InvalidAgeRange { trial_id: String, min: u32, max: u32 },
    UnknownStatus { trial_id: String, value: String },
}

impl std::fmt::Display for CatalogImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogImportError::Io(err) => write!(f, "failed to read import file: {}", err),
            CatalogImportError::Csv(err) => write!(f, "invalid trial catalog CSV: {}", err),
            CatalogImportError::Json(err) => write!(f, "invalid patient JSON: {}", err),
            CatalogImportError::InvalidAgeRange { trial_id, min, max } => write!(
                f,
                "trial {} has minimum age {} above maximum age {}",
                trial_id, min, max
            ),
            CatalogImportError::UnknownStatus { trial_id, value } => {
                write!(f, "trial {} has unknown status '{}'", trial_id, value)
            }
        }
    }
}

impl std::error::Error for CatalogImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CatalogImportError::Io(err) => Some(err),
            CatalogImportError::Csv(err) => Some(err),
            CatalogImportError::Json(err) => Some(err),
            CatalogImportError::InvalidAgeRange { .. }
            | CatalogImportError::UnknownStatus { .. } => None,
        }
    }
}

impl From<std::io::Error> for CatalogImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for CatalogImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<serde_json::Error> for CatalogImportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err)
    }
}

pub struct TrialCatalogImporter;

impl TrialCatalogImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<TrialRecord>, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    /// Parse every row, in file order. Closed trials are kept; filtering is the
    /// catalog's job.
    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<TrialRecord>, CatalogImportError> {
        let trials = parse_rows(reader)?
            .into_iter()
            .map(trial_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        debug!(trials = trials.len(), "imported trial catalog");
        Ok(trials)
    }
}

fn trial_from_row(row: CatalogRow) -> Result<TrialRecord, CatalogImportError> {
    let status = TrialStatus::parse(&row.status).ok_or_else(|| CatalogImportError::UnknownStatus {
        trial_id: row.trial_id.clone(),
        value: row.status.clone(),
    })?;

    let age_range = match (row.min_age, row.max_age) {
        (None, None) => None,
        (min, max) => {
            let min = min.unwrap_or(0);
            let max = max.unwrap_or(OPEN_MAX_AGE);
            if min > max {
                return Err(CatalogImportError::InvalidAgeRange {
                    trial_id: row.trial_id,
                    min,
                    max,
                });
            }
            Some(AgeRange { min, max })
        }
    };

    Ok(TrialRecord {
        trial_id: TrialId(row.trial_id),
        title: row.title,
        status,
        target_conditions: split_list(row.target_conditions.as_deref()),
        exclusion_criteria: split_list(row.exclusion_criteria.as_deref()),
        age_range,
        gender_restriction: row.gender,
    })
}

pub struct PatientProfileImporter;

impl PatientProfileImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<PatientProfile, CatalogImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<PatientProfile, CatalogImportError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Fixed catalog loaded once at startup; only open trials are offered.
#[derive(Debug, Default, Clone)]
pub struct StaticTrialCatalog {
    trials: Vec<TrialRecord>,
}

impl StaticTrialCatalog {
    pub fn new(trials: Vec<TrialRecord>) -> Self {
        Self { trials }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogImportError> {
        TrialCatalogImporter::from_path(path).map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

impl TrialCatalog for StaticTrialCatalog {
    fn open_trials(&self) -> Result<Vec<TrialRecord>, RepositoryError> {
        Ok(self
            .trials
            .iter()
            .filter(|trial| trial.status.is_open())
            .cloned()
            .collect())
    }
}
