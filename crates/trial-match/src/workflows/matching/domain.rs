use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for patients known to the portal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PatientId(pub String);

/// Identifier wrapper for trials in the catalog (typically an NCT number).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrialId(pub String);

/// Identifier wrapper for the consultation whose transcript produced the patient entities.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ConsultationId(pub String);

/// Identifier wrapper for persisted trial matches.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MatchId(pub String);

macro_rules! display_as_inner {
    ($($id:ty),+) => {
        $(impl fmt::Display for $id {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        })+
    };
}

display_as_inner!(PatientId, TrialId, ConsultationId, MatchId);

/// Clinician-assessed severity attached to an extracted condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Mild,
    Moderate,
    Severe,
}

/// Free-text diagnosis as extracted from the consultation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
    pub name: String,
    pub severity: Severity,
}

impl Condition {
    pub fn new(name: impl Into<String>, severity: Severity) -> Self {
        Self {
            name: name.into(),
            severity,
        }
    }
}

/// Structured medical entities for a patient. Every collection may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientMedicalData {
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub medications: Vec<String>,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub comorbidities: Vec<String>,
}

/// Demographic fields consumed alongside the medical data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientDemographics {
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
}

/// Everything the patient directory knows about a patient that matters for matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub patient_id: PatientId,
    #[serde(default)]
    pub demographics: PatientDemographics,
    #[serde(default)]
    pub medical_data: PatientMedicalData,
}

/// Inclusive age window for trial eligibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: u32,
    pub max: u32,
}

impl AgeRange {
    pub fn contains(&self, age: u32) -> bool {
        age >= self.min && age <= self.max
    }

    /// Years between `age` and the nearest bound; zero when inside the window.
    pub fn distance_from(&self, age: u32) -> u32 {
        if age < self.min {
            self.min - age
        } else if age > self.max {
            age - self.max
        } else {
            0
        }
    }
}

/// Recruitment status published by the trial registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrialStatus {
    Recruiting,
    Active,
    Completed,
    Suspended,
    Terminated,
}

impl TrialStatus {
    /// Only recruiting and active trials are offered to patients.
    pub const fn is_open(self) -> bool {
        matches!(self, TrialStatus::Recruiting | TrialStatus::Active)
    }

    pub const fn label(self) -> &'static str {
        match self {
            TrialStatus::Recruiting => "recruiting",
            TrialStatus::Active => "active",
            TrialStatus::Completed => "completed",
            TrialStatus::Suspended => "suspended",
            TrialStatus::Terminated => "terminated",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "recruiting" => Some(Self::Recruiting),
            "active" | "active, not recruiting" => Some(Self::Active),
            "completed" => Some(Self::Completed),
            "suspended" => Some(Self::Suspended),
            "terminated" | "withdrawn" => Some(Self::Terminated),
            _ => None,
        }
    }
}

/// Catalog entry describing a candidate trial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialRecord {
    pub trial_id: TrialId,
    pub title: String,
    pub status: TrialStatus,
    #[serde(default)]
    pub target_conditions: Vec<String>,
    #[serde(default)]
    pub exclusion_criteria: Vec<String>,
    #[serde(default)]
    pub age_range: Option<AgeRange>,
    #[serde(default)]
    pub gender_restriction: Option<String>,
}
