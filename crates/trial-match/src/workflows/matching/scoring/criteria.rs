use serde::{Deserialize, Serialize};

/// Criteria contributing to a trial's relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    ConditionMatch,
    AgeMatch,
    GenderMatch,
    MedicationMatch,
    ComorbidityMatch,
    AllergyMatch,
}

impl Criterion {
    pub const ALL: [Criterion; 6] = [
        Criterion::ConditionMatch,
        Criterion::AgeMatch,
        Criterion::GenderMatch,
        Criterion::MedicationMatch,
        Criterion::ComorbidityMatch,
        Criterion::AllergyMatch,
    ];

    /// Points available for this criterion.
    pub const fn weight(self) -> f64 {
        match self {
            Criterion::ConditionMatch => 40.0,
            Criterion::AgeMatch => 15.0,
            Criterion::GenderMatch => 10.0,
            Criterion::MedicationMatch => 15.0,
            Criterion::ComorbidityMatch => 10.0,
            Criterion::AllergyMatch => 5.0,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Criterion::ConditionMatch => "condition_match",
            Criterion::AgeMatch => "age_match",
            Criterion::GenderMatch => "gender_match",
            Criterion::MedicationMatch => "medication_match",
            Criterion::ComorbidityMatch => "comorbidity_match",
            Criterion::AllergyMatch => "allergy_match",
        }
    }

    /// Sum of every declared weight. The weights add up to 95, and percentages are
    /// taken against this sum rather than a flat 100.
    pub fn total_weight() -> f64 {
        Self::ALL.iter().map(|criterion| criterion.weight()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_weight_is_the_live_sum_of_weights() {
        assert_eq!(Criterion::total_weight(), 95.0);
    }

    #[test]
    fn ordering_follows_declaration() {
        let mut shuffled = vec![
            Criterion::AllergyMatch,
            Criterion::ConditionMatch,
            Criterion::GenderMatch,
        ];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![
                Criterion::ConditionMatch,
                Criterion::GenderMatch,
                Criterion::AllergyMatch
            ]
        );
    }
}
