use std::collections::BTreeMap;

use super::criteria::Criterion;
use super::CriterionScore;

/// Share of a criterion's weight a score must exceed before it is advertised as a factor.
const STRONG_MATCH_RATIO: f64 = 0.8;

/// Human-readable highlights for a scored trial. Presentation only; never feeds the score.
pub(crate) fn matching_factors(components: &BTreeMap<Criterion, CriterionScore>) -> Vec<String> {
    Criterion::ALL
        .iter()
        .filter_map(|criterion| {
            let component = components.get(criterion)?;
            qualifies(*criterion, component.score).then(|| factor_label(*criterion).to_string())
        })
        .collect()
}

fn qualifies(criterion: Criterion, score: f64) -> bool {
    match criterion {
        Criterion::ConditionMatch | Criterion::GenderMatch => score > 0.0,
        Criterion::AgeMatch
        | Criterion::MedicationMatch
        | Criterion::ComorbidityMatch
        | Criterion::AllergyMatch => score > criterion.weight() * STRONG_MATCH_RATIO,
    }
}

fn factor_label(criterion: Criterion) -> &'static str {
    match criterion {
        Criterion::ConditionMatch => "Condition match",
        Criterion::AgeMatch => "Age criteria met",
        Criterion::GenderMatch => "Gender criteria met",
        Criterion::MedicationMatch => "No medication conflicts",
        Criterion::ComorbidityMatch => "No comorbidity conflicts",
        Criterion::AllergyMatch => "No allergy conflicts",
    }
}
