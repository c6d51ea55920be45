use super::super::domain::{PatientDemographics, PatientMedicalData, TrialRecord};
use super::criteria::Criterion;
use super::CriterionScore;

/// Years past either end of an age window over which the age score decays to zero.
const AGE_DECAY_YEARS: f64 = 5.0;

/// Exclusion hits at which a conflict sub-score reaches zero.
const CONFLICTS_FOR_FULL_PENALTY: f64 = 2.0;

pub(crate) fn score_condition_match(
    patient: &PatientMedicalData,
    trial: &TrialRecord,
) -> CriterionScore {
    let weight = Criterion::ConditionMatch.weight();
    let patient_conditions: Vec<String> = patient
        .conditions
        .iter()
        .map(|condition| normalize(&condition.name))
        .filter(|name| !name.is_empty())
        .collect();

    let matched: Vec<&str> = trial
        .target_conditions
        .iter()
        .filter(|target| {
            let target = normalize(target);
            !target.is_empty()
                && patient_conditions
                    .iter()
                    .any(|name| name.contains(&target) || target.contains(name.as_str()))
        })
        .map(String::as_str)
        .collect();

    if matched.is_empty() {
        return CriterionScore::new(0.0, "No matching conditions");
    }

    // `matched` is non-empty, so `target_conditions` is too.
    let ratio = matched.len() as f64 / trial.target_conditions.len() as f64;
    CriterionScore::new(
        weight * ratio,
        format!("Matched conditions: {}", matched.join(", ")),
    )
}

pub(crate) fn score_age_match(
    demographics: &PatientDemographics,
    trial: &TrialRecord,
) -> CriterionScore {
    let weight = Criterion::AgeMatch.weight();
    let (range, age) = match (trial.age_range, demographics.age) {
        (Some(range), Some(age)) => (range, age),
        _ => return CriterionScore::new(weight / 2.0, "Age criteria not applicable"),
    };

    if range.contains(age) {
        return CriterionScore::new(
            weight,
            format!("Age {age} within range {}-{}", range.min, range.max),
        );
    }

    let closest_diff = range.distance_from(age);
    let diff_penalty = (closest_diff as f64 / AGE_DECAY_YEARS).min(1.0);
    CriterionScore::new(
        (weight * (1.0 - diff_penalty)).max(0.0),
        format!(
            "Age {age} outside range {}-{} by {} year(s)",
            range.min, range.max, closest_diff
        ),
    )
}

pub(crate) fn score_gender_match(
    demographics: &PatientDemographics,
    trial: &TrialRecord,
) -> CriterionScore {
    let weight = Criterion::GenderMatch.weight();
    let restriction = trial
        .gender_restriction
        .as_deref()
        .map(normalize)
        .filter(|value| !value.is_empty());
    let gender = demographics
        .gender
        .as_deref()
        .map(normalize)
        .filter(|value| !value.is_empty());

    let (restriction, gender) = match (restriction, gender) {
        (Some(restriction), Some(gender)) => (restriction, gender),
        (None, _) => return CriterionScore::new(weight, "No gender restriction"),
        (Some(_), None) => return CriterionScore::new(weight, "Gender criteria not applicable"),
    };

    if gender_satisfies(&gender, &restriction) {
        return CriterionScore::new(weight, "Gender criteria met");
    }

    CriterionScore::new(
        0.0,
        format!("Gender restriction not met: {restriction} required"),
    )
}

fn gender_satisfies(gender: &str, restriction: &str) -> bool {
    matches!(restriction, "any" | "all")
        || gender == restriction
        || (gender == "f" && restriction == "female")
        || (gender == "m" && restriction == "male")
}

pub(crate) fn score_medication_match(
    patient: &PatientMedicalData,
    trial: &TrialRecord,
) -> CriterionScore {
    let weight = Criterion::MedicationMatch.weight();
    if patient.medications.is_empty() {
        return CriterionScore::new(weight / 2.0, "No medications to evaluate");
    }

    conflict_score(weight, "medication", &patient.medications, trial)
}

pub(crate) fn score_comorbidity_match(
    patient: &PatientMedicalData,
    trial: &TrialRecord,
) -> CriterionScore {
    let weight = Criterion::ComorbidityMatch.weight();
    if patient.comorbidities.is_empty() {
        return CriterionScore::new(weight, "No comorbidities to evaluate");
    }

    conflict_score(weight, "comorbidity", &patient.comorbidities, trial)
}

pub(crate) fn score_allergy_match(
    patient: &PatientMedicalData,
    trial: &TrialRecord,
) -> CriterionScore {
    let weight = Criterion::AllergyMatch.weight();
    if patient.allergies.is_empty() {
        return CriterionScore::new(weight, "No allergies to evaluate");
    }

    conflict_score(weight, "allergy", &patient.allergies, trial)
}

fn conflict_score(weight: f64, noun: &str, items: &[String], trial: &TrialRecord) -> CriterionScore {
    let conflicts = count_exclusion_conflicts(items, &trial.exclusion_criteria);
    if conflicts == 0 {
        return CriterionScore::new(weight, format!("No {noun} conflicts with exclusion criteria"));
    }

    let penalty_factor = (conflicts as f64 / CONFLICTS_FOR_FULL_PENALTY).min(1.0);
    CriterionScore::new(
        weight * (1.0 - penalty_factor),
        format!("{conflicts} exclusion criteria conflict with patient {noun} list"),
    )
}

/// Number of distinct exclusion entries mentioning at least one of `items`.
pub(crate) fn count_exclusion_conflicts(items: &[String], exclusion_criteria: &[String]) -> usize {
    let needles: Vec<String> = items
        .iter()
        .map(|item| normalize(item))
        .filter(|item| !item.is_empty())
        .collect();

    exclusion_criteria
        .iter()
        .map(|criterion| normalize(criterion))
        .filter(|criterion| needles.iter().any(|needle| criterion.contains(needle.as_str())))
        .count()
}

/// Case folding is the only normalization; surrounding whitespace stays significant.
fn normalize(value: &str) -> String {
    value.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::matching::domain::{
        AgeRange, Condition, Severity, TrialId, TrialStatus,
    };

    fn trial() -> TrialRecord {
        TrialRecord {
            trial_id: TrialId("NCT-RULES".to_string()),
            title: "Rules fixture".to_string(),
            status: TrialStatus::Recruiting,
            target_conditions: vec!["diabetes".to_string()],
            exclusion_criteria: Vec::new(),
            age_range: Some(AgeRange { min: 18, max: 65 }),
            gender_restriction: None,
        }
    }

    fn patient_with(conditions: &[&str]) -> PatientMedicalData {
        PatientMedicalData {
            conditions: conditions
                .iter()
                .map(|name| Condition::new(*name, Severity::Moderate))
                .collect(),
            ..PatientMedicalData::default()
        }
    }

    fn demographics(age: Option<u32>, gender: Option<&str>) -> PatientDemographics {
        PatientDemographics {
            age,
            gender: gender.map(str::to_string),
        }
    }

    #[test]
    fn condition_match_is_bidirectional_substring() {
        let mut trial = trial();
        trial.target_conditions = vec![
            "Type 2 Diabetes Mellitus".to_string(),
            "hypertension".to_string(),
        ];
        let patient = patient_with(&["type 2 diabetes", "Essential Hypertension"]);

        let score = score_condition_match(&patient, &trial);

        assert_eq!(score.score, 40.0);
        assert_eq!(
            score.reason,
            "Matched conditions: Type 2 Diabetes Mellitus, hypertension"
        );
    }

    #[test]
    fn condition_match_scales_by_target_count() {
        let mut trial = trial();
        trial.target_conditions = vec![
            "asthma".to_string(),
            "copd".to_string(),
            "bronchiectasis".to_string(),
            "emphysema".to_string(),
        ];
        let patient = patient_with(&["Asthma"]);

        assert_eq!(score_condition_match(&patient, &trial).score, 10.0);
    }

    #[test]
    fn blank_condition_names_never_match() {
        let mut trial = trial();
        trial.target_conditions = vec![String::new()];
        let patient = patient_with(&["asthma"]);

        let score = score_condition_match(&patient, &trial);
        assert_eq!(score.score, 0.0);
        assert_eq!(score.reason, "No matching conditions");
    }

    #[test]
    fn age_inside_window_gets_full_credit_including_bounds() {
        let trial = trial();
        for age in [18, 40, 65] {
            assert_eq!(
                score_age_match(&demographics(Some(age), None), &trial).score,
                15.0
            );
        }
    }

    #[test]
    fn age_decays_linearly_past_either_bound() {
        let trial = trial();
        assert_eq!(score_age_match(&demographics(Some(67), None), &trial).score, 9.0);
        assert_eq!(score_age_match(&demographics(Some(16), None), &trial).score, 9.0);
        assert_eq!(score_age_match(&demographics(Some(90), None), &trial).score, 0.0);
    }

    #[test]
    fn age_without_range_is_neutral() {
        let mut trial = trial();
        trial.age_range = None;
        let score = score_age_match(&demographics(Some(30), None), &trial);
        assert_eq!(score.score, 7.5);
        assert_eq!(score.reason, "Age criteria not applicable");
    }

    #[test]
    fn gender_abbreviations_are_accepted() {
        let mut trial = trial();
        trial.gender_restriction = Some("Female".to_string());
        assert_eq!(
            score_gender_match(&demographics(None, Some("F")), &trial).score,
            10.0
        );

        trial.gender_restriction = Some("male".to_string());
        assert_eq!(
            score_gender_match(&demographics(None, Some("m")), &trial).score,
            10.0
        );
        assert_eq!(
            score_gender_match(&demographics(None, Some("f")), &trial).score,
            0.0
        );
    }

    #[test]
    fn gender_all_and_missing_values_pass() {
        let mut trial = trial();
        trial.gender_restriction = Some("ALL".to_string());
        assert_eq!(
            score_gender_match(&demographics(None, Some("nonbinary")), &trial).score,
            10.0
        );

        trial.gender_restriction = Some("female".to_string());
        assert_eq!(score_gender_match(&demographics(None, None), &trial).score, 10.0);
    }

    #[test]
    fn conflicts_count_distinct_exclusion_entries() {
        let criteria = vec![
            "Current use of warfarin or aspirin".to_string(),
            "Aspirin allergy".to_string(),
            "Pregnancy".to_string(),
        ];
        let items = vec!["Aspirin".to_string(), "Warfarin".to_string()];

        assert_eq!(count_exclusion_conflicts(&items, &criteria), 2);
    }

    #[test]
    fn two_conflicts_zero_out_the_criterion() {
        let mut trial = trial();
        trial.exclusion_criteria = vec![
            "Penicillin allergy".to_string(),
            "Known sulfa allergy".to_string(),
        ];
        let patient = PatientMedicalData {
            allergies: vec!["penicillin".to_string(), "Sulfa".to_string()],
            ..PatientMedicalData::default()
        };

        assert_eq!(score_allergy_match(&patient, &trial).score, 0.0);
    }

    #[test]
    fn missing_comorbidities_are_never_penalized() {
        let mut trial = trial();
        trial.exclusion_criteria = vec!["Chronic kidney disease".to_string()];
        let score = score_comorbidity_match(&PatientMedicalData::default(), &trial);
        assert_eq!(score.score, 10.0);
    }

    #[test]
    fn one_comorbidity_conflict_halves_the_score() {
        let mut trial = trial();
        trial.exclusion_criteria = vec!["Chronic kidney disease stage 4+".to_string()];
        let patient = PatientMedicalData {
            comorbidities: vec!["chronic kidney disease".to_string()],
            ..PatientMedicalData::default()
        };
        assert_eq!(score_comorbidity_match(&patient, &trial).score, 5.0);
    }

    #[test]
    fn surrounding_whitespace_is_significant() {
        let mut trial = trial();
        trial.target_conditions = vec!["diabetes ".to_string()];
        trial.exclusion_criteria = vec!["Metformin-based regimen".to_string()];
        let patient = PatientMedicalData {
            medications: vec!["metformin ".to_string()],
            ..patient_with(&["Type 2 Diabetes"])
        };

        assert_eq!(score_condition_match(&patient, &trial).score, 0.0);
        assert_eq!(score_medication_match(&patient, &trial).score, 15.0);
    }

    #[test]
    fn case_differences_still_match() {
        let mut trial = trial();
        trial.target_conditions = vec!["DIABETES".to_string()];
        trial.exclusion_criteria = vec!["Metformin-based regimen".to_string()];
        let patient = PatientMedicalData {
            medications: vec!["METFORMIN".to_string()],
            ..patient_with(&["type 2 diabetes"])
        };

        assert_eq!(score_condition_match(&patient, &trial).score, 40.0);
        assert_eq!(score_medication_match(&patient, &trial).score, 7.5);
    }
}
