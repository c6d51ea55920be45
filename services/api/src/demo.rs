use crate::infra::{logging_dispatcher, InMemoryMatchRepository, InMemoryPatientDirectory};
use clap::Args;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use trial_match::config::AppConfig;
use trial_match::error::AppError;
use trial_match::workflows::catalog::{
    CatalogImportError, PatientProfileImporter, StaticTrialCatalog, TrialCatalogImporter,
};
use trial_match::workflows::matching::{
    Condition, ConsultationId, Criterion, MatchStatus, MatchSummary, PatientDemographics,
    PatientId, PatientMedicalData, PatientProfile, ScoredTrial, Severity, TrialMatchingService,
    TrialScorer,
};

const SAMPLE_CATALOG: &str = "\
Trial ID,Title,Status,Target Conditions,Exclusion Criteria,Min Age,Max Age,Gender
NCT05000001,Once-weekly GLP-1 agonist in type 2 diabetes,Recruiting,Type 2 Diabetes,Insulin therapy;Pregnancy,40,75,any
NCT05000002,Intensive blood pressure control,Active,Hypertension;Chronic Kidney Disease,Lisinopril;Dialysis,50,80,
NCT05000003,Cardiometabolic lifestyle program,Recruiting,Obesity;Type 2 Diabetes,Penicillin allergy,30,55,male
NCT05000004,Pediatric asthma biologic,Recruiting,Asthma,,6,17,
NCT05000005,Metformin extension study,Completed,Type 2 Diabetes,,18,80,
";

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// Patient profile JSON (patient_id, demographics, medical_data)
    #[arg(long)]
    pub(crate) patient: PathBuf,
    /// Trial catalog CSV export
    #[arg(long)]
    pub(crate) catalog: PathBuf,
    /// Minimum relevance (0-100); defaults to MATCH_MIN_RELEVANCE
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub(crate) min_relevance: Option<u8>,
    /// Print the ranked trials as JSON instead of a table
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Optional trial catalog CSV; the bundled sample catalog is used otherwise.
    #[arg(long)]
    pub(crate) catalog: Option<PathBuf>,
    /// Minimum relevance (0-100); defaults to MATCH_MIN_RELEVANCE
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub(crate) min_relevance: Option<u8>,
}

pub(crate) fn sample_catalog() -> Result<StaticTrialCatalog, CatalogImportError> {
    TrialCatalogImporter::from_reader(Cursor::new(SAMPLE_CATALOG)).map(StaticTrialCatalog::new)
}

pub(crate) fn sample_patient() -> PatientProfile {
    PatientProfile {
        patient_id: PatientId("demo-patient-001".to_string()),
        demographics: PatientDemographics {
            age: Some(58),
            gender: Some("F".to_string()),
        },
        medical_data: PatientMedicalData {
            conditions: vec![
                Condition::new("Type 2 Diabetes", Severity::Moderate),
                Condition::new("Hypertension", Severity::Mild),
            ],
            medications: vec!["Metformin".to_string(), "Lisinopril".to_string()],
            allergies: vec!["Penicillin".to_string()],
            comorbidities: vec!["Obesity".to_string()],
        },
    }
}

fn resolve_threshold(override_value: Option<u8>) -> Result<u8, AppError> {
    match override_value {
        Some(value) => Ok(value),
        None => Ok(AppConfig::load()?.matching.minimum_relevance),
    }
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        patient,
        catalog,
        min_relevance,
        json,
    } = args;

    let profile = PatientProfileImporter::from_path(patient)?;
    let trials: Vec<_> = TrialCatalogImporter::from_path(catalog)?
        .into_iter()
        .filter(|trial| trial.status.is_open())
        .collect();
    let scorer = TrialScorer::new(resolve_threshold(min_relevance)?);

    let ranked = scorer.score(&profile.medical_data, &profile.demographics, &trials);

    if json {
        println!("{}", render_json(&ranked)?);
    } else {
        println!(
            "Trial relevance for patient {} ({} open trials, minimum relevance {})",
            profile.patient_id,
            trials.len(),
            scorer.minimum_relevance()
        );
        render_ranked(&ranked);
    }

    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        catalog,
        min_relevance,
    } = args;

    let catalog = match catalog {
        Some(path) => StaticTrialCatalog::from_path(path)?,
        None => sample_catalog()?,
    };
    let scorer = TrialScorer::new(resolve_threshold(min_relevance)?);

    let patient = sample_patient();
    let directory = InMemoryPatientDirectory::default();
    directory.insert(patient.clone());

    let service = TrialMatchingService::new(
        Arc::new(directory),
        Arc::new(catalog),
        Arc::new(InMemoryMatchRepository::default()),
        Arc::new(logging_dispatcher()),
        scorer,
    );

    println!("Clinical trial matching demo");
    println!(
        "- Patient {}: age {}, gender {}",
        patient.patient_id,
        patient
            .demographics
            .age
            .map(|age| age.to_string())
            .unwrap_or_else(|| "unknown".to_string()),
        patient.demographics.gender.as_deref().unwrap_or("unknown")
    );
    let conditions: Vec<&str> = patient
        .medical_data
        .conditions
        .iter()
        .map(|condition| condition.name.as_str())
        .collect();
    println!("  Conditions: {}", conditions.join(", "));
    println!("  Medications: {}", patient.medical_data.medications.join(", "));

    let run = service.match_consultation(
        &patient.patient_id,
        &ConsultationId("demo-consultation".to_string()),
    )?;
    println!(
        "\nRanked trials (minimum relevance {})",
        service.scorer().minimum_relevance()
    );
    render_ranked(&run.ranked);

    if let Some(top) = run.created.first() {
        let approved = service.update_status(
            &top.match_id,
            MatchStatus::Approved,
            "demo-clinician",
            Some("reviewed during consultation".to_string()),
        )?;
        println!(
            "\nMatch {} for trial {} -> {} (consent {})",
            approved.match_id,
            approved.trial_id,
            approved.status.label(),
            approved.consent_status.label()
        );
    }

    let summary = service.summary(&patient.patient_id)?;
    render_summary(&summary);

    Ok(())
}

fn render_json(ranked: &[ScoredTrial]) -> Result<String, AppError> {
    Ok(serde_json::to_string_pretty(ranked)?)
}

fn render_ranked(ranked: &[ScoredTrial]) {
    if ranked.is_empty() {
        println!("  No trials met the relevance threshold");
        return;
    }

    for (position, scored) in ranked.iter().enumerate() {
        println!(
            "{}. {} [{}] relevance {}",
            position + 1,
            scored.trial.trial_id,
            scored.trial.title,
            scored.relevance_score
        );
        for criterion in Criterion::ALL {
            if let Some(component) = scored.component(criterion) {
                println!(
                    "     {:<12} {:>5.1}/{:<4} {}",
                    criterion.label(),
                    component.score,
                    criterion.weight(),
                    component.reason
                );
            }
        }
        if !scored.matching_factors.is_empty() {
            println!("     factors: {}", scored.match_reason());
        }
    }
}

fn render_summary(summary: &MatchSummary) {
    println!("\nMatch summary for {}", summary.patient_id);
    println!(
        "- {} matches | {} awaiting consent | {} failed notifications",
        summary.total, summary.awaiting_consent, summary.failed_notifications
    );
    for entry in &summary.by_status {
        if entry.count > 0 {
            println!("  - {}: {}", entry.status_label, entry.count);
        }
    }
    if let Some(average) = summary.average_relevance {
        println!("- Average relevance {:.1}", average);
    }
    if let Some(top) = &summary.top_trial {
        println!("- Top trial {}", top);
    }
}
