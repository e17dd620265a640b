//! Single-record prediction command

use anyhow::{bail, Context, Result};
use std::path::Path;
use success_lib::{PredictionResult, ProjectRecord, SuccessService};
use tabled::Tabled;

use crate::output::{
    color_confidence, color_label, format_percent, print_header, print_json, print_warning,
    OutputFormat,
};

/// Row for the probability table
#[derive(Tabled)]
struct ProbabilityRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Probability")]
    probability: String,
}

/// Record fields given on the command line
pub struct RecordArgs {
    pub description: Option<String>,
    pub progress: Option<i64>,
    pub created_at: Option<String>,
    pub input: Option<std::path::PathBuf>,
}

impl RecordArgs {
    fn into_record(self) -> Result<ProjectRecord> {
        if let Some(path) = self.input {
            return read_record(&path);
        }
        let Some(description) = self.description else {
            bail!("Either --description or --input is required");
        };
        Ok(ProjectRecord {
            description,
            progress: self.progress,
            created_at: self.created_at,
        })
    }
}

fn read_record(path: &Path) -> Result<ProjectRecord> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid project record in {}", path.display()))
}

pub fn predict(service: &SuccessService, args: RecordArgs, format: OutputFormat) -> Result<()> {
    let record = args.into_record()?;
    let result = service.predict(&record)?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => print_result(&result),
    }

    Ok(())
}

fn print_result(result: &PredictionResult) {
    print_header("Success Prediction");
    if result.is_fallback {
        print_warning("The model could not analyze this project; showing a neutral estimate");
    }
    println!("Predicted tier:         {}", color_label(&result.label));
    println!("Confidence:             {}", color_confidence(result.confidence));
    println!("Model version:          {}", result.model_version);
    println!();

    let rows: Vec<ProbabilityRow> = result
        .probabilities
        .iter()
        .map(|(class, p)| ProbabilityRow {
            class: class.to_string(),
            probability: format_percent(p),
        })
        .collect();
    let table = tabled::Table::new(rows)
        .with(tabled::settings::Style::rounded())
        .to_string();
    println!("{}", table);
    println!();

    let analysis = &result.feature_analysis;
    println!("Progress:               {}%", analysis.progress);
    println!("Description length:     {} chars, {} words", analysis.description_length, analysis.word_count);
    println!("Days active:            {}", analysis.days_active);
    println!(
        "Keyword hits:           high {}, medium {}, low {}",
        analysis.high_keywords_found, analysis.medium_keywords_found, analysis.low_keywords_found
    );
    println!();
    println!("{}", result.explanation);
}
