//! Model training command

use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;
use success_lib::{OutcomeLabel, SuccessService};
use tabled::Tabled;

use crate::output::{format_percent, print_header, print_json, print_success, print_warning, OutputFormat};

/// Row for the class distribution table
#[derive(Tabled)]
struct ClassCountRow {
    #[tabled(rename = "Class")]
    class: String,
    #[tabled(rename = "Rows")]
    rows: usize,
}

/// Train from `csv` and replace the stored model
pub async fn train(service: &SuccessService, csv: &Path, format: OutputFormat) -> Result<()> {
    let report = service
        .retrain(csv)
        .await
        .with_context(|| format!("Training from {} failed", csv.display()))?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => {
            print_header("Training Report");
            println!("Rows read:              {}", report.rows_read);
            println!("Rows used:              {}", report.rows_used);
            println!("Rows dropped:           {}", report.rows_dropped);
            println!("Vocabulary size:        {}", report.vocabulary_size);
            println!("Trees:                  {}", report.n_trees);
            println!("Training accuracy:      {}", format_percent(report.training_accuracy));
            println!("Elapsed:                {} ms", report.elapsed_ms);
            println!();

            let rows: Vec<ClassCountRow> = OutcomeLabel::ALL
                .iter()
                .map(|label| ClassCountRow {
                    class: label.name().to_string(),
                    rows: report.class_counts[label.index()],
                })
                .collect();
            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!();

            if report.unrecognized_labels > 0 {
                print_warning(&format!(
                    "{} rows had unrecognized outcome labels",
                    report.unrecognized_labels
                ));
            }
            print_success(&format!(
                "Model saved to {}",
                report.artifact_path.display().to_string().cyan()
            ));
        }
    }

    Ok(())
}
