//! Show stored model metadata

use anyhow::Result;
use colored::Colorize;
use success_lib::{ModelStore, NotTrainedCause, SuccessError};

use crate::output::{format_percent, format_timestamp, print_header, print_json, OutputFormat};

pub fn inspect(store: &ModelStore, format: OutputFormat) -> Result<()> {
    let metadata = store.metadata()?.ok_or_else(|| SuccessError::ModelNotTrained {
        path: store.path().to_path_buf(),
        cause: NotTrainedCause::Absent,
    })?;

    match format {
        OutputFormat::Json => print_json(&metadata)?,
        OutputFormat::Table => {
            print_header("Model Artifact");
            println!("Path:                   {}", store.path().display().to_string().cyan());
            println!("Version:                {}", metadata.version);
            println!("Trained at:             {}", format_timestamp(&metadata.trained_at));
            println!("Classes:                {}", metadata.class_names.join(", "));
            println!("Rows trained:           {}", metadata.rows_trained);
            println!("Training accuracy:      {}", format_percent(metadata.training_accuracy));
            println!("Vocabulary size:        {}", metadata.vocabulary_size);
            println!("Trees:                  {}", metadata.n_trees);
        }
    }

    Ok(())
}
