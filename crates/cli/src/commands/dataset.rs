//! Sample dataset generation

use anyhow::{Context, Result};
use std::path::Path;
use success_lib::dataset::sample::generate_sample_csv;

use crate::output::print_success;

/// Write the built-in sample training CSV to `output`, or stdout
pub fn generate(output: Option<&Path>) -> Result<()> {
    let csv = generate_sample_csv(chrono::Utc::now().date_naive())?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(path, &csv)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_success(&format!("Sample dataset written to {}", path.display()));
        }
        None => print!("{}", csv),
    }

    Ok(())
}
