//! CLI integration tests

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn successctl(args: &[&str], model_path: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_successctl"))
        .args(args)
        .env("SUCCESS_MODEL_PATH", model_path)
        .env("SUCCESS_TRAINER__PIPELINE__FOREST__N_ESTIMATORS", "40")
        .env("RUST_LOG", "warn")
        .output()
        .expect("Failed to execute command")
}

fn train_sample(dir: &TempDir, model_path: &Path) {
    let csv = dir.path().join("sample.csv");
    let output = successctl(
        &["generate-dataset", "--output", csv.to_str().unwrap()],
        model_path,
    );
    assert!(output.status.success(), "generate-dataset should succeed");

    let output = successctl(&["train", csv.to_str().unwrap()], model_path);
    assert!(
        output.status.success(),
        "train should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let dir = TempDir::new().unwrap();
    let output = successctl(&["--help"], &dir.path().join("model.json"));
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(stdout.contains("success predictor"), "Should show app name");
    assert!(stdout.contains("train"), "Should show train command");
    assert!(stdout.contains("predict"), "Should show predict command");
    assert!(stdout.contains("inspect"), "Should show inspect command");
    assert!(stdout.contains("generate-dataset"), "Should show generate-dataset command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let dir = TempDir::new().unwrap();
    let output = successctl(&["--version"], &dir.path().join("model.json"));
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("successctl"), "Should show binary name");
}

#[test]
fn test_generate_dataset_to_stdout() {
    let dir = TempDir::new().unwrap();
    let output = successctl(&["generate-dataset"], &dir.path().join("model.json"));
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines[0], "description,progress,created_at,outcome");
    assert_eq!(lines.len(), 46);
}

#[test]
fn test_predict_without_model_exits_with_code_2() {
    let dir = TempDir::new().unwrap();
    let output = successctl(
        &["predict", "--description", "Idea inicial"],
        &dir.path().join("model.json"),
    );
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr.contains("train the model first"));
}

#[test]
fn test_inspect_without_model_exits_with_code_2() {
    let dir = TempDir::new().unwrap();
    let output = successctl(&["inspect"], &dir.path().join("model.json"));
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_train_then_predict_json() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("models").join("model.json");
    train_sample(&dir, &model_path);
    assert!(model_path.exists());

    let output = successctl(
        &[
            "--format",
            "json",
            "predict",
            "--description",
            "Idea inicial sin desarrollo",
            "--progress",
            "5",
        ],
        &model_path,
    );
    assert!(output.status.success());

    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["label_index"], 0);
    assert_eq!(result["label"], "Low");
    assert_eq!(result["is_fallback"], false);
    let probabilities = result["probabilities"].as_object().unwrap();
    assert_eq!(probabilities.len(), 3);
    let sum: f64 = probabilities.values().map(|v| v.as_f64().unwrap()).sum();
    assert!((sum - 1.0).abs() < 1e-6);
}

#[test]
fn test_predict_from_input_file() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("model.json");
    train_sample(&dir, &model_path);

    let record = dir.path().join("record.json");
    std::fs::write(
        &record,
        r#"{"description": "500 clientes activos, $50K ingresos recurrentes mensuales", "progress": 90}"#,
    )
    .unwrap();

    let output = successctl(
        &["--format", "json", "predict", "--input", record.to_str().unwrap()],
        &model_path,
    );
    assert!(output.status.success());
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(result["label_index"], 2);
}

#[test]
fn test_inspect_after_training() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("model.json");
    train_sample(&dir, &model_path);

    let output = successctl(&["--format", "json", "inspect"], &model_path);
    assert!(output.status.success());
    let metadata: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(metadata["version"], "2.0");
    assert_eq!(metadata["rows_trained"], 45);
    assert_eq!(metadata["n_trees"], 40);
    assert_eq!(metadata["class_names"], serde_json::json!(["Low", "Medium", "High"]));
}

#[test]
fn test_train_rejects_csv_without_outcome() {
    let dir = TempDir::new().unwrap();
    let model_path = dir.path().join("model.json");
    let csv = dir.path().join("bad.csv");
    std::fs::write(&csv, "description,progress\nIdea inicial,5\n").unwrap();

    let output = successctl(&["train", csv.to_str().unwrap()], &model_path);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("outcome"));
    assert!(!model_path.exists());
}
