//! The `bat` subcommands.
//!
//! Human-readable output goes to stdout with `println!`; diagnostics go
//! through `tracing` to stderr.

use anyhow::{Context, Result};
use bat_forecast::predict::{default_values, parse_assignments};
use bat_forecast::schema::resolve_excluding;
use bat_forecast::{
    Dataset, DatasetSummary, ExperimentOptions, FeatureKind, FeatureSchema, Leaderboard,
    PredictionResult, SessionHandle, WorkflowController,
};
use bat_learning::PyCaretEngine;
use std::path::{Path, PathBuf};
use tracing::info;

/// Everything `bat forecast` needs.
#[derive(Debug)]
pub struct ForecastRequest {
    pub file: PathBuf,
    pub target: String,
    pub exclude: Vec<String>,
    pub options: ExperimentOptions,
    pub values: Vec<String>,
    pub json: bool,
}

pub fn describe(file: &Path) -> Result<()> {
    let dataset = Dataset::from_path(file)?;
    print_summary(&dataset.summary());
    Ok(())
}

pub fn schema(file: &Path, target: &str, exclude: &[String]) -> Result<()> {
    let dataset = Dataset::from_path(file)?;
    let schema = resolve_excluding(&dataset, target, exclude)?;
    print_schema(&schema);
    Ok(())
}

pub async fn forecast(request: ForecastRequest) -> Result<()> {
    let dataset = Dataset::from_path(&request.file)?;

    let engine = PyCaretEngine::new().context("PyCaret is not available")?;
    let controller = WorkflowController::builder(engine)
        .options(request.options)
        .on_transition(|t| info!("Session is now {} (after {})", t.to, t.action))
        .build()?;
    let session = SessionHandle::new(controller);

    session.load_dataset(dataset);
    if !request.exclude.is_empty() {
        session.exclude_columns(request.exclude)?;
    }
    let schema = session.select_target(&request.target)?;
    // Parse before training so a typo does not cost a full model search.
    let overrides = parse_assignments(&schema, &request.values)?;

    info!("Comparing models for '{}'...", request.target);
    let outcome = session.start_training().await?;

    let mut values = default_values(&schema);
    values.extend(overrides);
    let result = session.predict(&values)?;

    if request.json {
        let document = serde_json::json!({
            "session": session.status(),
            "prediction": result,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    print_schema(&schema);
    print_leaderboard(outcome.leaderboard());
    print_prediction(&result);
    Ok(())
}

fn rule(c: char) -> String {
    c.to_string().repeat(80)
}

fn print_summary(summary: &DatasetSummary) {
    println!("\n{}", rule('='));
    println!("DATASET: {}", summary.name);
    println!("{}\n", rule('='));
    println!("  Rows: {}", summary.rows);
    println!("  Columns: {}", summary.columns);
    println!("  Missing values: {}", summary.missing_values);
    println!("  Memory: {:.1} KiB", summary.memory_bytes as f64 / 1024.0);
    println!();

    println!(
        "{:<24} {:<14} {:<12} {:<10}",
        "Column", "Type", "Kind", "Missing"
    );
    println!("{}", "-".repeat(62));
    for column in &summary.column_summaries {
        println!(
            "{:<24} {:<14} {:<12} {:<10}",
            truncate_str(&column.name, 23),
            truncate_str(&column.dtype, 13),
            column.kind.as_str(),
            column.missing
        );
    }
    println!();
}

fn print_schema(schema: &FeatureSchema) {
    println!("\nFEATURES (target: {}, schema {})", schema.target(), schema.fingerprint());
    println!("{}", "-".repeat(62));
    for feature in schema.features() {
        let default = match &feature.kind {
            FeatureKind::Numeric { mean } => format!("mean {mean:.2}"),
            FeatureKind::Categorical { candidates } => {
                format!("{} values, e.g. {}", candidates.len(), candidates.join(", "))
            }
        };
        println!(
            "  {:<22} {:<12} {}",
            truncate_str(&feature.name, 21),
            feature.kind.column_kind().as_str(),
            truncate_str(&default, 40)
        );
    }
    if !schema.excluded().is_empty() {
        println!("  excluded: {}", schema.excluded().join(", "));
    }
    println!();
}

fn print_leaderboard(board: &Leaderboard) {
    println!("BEST MODEL");
    println!("{}", "-".repeat(62));
    println!("  {board}");
    for (name, value) in &board.metrics {
        println!("    {:<12} {:.4}", name, value);
    }
    println!();
}

fn print_prediction(result: &PredictionResult) {
    println!("{}", rule('='));
    println!("{result}");
    println!("{}", rule('='));
    for warning in &result.warnings {
        println!("  warning: {warning}");
    }
}

fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}
