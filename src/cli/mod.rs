//! Collective Memory CLI Module
//!
//! Command-line interface for uploading datasets, inspecting the memory and
//! managing model versions.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::MemoryConfig;
use crate::jobs::TrainingQueue;
use crate::prediction::Predictor;
use crate::registry::Stage;
use crate::storage::list_memories;
use crate::synthetic;
use crate::workflow::{Upload, Workflow, WorkflowOutcome};

// ─── Styling helpers ───────────────────────────────────────────────────────────

fn dim(s: &str) -> ColoredString { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString { s.truecolor(100, 210, 120) }

fn step_ok(msg: &str) {
    println!("  {} {}", ok("✓"), msg);
}

fn step_err(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

fn stage_label(stage: Stage) -> ColoredString {
    match stage {
        Stage::Production => "Production".green().bold(),
        Stage::Staging => "Staging".yellow(),
        Stage::Archived => dim("Archived"),
        Stage::None => dim("None"),
    }
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "collective-memory")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Accumulate uploaded datasets and retrain a versioned model on all of them")]
#[command(long_about = None)]
pub struct Cli {
    /// Object store directory (overrides MEMORY_STORE_DIR)
    #[arg(long, global = true)]
    pub store_dir: Option<PathBuf>,

    /// Model registry directory (overrides MEMORY_REGISTRY_DIR)
    #[arg(long, global = true)]
    pub registry_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Upload one or more CSV datasets; each one triggers a training run
    Upload {
        /// CSV files to upload
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List the datasets stored in the memory, newest first
    List,

    /// Retrain on the stored datasets without uploading anything
    Retrain,

    /// Show every registered model version
    History,

    /// Promote a version to Production
    Promote {
        /// Version number
        version: u64,
    },

    /// Show the parameters and metrics of a training run
    Run {
        /// Run id, as printed by `history`
        run_id: String,
    },

    /// Score inputs against the Production model
    Predict {
        /// Feature values in configured column order
        #[arg(required = true, num_args = 1..)]
        features: Vec<f64>,
    },

    /// Write a synthetic housing dataset
    Generate {
        /// Output CSV file
        #[arg(short, long, default_value = "test_data.csv")]
        output: PathBuf,

        /// Number of random rows (one duplicate id is appended)
        #[arg(short, long, default_value = "20")]
        rows: usize,

        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
    },
}

impl Cli {
    /// Environment configuration with command-line overrides applied
    pub fn config(&self) -> MemoryConfig {
        let mut config = MemoryConfig::default();
        if let Some(dir) = &self.store_dir {
            config = config.with_store_dir(dir);
        }
        if let Some(dir) = &self.registry_dir {
            config = config.with_registry_dir(dir);
        }
        config
    }
}

fn open_workflow(config: MemoryConfig) -> anyhow::Result<Workflow> {
    Ok(Workflow::from_config(config)?)
}

fn dataset_name(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid file name: {}", path.display()))
}

fn print_outcome(outcome: &WorkflowOutcome) {
    let response = outcome.response();
    match outcome {
        WorkflowOutcome::Done(summary) => {
            step_ok(&response.message);
            println!("  {:<16} {}", muted("Accuracy"), format!("{:.4}", summary.accuracy).white().bold());
            println!("  {:<16} {}", muted("Version"), format!("v{}", summary.version).white());
            println!(
                "  {:<16} {}",
                muted("Stage"),
                stage_label(if summary.promoted { Stage::Production } else { Stage::None })
            );
            println!("  {:<16} {}", muted("Sources"), summary.sources.join(", ").white());
            for skipped in &summary.skipped {
                println!("  {} {} {}", "!".yellow(), skipped.name, dim(&skipped.reason));
            }
        }
        WorkflowOutcome::Failed(failure) => {
            step_err(&format!("{} {}", failure.kind.to_string().red(), response.message));
            println!("  {:<16} {}", muted("Stage"), failure.stage.to_string().white());
        }
    }
}

pub async fn cmd_upload(config: MemoryConfig, files: &[PathBuf]) -> anyhow::Result<()> {
    section("Upload");
    let queue = TrainingQueue::new(Arc::new(open_workflow(config)?));

    let mut handles = Vec::with_capacity(files.len());
    for path in files {
        let name = dataset_name(path)?;
        let bytes = std::fs::read(path)?;
        step_ok(&format!("{} {}", name, dim(&format!("{} bytes", bytes.len()))));
        handles.push((name.clone(), queue.submit(Upload::new(name, bytes))));
    }

    let mut failed = 0;
    for (name, handle) in handles {
        let outcome = handle.wait().await?;
        section(&name);
        print_outcome(&outcome);
        if !outcome.is_done() {
            failed += 1;
        }
    }
    println!();

    if failed > 0 {
        anyhow::bail!("{} of {} uploads failed", failed, files.len());
    }
    Ok(())
}

pub fn cmd_list(config: MemoryConfig) -> anyhow::Result<()> {
    section("Collective Memory");
    let workflow = open_workflow(config)?;
    let entries = list_memories(workflow.store().as_ref(), &workflow.config().uploads_prefix)?;

    if entries.is_empty() {
        println!("  {}", dim("no datasets stored yet"));
    }
    for entry in entries {
        println!(
            "  {:<32} {:>10} {}  {}",
            entry.name.white(),
            format!("{:.2} KB", entry.size_kb),
            dim(&entry.updated.format("%Y-%m-%d %H:%M").to_string()),
            muted(entry.kind)
        );
    }
    println!();
    Ok(())
}

pub fn cmd_retrain(config: MemoryConfig) -> anyhow::Result<()> {
    section("Retrain");
    let workflow = open_workflow(config)?;
    step_run("Training on stored memory");
    let outcome = workflow.retrain();
    step_done(&format!("HTTP {}", outcome.status_code()));
    print_outcome(&outcome);
    println!();

    if let WorkflowOutcome::Failed(failure) = &outcome {
        anyhow::bail!("{}", failure.message);
    }
    Ok(())
}

pub fn cmd_history(config: MemoryConfig) -> anyhow::Result<()> {
    let workflow = open_workflow(config)?;
    let registry = workflow.registry();
    section(&format!("Model: {}", registry.model_name()));

    let history = registry.history()?;
    if history.is_empty() {
        println!("  {}", dim("no versions registered"));
    }
    for version in history {
        println!(
            "  {:<6} {:<12} {:<10} {}  {}",
            format!("v{}", version.version).white().bold(),
            stage_label(version.stage),
            format!("{:.4}", version.metric),
            dim(&version.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
            dim(&version.run_id)
        );
    }
    println!();
    Ok(())
}

pub fn cmd_promote(config: MemoryConfig, version: u64) -> anyhow::Result<()> {
    section("Promote");
    let workflow = open_workflow(config)?;
    let entry = workflow.registry().promote(version)?;
    step_ok(&format!("v{} is now {}", entry.version, stage_label(entry.stage)));
    println!();
    Ok(())
}

pub fn cmd_run(config: MemoryConfig, run_id: &str) -> anyhow::Result<()> {
    let workflow = open_workflow(config)?;
    let run = workflow.registry().run(run_id)?;
    section(&format!("Run {}", run.run_name()));

    println!("  {:<20} {}", muted("Status"), format!("{:?}", run.status()).white());
    println!("  {:<20} {}", muted("Duration"), format!("{:.3}s", run.duration_secs()).white());
    if let Some(reason) = run.failure() {
        println!("  {:<20} {}", muted("Failure"), reason.red());
    }
    for (key, value) in run.params() {
        println!("  {:<20} {}", muted(key), value.white());
    }
    for (name, value) in run.metrics() {
        println!("  {:<20} {}", muted(name), format!("{:.4}", value).white().bold());
    }
    println!();
    Ok(())
}

pub fn cmd_predict(config: MemoryConfig, features: &[f64]) -> anyhow::Result<()> {
    section("Predict");
    let workflow = open_workflow(config)?;
    let predictor = Predictor::new(workflow.registry().clone());
    let prediction = predictor.predict_features(features)?;

    println!("  {:<16} {}", muted("Version"), format!("v{}", prediction.version).white());
    println!("  {:<16} {}", muted("Value"), format!("{:.4}", prediction.value).white().bold());
    if let Some(p) = prediction.probability {
        println!("  {:<16} {}", muted("Probability"), format!("{:.4}", p).white());
    }
    if let Some(label) = prediction.label {
        println!("  {:<16} {}", muted("Label"), label.cyan().bold());
    }
    println!();
    Ok(())
}

pub fn cmd_generate(output: &Path, rows: usize, seed: Option<u64>) -> anyhow::Result<()> {
    section("Generate");
    step_run(&format!("Writing {}", output.display()));
    let mut df = synthetic::housing_frame(rows, seed)?;
    let bytes = synthetic::to_csv_bytes(&mut df)?;
    std::fs::write(output, bytes)?;
    step_done(&format!("{} rows (including duplicates)", df.height()));
    println!();
    Ok(())
}
