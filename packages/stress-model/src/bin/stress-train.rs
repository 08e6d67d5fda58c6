//! stress-train CLI: fit a Random Forest on labelled physiological data and
//! write the JSON artifact the API loads.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use stress_model::train::{
    evaluate_classifier, train_forest, Dataset, ForestParams, MissingStrategy,
};
use stress_model::FEATURE_NAMES;

#[derive(Parser)]
#[command(name = "stress-train")]
#[command(about = "Train the stress level Random Forest")]
#[command(version)]
struct Cli {
    /// Labelled CSV with heart_rate, ecg, emg, gsr, resp and stress_level columns
    #[arg(short, long, default_value = "data/processed/stress_data.csv")]
    data: PathBuf,

    /// Output artifact path
    #[arg(short, long, default_value = "models/stress_model.json")]
    output: PathBuf,

    #[arg(long, default_value_t = 100)]
    n_estimators: usize,

    #[arg(long, default_value_t = 15)]
    max_depth: usize,

    #[arg(long, default_value_t = 5)]
    min_samples_split: usize,

    #[arg(long, default_value_t = 2)]
    min_samples_leaf: usize,

    /// Fraction of samples held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_size: f64,

    /// Random seed for reproducibility
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Samples to generate when the CSV does not exist
    #[arg(long, default_value_t = 1000)]
    synthetic_samples: usize,

    /// How to fill unparsable feature cells
    #[arg(long, value_enum, default_value = "mean")]
    missing: MissingArg,

    /// Drop rows with any |z-score| above this value
    #[arg(long)]
    outlier_threshold: Option<f64>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MissingArg {
    Mean,
    Median,
    Drop,
}

impl From<MissingArg> for MissingStrategy {
    fn from(arg: MissingArg) -> Self {
        match arg {
            MissingArg::Mean => MissingStrategy::Mean,
            MissingArg::Median => MissingStrategy::Median,
            MissingArg::Drop => MissingStrategy::Drop,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if !(0.0..1.0).contains(&cli.test_size) {
        anyhow::bail!("--test-size must be in [0, 1), got {}", cli.test_size);
    }

    let dataset = if cli.data.exists() {
        tracing::info!(path = %cli.data.display(), "loading training data");
        Dataset::from_csv(&cli.data)
            .with_context(|| format!("failed to read {}", cli.data.display()))?
    } else {
        tracing::warn!(
            path = %cli.data.display(),
            samples = cli.synthetic_samples,
            "training data not found, generating synthetic samples"
        );
        Dataset::synthetic(cli.synthetic_samples, cli.seed)
    };

    let mut dataset = dataset.handle_missing(cli.missing.into());
    if let Some(threshold) = cli.outlier_threshold {
        let before = dataset.len();
        dataset = dataset.remove_outliers(threshold);
        tracing::info!(removed = before - dataset.len(), threshold, "outliers removed");
    }

    let [low, medium, high] = dataset.class_counts();
    tracing::info!(samples = dataset.len(), low, medium, high, "dataset ready");

    let (train, test) = dataset.stratified_split(cli.test_size, cli.seed);
    tracing::info!(train = train.len(), test = test.len(), "stratified split");

    let params = ForestParams {
        n_estimators: cli.n_estimators,
        max_depth: cli.max_depth,
        min_samples_split: cli.min_samples_split,
        min_samples_leaf: cli.min_samples_leaf,
        seed: cli.seed,
        ..ForestParams::default()
    };

    let started = std::time::Instant::now();
    let mut forest = train_forest(&train, &params).context("training failed")?;
    tracing::info!(
        trees = forest.trees().len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "forest trained"
    );

    let train_report = evaluate_classifier(&forest, &train)?;
    tracing::info!(
        accuracy = train_report.accuracy,
        f1 = train_report.f1,
        "training set"
    );

    if !test.is_empty() {
        let test_report = evaluate_classifier(&forest, &test)?;
        tracing::info!(
            accuracy = test_report.accuracy,
            precision = test_report.precision,
            recall = test_report.recall,
            f1 = test_report.f1,
            "test set"
        );
        println!("Classification report:\n{test_report}\n");
        println!("Confusion matrix (rows = true, columns = predicted):\n{}\n", test_report.confusion);
        forest.metadata_mut().test_accuracy = Some(test_report.accuracy);
    }

    let mut ranked: Vec<(&str, f64)> = FEATURE_NAMES
        .iter()
        .copied()
        .zip(forest.feature_importances())
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!("Feature importances:");
    for (name, importance) in ranked {
        println!("  {name:<12} {importance:.4}");
    }

    forest
        .save(&cli.output)
        .with_context(|| format!("failed to write {}", cli.output.display()))?;
    tracing::info!(path = %cli.output.display(), "model saved");

    Ok(())
}
