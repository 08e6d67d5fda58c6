//! Training data: CSV loading, synthetic generation and preprocessing.

use std::io::Read;
use std::path::Path;

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use crate::mock::CLASS_PROTOTYPES;
use crate::types::{StressLevel, CLASS_COUNT, FEATURE_COUNT, FEATURE_NAMES, FEATURE_SPECS};

/// Column consulted first for labels; otherwise the last column is used.
pub const LABEL_COLUMN: &str = "stress_level";

const SYNTHETIC_HEART_RATE_JITTER: f64 = 15.0;
const SYNTHETIC_SIGNAL_JITTER: f64 = 0.2;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("missing feature column '{0}'")]
    MissingColumn(&'static str),
    #[error("no label column: expected '{}' or a trailing non-feature column", LABEL_COLUMN)]
    NoLabelColumn,
    #[error("row {row}: unrecognized label '{value}'")]
    BadLabel { row: usize, value: String },
    #[error("feature and label counts differ ({features} vs {labels})")]
    LengthMismatch { features: usize, labels: usize },
}

/// Strategy for cells that could not be parsed as numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingStrategy {
    Mean,
    Median,
    Drop,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    pub features: Vec<[f64; FEATURE_COUNT]>,
    pub labels: Vec<StressLevel>,
}

impl Dataset {
    pub fn new(
        features: Vec<[f64; FEATURE_COUNT]>,
        labels: Vec<StressLevel>,
    ) -> Result<Self, DatasetError> {
        if features.len() != labels.len() {
            return Err(DatasetError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }
        Ok(Self { features, labels })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn from_csv(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
        Self::from_reader(file)
    }

    /// Reads a headered CSV. Feature columns are located by name, so column
    /// order in the file does not matter.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DatasetError> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = rdr
            .headers()?
            .iter()
            .map(|h| h.to_ascii_lowercase())
            .collect();

        let mut columns = [0usize; FEATURE_COUNT];
        for (slot, name) in columns.iter_mut().zip(FEATURE_NAMES) {
            *slot = headers
                .iter()
                .position(|h| h == name)
                .ok_or(DatasetError::MissingColumn(name))?;
        }

        let label_column = headers
            .iter()
            .position(|h| h == LABEL_COLUMN)
            .or_else(|| headers.len().checked_sub(1))
            .filter(|idx| !columns.contains(idx))
            .ok_or(DatasetError::NoLabelColumn)?;

        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;

            let raw_label = record.get(label_column).unwrap_or_default();
            let label = StressLevel::parse_label(raw_label).ok_or_else(|| DatasetError::BadLabel {
                row: row + 1,
                value: raw_label.to_string(),
            })?;

            let mut sample = [f64::NAN; FEATURE_COUNT];
            for (slot, &col) in sample.iter_mut().zip(columns.iter()) {
                if let Some(value) = record.get(col).and_then(|v| v.parse::<f64>().ok()) {
                    *slot = value;
                }
            }

            features.push(sample);
            labels.push(label);
        }

        Self::new(features, labels)
    }

    /// Samples jittered around the class prototypes, clamped to the
    /// advisory feature ranges.
    pub fn synthetic(samples: usize, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut features = Vec::with_capacity(samples);
        let mut labels = Vec::with_capacity(samples);

        for _ in 0..samples {
            let class = rng.gen_range(0..CLASS_COUNT);
            let prototype = CLASS_PROTOTYPES[class];

            let mut sample = [0.0; FEATURE_COUNT];
            for (j, slot) in sample.iter_mut().enumerate() {
                let jitter = if j == 0 {
                    SYNTHETIC_HEART_RATE_JITTER
                } else {
                    SYNTHETIC_SIGNAL_JITTER
                };
                let spec = &FEATURE_SPECS[j];
                *slot = (prototype[j] + rng.gen_range(-jitter..jitter)).clamp(spec.min, spec.max);
            }

            features.push(sample);
            // class < CLASS_COUNT so from_index always succeeds
            labels.push(StressLevel::from_index(class).unwrap_or(StressLevel::Low));
        }

        Self { features, labels }
    }

    pub fn class_counts(&self) -> [usize; CLASS_COUNT] {
        let mut counts = [0; CLASS_COUNT];
        for label in &self.labels {
            counts[label.index()] += 1;
        }
        counts
    }

    pub fn has_missing(&self) -> bool {
        self.features
            .iter()
            .any(|row| row.iter().any(|v| !v.is_finite()))
    }

    /// Fills or drops samples with missing values.
    pub fn handle_missing(self, strategy: MissingStrategy) -> Self {
        match strategy {
            MissingStrategy::Drop => self.retain(|row| row.iter().all(|v| v.is_finite())),
            MissingStrategy::Mean | MissingStrategy::Median => {
                let mut fills = [0.0; FEATURE_COUNT];
                for (j, fill) in fills.iter_mut().enumerate() {
                    let mut column: Vec<f64> = self
                        .features
                        .iter()
                        .map(|row| row[j])
                        .filter(|v| v.is_finite())
                        .collect();
                    *fill = match strategy {
                        MissingStrategy::Mean => mean(&column),
                        _ => median(&mut column),
                    };
                }

                let features = self
                    .features
                    .into_iter()
                    .map(|mut row| {
                        for (v, fill) in row.iter_mut().zip(fills) {
                            if !v.is_finite() {
                                *v = fill;
                            }
                        }
                        row
                    })
                    .collect();

                Self {
                    features,
                    labels: self.labels,
                }
            }
        }
    }

    /// Drops samples whose per-column z-score reaches `threshold`.
    pub fn remove_outliers(self, threshold: f64) -> Self {
        let mut stats = [(0.0, 0.0); FEATURE_COUNT];
        for (j, stat) in stats.iter_mut().enumerate() {
            let column: Vec<f64> = self.features.iter().map(|row| row[j]).collect();
            let mu = mean(&column);
            let var = if column.is_empty() {
                0.0
            } else {
                column.iter().map(|v| (v - mu).powi(2)).sum::<f64>() / column.len() as f64
            };
            *stat = (mu, var.sqrt());
        }

        self.retain(|row| {
            row.iter().zip(stats.iter()).all(|(v, (mu, sd))| {
                if *sd <= f64::EPSILON {
                    true
                } else {
                    ((v - mu) / sd).abs() < threshold
                }
            })
        })
    }

    /// Splits each class separately so both halves keep the class mix.
    pub fn stratified_split(&self, test_size: f64, seed: u64) -> (Dataset, Dataset) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let test_size = test_size.clamp(0.0, 1.0);

        let mut train = Dataset::default();
        let mut test = Dataset::default();

        for level in StressLevel::ALL {
            let mut indices: Vec<usize> = (0..self.len())
                .filter(|&i| self.labels[i] == level)
                .collect();
            indices.shuffle(&mut rng);

            let mut n_test = (indices.len() as f64 * test_size).round() as usize;
            if indices.len() >= 2 {
                n_test = n_test.min(indices.len() - 1);
            }

            for (pos, &i) in indices.iter().enumerate() {
                let target = if pos < n_test { &mut test } else { &mut train };
                target.features.push(self.features[i]);
                target.labels.push(self.labels[i]);
            }
        }

        (train, test)
    }

    fn retain(self, keep: impl Fn(&[f64; FEATURE_COUNT]) -> bool) -> Self {
        let (features, labels) = self
            .features
            .into_iter()
            .zip(self.labels)
            .filter(|(row, _)| keep(row))
            .unzip();
        Self { features, labels }
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
resp,heart_rate,ecg,emg,gsr,stress_level
0.3,70,0.3,0.2,0.1,low
0.7,110,0.8,0.7,0.6,high
,95,0.5,0.5,0.5,1
0.5,90,abc,0.5,0.4,medium
";

    #[test]
    fn test_csv_columns_located_by_name() {
        let ds = Dataset::from_reader(CSV.as_bytes()).unwrap();
        assert_eq!(ds.len(), 4);
        assert_eq!(ds.features[0], [70.0, 0.3, 0.2, 0.1, 0.3]);
        assert_eq!(
            ds.labels,
            vec![
                StressLevel::Low,
                StressLevel::High,
                StressLevel::Medium,
                StressLevel::Medium
            ]
        );
        assert!(ds.features[2][4].is_nan());
        assert!(ds.features[3][1].is_nan());
        assert!(ds.has_missing());
    }

    #[test]
    fn test_csv_missing_feature_column() {
        let csv = "heart_rate,ecg,emg,gsr,label\n70,0.3,0.2,0.1,low\n";
        assert!(matches!(
            Dataset::from_reader(csv.as_bytes()).unwrap_err(),
            DatasetError::MissingColumn("resp")
        ));
    }

    #[test]
    fn test_csv_trailing_label_column_and_bad_label() {
        let csv = "heart_rate,ecg,emg,gsr,resp,target\n70,0.3,0.2,0.1,0.3,2\n";
        let ds = Dataset::from_reader(csv.as_bytes()).unwrap();
        assert_eq!(ds.labels, vec![StressLevel::High]);

        let csv = "heart_rate,ecg,emg,gsr,resp,target\n70,0.3,0.2,0.1,0.3,severe\n";
        assert!(matches!(
            Dataset::from_reader(csv.as_bytes()).unwrap_err(),
            DatasetError::BadLabel { row: 1, .. }
        ));

        let csv = "target,heart_rate,ecg,emg,gsr,resp\nlow,70,0.3,0.2,0.1,0.3\n";
        assert!(matches!(
            Dataset::from_reader(csv.as_bytes()).unwrap_err(),
            DatasetError::NoLabelColumn
        ));
    }

    #[test]
    fn test_missing_value_strategies() {
        let ds = Dataset::from_reader(CSV.as_bytes()).unwrap();

        let dropped = ds.clone().handle_missing(MissingStrategy::Drop);
        assert_eq!(dropped.len(), 2);
        assert!(!dropped.has_missing());

        let filled = ds.clone().handle_missing(MissingStrategy::Mean);
        assert_eq!(filled.len(), 4);
        assert!((filled.features[2][4] - 0.5).abs() < 1e-12);

        let filled = ds.handle_missing(MissingStrategy::Median);
        assert!((filled.features[3][1] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_remove_outliers() {
        let mut features = vec![[70.0, 0.5, 0.5, 0.5, 0.5]; 20];
        features.push([400.0, 0.5, 0.5, 0.5, 0.5]);
        let labels = vec![StressLevel::Low; 21];
        let ds = Dataset::new(features, labels).unwrap();

        let cleaned = ds.remove_outliers(3.0);
        assert_eq!(cleaned.len(), 20);
        assert!(cleaned.features.iter().all(|row| row[0] == 70.0));
    }

    #[test]
    fn test_synthetic_is_seeded_and_in_range() {
        let a = Dataset::synthetic(200, 42);
        let b = Dataset::synthetic(200, 42);
        assert_eq!(a, b);
        assert_ne!(a, Dataset::synthetic(200, 7));

        for row in &a.features {
            for (v, spec) in row.iter().zip(FEATURE_SPECS.iter()) {
                assert!(spec.in_advisory_range(*v));
            }
        }
        assert!(a.class_counts().iter().all(|&c| c > 0));
    }

    #[test]
    fn test_stratified_split_keeps_every_class() {
        let ds = Dataset::synthetic(300, 42);
        let (train, test) = ds.stratified_split(0.2, 42);
        assert_eq!(train.len() + test.len(), 300);

        let counts = ds.class_counts();
        let test_counts = test.class_counts();
        for c in 0..CLASS_COUNT {
            let expected = (counts[c] as f64 * 0.2).round() as usize;
            assert_eq!(test_counts[c], expected);
        }
    }
}
