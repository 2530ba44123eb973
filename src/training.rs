use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use crate::config::TrainingConfig;
use crate::constants::MAJOR_STANDARD_COLUMN;
use crate::error::{PipelineError, Result};
use crate::model::{softmax, ModelArtifact};

/// Features and labels read back from a prepared CSV
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingData {
    pub feature_columns: Vec<String>,
    pub features: Vec<Vec<f64>>,
    pub labels: Vec<String>,
}

impl TrainingData {
    /// Every column except `major_standard` is a feature
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::InputNotFound(path.to_path_buf()));
        }

        let mut reader = csv::Reader::from_path(path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let label_index = headers
            .iter()
            .position(|h| h == MAJOR_STANDARD_COLUMN)
            .ok_or_else(|| PipelineError::MissingColumn(MAJOR_STANDARD_COLUMN.to_string()))?;

        let feature_columns: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != label_index)
            .map(|(_, h)| h.clone())
            .collect();

        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (row_index, record) in reader.records().enumerate() {
            let record = record?;
            let mut row = Vec::with_capacity(feature_columns.len());
            for (i, field) in record.iter().enumerate() {
                if i == label_index {
                    continue;
                }
                let value = field.trim().parse::<f64>().map_err(|_| PipelineError::InvalidValue {
                    row: row_index + 1,
                    column: headers.get(i).cloned().unwrap_or_default(),
                    value: field.to_string(),
                })?;
                row.push(value);
            }
            features.push(row);
            labels.push(record.get(label_index).unwrap_or_default().to_string());
        }

        info!(
            "Dataset loaded from {}: rows={}, features={}",
            path.display(),
            labels.len(),
            feature_columns.len()
        );
        Ok(Self {
            feature_columns,
            features,
            labels,
        })
    }
}

/// Maps labels to dense class indices in sorted order
#[derive(Debug, Clone, PartialEq)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit(labels: &[String]) -> Self {
        let classes: BTreeSet<&String> = labels.iter().collect();
        Self {
            classes: classes.into_iter().cloned().collect(),
        }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn encode(&self, label: &str) -> Option<usize> {
        self.classes
            .binary_search_by(|c| c.as_str().cmp(label))
            .ok()
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn transform(&self, labels: &[String]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|label| {
                self.encode(label)
                    .ok_or_else(|| PipelineError::Model(format!("unknown label '{}'", label)))
            })
            .collect()
    }
}

/// Per-class seeded shuffle, then `test_fraction` of each class held out.
///
/// Every class keeps at least one training row. Returns (train, test) row indices.
pub fn stratified_split(targets: &[usize], test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut by_class: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (row, class) in targets.iter().enumerate() {
        by_class.entry(*class).or_default().push(row);
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::new();
    let mut test = Vec::new();
    for (_, mut rows) in by_class {
        rows.shuffle(&mut rng);
        let n_test = ((rows.len() as f64 * test_fraction).round() as usize).min(rows.len() - 1);
        test.extend_from_slice(&rows[..n_test]);
        train.extend_from_slice(&rows[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    (train, test)
}

/// Full-batch gradient descent on the multinomial cross-entropy loss
pub fn fit_softmax_regression(
    features: &[Vec<f64>],
    targets: &[usize],
    n_classes: usize,
    iterations: usize,
    learning_rate: f64,
) -> (Vec<Vec<f64>>, Vec<f64>) {
    let n_features = features.first().map_or(0, Vec::len);
    let mut weights = vec![vec![0.0; n_features]; n_classes];
    let mut intercepts = vec![0.0; n_classes];
    if features.is_empty() {
        return (weights, intercepts);
    }
    let n = features.len() as f64;

    for _ in 0..iterations {
        let mut grad_w = vec![vec![0.0; n_features]; n_classes];
        let mut grad_b = vec![0.0; n_classes];

        for (x, target) in features.iter().zip(targets) {
            let scores: Vec<f64> = weights
                .iter()
                .zip(&intercepts)
                .map(|(w, b)| w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f64>() + b)
                .collect();
            let probs = softmax(&scores);

            for k in 0..n_classes {
                let error = probs[k] - if k == *target { 1.0 } else { 0.0 };
                grad_b[k] += error;
                for (g, xi) in grad_w[k].iter_mut().zip(x) {
                    *g += error * xi;
                }
            }
        }

        for k in 0..n_classes {
            intercepts[k] -= learning_rate * grad_b[k] / n;
            for (w, g) in weights[k].iter_mut().zip(&grad_w[k]) {
                *w -= learning_rate * g / n;
            }
        }
    }

    (weights, intercepts)
}

/// Share of rows whose argmax class matches the target
pub fn accuracy(model: &ModelArtifact, features: &[Vec<f64>], targets: &[usize]) -> f64 {
    if features.is_empty() {
        return 0.0;
    }
    let correct = features
        .iter()
        .zip(targets)
        .filter(|(x, target)| {
            let scores = model.decision_function(x);
            let best = scores
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i);
            best == Some(**target)
        })
        .count();
    correct as f64 / features.len() as f64
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub rows: usize,
    pub classes: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_accuracy: Option<f64>,
}

/// Encode labels, split, fit, and score the held-out rows
pub fn train(data: &TrainingData, config: &TrainingConfig) -> Result<(ModelArtifact, TrainingSummary)> {
    if data.labels.is_empty() {
        return Err(PipelineError::Model("training data is empty".to_string()));
    }

    let encoder = LabelEncoder::fit(&data.labels);
    let targets = encoder.transform(&data.labels)?;
    info!("Label encoding complete: classes={}", encoder.classes().len());

    let (train_rows, test_rows) = stratified_split(&targets, config.test_fraction, config.seed);
    info!(
        "Data split complete: train={}, test={}",
        train_rows.len(),
        test_rows.len()
    );

    let pick = |rows: &[usize]| -> (Vec<Vec<f64>>, Vec<usize>) {
        rows.iter()
            .map(|i| (data.features[*i].clone(), targets[*i]))
            .unzip()
    };
    let (x_train, y_train) = pick(&train_rows);
    let (x_test, y_test) = pick(&test_rows);

    let started = Instant::now();
    let (coefficients, intercepts) = fit_softmax_regression(
        &x_train,
        &y_train,
        encoder.classes().len(),
        config.iterations,
        config.learning_rate,
    );
    info!("Model training completed in {:.2?}", started.elapsed());

    let model = ModelArtifact {
        features: data.feature_columns.clone(),
        classes: encoder.classes().to_vec(),
        coefficients,
        intercepts,
    };

    let test_accuracy = if x_test.is_empty() {
        warn!("No held-out rows; skipping evaluation");
        None
    } else {
        let score = accuracy(&model, &x_test, &y_test);
        info!("Held-out accuracy: {:.3}", score);
        Some(score)
    };

    let summary = TrainingSummary {
        rows: data.labels.len(),
        classes: encoder.classes().len(),
        train_rows: train_rows.len(),
        test_rows: test_rows.len(),
        test_accuracy,
    };
    Ok((model, summary))
}
