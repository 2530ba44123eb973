//! Prediction glue over a trained multinomial logistic model.
//!
//! The model is stored as a JSON artifact holding the feature column order,
//! the class labels, and one coefficient row plus intercept per class.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::constants::TOP_K_PREDICTIONS;
use crate::error::{PipelineError, Result};

/// A trained classifier that scores a fixed-length feature vector
pub trait Classifier {
    fn classes(&self) -> &[String];

    fn feature_count(&self) -> usize;

    /// One probability per class, in `classes()` order
    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>>;
}

/// Serialized multinomial logistic regression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub features: Vec<String>,
    pub classes: Vec<String>,
    /// `classes.len()` rows of `features.len()` weights
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl ModelArtifact {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingResource(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&content)?;
        artifact.validate()?;
        info!(
            "Loaded model from {}: {} features, {} classes",
            path.display(),
            artifact.features.len(),
            artifact.classes.len()
        );
        Ok(artifact)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.classes.is_empty() {
            return Err(PipelineError::Model("model has no classes".to_string()));
        }
        if self.coefficients.len() != self.classes.len() || self.intercepts.len() != self.classes.len() {
            return Err(PipelineError::Model(format!(
                "expected {} coefficient rows and intercepts, found {} and {}",
                self.classes.len(),
                self.coefficients.len(),
                self.intercepts.len()
            )));
        }
        if let Some(row) = self.coefficients.iter().find(|row| row.len() != self.features.len()) {
            return Err(PipelineError::Model(format!(
                "coefficient row has {} weights, expected {}",
                row.len(),
                self.features.len()
            )));
        }
        Ok(())
    }

    /// Raw per-class scores before softmax
    pub fn decision_function(&self, features: &[f64]) -> Vec<f64> {
        self.coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(weights, intercept)| {
                weights.iter().zip(features).map(|(w, x)| w * x).sum::<f64>() + intercept
            })
            .collect()
    }
}

impl Classifier for ModelArtifact {
    fn classes(&self) -> &[String] {
        &self.classes
    }

    fn feature_count(&self) -> usize {
        self.features.len()
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>> {
        validate_input(features, self.feature_count())?;
        Ok(softmax(&self.decision_function(features)))
    }
}

/// Numerically stable softmax
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scores.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedMajor {
    pub major: String,
    pub probability: f64,
}

/// Prediction response: best major plus the top five candidates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub predicted_major: String,
    pub top_5_predictions: Vec<RankedMajor>,
}

/// Score one respondent and rank the candidate majors
pub fn predict(classifier: &dyn Classifier, features: &[f64]) -> Result<Prediction> {
    let probabilities = classifier.predict_proba(features)?;
    let classes = classifier.classes();

    let mut order: Vec<usize> = (0..probabilities.len()).collect();
    // stable sort keeps class order on equal probabilities
    order.sort_by(|a, b| probabilities[*b].total_cmp(&probabilities[*a]));

    let predicted_major = order
        .first()
        .map(|i| classes[*i].clone())
        .ok_or_else(|| PipelineError::Model("model has no classes".to_string()))?;

    let top_5_predictions = order
        .iter()
        .take(TOP_K_PREDICTIONS)
        .map(|i| RankedMajor {
            major: classes[*i].clone(),
            probability: round3(probabilities[*i]),
        })
        .collect();

    debug!("Predicted {}", predicted_major);
    Ok(Prediction {
        predicted_major,
        top_5_predictions,
    })
}

fn validate_input(features: &[f64], expected: usize) -> Result<()> {
    if features.len() != expected {
        return Err(PipelineError::InvalidInput(format!(
            "expected {} feature values, got {}",
            expected,
            features.len()
        )));
    }
    if let Some(position) = features.iter().position(|v| !v.is_finite()) {
        return Err(PipelineError::InvalidInput(format!(
            "feature {} is not a finite number",
            position
        )));
    }
    Ok(())
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact(classes: &[&str]) -> ModelArtifact {
        // class k prefers feature k
        let n = classes.len();
        ModelArtifact {
            features: (0..n).map(|i| format!("F{}", i)).collect(),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            coefficients: (0..n)
                .map(|k| (0..n).map(|j| if j == k { 4.0 } else { 0.0 }).collect())
                .collect(),
            intercepts: vec![0.0; n],
        }
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let probs = softmax(&[1000.0, 1000.0, 999.0]);
        let total: f64 = probs.iter().sum();
        assert!((total - 1.0).abs() < 1e-12);
        assert!(probs[0] > probs[2]);
    }

    #[test]
    fn test_predict_ranks_top_five() {
        let model = artifact(&["Art", "Biology", "Law", "Music", "Nursing", "Physics"]);
        let mut features = vec![0.0; 6];
        features[2] = 1.0;

        let prediction = predict(&model, &features).unwrap();
        assert_eq!(prediction.predicted_major, "Law");
        assert_eq!(prediction.top_5_predictions.len(), 5);
        assert_eq!(prediction.top_5_predictions[0].major, "Law");
        // remaining classes tie; class order decides
        assert_eq!(prediction.top_5_predictions[1].major, "Art");
        let p = prediction.top_5_predictions[0].probability;
        assert_eq!(p, (p * 1000.0).round() / 1000.0);
    }

    #[test]
    fn test_predict_rejects_wrong_length() {
        let model = artifact(&["Art", "Law"]);
        let result = predict(&model, &[0.5]);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn test_predict_rejects_nan() {
        let model = artifact(&["Art", "Law"]);
        let result = predict(&model, &[0.5, f64::NAN]);
        assert!(matches!(result, Err(PipelineError::InvalidInput(_))));
    }

    #[test]
    fn test_artifact_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model").join("logreg_model.json");
        let model = artifact(&["Art", "Law"]);

        model.save(&path).unwrap();
        assert_eq!(ModelArtifact::load(&path).unwrap(), model);
    }

    #[test]
    fn test_validate_catches_shape_mismatch() {
        let mut model = artifact(&["Art", "Law"]);
        model.intercepts.pop();
        assert!(matches!(model.validate(), Err(PipelineError::Model(_))));
    }
}
