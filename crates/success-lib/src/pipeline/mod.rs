//! Fitted classification pipeline
//!
//! `[tfidf(description) | standardize(impute(numeric features))]` fed into a
//! class-balanced random forest. The whole pipeline is serializable and is
//! what the model store persists.

mod forest;
mod numeric;
mod text;

pub use forest::{ClassWeight, DecisionTree, ForestConfig, MaxFeatures, RandomForest, TreeNode};
pub use numeric::{MedianImputer, NumericTransform, StandardScaler};
pub use text::{TfidfConfig, TfidfVectorizer};

use crate::error::{Result, SuccessError};
use crate::models::{FeatureVector, OutcomeLabel};
use ndarray::{concatenate, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Settings for both pipeline stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tfidf: TfidfConfig,
    pub forest: ForestConfig,
}

/// Text + numeric transform and the classifier fitted on top of it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessPipeline {
    tfidf: TfidfVectorizer,
    numeric: NumericTransform,
    forest: RandomForest,
}

impl SuccessPipeline {
    pub fn fit(
        features: &[FeatureVector],
        labels: &[OutcomeLabel],
        config: &PipelineConfig,
    ) -> Result<Self> {
        if features.len() != labels.len() {
            return Err(SuccessError::Input(format!(
                "{} feature rows but {} labels",
                features.len(),
                labels.len()
            )));
        }

        let texts: Vec<&str> = features.iter().map(|f| f.text.as_str()).collect();
        let mut tfidf = TfidfVectorizer::new(config.tfidf.clone());
        tfidf.fit(&texts)?;

        let mut numeric = NumericTransform::default();
        let numeric_block = numeric.fit_transform(numeric_matrix(features));
        let x = hstack(tfidf.transform(&texts), numeric_block)?;

        let y: Vec<usize> = labels.iter().map(|l| l.index()).collect();
        let forest = RandomForest::fit(&x, &y, OutcomeLabel::COUNT, &config.forest)?;

        Ok(Self { tfidf, numeric, forest })
    }

    /// Class probabilities, one row per feature vector, columns in class-index order
    pub fn predict_proba(&self, features: &[FeatureVector]) -> Result<Array2<f64>> {
        let texts: Vec<&str> = features.iter().map(|f| f.text.as_str()).collect();
        let numeric_block = self.numeric.transform(numeric_matrix(features))?;
        let x = hstack(self.tfidf.transform(&texts), numeric_block)?;
        self.forest.predict_proba(&x)
    }

    pub fn predict_proba_one(&self, features: &FeatureVector) -> Result<Vec<f64>> {
        let proba = self.predict_proba(std::slice::from_ref(features))?;
        Ok(proba.row(0).to_vec())
    }

    pub fn vocabulary_size(&self) -> usize {
        self.tfidf.n_features()
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }

    pub fn n_input_features(&self) -> usize {
        self.forest.n_features()
    }
}

fn numeric_matrix(features: &[FeatureVector]) -> Array2<f64> {
    let mut m = Array2::zeros((features.len(), FeatureVector::NUM_NUMERIC));
    for (r, f) in features.iter().enumerate() {
        for (c, v) in f.numeric_values().into_iter().enumerate() {
            m[[r, c]] = v;
        }
    }
    m
}

fn hstack(text: Array2<f64>, numeric: Array2<f64>) -> Result<Array2<f64>> {
    concatenate(Axis(1), &[text.view(), numeric.view()])
        .map_err(|e| SuccessError::Inference(format!("cannot combine feature blocks: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProjectRecord;
    use crate::predictor::FeatureExtractor;
    use chrono::{TimeZone, Utc};

    fn toy_features() -> (Vec<FeatureVector>, Vec<OutcomeLabel>) {
        let extractor = FeatureExtractor::at(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let rows = [
            ("Idea inicial sin equipo", 5, OutcomeLabel::Low),
            ("Concepto inicial en exploración", 8, OutcomeLabel::Low),
            ("Idea sin validación", 3, OutcomeLabel::Low),
            ("MVP en desarrollo con feedback", 55, OutcomeLabel::Medium),
            ("Prototipo en pruebas beta", 50, OutcomeLabel::Medium),
            ("MVP con primeros clientes", 60, OutcomeLabel::Medium),
            ("500 clientes activos y $50K MRR", 92, OutcomeLabel::High),
            ("Ventas recurrentes, 20 empleados", 90, OutcomeLabel::High),
            ("Crecimiento 30% mensual con funding", 95, OutcomeLabel::High),
        ];
        let features = rows
            .iter()
            .map(|(d, p, _)| extractor.extract(&ProjectRecord::new(*d).with_progress(*p)))
            .collect();
        let labels = rows.iter().map(|(_, _, l)| *l).collect();
        (features, labels)
    }

    #[test]
    fn test_pipeline_fit_and_predict_shape() {
        let (features, labels) = toy_features();
        let config = PipelineConfig {
            forest: ForestConfig::default().with_n_estimators(20),
            ..Default::default()
        };
        let pipeline = SuccessPipeline::fit(&features, &labels, &config).unwrap();
        assert_eq!(pipeline.n_trees(), 20);
        assert_eq!(
            pipeline.n_input_features(),
            pipeline.vocabulary_size() + FeatureVector::NUM_NUMERIC
        );

        let proba = pipeline.predict_proba(&features).unwrap();
        assert_eq!(proba.dim(), (features.len(), OutcomeLabel::COUNT));
        for row in proba.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_pipeline_round_trips_through_json() {
        let (features, labels) = toy_features();
        let config = PipelineConfig {
            forest: ForestConfig::default().with_n_estimators(10),
            ..Default::default()
        };
        let pipeline = SuccessPipeline::fit(&features, &labels, &config).unwrap();
        let json = serde_json::to_string(&pipeline).unwrap();
        let restored: SuccessPipeline = serde_json::from_str(&json).unwrap();
        assert_eq!(
            pipeline.predict_proba_one(&features[0]).unwrap(),
            restored.predict_proba_one(&features[0]).unwrap()
        );
    }

    #[test]
    fn test_mismatched_labels_rejected() {
        let (features, labels) = toy_features();
        let err = SuccessPipeline::fit(&features, &labels[..2], &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, SuccessError::Input(_)));
    }
}
