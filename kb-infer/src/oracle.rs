//! Policy-value oracle interface and baseline evaluators.

use kb_core::A;
use kb_features::{F, SCORE_DIFF_INDEX};
use thiserror::Error;

/// Encoded state, schema v1.
pub type Features = [f32; F];

/// One evaluator output: action priors + scalar value in [-1, 1], both from
/// the POV of the encoded player-to-move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub policy: [f32; A],
    pub value: f32,
}

#[derive(Debug, Clone, Error)]
pub enum OracleError {
    /// The evaluator itself failed. Not locally recoverable: a broken
    /// evaluator invalidates the whole decision.
    #[error("evaluator failed: {0}")]
    Eval(String),
    /// The dispatcher stopped while this request was pending.
    #[error("dispatcher is shutting down")]
    ShuttingDown,
}

/// Minimal evaluator interface shared by raw evaluators and the dispatcher.
pub trait Oracle: Send + Sync {
    fn infer(&self, features: &Features) -> Result<Evaluation, OracleError>;

    /// Batch-equivalent to calling `infer` once per element.
    fn infer_batch(&self, batch: &[Features]) -> Result<Vec<Evaluation>, OracleError> {
        batch.iter().map(|f| self.infer(f)).collect()
    }
}

/// Uniform policy + zero value (baseline stub).
pub struct UniformOracle;

impl Oracle for UniformOracle {
    fn infer(&self, _features: &Features) -> Result<Evaluation, OracleError> {
        Ok(Evaluation {
            policy: [1.0 / (A as f32); A],
            value: 0.0,
        })
    }
}

/// Uniform policy + score-difference value.
///
/// The value is read back from the encoded score-diff feature, so this
/// evaluator needs nothing beyond the feature vector. It stands in for the
/// learned network when none is loaded.
pub struct HeuristicOracle;

impl Oracle for HeuristicOracle {
    fn infer(&self, features: &Features) -> Result<Evaluation, OracleError> {
        Ok(Evaluation {
            policy: [1.0 / (A as f32); A],
            value: features[SCORE_DIFF_INDEX].clamp(-1.0, 1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_infer_batch_matches_per_element_infer() {
        let mut f1: Features = [0.0; F];
        f1[SCORE_DIFF_INDEX] = 0.25;
        let mut f2: Features = [0.0; F];
        f2[SCORE_DIFF_INDEX] = -0.5;

        let oracle = HeuristicOracle;
        let batch = oracle.infer_batch(&[f1, f2]).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0], oracle.infer(&f1).unwrap());
        assert_eq!(batch[1], oracle.infer(&f2).unwrap());
        assert_eq!(batch[0].value, 0.25);
        assert_eq!(batch[1].value, -0.5);
    }

    #[test]
    fn uniform_oracle_policy_sums_to_one() {
        let ev = UniformOracle.infer(&[0.0; F]).unwrap();
        let sum: f32 = ev.policy.iter().sum();
        assert!((sum - 1.0).abs() < 1e-6);
        assert_eq!(ev.value, 0.0);
    }
}
