//! Model configuration: score weights, bin count, segmentation thresholds.
//!
//! RULE: Nothing in the pipeline reads process-wide state.
//! Every stage receives its parameters from an RfmaConfig that has
//! passed validate() before the first record is touched.

use crate::{
    error::{RfmaError, RfmaResult},
    segmenter::{Segment, Segmenter},
    types::Score,
};
use serde::{Deserialize, Serialize};

// ── Weights ──────────────────────────────────────────────────────────────────

/// Per-axis weights of the composite score. Conventionally sum to 1.0;
/// the engine does not enforce that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub recency:   f64,
    pub frequency: f64,
    pub monetary:  f64,
    pub adherence: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            recency:   0.2,
            frequency: 0.2,
            monetary:  0.2,
            adherence: 0.4,
        }
    }
}

impl ScoreWeights {
    pub fn total(&self) -> f64 {
        self.recency + self.frequency + self.monetary + self.adherence
    }

    fn named(&self) -> [(&'static str, f64); 4] {
        [
            ("recency",   self.recency),
            ("frequency", self.frequency),
            ("monetary",  self.monetary),
            ("adherence", self.adherence),
        ]
    }
}

// ── Segmentation thresholds ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighValueThresholds {
    pub min_score:     f64,
    pub min_adherence: Score,
}

impl Default for HighValueThresholds {
    fn default() -> Self {
        Self { min_score: 4.5, min_adherence: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighRiskThresholds {
    pub min_score:     f64,
    pub max_adherence: Score,
}

impl Default for HighRiskThresholds {
    fn default() -> Self {
        Self { min_score: 3.0, max_adherence: 2 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnRiskThresholds {
    pub max_recency:   Score,
    pub min_adherence: Score,
}

impl Default for ChurnRiskThresholds {
    fn default() -> Self {
        Self { max_recency: 1, min_adherence: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowValueThresholds {
    pub max_score: f64,
}

impl Default for LowValueThresholds {
    fn default() -> Self {
        Self { max_score: 2.0 }
    }
}

/// Thresholds for the ordered segment rules. Rule order is fixed:
/// high_value, high_risk, churn_risk, low_value, then the normal fallback.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    pub high_value: HighValueThresholds,
    pub high_risk:  HighRiskThresholds,
    pub churn_risk: ChurnRiskThresholds,
    pub low_value:  LowValueThresholds,
}

// ── Top-level config ─────────────────────────────────────────────────────────

/// Upper bound on `score_bins`. The overlap report walks all bins^4 score
/// combinations.
pub const MAX_SCORE_BINS: Score = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RfmaConfig {
    pub weights:      ScoreWeights,
    pub score_bins:   Score,
    pub segmentation: SegmentationConfig,
}

impl Default for RfmaConfig {
    fn default() -> Self {
        Self {
            weights:      ScoreWeights::default(),
            score_bins:   5,
            segmentation: SegmentationConfig::default(),
        }
    }
}

impl RfmaConfig {
    /// Load from a JSON file. Fields the file omits keep their defaults.
    /// Does not validate; RfmaEngine::new() does that.
    pub fn load(path: &str) -> RfmaResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: RfmaConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Reject configurations no run could use. Overlapping segment rules
    /// are legal (first rule wins) and are only logged.
    pub fn validate(&self) -> RfmaResult<()> {
        if !(2..=MAX_SCORE_BINS).contains(&self.score_bins) {
            return Err(RfmaError::config(format!(
                "score_bins must be between 2 and {MAX_SCORE_BINS}, got {}",
                self.score_bins
            )));
        }

        for (name, weight) in self.weights.named() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RfmaError::config(format!(
                    "weights.{name} must be a finite non-negative number, got {weight}"
                )));
            }
        }

        let seg = &self.segmentation;
        let composite_thresholds = [
            ("segmentation.high_value.min_score", seg.high_value.min_score),
            ("segmentation.high_risk.min_score",  seg.high_risk.min_score),
            ("segmentation.low_value.max_score",  seg.low_value.max_score),
        ];
        for (field, value) in composite_thresholds {
            if !value.is_finite() || value < 0.0 {
                return Err(RfmaError::config(format!(
                    "{field} must be a finite non-negative number, got {value}"
                )));
            }
        }

        let ordinal_thresholds = [
            ("segmentation.high_value.min_adherence", seg.high_value.min_adherence),
            ("segmentation.high_risk.max_adherence",  seg.high_risk.max_adherence),
            ("segmentation.churn_risk.max_recency",   seg.churn_risk.max_recency),
            ("segmentation.churn_risk.min_adherence", seg.churn_risk.min_adherence),
        ];
        for (field, value) in ordinal_thresholds {
            if value > self.score_bins {
                return Err(RfmaError::config(format!(
                    "{field} = {value} exceeds score_bins = {}",
                    self.score_bins
                )));
            }
        }

        for (first, second) in self.overlapping_rules() {
            log::warn!(
                "segment rules {first} and {second} can match the same patient; \
                 {first} wins because it is evaluated first"
            );
        }

        Ok(())
    }

    /// Pairs of segment rules that some score combination satisfies at once,
    /// listed in evaluation order.
    pub fn overlapping_rules(&self) -> Vec<(Segment, Segment)> {
        Segmenter::from_config(&self.segmentation)
            .overlapping_rules(&self.weights, self.score_bins)
    }
}
