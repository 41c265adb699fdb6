//! Segmenter: ordered, first-match-wins classification of scored patients.
//!
//! EVALUATION ORDER (fixed, documented, never reordered):
//!   1. High-value   RFMA ≥ min_score  AND  A ≥ min_adherence
//!   2. High-risk    RFMA ≥ min_score  AND  A ≤ max_adherence
//!   3. Churn-risk   R ≤ max_recency   AND  A ≥ min_adherence
//!   4. Low-value    RFMA ≤ max_score
//!   5. Normal       fallback
//!
//! Rules are not mutually exclusive. When thresholds overlap, the earlier
//! rule wins; that is the tie-break, not a conflict.

use crate::{
    config::{ScoreWeights, SegmentationConfig},
    error::{RfmaError, RfmaResult, Stage},
    record::{PatientProfile, ResultRecord, ScoredRecord},
    scorer::Scorer,
    types::{PatientId, Score},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

// ── Segment labels ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Segment {
    HighValue,
    HighRisk,
    ChurnRisk,
    LowValue,
    Normal,
}

impl Segment {
    pub const ALL: [Segment; 5] = [
        Segment::HighValue,
        Segment::HighRisk,
        Segment::ChurnRisk,
        Segment::LowValue,
        Segment::Normal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Segment::HighValue => "high_value",
            Segment::HighRisk  => "high_risk",
            Segment::ChurnRisk => "churn_risk",
            Segment::LowValue  => "low_value",
            Segment::Normal    => "normal",
        }
    }

    /// Human-readable name for reports.
    pub fn label(self) -> &'static str {
        match self {
            Segment::HighValue => "High-value patient",
            Segment::HighRisk  => "High-risk patient",
            Segment::ChurnRisk => "Churn warning",
            Segment::LowValue  => "Low-value group",
            Segment::Normal    => "Regular patient",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Conditions ───────────────────────────────────────────────────────────────

/// A predicate over one scored record.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    CompositeAtLeast(f64),
    CompositeAtMost(f64),
    RecencyAtMost(Score),
    AdherenceAtLeast(Score),
    AdherenceAtMost(Score),
    All(Vec<Condition>),
}

impl Condition {
    pub fn matches(&self, record: &ScoredRecord) -> bool {
        match self {
            Condition::CompositeAtLeast(min) => record.rfma_score >= *min,
            Condition::CompositeAtMost(max)  => record.rfma_score <= *max,
            Condition::RecencyAtMost(max)    => record.r_score <= *max,
            Condition::AdherenceAtLeast(min) => record.a_score >= *min,
            Condition::AdherenceAtMost(max)  => record.a_score <= *max,
            Condition::All(parts)            => parts.iter().all(|c| c.matches(record)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRule {
    pub segment:   Segment,
    pub condition: Condition,
}

impl SegmentRule {
    pub fn new(segment: Segment, condition: Condition) -> Self {
        Self { segment, condition }
    }
}

// ── Segmenter ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Segmenter {
    rules:    Vec<SegmentRule>,
    fallback: Segment,
}

impl Segmenter {
    /// The four configured rules in evaluation order, falling back to Normal.
    pub fn from_config(config: &SegmentationConfig) -> Self {
        let rules = vec![
            SegmentRule::new(
                Segment::HighValue,
                Condition::All(vec![
                    Condition::CompositeAtLeast(config.high_value.min_score),
                    Condition::AdherenceAtLeast(config.high_value.min_adherence),
                ]),
            ),
            SegmentRule::new(
                Segment::HighRisk,
                Condition::All(vec![
                    Condition::CompositeAtLeast(config.high_risk.min_score),
                    Condition::AdherenceAtMost(config.high_risk.max_adherence),
                ]),
            ),
            SegmentRule::new(
                Segment::ChurnRisk,
                Condition::All(vec![
                    Condition::RecencyAtMost(config.churn_risk.max_recency),
                    Condition::AdherenceAtLeast(config.churn_risk.min_adherence),
                ]),
            ),
            SegmentRule::new(
                Segment::LowValue,
                Condition::CompositeAtMost(config.low_value.max_score),
            ),
        ];
        Self::with_rules(rules, Segment::Normal)
    }

    pub fn with_rules(rules: Vec<SegmentRule>, fallback: Segment) -> Self {
        Self { rules, fallback }
    }

    pub fn rules(&self) -> &[SegmentRule] {
        &self.rules
    }

    pub fn fallback(&self) -> Segment {
        self.fallback
    }

    /// Label of the first rule that matches, or the fallback.
    pub fn classify(&self, record: &ScoredRecord) -> Segment {
        self.rules
            .iter()
            .find(|rule| rule.condition.matches(record))
            .map(|rule| rule.segment)
            .unwrap_or(self.fallback)
    }

    /// Label every record and join its profile. Every scored patient must
    /// have exactly one profile row.
    pub fn segment(
        &self,
        scored: Vec<ScoredRecord>,
        profiles: &[PatientProfile],
    ) -> RfmaResult<Vec<ResultRecord>> {
        let mut by_patient: HashMap<&str, &PatientProfile> = HashMap::with_capacity(profiles.len());
        for profile in profiles {
            if by_patient.insert(profile.patient_id.as_str(), profile).is_some() {
                return Err(RfmaError::data(
                    Stage::Segment,
                    format!("patient {}: duplicate profile row", profile.patient_id),
                ));
            }
        }

        let mut results = Vec::with_capacity(scored.len());
        for record in scored {
            let Some(profile) = by_patient.get(record.patient_id.as_str()) else {
                return Err(RfmaError::data(
                    Stage::Segment,
                    format!("patient {}: scored but has no profile row", record.patient_id),
                ));
            };
            let segment = self.classify(&record);
            results.push(ResultRecord::from_parts(record, segment, profile));
        }

        log::info!("segment: {} patients labelled", results.len());
        Ok(results)
    }

    /// Pairs of rules (earlier, later) that some integer score combination
    /// satisfies at once. Checks every (R, F, M, A) in [1, bins]^4, so it is
    /// exact; `RfmaConfig::validate` caps `bins` to keep the grid small.
    pub fn overlapping_rules(&self, weights: &ScoreWeights, bins: Score) -> Vec<(Segment, Segment)> {
        let scorer = Scorer::new(bins, weights.clone());
        let n = self.rules.len();
        let mut overlap = vec![false; n * n];
        let mut sample = ScoredRecord {
            patient_id:      PatientId::new(),
            recency_days:    0,
            order_count:     0,
            total_spent:     0.0,
            adherence_score: 0.0,
            r_score:         1,
            f_score:         1,
            m_score:         1,
            a_score:         1,
            rfma_score:      0.0,
        };

        for r in 1..=bins {
            for f in 1..=bins {
                for m in 1..=bins {
                    for a in 1..=bins {
                        sample.r_score = r;
                        sample.f_score = f;
                        sample.m_score = m;
                        sample.a_score = a;
                        sample.rfma_score = scorer.composite(r, f, m, a);

                        let hits: Vec<usize> = (0..n)
                            .filter(|&i| self.rules[i].condition.matches(&sample))
                            .collect();
                        for (k, &i) in hits.iter().enumerate() {
                            for &j in &hits[k + 1..] {
                                overlap[i * n + j] = true;
                            }
                        }
                    }
                }
            }
        }

        let mut pairs = Vec::new();
        for i in 0..n {
            for j in i + 1..n {
                if overlap[i * n + j] {
                    pairs.push((self.rules[i].segment, self.rules[j].segment));
                }
            }
        }
        pairs
    }
}
