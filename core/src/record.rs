//! Record types for every table the pipeline reads or produces.
//!
//! Input records mirror the CSV column names exactly. Derived records are
//! owned by the run that produced them and never mutated afterwards.

use crate::{
    segmenter::Segment,
    types::{PatientId, Score},
};
use serde::{Deserialize, Serialize};

// ── Input tables ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientProfile {
    pub patient_id:      PatientId,
    pub name:            String,
    pub age:             u32,
    pub gender:          String,
    pub primary_disease: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub patient_id:       PatientId,
    pub transaction_id:   String,
    /// Raw ISO date string; parsed by the aggregator.
    pub transaction_date: String,
    pub amount:           f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdherenceRecord {
    pub patient_id:      PatientId,
    pub adherence_score: f64,
}

// ── Derived tables ───────────────────────────────────────────────────────────

/// One row per patient with at least one transaction and an adherence record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRecord {
    pub patient_id:      PatientId,
    pub recency_days:    i64,
    pub order_count:     u64,
    pub total_spent:     f64,
    pub adherence_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub patient_id:      PatientId,
    pub recency_days:    i64,
    pub order_count:     u64,
    pub total_spent:     f64,
    pub adherence_score: f64,
    #[serde(rename = "R_score")]
    pub r_score:         Score,
    #[serde(rename = "F_score")]
    pub f_score:         Score,
    #[serde(rename = "M_score")]
    pub m_score:         Score,
    #[serde(rename = "A_score")]
    pub a_score:         Score,
    #[serde(rename = "RFMA_score")]
    pub rfma_score:      f64,
}

/// Terminal artifact of a run: scores, segment, and profile attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub patient_id:      PatientId,
    pub recency_days:    i64,
    pub order_count:     u64,
    pub total_spent:     f64,
    pub adherence_score: f64,
    #[serde(rename = "R_score")]
    pub r_score:         Score,
    #[serde(rename = "F_score")]
    pub f_score:         Score,
    #[serde(rename = "M_score")]
    pub m_score:         Score,
    #[serde(rename = "A_score")]
    pub a_score:         Score,
    #[serde(rename = "RFMA_score")]
    pub rfma_score:      f64,
    pub segment:         Segment,
    pub name:            String,
    pub age:             u32,
    pub gender:          String,
    pub primary_disease: String,
}

impl ResultRecord {
    pub fn from_parts(scored: ScoredRecord, segment: Segment, profile: &PatientProfile) -> Self {
        Self {
            patient_id:      scored.patient_id,
            recency_days:    scored.recency_days,
            order_count:     scored.order_count,
            total_spent:     scored.total_spent,
            adherence_score: scored.adherence_score,
            r_score:         scored.r_score,
            f_score:         scored.f_score,
            m_score:         scored.m_score,
            a_score:         scored.a_score,
            rfma_score:      scored.rfma_score,
            segment,
            name:            profile.name.clone(),
            age:             profile.age,
            gender:          profile.gender.clone(),
            primary_disease: profile.primary_disease.clone(),
        }
    }
}
