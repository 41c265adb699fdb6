//! Scorer: aggregated metrics → ordinal R/F/M/A scores + weighted composite.
//!
//! Each metric is binned independently over the whole population, so a
//! patient's scores depend only on the distribution of each metric, never
//! on row order.

use crate::{
    binning::QuantileBins,
    config::{RfmaConfig, ScoreWeights},
    error::RfmaResult,
    record::{AggregatedRecord, ScoredRecord},
    types::Score,
};

// ── Metrics ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Recency,
    Frequency,
    Monetary,
    Adherence,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Recency,
        Metric::Frequency,
        Metric::Monetary,
        Metric::Adherence,
    ];

    /// Source column of the metric.
    pub fn column(self) -> &'static str {
        match self {
            Metric::Recency   => "recency_days",
            Metric::Frequency => "order_count",
            Metric::Monetary  => "total_spent",
            Metric::Adherence => "adherence_score",
        }
    }

    /// Recency is the only metric where less is better.
    pub fn is_inverted(self) -> bool {
        matches!(self, Metric::Recency)
    }

    pub fn value(self, record: &AggregatedRecord) -> f64 {
        match self {
            Metric::Recency   => record.recency_days as f64,
            Metric::Frequency => record.order_count as f64,
            Metric::Monetary  => record.total_spent,
            Metric::Adherence => record.adherence_score,
        }
    }
}

// ── Scorer ───────────────────────────────────────────────────────────────────

pub struct Scorer {
    bins:    Score,
    weights: ScoreWeights,
}

impl Scorer {
    pub fn new(bins: Score, weights: ScoreWeights) -> Self {
        Self { bins, weights }
    }

    pub fn from_config(config: &RfmaConfig) -> Self {
        Self::new(config.score_bins, config.weights.clone())
    }

    pub fn bins(&self) -> Score {
        self.bins
    }

    /// Fit bins for one metric over the given population.
    pub fn fit_metric(&self, metric: Metric, records: &[AggregatedRecord]) -> RfmaResult<QuantileBins> {
        let values: Vec<f64> = records.iter().map(|r| metric.value(r)).collect();
        QuantileBins::fit(metric.column(), &values, self.bins)
    }

    /// Ordinal scores of every record for one metric, in input order.
    pub fn score_metric(&self, metric: Metric, records: &[AggregatedRecord]) -> RfmaResult<Vec<Score>> {
        let bins = self.fit_metric(metric, records)?;
        let scores = records
            .iter()
            .map(|r| {
                let value = metric.value(r);
                if metric.is_inverted() {
                    bins.inverted_score(value)
                } else {
                    bins.direct_score(value)
                }
            })
            .collect();
        Ok(scores)
    }

    /// Weighted composite of the four ordinal scores.
    pub fn composite(&self, r: Score, f: Score, m: Score, a: Score) -> f64 {
        f64::from(r) * self.weights.recency
            + f64::from(f) * self.weights.frequency
            + f64::from(m) * self.weights.monetary
            + f64::from(a) * self.weights.adherence
    }

    pub fn score(&self, aggregated: Vec<AggregatedRecord>) -> RfmaResult<Vec<ScoredRecord>> {
        let r_scores = self.score_metric(Metric::Recency, &aggregated)?;
        let f_scores = self.score_metric(Metric::Frequency, &aggregated)?;
        let m_scores = self.score_metric(Metric::Monetary, &aggregated)?;
        let a_scores = self.score_metric(Metric::Adherence, &aggregated)?;

        let scored: Vec<ScoredRecord> = aggregated
            .into_iter()
            .enumerate()
            .map(|(i, rec)| {
                let (r, f, m, a) = (r_scores[i], f_scores[i], m_scores[i], a_scores[i]);
                ScoredRecord {
                    patient_id:      rec.patient_id,
                    recency_days:    rec.recency_days,
                    order_count:     rec.order_count,
                    total_spent:     rec.total_spent,
                    adherence_score: rec.adherence_score,
                    r_score:         r,
                    f_score:         f,
                    m_score:         m,
                    a_score:         a,
                    rfma_score:      self.composite(r, f, m, a),
                }
            })
            .collect();

        log::info!("score: {} patients scored with {} bins", scored.len(), self.bins);
        Ok(scored)
    }
}
