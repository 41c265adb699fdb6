//! The analysis engine: one batch in, one immutable result out.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Aggregator  (transactions + adherence → per-patient metrics)
//!   2. Scorer      (metrics → R/F/M/A scores + composite)
//!   3. Segmenter   (scores → segment label, profile join)
//!
//! RULES:
//!   - Configuration is validated before any stage runs.
//!   - Stages never read anything downstream of themselves.
//!   - Any stage error aborts the run; no partial result is returned.
//!   - Identical inputs and config produce identical results.

use crate::{
    aggregator::Aggregator,
    config::RfmaConfig,
    error::RfmaResult,
    record::ResultRecord,
    scorer::Scorer,
    segmenter::{Segment, Segmenter},
    store::PatientTables,
    types::PatientId,
};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

pub struct RfmaEngine {
    config:    RfmaConfig,
    scorer:    Scorer,
    segmenter: Segmenter,
}

impl RfmaEngine {
    /// Validate `config` and build the stages. Fails with a config error
    /// before any data is looked at.
    pub fn new(config: RfmaConfig) -> RfmaResult<Self> {
        config.validate()?;
        Ok(Self {
            scorer:    Scorer::from_config(&config),
            segmenter: Segmenter::from_config(&config.segmentation),
            config,
        })
    }

    pub fn config(&self) -> &RfmaConfig {
        &self.config
    }

    pub fn scorer(&self) -> &Scorer {
        &self.scorer
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    /// Run the full pipeline. `evaluation_date` defaults to today.
    pub fn run(
        &self,
        tables: &PatientTables,
        evaluation_date: Option<NaiveDate>,
    ) -> RfmaResult<AnalysisResult> {
        let aggregator = match evaluation_date {
            Some(date) => Aggregator::new(date),
            None       => Aggregator::as_of_today(),
        };

        let (aggregated, join_report) =
            aggregator.aggregate(&tables.transactions, &tables.adherence)?;
        let scored = self.scorer.score(aggregated)?;
        let records = self.segmenter.segment(scored, &tables.patients)?;

        let transacting: HashSet<&str> = tables
            .transactions
            .iter()
            .map(|t| t.patient_id.as_str())
            .collect();
        let patients_without_transactions = tables
            .patients
            .iter()
            .filter(|p| !transacting.contains(p.patient_id.as_str()))
            .count();

        let result = AnalysisResult::new(
            aggregator.evaluation_date(),
            records,
            join_report.missing_adherence,
            patients_without_transactions,
        );

        for (segment, count) in result.segment_counts() {
            log::debug!("segment {segment}: {count} patients");
        }
        log::info!(
            "run complete: {} patients scored as of {}",
            result.len(),
            result.evaluation_date()
        );
        Ok(result)
    }
}

// ── Result ───────────────────────────────────────────────────────────────────

/// Final result table of one run plus derived views.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    evaluation_date:               NaiveDate,
    records:                       Vec<ResultRecord>,
    segment_counts:                BTreeMap<Segment, usize>,
    dropped_without_adherence:     Vec<PatientId>,
    patients_without_transactions: usize,
}

impl AnalysisResult {
    fn new(
        evaluation_date: NaiveDate,
        records: Vec<ResultRecord>,
        dropped_without_adherence: Vec<PatientId>,
        patients_without_transactions: usize,
    ) -> Self {
        let mut segment_counts = BTreeMap::new();
        for record in &records {
            *segment_counts.entry(record.segment).or_insert(0) += 1;
        }
        Self {
            evaluation_date,
            records,
            segment_counts,
            dropped_without_adherence,
            patients_without_transactions,
        }
    }

    pub fn evaluation_date(&self) -> NaiveDate {
        self.evaluation_date
    }

    /// All result rows, ordered by patient id.
    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Population per segment. Segments with no patients are absent.
    pub fn segment_counts(&self) -> &BTreeMap<Segment, usize> {
        &self.segment_counts
    }

    pub fn in_segment(&self, segment: Segment) -> impl Iterator<Item = &ResultRecord> + '_ {
        self.records.iter().filter(move |r| r.segment == segment)
    }

    pub fn high_value(&self) -> impl Iterator<Item = &ResultRecord> + '_ {
        self.in_segment(Segment::HighValue)
    }

    pub fn high_risk(&self) -> impl Iterator<Item = &ResultRecord> + '_ {
        self.in_segment(Segment::HighRisk)
    }

    pub fn churn_risk(&self) -> impl Iterator<Item = &ResultRecord> + '_ {
        self.in_segment(Segment::ChurnRisk)
    }

    pub fn find(&self, patient_id: &str) -> Option<&ResultRecord> {
        self.records
            .binary_search_by(|r| r.patient_id.as_str().cmp(patient_id))
            .ok()
            .map(|i| &self.records[i])
    }

    /// Patients with transactions that the adherence join dropped.
    pub fn dropped_without_adherence(&self) -> &[PatientId] {
        &self.dropped_without_adherence
    }

    /// Profiled patients that never transacted and so were never scored.
    pub fn patients_without_transactions(&self) -> usize {
        self.patients_without_transactions
    }
}
