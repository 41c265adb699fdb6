//! Aggregator: raw transactions + adherence → one row per patient.
//!
//! RULE: Only patients with at least one transaction are aggregated.
//! Patients without an adherence record are dropped (inner join) and
//! reported in the JoinReport; they are never zero-filled.

use crate::{
    error::{RfmaError, RfmaResult, Stage},
    record::{AdherenceRecord, AggregatedRecord, Transaction},
    types::PatientId,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{btree_map::Entry, BTreeMap, HashMap};

// ── Public types ─────────────────────────────────────────────────────────────

/// What the adherence join removed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinReport {
    /// Distinct patients present in the transaction table.
    pub transaction_patients: usize,
    /// Patients with transactions but no adherence record, sorted.
    pub missing_adherence:    Vec<PatientId>,
}

pub struct Aggregator {
    evaluation_date: NaiveDate,
}

struct PatientActivity {
    last_seen: NaiveDateTime,
    amounts:   Vec<f64>,
}

impl PatientActivity {
    fn order_count(&self) -> u64 {
        self.amounts.len() as u64
    }

    /// Sum in ascending order so the total does not depend on row order.
    fn total_spent(&self) -> f64 {
        let mut sorted = self.amounts.clone();
        sorted.sort_by(f64::total_cmp);
        sorted.iter().sum()
    }
}

// ── Aggregator ───────────────────────────────────────────────────────────────

impl Aggregator {
    pub fn new(evaluation_date: NaiveDate) -> Self {
        Self { evaluation_date }
    }

    /// Aggregator evaluated against today's local date.
    pub fn as_of_today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    pub fn evaluation_date(&self) -> NaiveDate {
        self.evaluation_date
    }

    /// Collapse the transaction table to one record per patient and join
    /// adherence scores. Output is ordered by patient id.
    pub fn aggregate(
        &self,
        transactions: &[Transaction],
        adherence: &[AdherenceRecord],
    ) -> RfmaResult<(Vec<AggregatedRecord>, JoinReport)> {
        if transactions.is_empty() {
            return Err(RfmaError::data(
                Stage::Aggregate,
                "transaction table is empty; no patients to score",
            ));
        }

        let activity = self.collect_activity(transactions)?;
        let adherence_by_patient = index_adherence(adherence)?;

        let evaluation_start = self.evaluation_date.and_time(NaiveTime::MIN);
        let mut records = Vec::with_capacity(activity.len());
        let mut missing_adherence = Vec::new();

        for (patient_id, act) in &activity {
            let Some(&adherence_score) = adherence_by_patient.get(patient_id) else {
                missing_adherence.push((*patient_id).to_string());
                continue;
            };
            let recency_days = (evaluation_start - act.last_seen).num_days().max(0);

            records.push(AggregatedRecord {
                patient_id:   (*patient_id).to_string(),
                recency_days,
                order_count:  act.order_count(),
                total_spent:  act.total_spent(),
                adherence_score,
            });
        }

        if records.is_empty() {
            return Err(RfmaError::data(
                Stage::Aggregate,
                format!(
                    "none of the {} transaction patients matched an adherence record; \
                     check that patient_id is written the same way in both tables",
                    activity.len()
                ),
            ));
        }

        if !missing_adherence.is_empty() {
            log::warn!(
                "aggregate: dropped {} of {} patients with no adherence record",
                missing_adherence.len(),
                activity.len()
            );
        }
        log::info!(
            "aggregate: {} patients from {} transactions (as of {})",
            records.len(),
            transactions.len(),
            self.evaluation_date
        );

        let report = JoinReport {
            transaction_patients: activity.len(),
            missing_adherence,
        };
        Ok((records, report))
    }

    fn collect_activity<'a>(
        &self,
        transactions: &'a [Transaction],
    ) -> RfmaResult<BTreeMap<&'a str, PatientActivity>> {
        let mut activity: BTreeMap<&str, PatientActivity> = BTreeMap::new();

        for txn in transactions {
            let seen = parse_transaction_date(&txn.transaction_date).ok_or_else(|| {
                RfmaError::data(
                    Stage::Aggregate,
                    format!(
                        "transaction {} (patient {}): unparseable transaction_date '{}'",
                        txn.transaction_id, txn.patient_id, txn.transaction_date
                    ),
                )
            })?;

            if !txn.amount.is_finite() || txn.amount < 0.0 {
                return Err(RfmaError::data(
                    Stage::Aggregate,
                    format!(
                        "transaction {} (patient {}): amount must be a non-negative number, got {}",
                        txn.transaction_id, txn.patient_id, txn.amount
                    ),
                ));
            }

            if seen.date() > self.evaluation_date {
                return Err(RfmaError::data(
                    Stage::Aggregate,
                    format!(
                        "transaction {} (patient {}): date {} is after evaluation date {}",
                        txn.transaction_id,
                        txn.patient_id,
                        seen.date(),
                        self.evaluation_date
                    ),
                ));
            }

            match activity.entry(txn.patient_id.as_str()) {
                Entry::Vacant(slot) => {
                    slot.insert(PatientActivity {
                        last_seen: seen,
                        amounts:   vec![txn.amount],
                    });
                }
                Entry::Occupied(mut slot) => {
                    let act = slot.get_mut();
                    act.last_seen = act.last_seen.max(seen);
                    act.amounts.push(txn.amount);
                }
            }
        }

        Ok(activity)
    }
}

fn index_adherence(adherence: &[AdherenceRecord]) -> RfmaResult<HashMap<&str, f64>> {
    let mut by_patient = HashMap::with_capacity(adherence.len());
    for rec in adherence {
        if by_patient.insert(rec.patient_id.as_str(), rec.adherence_score).is_some() {
            return Err(RfmaError::data(
                Stage::Aggregate,
                format!("patient {}: more than one adherence record", rec.patient_id),
            ));
        }
    }
    Ok(by_patient)
}

/// Parse an ISO transaction date. Accepts a bare date, a date-time with
/// `T` or space separator, or RFC 3339 (offset discarded after
/// conversion to UTC).
pub fn parse_transaction_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date.and_time(NaiveTime::MIN));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.naive_utc())
}
