use chrono::NaiveDate;
use rfma_core::{
    aggregator::{parse_transaction_date, Aggregator},
    record::{AdherenceRecord, Transaction},
    Stage,
};

// ── Helpers ──────────────────────────────────────────────────────────────────

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn txn(patient: &str, id: &str, date: &str, amount: f64) -> Transaction {
    Transaction {
        patient_id:       patient.into(),
        transaction_id:   id.into(),
        transaction_date: date.into(),
        amount,
    }
}

fn adherence(patient: &str, score: f64) -> AdherenceRecord {
    AdherenceRecord { patient_id: patient.into(), adherence_score: score }
}

// ── Tests ────────────────────────────────────────────────────────────────────

/// Recency, frequency and monetary are computed per patient against the
/// evaluation date.
#[test]
fn metrics_collapse_to_one_row_per_patient() {
    let transactions = vec![
        txn("P0002", "T1", "2024-06-01", 40.0),
        txn("P0001", "T2", "2024-05-31", 10.0),
        txn("P0002", "T3", "2024-06-20", 60.0),
        txn("P0001", "T4", "2024-01-01", 15.5),
        txn("P0002", "T5", "2024-03-15", 100.0),
    ];
    let adh = vec![adherence("P0001", 3.2), adherence("P0002", 4.7)];

    let (records, report) = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap();

    assert_eq!(records.len(), 2);
    assert!(report.missing_adherence.is_empty());

    let p1 = &records[0];
    assert_eq!(p1.patient_id, "P0001");
    assert_eq!(p1.recency_days, 30);
    assert_eq!(p1.order_count, 2);
    assert!((p1.total_spent - 25.5).abs() < 1e-9);
    assert_eq!(p1.adherence_score, 3.2);

    let p2 = &records[1];
    assert_eq!(p2.patient_id, "P0002");
    assert_eq!(p2.recency_days, 10);
    assert_eq!(p2.order_count, 3);
    assert!((p2.total_spent - 200.0).abs() < 1e-9);
}

/// Output is ordered by patient id regardless of input row order.
#[test]
fn output_is_ordered_by_patient_id() {
    let transactions = vec![
        txn("P0300", "T1", "2024-06-01", 1.0),
        txn("P0100", "T2", "2024-06-01", 1.0),
        txn("P0200", "T3", "2024-06-01", 1.0),
    ];
    let adh = vec![adherence("P0200", 1.0), adherence("P0300", 1.0), adherence("P0100", 1.0)];

    let (records, _) = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap();
    let ids: Vec<&str> = records.iter().map(|r| r.patient_id.as_str()).collect();
    assert_eq!(ids, ["P0100", "P0200", "P0300"]);
}

/// Patients with no adherence record are dropped, not zero-filled, and the
/// drop is reported.
#[test]
fn missing_adherence_is_dropped_and_reported() {
    let transactions = vec![
        txn("P0001", "T1", "2024-06-01", 10.0),
        txn("P0002", "T2", "2024-06-01", 20.0),
        txn("P0003", "T3", "2024-06-01", 30.0),
    ];
    let adh = vec![adherence("P0001", 2.0), adherence("P0003", 4.0)];

    let (records, report) = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap();

    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.patient_id != "P0002"));
    assert_eq!(report.transaction_patients, 3);
    assert_eq!(report.missing_adherence, vec!["P0002".to_string()]);
}

/// Adherence-only patients never appear: the table holds transacting patients only.
#[test]
fn patients_without_transactions_are_absent() {
    let transactions = vec![txn("P0001", "T1", "2024-06-01", 10.0)];
    let adh = vec![adherence("P0001", 2.0), adherence("P0009", 5.0)];

    let (records, _) = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap();
    assert_eq!(records.len(), 1);
    assert!(records.iter().all(|r| r.order_count >= 1));
}

#[test]
fn empty_transaction_table_is_a_data_error() {
    let err = Aggregator::new(as_of())
        .aggregate(&[], &[adherence("P0001", 1.0)])
        .unwrap_err();
    assert!(err.is_data_error(), "Expected data error, got {err}");
    assert_eq!(err.stage(), Some(Stage::Aggregate));
}

/// Ids written differently across tables join to nothing, which is fatal.
#[test]
fn inconsistent_patient_ids_are_a_data_error() {
    let transactions = vec![txn("1", "T1", "2024-06-01", 10.0)];
    let adh = vec![adherence("P0001", 3.0)];

    let err = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap_err();
    assert!(err.is_data_error());
    assert!(err.to_string().contains("patient_id"), "Unhelpful message: {err}");
}

#[test]
fn unparseable_date_names_the_transaction() {
    let transactions = vec![
        txn("P0001", "T1", "2024-06-01", 10.0),
        txn("P0001", "T-BAD", "06/01/2024", 10.0),
    ];
    let adh = vec![adherence("P0001", 3.0)];

    let err = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap_err();
    assert!(err.is_data_error());
    let msg = err.to_string();
    assert!(msg.contains("T-BAD") && msg.contains("P0001"), "Message lacks context: {msg}");
}

#[test]
fn transaction_after_evaluation_date_is_rejected() {
    let transactions = vec![txn("P0001", "T1", "2024-07-15", 10.0)];
    let adh = vec![adherence("P0001", 3.0)];

    let err = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap_err();
    assert!(err.is_data_error());
}

/// The date check runs before the adherence join, so a patient who would be
/// dropped for lack of adherence still fails the batch.
#[test]
fn future_transaction_fails_even_without_adherence() {
    let transactions = vec![
        txn("P0001", "T1", "2024-06-01", 10.0),
        txn("P0002", "T2", "2024-06-01", 12.0),
        txn("NOADH", "T3", "2099-01-01", 8.0),
    ];
    let adh = vec![adherence("P0001", 3.0), adherence("P0002", 4.0)];

    let err = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap_err();
    assert!(err.is_data_error());
    let msg = err.to_string();
    assert!(msg.contains("T3") && msg.contains("NOADH"), "Message lacks context: {msg}");
}

/// Totals are bit-identical whatever order the amounts arrive in.
#[test]
fn total_spent_ignores_row_order() {
    let forward = vec![
        txn("P0001", "T1", "2024-06-01", 0.1),
        txn("P0001", "T2", "2024-06-02", 0.2),
        txn("P0001", "T3", "2024-06-03", 0.3),
    ];
    let mut reversed = forward.clone();
    reversed.reverse();
    let adh = vec![adherence("P0001", 3.0)];

    let aggregator = Aggregator::new(as_of());
    let (a, _) = aggregator.aggregate(&forward, &adh).unwrap();
    let (b, _) = aggregator.aggregate(&reversed, &adh).unwrap();

    assert_eq!(a[0].total_spent.to_bits(), b[0].total_spent.to_bits());
}

#[test]
fn negative_amount_is_rejected() {
    let transactions = vec![txn("P0001", "T1", "2024-06-01", -5.0)];
    let adh = vec![adherence("P0001", 3.0)];

    let err = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap_err();
    assert!(err.is_data_error());
}

#[test]
fn duplicate_adherence_record_is_rejected() {
    let transactions = vec![txn("P0001", "T1", "2024-06-01", 5.0)];
    let adh = vec![adherence("P0001", 3.0), adherence("P0001", 4.0)];

    let err = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap_err();
    assert!(err.is_data_error());
}

/// Date-times count whole elapsed days; a same-day transaction has recency 0.
#[test]
fn date_time_formats_are_accepted() {
    assert!(parse_transaction_date("2024-06-01").is_some());
    assert!(parse_transaction_date("2024-06-01T08:26:00").is_some());
    assert!(parse_transaction_date("2024-06-01 08:26:00").is_some());
    assert!(parse_transaction_date("2024-06-01T08:26:00Z").is_some());
    assert!(parse_transaction_date("June 1st").is_none());

    let transactions = vec![
        txn("P0001", "T1", "2024-06-30", 5.0),
        txn("P0002", "T2", "2024-06-28T23:00:00", 5.0),
    ];
    let adh = vec![adherence("P0001", 3.0), adherence("P0002", 3.0)];
    let (records, _) = Aggregator::new(as_of()).aggregate(&transactions, &adh).unwrap();

    assert_eq!(records[0].recency_days, 0);
    assert_eq!(records[1].recency_days, 1);
}
