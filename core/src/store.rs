//! Flat-file persistence layer.
//!
//! RULE: Only store.rs touches data files. The one other read is
//! RfmaConfig::load for the model configuration.
//! Stages receive in-memory tables and return in-memory tables; the store
//! reads the input CSVs once and writes the result table once per run.

use crate::{
    error::{RfmaError, RfmaResult, Stage},
    record::{AdherenceRecord, PatientProfile, ResultRecord, Transaction},
    segmenter::Segment,
};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const PATIENTS_FILE:     &str = "patients.csv";
pub const TRANSACTIONS_FILE: &str = "transactions.csv";
pub const ADHERENCE_FILE:    &str = "adherence.csv";

const PATIENT_COLUMNS:     &[&str] = &["patient_id", "name", "age", "gender", "primary_disease"];
const TRANSACTION_COLUMNS: &[&str] = &["patient_id", "transaction_id", "transaction_date", "amount"];
const ADHERENCE_COLUMNS:   &[&str] = &["patient_id", "adherence_score"];

/// The three input tables the engine consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatientTables {
    pub patients:     Vec<PatientProfile>,
    pub transactions: Vec<Transaction>,
    pub adherence:    Vec<AdherenceRecord>,
}

impl PatientTables {
    pub fn new(
        patients: Vec<PatientProfile>,
        transactions: Vec<Transaction>,
        adherence: Vec<AdherenceRecord>,
    ) -> Self {
        Self { patients, transactions, adherence }
    }
}

pub struct FlatFileStore {
    data_dir: PathBuf,
}

impl FlatFileStore {
    /// Open a data directory holding patients.csv, transactions.csv and
    /// adherence.csv.
    pub fn open(data_dir: impl AsRef<Path>) -> RfmaResult<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        if !data_dir.is_dir() {
            return Err(RfmaError::Other(anyhow::anyhow!(
                "data directory {} does not exist",
                data_dir.display()
            )));
        }
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn load_tables(&self) -> RfmaResult<PatientTables> {
        let tables = PatientTables {
            patients:     self.load_patients()?,
            transactions: self.load_transactions()?,
            adherence:    self.load_adherence()?,
        };
        log::info!(
            "load: {} patients, {} transactions, {} adherence records from {}",
            tables.patients.len(),
            tables.transactions.len(),
            tables.adherence.len(),
            self.data_dir.display()
        );
        Ok(tables)
    }

    pub fn load_patients(&self) -> RfmaResult<Vec<PatientProfile>> {
        self.read_table(PATIENTS_FILE, PATIENT_COLUMNS)
    }

    pub fn load_transactions(&self) -> RfmaResult<Vec<Transaction>> {
        self.read_table(TRANSACTIONS_FILE, TRANSACTION_COLUMNS)
    }

    pub fn load_adherence(&self) -> RfmaResult<Vec<AdherenceRecord>> {
        self.read_table(ADHERENCE_FILE, ADHERENCE_COLUMNS)
    }

    fn read_table<T: DeserializeOwned>(&self, file: &str, required: &[&str]) -> RfmaResult<Vec<T>> {
        let path = self.data_dir.join(file);
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(&path)?;

        let headers = reader.headers()?.clone();
        if let Some(missing) = required.iter().find(|col| !headers.iter().any(|h| h == **col)) {
            return Err(RfmaError::data(
                Stage::Load,
                format!("{file}: missing column '{missing}'"),
            ));
        }

        let mut rows = Vec::new();
        for (line, row) in reader.deserialize::<T>().enumerate() {
            let row = row.map_err(|e| {
                RfmaError::data(Stage::Load, format!("{file}: data row {}: {e}", line + 1))
            })?;
            rows.push(row);
        }
        Ok(rows)
    }
}

// ── Output ───────────────────────────────────────────────────────────────────

/// Write the final result table as CSV, one row per patient.
pub fn write_results(path: impl AsRef<Path>, records: &[ResultRecord]) -> RfmaResult<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    log::info!("wrote {} result rows to {}", records.len(), path.as_ref().display());
    Ok(())
}

/// Write segment counts as a JSON object keyed by segment name.
pub fn write_segment_counts(
    path: impl AsRef<Path>,
    counts: &BTreeMap<Segment, usize>,
) -> RfmaResult<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer_pretty(file, counts)?;
    Ok(())
}
