//! ---
//! pid_section: "03-persistence-logging"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Record store abstractions and storage bindings."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::fs;
use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use pidgen_common::fs::write_atomic;
use tracing::{debug, warn};

use crate::metrics::PersistenceMetrics;
use crate::record::StoredRow;
use crate::{PersistenceError, Result};

/// Ordered, append-only collection of stored rows.
///
/// Uniqueness of identifiers is not enforced here; the allocator targets it.
pub trait RecordStore {
    /// Row type held by the store.
    type Row;

    /// Append one row and make it durable before returning.
    fn append(&mut self, row: Self::Row) -> Result<()>;

    /// Identifiers of every stored row, in write order.
    fn scan_identifiers(&self) -> Result<Vec<String>>;

    /// Every stored row, in write order.
    fn iterate_all(&self) -> Result<Vec<Self::Row>>;
}

impl<S: RecordStore + ?Sized> RecordStore for &mut S {
    type Row = S::Row;

    fn append(&mut self, row: Self::Row) -> Result<()> {
        (**self).append(row)
    }

    fn scan_identifiers(&self) -> Result<Vec<String>> {
        (**self).scan_identifiers()
    }

    fn iterate_all(&self) -> Result<Vec<Self::Row>> {
        (**self).iterate_all()
    }
}

/// CSV file store with a header row. Every append loads the whole file,
/// adds the row and atomically replaces the file.
#[derive(Debug, Clone)]
pub struct CsvRecordStore<R> {
    path: PathBuf,
    label: &'static str,
    metrics: Option<PersistenceMetrics>,
    _row: PhantomData<fn() -> R>,
}

impl<R: StoredRow> CsvRecordStore<R> {
    /// Store backed by `path`; `label` names it in logs and metrics.
    pub fn new(path: impl Into<PathBuf>, label: &'static str) -> Self {
        Self {
            path: path.into(),
            label,
            metrics: None,
            _row: PhantomData,
        }
    }

    /// Attach Prometheus counters.
    pub fn with_metrics(mut self, metrics: PersistenceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Store label (`primary`, `media`).
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Write a header-only file if none exists. Returns true when created.
    pub fn ensure_initialized(&self) -> Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        self.save(&[])?;
        debug!(store = self.label, path = %self.path.display(), "created record store");
        Ok(true)
    }

    fn load(&self) -> Result<Vec<R>> {
        let raw = match fs::read(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(PersistenceError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Ok(Vec::new());
        }

        let mut reader = ReaderBuilder::new().has_headers(true).from_reader(raw.as_slice());
        let headers = reader.headers().map_err(|err| self.corrupt(err.to_string()))?;
        if !headers.iter().eq(R::HEADERS.iter().copied()) {
            return Err(self.corrupt(format!(
                "unexpected header row '{}'",
                headers.iter().collect::<Vec<_>>().join(",")
            )));
        }

        let mut rows = Vec::new();
        for row in reader.deserialize::<R>() {
            rows.push(row.map_err(|err| self.corrupt(err.to_string()))?);
        }
        Ok(rows)
    }

    fn save(&self, rows: &[R]) -> Result<()> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_writer(Vec::new());
        writer.write_record(R::HEADERS)?;
        for row in rows {
            writer.serialize(row)?;
        }
        let body = writer.into_inner().map_err(|err| PersistenceError::Persist {
            path: self.path.clone(),
            source: err.into_error(),
        })?;
        write_atomic(&self.path, &body).map_err(|source| PersistenceError::Persist {
            path: self.path.clone(),
            source,
        })
    }

    fn corrupt(&self, reason: String) -> PersistenceError {
        PersistenceError::Corrupt {
            path: self.path.clone(),
            reason,
        }
    }
}

impl<R: StoredRow> RecordStore for CsvRecordStore<R> {
    type Row = R;

    fn append(&mut self, row: R) -> Result<()> {
        let result = self.load().and_then(|mut rows| {
            rows.push(row);
            self.save(&rows)
        });
        match &result {
            Ok(()) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_append(self.label);
                }
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics.record_append_failure(self.label);
                }
                warn!(store = self.label, path = %self.path.display(), error = %err, "record append failed");
            }
        }
        result
    }

    fn scan_identifiers(&self) -> Result<Vec<String>> {
        Ok(self
            .load()?
            .iter()
            .map(|row| row.id().to_owned())
            .collect())
    }

    fn iterate_all(&self) -> Result<Vec<R>> {
        self.load()
    }
}

/// Volatile store used by tests and dry runs.
#[derive(Debug, Clone)]
pub struct MemoryRecordStore<R> {
    rows: Vec<R>,
}

impl<R> Default for MemoryRecordStore<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R> MemoryRecordStore<R> {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when nothing has been appended.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<R: StoredRow> FromIterator<R> for MemoryRecordStore<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<R: StoredRow> RecordStore for MemoryRecordStore<R> {
    type Row = R;

    fn append(&mut self, row: R) -> Result<()> {
        self.rows.push(row);
        Ok(())
    }

    fn scan_identifiers(&self) -> Result<Vec<String>> {
        Ok(self.rows.iter().map(|row| row.id().to_owned()).collect())
    }

    fn iterate_all(&self) -> Result<Vec<R>> {
        Ok(self.rows.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Gender, MediaRow, PatientRecord, PrimaryRow};
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn record(id: &str) -> PatientRecord {
        let day = NaiveDate::from_ymd_opt(2025, 7, 23).unwrap();
        PatientRecord {
            id: id.into(),
            name: "Name, With Comma".into(),
            dob: NaiveDate::from_ymd_opt(2000, 2, 29).unwrap(),
            age: 25,
            gender: Gender::Male,
            care_of: String::new(),
            phone: "0123456789".into(),
            registration_date: day,
            timestamp: day.and_hms_opt(9, 0, 0).unwrap(),
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempdir().unwrap();
        let store: CsvRecordStore<PrimaryRow> =
            CsvRecordStore::new(dir.path().join("absent.csv"), "primary");
        assert!(store.iterate_all().unwrap().is_empty());
        assert!(store.scan_identifiers().unwrap().is_empty());
    }

    #[test]
    fn appends_keep_write_order_and_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data_base").join("patient_data.csv");
        let mut store: CsvRecordStore<PrimaryRow> = CsvRecordStore::new(&path, "primary");
        store
            .append(PrimaryRow::new(&record("P-1001"), "/cards/P-1001.card.json"))
            .unwrap();
        store
            .append(PrimaryRow::new(&record("P-1000"), "/cards/P-1000.card.json"))
            .unwrap();

        assert_eq!(store.scan_identifiers().unwrap(), vec!["P-1001", "P-1000"]);
        let rows = store.iterate_all().unwrap();
        assert_eq!(rows[0].record(), record("P-1001"));
        assert_eq!(rows[0].artifact_path, "/cards/P-1001.card.json");

        let raw = fs::read_to_string(&path).unwrap();
        let mut lines = raw.lines();
        assert_eq!(
            lines.next().unwrap(),
            "Patient ID,Name,DOB,Age,Gender,Care Of,Phone,Card Path,Reg Date,Timestamp"
        );
        assert!(lines.next().unwrap().contains(",29-02-2000,25,Male,,"));
    }

    #[test]
    fn header_only_file_is_empty() {
        let dir = tempdir().unwrap();
        let store: CsvRecordStore<MediaRow> =
            CsvRecordStore::new(dir.path().join("patient_data_pictures.csv"), "media");
        assert!(store.ensure_initialized().unwrap());
        assert!(!store.ensure_initialized().unwrap());
        assert!(store.iterate_all().unwrap().is_empty());
    }

    #[test]
    fn foreign_header_is_corrupt_and_left_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("patient_data.csv");
        fs::write(&path, "id,name\nX-1,someone\n").unwrap();
        let mut store: CsvRecordStore<PrimaryRow> = CsvRecordStore::new(&path, "primary");
        let err = store
            .append(PrimaryRow::new(&record("P-1000"), "card"))
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Corrupt { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "id,name\nX-1,someone\n");
    }

    #[test]
    fn duplicate_identifiers_are_stored() {
        let mut store = MemoryRecordStore::<MediaRow>::new();
        store.append(MediaRow::from(&record("P-1000"))).unwrap();
        store.append(MediaRow::from(&record("P-1000"))).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.scan_identifiers().unwrap(), vec!["P-1000", "P-1000"]);
    }
}
