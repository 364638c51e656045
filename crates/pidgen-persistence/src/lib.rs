//! ---
//! pid_section: "03-persistence-logging"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Record store abstractions and storage bindings."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
#![warn(missing_docs)]

//! Patient record persistence: the `RecordStore` capability, its CSV and
//! in-memory implementations, and the identifier allocator that scans it.

use std::path::PathBuf;

/// Result alias used throughout the persistence crate.
pub type Result<T> = std::result::Result<T, PersistenceError>;

/// Error type for the persistence subsystem.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    /// A store file exists but could not be read.
    #[error("unable to read record store {path}: {source}")]
    Io {
        /// Store file.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// Row encoding failed while preparing a save.
    #[error("csv encoding error: {0}")]
    Csv(#[from] csv::Error),
    /// Stored contents do not match the expected schema.
    #[error("record store {path} is corrupt: {reason}")]
    Corrupt {
        /// Store file.
        path: PathBuf,
        /// What failed to parse.
        reason: String,
    },
    /// The whole-file save failed; the previous contents are intact.
    #[error("unable to persist record store {path}: {source}")]
    Persist {
        /// Store file.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// Wrapper for Prometheus metrics registration failures.
    #[error("metrics error: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub mod allocator;
pub mod metrics;
pub mod record;
pub mod store;

pub use allocator::{IdentifierAllocator, IDENTIFIER_FLOOR};
pub use metrics::PersistenceMetrics;
pub use record::{Gender, MediaRow, PatientRecord, PrimaryRow, StoredRow};
pub use store::{CsvRecordStore, MemoryRecordStore, RecordStore};

/// CSV-backed Primary Record Store.
pub type PrimaryStore = CsvRecordStore<PrimaryRow>;

/// CSV-backed Media Record Store.
pub type MediaStore = CsvRecordStore<MediaRow>;
