//! ---
//! pid_section: "03-persistence-logging"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Record store abstractions and storage bindings."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use chrono::{NaiveDate, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumIter, EnumString};

/// Gender recorded on a patient card.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Gender {
    /// Male.
    Male,
    /// Female.
    Female,
    /// Any other gender.
    Other,
}

/// One issued patient record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRecord {
    /// `PREFIX-n` identifier.
    pub id: String,
    /// Patient name.
    pub name: String,
    /// Date of birth.
    pub dob: NaiveDate,
    /// Whole years on the registration date.
    pub age: i32,
    /// Gender.
    pub gender: Gender,
    /// Guardian or relation, may be empty.
    pub care_of: String,
    /// Ten ASCII digits.
    pub phone: String,
    /// Day the identifier was issued.
    pub registration_date: NaiveDate,
    /// Local wall-clock time the record was written.
    pub timestamp: NaiveDateTime,
}

/// Row schema persisted by a CSV record store.
pub trait StoredRow: Serialize + DeserializeOwned + Clone {
    /// Header row, in column order.
    const HEADERS: &'static [&'static str];

    /// Identifier column.
    fn id(&self) -> &str;

    /// Patient fields carried by the row.
    fn record(&self) -> PatientRecord;
}

/// Primary Record Store row: the record plus the rendered artifact path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryRow {
    #[serde(rename = "Patient ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "DOB", with = "dmy")]
    dob: NaiveDate,
    #[serde(rename = "Age")]
    age: i32,
    #[serde(rename = "Gender")]
    gender: Gender,
    #[serde(rename = "Care Of")]
    care_of: String,
    #[serde(rename = "Phone")]
    phone: String,
    /// Rendered card location as written at issue time.
    #[serde(rename = "Card Path")]
    pub artifact_path: String,
    #[serde(rename = "Reg Date", with = "dmy")]
    registration_date: NaiveDate,
    #[serde(rename = "Timestamp")]
    timestamp: NaiveDateTime,
}

impl PrimaryRow {
    /// Row for `record` referencing the artifact at `artifact_path`.
    pub fn new(record: &PatientRecord, artifact_path: impl Into<String>) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            dob: record.dob,
            age: record.age,
            gender: record.gender,
            care_of: record.care_of.clone(),
            phone: record.phone.clone(),
            artifact_path: artifact_path.into(),
            registration_date: record.registration_date,
            timestamp: record.timestamp,
        }
    }
}

impl StoredRow for PrimaryRow {
    const HEADERS: &'static [&'static str] = &[
        "Patient ID",
        "Name",
        "DOB",
        "Age",
        "Gender",
        "Care Of",
        "Phone",
        "Card Path",
        "Reg Date",
        "Timestamp",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn record(&self) -> PatientRecord {
        PatientRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            dob: self.dob,
            age: self.age,
            gender: self.gender,
            care_of: self.care_of.clone(),
            phone: self.phone.clone(),
            registration_date: self.registration_date,
            timestamp: self.timestamp,
        }
    }
}

/// Media Record Store row: the record projection without an artifact path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRow {
    #[serde(rename = "Patient ID")]
    id: String,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "DOB", with = "dmy")]
    dob: NaiveDate,
    #[serde(rename = "Age")]
    age: i32,
    #[serde(rename = "Gender")]
    gender: Gender,
    #[serde(rename = "Care Of")]
    care_of: String,
    #[serde(rename = "Phone")]
    phone: String,
    #[serde(rename = "Registration Date", with = "dmy")]
    registration_date: NaiveDate,
    #[serde(rename = "Timestamp")]
    timestamp: NaiveDateTime,
}

impl From<&PatientRecord> for MediaRow {
    fn from(record: &PatientRecord) -> Self {
        Self {
            id: record.id.clone(),
            name: record.name.clone(),
            dob: record.dob,
            age: record.age,
            gender: record.gender,
            care_of: record.care_of.clone(),
            phone: record.phone.clone(),
            registration_date: record.registration_date,
            timestamp: record.timestamp,
        }
    }
}

impl StoredRow for MediaRow {
    const HEADERS: &'static [&'static str] = &[
        "Patient ID",
        "Name",
        "DOB",
        "Age",
        "Gender",
        "Care Of",
        "Phone",
        "Registration Date",
        "Timestamp",
    ];

    fn id(&self) -> &str {
        &self.id
    }

    fn record(&self) -> PatientRecord {
        PatientRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            dob: self.dob,
            age: self.age,
            gender: self.gender,
            care_of: self.care_of.clone(),
            phone: self.phone.clone(),
            registration_date: self.registration_date,
            timestamp: self.timestamp,
        }
    }
}

mod dmy {
    use chrono::NaiveDate;
    use pidgen_common::time::{format_dmy, parse_dmy};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_dmy(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_dmy(raw.trim()).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatientRecord {
        PatientRecord {
            id: "GKNMH-CERWP-1000".into(),
            name: "Asha Rao".into(),
            dob: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
            age: 35,
            gender: Gender::Female,
            care_of: "Ravi Rao".into(),
            phone: "9876543210".into(),
            registration_date: NaiveDate::from_ymd_opt(2025, 7, 23).unwrap(),
            timestamp: NaiveDate::from_ymd_opt(2025, 7, 23)
                .unwrap()
                .and_hms_micro_opt(10, 4, 5, 120_000)
                .unwrap(),
        }
    }

    #[test]
    fn media_projection_drops_only_the_artifact_path() {
        let record = sample();
        let primary = PrimaryRow::new(&record, "/tmp/GKNMH-CERWP-1000.card.json");
        let media = MediaRow::from(&record);
        assert_eq!(primary.record(), media.record());
        assert_eq!(PrimaryRow::HEADERS.len(), MediaRow::HEADERS.len() + 1);
        assert_eq!(PrimaryRow::HEADERS[7], "Card Path");
    }

    #[test]
    fn gender_parses_case_insensitively() {
        assert_eq!("female".parse::<Gender>().unwrap(), Gender::Female);
        assert!("unknown".parse::<Gender>().is_err());
        assert_eq!(Gender::Other.to_string(), "Other");
    }
}
