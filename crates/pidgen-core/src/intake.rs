//! ---
//! pid_section: "01-core-functionality"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Enrollment coordination and installation lifecycle."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use chrono::NaiveDate;
use pidgen_common::time::{parse_dmy, DMY_FORMAT};
use pidgen_persistence::Gender;
use thiserror::Error;

/// Raw operator input for one enrollment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordInput {
    /// Patient name.
    pub name: String,
    /// Date of birth, `dd-mm-YYYY`.
    pub dob: String,
    /// `Male`, `Female` or `Other`.
    pub gender: String,
    /// Guardian or relation; optional.
    pub care_of: String,
    /// Ten-digit phone number.
    pub phone: String,
}

/// A field that failed intake validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Name empty after trimming.
    #[error("name is required")]
    NameMissing,
    /// Date of birth not in `dd-mm-YYYY` form.
    #[error("date of birth '{0}' is not a valid dd-mm-YYYY date")]
    DobUnparsable(String),
    /// Date of birth after the reference day.
    #[error("date of birth {} is in the future", .0.format(DMY_FORMAT))]
    DobInFuture(NaiveDate),
    /// Gender missing or not one of the enumerated values.
    #[error("gender '{0}' must be Male, Female or Other")]
    GenderInvalid(String),
    /// Phone not exactly ten ASCII digits.
    #[error("phone '{0}' must be exactly 10 digits")]
    PhoneInvalid(String),
}

/// Input that passed every field check. Only [`RecordInput::validate`] builds one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecordInput {
    name: String,
    dob: NaiveDate,
    gender: Gender,
    care_of: String,
    phone: String,
}

impl ValidatedRecordInput {
    /// Trimmed patient name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parsed date of birth.
    pub fn dob(&self) -> NaiveDate {
        self.dob
    }

    /// Gender.
    pub fn gender(&self) -> Gender {
        self.gender
    }

    /// Trimmed care-of value, possibly empty.
    pub fn care_of(&self) -> &str {
        &self.care_of
    }

    /// Ten-digit phone number.
    pub fn phone(&self) -> &str {
        &self.phone
    }
}

impl RecordInput {
    /// Check every field against `today`, reporting all failures at once.
    pub fn validate(&self, today: NaiveDate) -> Result<ValidatedRecordInput, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::NameMissing);
        }

        let raw_dob = self.dob.trim();
        let dob = match parse_dmy(raw_dob) {
            Ok(dob) if dob > today => {
                errors.push(ValidationError::DobInFuture(dob));
                None
            }
            Ok(dob) => Some(dob),
            Err(_) => {
                errors.push(ValidationError::DobUnparsable(raw_dob.to_owned()));
                None
            }
        };

        let raw_gender = self.gender.trim();
        let gender = match raw_gender.parse::<Gender>() {
            Ok(gender) => Some(gender),
            Err(_) => {
                errors.push(ValidationError::GenderInvalid(raw_gender.to_owned()));
                None
            }
        };

        let phone = self.phone.trim();
        if phone.len() != 10 || !phone.bytes().all(|b| b.is_ascii_digit()) {
            errors.push(ValidationError::PhoneInvalid(phone.to_owned()));
        }

        match (dob, gender) {
            (Some(dob), Some(gender)) if errors.is_empty() => Ok(ValidatedRecordInput {
                name: name.to_owned(),
                dob,
                gender,
                care_of: self.care_of.trim().to_owned(),
                phone: phone.to_owned(),
            }),
            _ => Err(errors),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 7, 23).unwrap()
    }

    fn input() -> RecordInput {
        RecordInput {
            name: "  Asha Rao ".into(),
            dob: "15-06-1990".into(),
            gender: "female".into(),
            care_of: " Ravi ".into(),
            phone: "9876543210".into(),
        }
    }

    #[test]
    fn valid_input_is_trimmed_and_typed() {
        let valid = input().validate(today()).unwrap();
        assert_eq!(valid.name(), "Asha Rao");
        assert_eq!(valid.care_of(), "Ravi");
        assert_eq!(valid.gender(), Gender::Female);
        assert_eq!(valid.dob(), NaiveDate::from_ymd_opt(1990, 6, 15).unwrap());
    }

    #[test]
    fn every_bad_field_is_reported() {
        let bad = RecordInput {
            name: "   ".into(),
            dob: "1990-06-15".into(),
            gender: String::new(),
            care_of: String::new(),
            phone: "98765".into(),
        };
        let errors = bad.validate(today()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::NameMissing,
                ValidationError::DobUnparsable("1990-06-15".into()),
                ValidationError::GenderInvalid(String::new()),
                ValidationError::PhoneInvalid("98765".into()),
            ]
        );
    }

    #[test]
    fn dob_today_is_accepted_tomorrow_is_not() {
        let mut candidate = input();
        candidate.dob = "23-07-2025".into();
        assert!(candidate.validate(today()).is_ok());
        candidate.dob = "24-07-2025".into();
        assert_eq!(
            candidate.validate(today()).unwrap_err(),
            vec![ValidationError::DobInFuture(
                NaiveDate::from_ymd_opt(2025, 7, 24).unwrap()
            )]
        );
    }

    #[test]
    fn phone_rejects_non_ascii_and_wrong_length() {
        for phone in ["98765432101", "98765-4321", "٩٨٧٦٥٤٣٢١٠", "abcdefghij"] {
            let mut candidate = input();
            candidate.phone = phone.into();
            assert!(candidate.validate(today()).is_err(), "{phone} accepted");
        }
    }
}
