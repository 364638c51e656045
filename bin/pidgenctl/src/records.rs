//! ---
//! pid_section: "05-operator-interfaces"
//! pid_subsection: "binary"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Operator CLI for PIDGen installations."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Subcommand};
use pidgen_common::time::{age_on, format_dmy, parse_dmy, Clock, SystemClock};
use pidgen_core::{EnrollmentOutcome, Installation, RecordInput};
use pidgen_licensing::{LicenseAuthority, LicenseStatus};
use pidgen_persistence::{PatientRecord, RecordStore, StoredRow};
use pidgen_security::Role;

use crate::access::authenticate;

#[derive(Debug, Args)]
pub struct EnrollCommand {
    /// User secret; prompted for when absent.
    #[arg(long = "user-secret", env = "PIDGEN_USER_SECRET", hide_env_values = true)]
    user_secret: Option<String>,
    /// Patient name.
    #[arg(long)]
    name: String,
    /// Date of birth, dd-mm-YYYY.
    #[arg(long, value_name = "DD-MM-YYYY")]
    dob: String,
    /// Male, Female or Other.
    #[arg(long)]
    gender: String,
    /// Guardian or relation.
    #[arg(long = "care-of", default_value = "")]
    care_of: String,
    /// Ten-digit phone number.
    #[arg(long)]
    phone: String,
}

#[derive(Debug, Subcommand)]
pub enum RecordsCommand {
    /// Print stored records in write order.
    List {
        /// Read the media mirror instead of the primary store.
        #[arg(long)]
        media: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum LicenseCommand {
    /// Show the trial window and whether enrollment is permitted today.
    Status,
}

#[derive(Debug, Args)]
pub struct AgeCommand {
    /// Date of birth, dd-mm-YYYY.
    #[arg(value_name = "DD-MM-YYYY")]
    dob: String,
    /// Reference day (defaults to today).
    #[arg(long = "on", value_name = "DD-MM-YYYY")]
    on: Option<String>,
}

pub fn enroll(install: &Installation, command: EnrollCommand) -> Result<()> {
    let mut access = install.access_controller(SystemClock)?;
    authenticate(&mut access, Role::User, command.user_secret)?;

    let input = RecordInput {
        name: command.name,
        dob: command.dob,
        gender: command.gender,
        care_of: command.care_of,
        phone: command.phone,
    };
    let mut coordinator = install.coordinator(SystemClock);
    let renderer = install.renderer();
    match coordinator.submit(&input) {
        EnrollmentOutcome::Success(record) => {
            println!("Issued {}", record.id);
            println!("Card: {}", renderer.card_path(&record.id).display());
            Ok(())
        }
        EnrollmentOutcome::Degraded { record, warnings } => {
            println!("Issued {}", record.id);
            println!("Card: {}", renderer.card_path(&record.id).display());
            for warning in warnings {
                eprintln!("warning: {warning}");
            }
            Ok(())
        }
        EnrollmentOutcome::Rejected(errors) => {
            for error in &errors {
                eprintln!("invalid input: {error}");
            }
            bail!("enrollment rejected: {} field(s) invalid", errors.len())
        }
        EnrollmentOutcome::LicenseExpired(reason) => {
            bail!("license expired ({reason}); contact the administrator")
        }
        EnrollmentOutcome::Fatal(error) => Err(anyhow!(error).context("enrollment aborted")),
    }
}

pub fn list(install: &Installation, command: RecordsCommand) -> Result<()> {
    let RecordsCommand::List { media } = command;
    let records: Vec<PatientRecord> = if media {
        install
            .media_store()
            .iterate_all()?
            .iter()
            .map(StoredRow::record)
            .collect()
    } else {
        install
            .primary_store()
            .iterate_all()?
            .iter()
            .map(StoredRow::record)
            .collect()
    };
    for record in &records {
        println!(
            "{} | {} | {} | {} | {} | {} | {} | {}",
            record.id,
            record.name,
            format_dmy(record.dob),
            record.age,
            record.gender,
            record.care_of,
            record.phone,
            format_dmy(record.registration_date)
        );
    }
    if records.is_empty() {
        println!("No records.");
    }
    Ok(())
}

pub fn license(install: &Installation, command: LicenseCommand) -> Result<()> {
    let LicenseCommand::Status = command;
    let gate = install.license_gate();
    match gate.check(SystemClock.today()) {
        LicenseStatus::Active {
            state,
            days_remaining,
        } => {
            println!("License active");
            println!("Started: {}", format_dmy(state.start_date));
            if let Some(last) = state.last_valid_day() {
                println!("Last licensed day: {}", format_dmy(last));
            }
            println!("Days remaining: {days_remaining}");
            Ok(())
        }
        LicenseStatus::Expired(reason) => bail!("license expired: {reason}"),
    }
}

pub fn age(command: AgeCommand) -> Result<()> {
    let dob = parse_dmy(command.dob.trim())
        .with_context(|| format!("'{}' is not a dd-mm-YYYY date", command.dob))?;
    let reference = match &command.on {
        Some(raw) => parse_dmy(raw.trim())
            .with_context(|| format!("'{raw}' is not a dd-mm-YYYY date"))?,
        None => SystemClock.today(),
    };
    if dob > reference {
        bail!("date of birth is after {}", format_dmy(reference));
    }
    println!("{}", age_on(dob, reference));
    Ok(())
}
