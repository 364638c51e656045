//! ---
//! pid_section: "15-testing-qa-runbook"
//! pid_subsection: "integration-tests"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Integration and validation tests for the PIDGen stack."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate};
use pidgen_common::config::{AppConfig, PathsConfig, RenderConfig};
use pidgen_common::time::FixedClock;
use pidgen_core::{
    ArtifactRenderer, CardRenderer, EnrollmentCoordinator, EnrollmentError, EnrollmentOutcome,
    EnrollmentWarning, Installation, RecordInput, RenderError, RenderStyle, RenderedArtifact,
};
use pidgen_licensing::{LicenseGate, MockLicenseAuthority};
use pidgen_persistence::{
    IdentifierAllocator, MediaStore, PatientRecord, PersistenceError, PrimaryRow, PrimaryStore,
    RecordStore, Result as StoreResult,
};
use tempfile::tempdir;

fn installation(root: &Path) -> Installation {
    Installation::new(AppConfig {
        paths: PathsConfig::rooted_at(root),
        ..AppConfig::default()
    })
}

fn input() -> RecordInput {
    RecordInput {
        name: "Ravi Kumar".into(),
        dob: "29-02-2000".into(),
        gender: "Male".into(),
        care_of: "Self".into(),
        phone: "9123456780".into(),
    }
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 28).unwrap()
}

struct BrokenRenderer;

impl ArtifactRenderer for BrokenRenderer {
    fn render(
        &self,
        _record: &PatientRecord,
        _qr_payload: &str,
        _style: RenderStyle,
    ) -> Result<RenderedArtifact, RenderError> {
        Err(RenderError::Io {
            path: PathBuf::from("gen_id"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }
}

/// Scans an inner store but refuses every append.
struct ReadOnlyPrimary(PrimaryStore);

impl RecordStore for ReadOnlyPrimary {
    type Row = PrimaryRow;

    fn append(&mut self, _row: PrimaryRow) -> StoreResult<()> {
        Err(PersistenceError::Persist {
            path: self.0.path().to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    fn scan_identifiers(&self) -> StoreResult<Vec<String>> {
        self.0.scan_identifiers()
    }

    fn iterate_all(&self) -> StoreResult<Vec<PrimaryRow>> {
        self.0.iterate_all()
    }
}

#[test]
fn sequential_enrollments_fill_both_stores() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let install = installation(dir.path());
    let clock = FixedClock::on(start());
    install.bootstrap(&clock)?;

    let mut coordinator = install.coordinator(&clock);
    let first = coordinator.submit(&input());
    assert_eq!(first.record().map(|r| r.id.as_str()), Some("GKNMH-CERWP-1000"));
    assert_eq!(first.record().map(|r| r.age), Some(23));
    let second = coordinator.submit(&input());
    assert_eq!(second.record().map(|r| r.id.as_str()), Some("GKNMH-CERWP-1001"));

    assert_eq!(install.primary_store().scan_identifiers()?.len(), 2);
    assert_eq!(install.media_store().scan_identifiers()?.len(), 2);
    assert!(!install
        .config()
        .paths
        .artifact_dir()
        .join("GKNMH-CERWP-1000_qr.txt")
        .exists());
    Ok(())
}

#[test]
fn license_window_boundary_is_inclusive() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let install = installation(dir.path());
    let clock = FixedClock::on(start());
    install.bootstrap(&clock)?;
    let mut coordinator = install.coordinator(&clock);

    clock.advance(Duration::days(300));
    assert!(coordinator.submit(&input()).is_issued());

    clock.advance(Duration::days(1));
    assert!(matches!(
        coordinator.submit(&input()),
        EnrollmentOutcome::LicenseExpired(_)
    ));
    assert_eq!(install.primary_store().scan_identifiers()?.len(), 1);
    Ok(())
}

#[test]
fn unreadable_license_fails_closed() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let install = installation(dir.path());
    let clock = FixedClock::on(start());
    install.bootstrap(&clock)?;
    std::fs::write(install.config().paths.license_file(), "not a date")?;

    let outcome = install.coordinator(&clock).submit(&input());
    assert!(matches!(outcome, EnrollmentOutcome::LicenseExpired(_)));
    assert!(install.primary_store().iterate_all()?.is_empty());
    Ok(())
}

#[test]
fn render_failure_consumes_no_identifier() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let install = installation(dir.path());
    let clock = FixedClock::on(start());
    install.bootstrap(&clock)?;
    let before = install.primary_store().scan_identifiers()?.len();

    let mut coordinator = EnrollmentCoordinator::new(
        MockLicenseAuthority::active(),
        install.primary_store(),
        install.media_store(),
        BrokenRenderer,
        install.allocator(),
        install.config().paths.media_dir.clone(),
        &clock,
    );
    assert!(matches!(
        coordinator.submit(&input()),
        EnrollmentOutcome::Fatal(EnrollmentError::Render(_))
    ));
    assert_eq!(install.primary_store().scan_identifiers()?.len(), before);
    assert!(install.media_store().iterate_all()?.is_empty());

    // The next healthy enrollment gets the identifier that was never consumed.
    let issued = install.coordinator(&clock).submit(&input());
    assert_eq!(
        issued.record().map(|r| r.id.clone()),
        Some("GKNMH-CERWP-1000".to_owned())
    );
    Ok(())
}

#[test]
fn primary_append_failure_discards_the_card() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let install = installation(dir.path());
    let clock = FixedClock::on(start());
    install.bootstrap(&clock)?;
    let renderer = install.renderer();

    let mut coordinator = EnrollmentCoordinator::new(
        LicenseGate::new(install.config().paths.license_file()),
        ReadOnlyPrimary(install.primary_store()),
        install.media_store(),
        &renderer,
        install.allocator(),
        install.config().paths.media_dir.clone(),
        &clock,
    );
    assert!(matches!(
        coordinator.submit(&input()),
        EnrollmentOutcome::Fatal(EnrollmentError::PrimaryAppend(_))
    ));
    assert!(!renderer.card_path("GKNMH-CERWP-1000").exists());
    assert!(!renderer.qr_path("GKNMH-CERWP-1000").exists());
    assert!(install.media_store().iterate_all()?.is_empty());
    Ok(())
}

#[test]
fn media_store_failure_still_issues_one_primary_record() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let install = installation(dir.path());
    let clock = FixedClock::on(start());
    install.bootstrap(&clock)?;
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "occupied")?;

    let mut coordinator = EnrollmentCoordinator::new(
        install.license_gate(),
        install.primary_store(),
        MediaStore::new(blocker.join("patient_data_pictures.csv"), "media"),
        install.renderer(),
        install.allocator(),
        install.config().paths.media_dir.clone(),
        &clock,
    );
    let outcome = coordinator.submit(&input());
    let EnrollmentOutcome::Degraded { record, warnings } = outcome else {
        panic!("expected degraded issue, got {outcome:?}");
    };
    assert!(matches!(
        warnings.as_slice(),
        [EnrollmentWarning::MediaAppendFailed(_)]
    ));
    let primary = install.primary_store().scan_identifiers()?;
    assert_eq!(primary, vec![record.id]);
    Ok(())
}

#[test]
fn media_copy_failure_skips_the_mirror() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let install = installation(dir.path());
    let clock = FixedClock::on(start());
    install.bootstrap(&clock)?;
    let blocked_media_dir = dir.path().join("media-file");
    std::fs::write(&blocked_media_dir, "occupied")?;

    let mut coordinator = EnrollmentCoordinator::new(
        install.license_gate(),
        install.primary_store(),
        install.media_store(),
        install.renderer(),
        install.allocator(),
        blocked_media_dir,
        &clock,
    );
    let outcome = coordinator.submit(&input());
    assert!(matches!(
        &outcome,
        EnrollmentOutcome::Degraded { warnings, .. }
            if matches!(warnings.as_slice(), [EnrollmentWarning::ArtifactCopyFailed { .. }])
    ));
    assert_eq!(install.primary_store().scan_identifiers()?.len(), 1);
    assert!(install.media_store().iterate_all()?.is_empty());
    Ok(())
}

#[test]
fn missing_standard_resources_degrade_but_fallback_failure_is_fatal() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let install = installation(dir.path());
    let clock = FixedClock::on(start());
    install.bootstrap(&clock)?;

    let degraded = CardRenderer::new(
        install.config().paths.artifact_dir(),
        RenderConfig {
            logo: None,
            font: Some(dir.path().join("missing.ttf")),
        },
    );
    let mut coordinator = EnrollmentCoordinator::new(
        MockLicenseAuthority::active(),
        install.primary_store(),
        install.media_store(),
        degraded,
        install.allocator(),
        install.config().paths.media_dir.clone(),
        &clock,
    );
    assert!(matches!(
        coordinator.submit(&input()),
        EnrollmentOutcome::Degraded { .. }
    ));

    // A fallback that also fails aborts with nothing written.
    let blocked_artifacts = dir.path().join("artifacts-file");
    std::fs::write(&blocked_artifacts, "occupied")?;
    let broken = CardRenderer::new(
        blocked_artifacts,
        RenderConfig {
            logo: None,
            font: Some(dir.path().join("missing.ttf")),
        },
    );
    let mut coordinator = EnrollmentCoordinator::new(
        MockLicenseAuthority::active(),
        install.primary_store(),
        install.media_store(),
        broken,
        install.allocator(),
        install.config().paths.media_dir.clone(),
        &clock,
    );
    assert!(matches!(
        coordinator.submit(&input()),
        EnrollmentOutcome::Fatal(EnrollmentError::Render(_))
    ));
    assert_eq!(install.primary_store().scan_identifiers()?.len(), 1);
    Ok(())
}

#[test]
fn duplicate_rows_are_kept_and_skipped_by_allocation() -> anyhow::Result<()> {
    let dir = tempdir()?;
    let install = installation(dir.path());
    let clock = FixedClock::on(start());
    install.bootstrap(&clock)?;

    let mut store = install.primary_store();
    let sample = install
        .coordinator(&clock)
        .submit(&input())
        .record()
        .cloned()
        .expect("issued");
    store.append(PrimaryRow::new(&sample, "duplicate"))?;

    let ids = store.scan_identifiers()?;
    assert_eq!(ids, vec!["GKNMH-CERWP-1000", "GKNMH-CERWP-1000"]);
    assert_eq!(
        IdentifierAllocator::new("GKNMH-CERWP").allocate(&store)?,
        "GKNMH-CERWP-1001"
    );
    Ok(())
}
