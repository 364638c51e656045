//! ---
//! pid_section: "01-core-functionality"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Enrollment coordination and installation lifecycle."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use pidgen_common::config::AppConfig;
use pidgen_common::time::Clock;
use pidgen_licensing::LicenseGate;
use pidgen_persistence::{IdentifierAllocator, MediaStore, PersistenceMetrics, PrimaryStore};
use pidgen_security::{AccessController, AuditLog, CredentialStore, SecurityError, SecurityMetrics};
use prometheus::Registry;
use tracing::info;

use crate::enrollment::EnrollmentCoordinator;
use crate::render::CardRenderer;

/// What a bootstrap run had to create.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Directories that did not exist before.
    pub created_dirs: Vec<PathBuf>,
    /// Primary store header written.
    pub primary_store_created: bool,
    /// Media store header written.
    pub media_store_created: bool,
    /// Default Admin secret installed.
    pub admin_default_installed: bool,
    /// Trial start recorded by this run.
    pub license_started: Option<NaiveDate>,
}

impl BootstrapReport {
    /// True when the installation already existed in full.
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

/// An installation rooted at the configured paths; builds every component over them.
#[derive(Debug, Clone)]
pub struct Installation {
    config: AppConfig,
    security_metrics: Option<SecurityMetrics>,
    persistence_metrics: Option<PersistenceMetrics>,
}

impl Installation {
    /// Installation described by `config`.
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            security_metrics: None,
            persistence_metrics: None,
        }
    }

    /// Register security and persistence counters on `registry`; every
    /// access controller and record store built afterwards reports into it.
    pub fn with_metrics(mut self, registry: Arc<Registry>) -> Result<Self> {
        let security = SecurityMetrics::new(registry.clone())
            .context("failed to register security metrics")?;
        let persistence =
            PersistenceMetrics::new(registry).context("failed to register persistence metrics")?;
        self.security_metrics = Some(security);
        self.persistence_metrics = Some(persistence);
        Ok(self)
    }

    /// Configuration in use.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Create whatever is missing. Existing files are never overwritten.
    pub fn bootstrap(&self, clock: &impl Clock) -> Result<BootstrapReport> {
        let paths = &self.config.paths;
        let mut report = BootstrapReport::default();

        let store_dir = paths
            .primary_store()
            .parent()
            .map(PathBuf::from)
            .unwrap_or_else(|| paths.base_dir.clone());
        for dir in [
            paths.base_dir.clone(),
            store_dir,
            paths.artifact_dir(),
            paths.license_dir(),
            paths.media_dir.clone(),
        ] {
            if !dir.is_dir() {
                fs::create_dir_all(&dir)
                    .with_context(|| format!("unable to create directory {}", dir.display()))?;
                report.created_dirs.push(dir);
            }
        }

        report.primary_store_created = self
            .primary_store()
            .ensure_initialized()
            .context("unable to initialise primary record store")?;
        report.media_store_created = self
            .media_store()
            .ensure_initialized()
            .context("unable to initialise media record store")?;
        report.admin_default_installed = self
            .credential_store()
            .ensure_admin_default()
            .context("unable to install default admin credential")?;

        let gate = self.license_gate();
        if !gate.path().exists() {
            let state = gate
                .initialize(clock.today())
                .context("unable to record license start date")?;
            report.license_started = Some(state.start_date);
        }

        if !report.is_noop() {
            info!(base_dir = %paths.base_dir.display(), "installation bootstrapped");
        }
        Ok(report)
    }

    /// Credential files.
    pub fn credential_store(&self) -> CredentialStore {
        CredentialStore::new(
            self.config.paths.user_credential(),
            self.config.paths.admin_credential(),
        )
    }

    /// Authentication audit trail.
    pub fn audit_log(&self) -> AuditLog {
        AuditLog::new(self.config.paths.audit_log())
    }

    /// Trial license gate.
    pub fn license_gate(&self) -> LicenseGate {
        LicenseGate::new(self.config.paths.license_file())
    }

    /// Primary Record Store.
    pub fn primary_store(&self) -> PrimaryStore {
        let store = PrimaryStore::new(self.config.paths.primary_store(), "primary");
        match &self.persistence_metrics {
            Some(metrics) => store.with_metrics(metrics.clone()),
            None => store,
        }
    }

    /// Media Record Store.
    pub fn media_store(&self) -> MediaStore {
        let store = MediaStore::new(self.config.paths.media_store(), "media");
        match &self.persistence_metrics {
            Some(metrics) => store.with_metrics(metrics.clone()),
            None => store,
        }
    }

    /// Card renderer writing into the artifact directory.
    pub fn renderer(&self) -> CardRenderer {
        CardRenderer::new(self.config.paths.artifact_dir(), self.config.render.clone())
    }

    /// Allocator using the configured prefix.
    pub fn allocator(&self) -> IdentifierAllocator {
        IdentifierAllocator::new(self.config.identifier.prefix.clone())
    }

    /// Access controller over the persisted credentials.
    pub fn access_controller<C: Clock>(&self, clock: C) -> Result<AccessController<C>, SecurityError> {
        let access = AccessController::open(self.credential_store(), self.audit_log(), clock)?;
        Ok(match &self.security_metrics {
            Some(metrics) => access.with_metrics(metrics.clone()),
            None => access,
        })
    }

    /// Coordinator over the on-disk stores.
    pub fn coordinator<C: Clock>(
        &self,
        clock: C,
    ) -> EnrollmentCoordinator<LicenseGate, PrimaryStore, MediaStore, CardRenderer, C> {
        EnrollmentCoordinator::new(
            self.license_gate(),
            self.primary_store(),
            self.media_store(),
            self.renderer(),
            self.allocator(),
            self.config.paths.media_dir.clone(),
            clock,
        )
    }
}
