//! ---
//! pid_section: "06-security-access-control"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Credential persistence, audit trail, and access control."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use pidgen_common::time::{Clock, SystemClock};
use pidgen_logging::{log_system_event, LogContext, SystemEventOutcome};
use tracing::{info, warn};

use crate::audit::AuditLog;
use crate::credentials::{
    AdminCredential, CredentialState, CredentialStore, Role, SecretDigest, UserCredential,
    DEFAULT_ADMIN_SECRET,
};
use crate::metrics::SecurityMetrics;
use crate::policy::{strength_violations, StrengthViolation};
use crate::SecurityError;

/// Result of a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// Secret accepted; the role now holds the session.
    Success,
    /// Wrong secret; `remaining` attempts before lockout.
    Rejected {
        /// Attempts left before the bound is reached.
        remaining: u8,
    },
    /// Attempt bound exhausted (User: persisted until override; Admin: for this session).
    Locked,
    /// User secret unset or older than the rotation window; a rotation is required.
    ExpirationRequired,
}

/// Result of an Admin override of a User lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// Override accepted; a User rotation must follow.
    Granted,
    /// Override refused; the session is terminated.
    Denied,
    /// The User is not locked, nothing to override.
    NotLocked,
}

/// Result of a secret rotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationOutcome {
    /// New secret persisted.
    Success,
    /// Candidate breaks the strength policy.
    WeakSecret(Vec<StrengthViolation>),
    /// The caller did not present the required Admin authority.
    AuthorizationFailed,
}

/// Authority presented with a rotation request.
#[derive(Debug, Clone, Copy)]
pub enum Authorization<'a> {
    /// Admin secret verified within the rotation call itself (required for User rotations).
    AdminSecret(&'a str),
    /// Reliance on an Admin session already established with [`AccessController::authenticate`].
    AdminSession,
}

/// Lifecycle state of the User credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserState {
    /// No secret issued yet.
    Unset,
    /// Secret valid and below the attempt bound.
    Active,
    /// Secret older than the rotation window.
    Expired,
    /// Attempt bound reached; requires override then rotation.
    Locked,
}

/// Login, lockout, override, and rotation state machine for one operator session.
///
/// Cross-restart state lives in the [`CredentialStore`] and is written back
/// after every mutation. The Admin attempt counter and the termination flag
/// are scoped to this value: dropping it and opening a new controller is
/// how a caller restarts the flow.
#[derive(Debug)]
pub struct AccessController<C: Clock = SystemClock> {
    store: CredentialStore,
    audit: AuditLog,
    clock: C,
    state: CredentialState,
    session: Option<Role>,
    admin_failures: u8,
    override_granted: bool,
    terminated: bool,
    metrics: Option<SecurityMetrics>,
}

impl<C: Clock> AccessController<C> {
    /// Load persisted credential state and start a fresh session.
    pub fn open(store: CredentialStore, audit: AuditLog, clock: C) -> Result<Self, SecurityError> {
        let state = store.load()?;
        Ok(Self {
            store,
            audit,
            clock,
            state,
            session: None,
            admin_failures: 0,
            override_granted: false,
            terminated: false,
            metrics: None,
        })
    }

    /// Attach Prometheus counters.
    pub fn with_metrics(mut self, metrics: SecurityMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Role currently holding the session, if any.
    pub fn session(&self) -> Option<Role> {
        if self.terminated {
            None
        } else {
            self.session
        }
    }

    /// True when `role` holds a live session.
    pub fn is_authorized(&self, role: Role) -> bool {
        self.session() == Some(role)
    }

    /// True after a denied override; nothing may be presented as authenticated.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// True between a granted override and the User rotation that completes it.
    pub fn override_pending(&self) -> bool {
        self.override_granted
    }

    /// Persisted consecutive User failures.
    pub fn failed_attempts(&self) -> u8 {
        self.state
            .user
            .as_ref()
            .map(|user| user.failed_attempts)
            .unwrap_or(0)
    }

    /// True while the Admin secret is still the bootstrap default.
    pub fn admin_secret_is_default(&self) -> bool {
        self.state
            .admin
            .as_ref()
            .is_some_and(|admin| admin.secret_hash.matches(DEFAULT_ADMIN_SECRET))
    }

    /// Current User lifecycle state.
    pub fn user_state(&self) -> UserState {
        let Some(user) = &self.state.user else {
            return UserState::Unset;
        };
        let Some(last_rotated) = user.last_rotated else {
            return UserState::Unset;
        };
        if let Some(max_age) = Role::User.policy().max_secret_age {
            if (self.clock.now() - last_rotated).num_days() > max_age.num_days() {
                return UserState::Expired;
            }
        }
        if user.is_locked() {
            UserState::Locked
        } else {
            UserState::Active
        }
    }

    /// Drop the current session without touching persisted state.
    pub fn end_session(&mut self) {
        self.session = None;
    }

    /// Attempt a login for `role`. Appends exactly one audit entry.
    pub fn authenticate(
        &mut self,
        role: Role,
        candidate: &str,
    ) -> Result<AuthOutcome, SecurityError> {
        if let Some(metrics) = &self.metrics {
            metrics.inc_auth_attempt();
        }
        let (result, note) = match role {
            Role::User => self.authenticate_user(candidate),
            Role::Admin => self.authenticate_admin(candidate),
        };
        self.record(role, &note);
        result
    }

    /// Clear a User lockout with the Admin secret. Appends exactly one audit entry.
    ///
    /// `Granted` does not reactivate the User; only the rotation that must
    /// follow does. `Denied` terminates this session.
    pub fn admin_override(&mut self, admin_secret: &str) -> OverrideOutcome {
        let (outcome, note) = if self.terminated {
            (OverrideOutcome::Denied, "Admin override refused, session terminated")
        } else if self.user_state() != UserState::Locked {
            (OverrideOutcome::NotLocked, "Admin override not required")
        } else if self.admin_matches(admin_secret) {
            self.override_granted = true;
            log_system_event(
                Some(&LogContext::new().with_role("User").with_operation("admin_override")),
                "access.override",
                "admin override granted; user rotation required",
                SystemEventOutcome::Success,
            );
            (
                OverrideOutcome::Granted,
                "Admin override granted, resetting user password",
            )
        } else {
            self.terminate();
            (
                OverrideOutcome::Denied,
                "Admin override failed, application locked",
            )
        };
        self.record(Role::User, note);
        outcome
    }

    /// Replace the secret of `role`. Appends exactly one audit entry.
    ///
    /// User rotations always verify the Admin secret inside this call. Admin
    /// rotations require a live Admin session.
    pub fn rotate_secret(
        &mut self,
        role: Role,
        new_secret: &str,
        authorization: Authorization<'_>,
    ) -> Result<RotationOutcome, SecurityError> {
        let (result, note) = self.rotate(role, new_secret, authorization);
        self.record(role, &note);
        result
    }

    fn authenticate_user(
        &mut self,
        candidate: &str,
    ) -> (Result<AuthOutcome, SecurityError>, String) {
        if self.terminated {
            return (
                Ok(AuthOutcome::Locked),
                "Login refused, session terminated".to_owned(),
            );
        }
        match self.user_state() {
            UserState::Unset | UserState::Expired => {
                return (
                    Ok(AuthOutcome::ExpirationRequired),
                    "Password setup or renewal required".to_owned(),
                );
            }
            UserState::Locked => {
                return (
                    Ok(AuthOutcome::Locked),
                    "Locked, admin override required".to_owned(),
                );
            }
            UserState::Active => {}
        }
        let Some(user) = self.state.user.as_mut() else {
            return (
                Ok(AuthOutcome::ExpirationRequired),
                "Password setup or renewal required".to_owned(),
            );
        };

        if user.secret_hash.matches(candidate) {
            let needs_reset = user.failed_attempts != 0;
            user.failed_attempts = 0;
            if needs_reset {
                let snapshot = user.clone();
                if let Err(err) = self.store.save_user(&snapshot) {
                    return (Err(err), "Login failed, credential store unavailable".to_owned());
                }
            }
            self.session = Some(Role::User);
            info!(role = "User", "login successful");
            return (Ok(AuthOutcome::Success), "Login successful".to_owned());
        }

        user.failed_attempts = user.failed_attempts.saturating_add(1);
        let snapshot = user.clone();
        if let Some(metrics) = &self.metrics {
            metrics.inc_auth_failure();
        }
        if let Err(err) = self.store.save_user(&snapshot) {
            return (Err(err), "Login failed, credential store unavailable".to_owned());
        }
        if snapshot.is_locked() {
            if let Some(metrics) = &self.metrics {
                metrics.inc_lockout();
            }
            log_system_event(
                Some(&LogContext::new().with_role("User").with_operation("authenticate")),
                "access.lockout",
                "user locked after exhausting login attempts",
                SystemEventOutcome::Fault,
            );
            return (
                Ok(AuthOutcome::Locked),
                "Invalid password, locked after failed attempts".to_owned(),
            );
        }
        let remaining = Role::User
            .policy()
            .max_attempts
            .saturating_sub(snapshot.failed_attempts);
        (
            Ok(AuthOutcome::Rejected { remaining }),
            format!("Invalid password. Attempts left: {remaining}"),
        )
    }

    fn authenticate_admin(
        &mut self,
        candidate: &str,
    ) -> (Result<AuthOutcome, SecurityError>, String) {
        let max_attempts = Role::Admin.policy().max_attempts;
        if self.terminated {
            return (
                Ok(AuthOutcome::Locked),
                "Login refused, session terminated".to_owned(),
            );
        }
        if self.admin_failures >= max_attempts {
            return (
                Ok(AuthOutcome::Locked),
                "Failed login attempts exceeded".to_owned(),
            );
        }
        if self.admin_matches(candidate) {
            self.admin_failures = 0;
            self.session = Some(Role::Admin);
            if self.admin_secret_is_default() {
                warn!("admin authenticated with the default secret; rotate it");
            }
            return (Ok(AuthOutcome::Success), "Login successful".to_owned());
        }

        self.admin_failures += 1;
        if let Some(metrics) = &self.metrics {
            metrics.inc_auth_failure();
        }
        if self.admin_failures >= max_attempts {
            if let Some(metrics) = &self.metrics {
                metrics.inc_lockout();
            }
            log_system_event(
                Some(&LogContext::new().with_role("Admin").with_operation("authenticate")),
                "access.lockout",
                "admin login attempts exhausted for this session",
                SystemEventOutcome::Fault,
            );
            return (
                Ok(AuthOutcome::Locked),
                "Failed login attempts exceeded".to_owned(),
            );
        }
        let remaining = max_attempts - self.admin_failures;
        (
            Ok(AuthOutcome::Rejected { remaining }),
            format!("Invalid password. Attempts left: {remaining}"),
        )
    }

    fn rotate(
        &mut self,
        role: Role,
        new_secret: &str,
        authorization: Authorization<'_>,
    ) -> (Result<RotationOutcome, SecurityError>, String) {
        if self.terminated {
            return (
                Ok(RotationOutcome::AuthorizationFailed),
                "Password change refused, session terminated".to_owned(),
            );
        }
        let authorized = match role {
            Role::User => match authorization {
                Authorization::AdminSecret(secret) => self.admin_matches(secret),
                Authorization::AdminSession => false,
            },
            Role::Admin => self.is_authorized(Role::Admin),
        };
        if !authorized {
            return (
                Ok(RotationOutcome::AuthorizationFailed),
                "Password change refused, admin authorization failed".to_owned(),
            );
        }

        let violations = strength_violations(new_secret);
        if !violations.is_empty() {
            return (
                Ok(RotationOutcome::WeakSecret(violations)),
                "Password change rejected, weak password".to_owned(),
            );
        }

        match role {
            Role::User => {
                let credential = UserCredential::issued(new_secret, self.clock.now());
                if let Err(err) = self.store.save_user(&credential) {
                    return (Err(err), "Password change failed, credential store unavailable".to_owned());
                }
                self.state.user = Some(credential);
                self.override_granted = false;
                info!(role = "User", "user secret rotated");
                (Ok(RotationOutcome::Success), "Password set or renewed".to_owned())
            }
            Role::Admin => {
                let credential = AdminCredential {
                    secret_hash: SecretDigest::of(new_secret),
                };
                if let Err(err) = self.store.save_admin(&credential) {
                    return (Err(err), "Password change failed, credential store unavailable".to_owned());
                }
                self.state.admin = Some(credential);
                info!(role = "Admin", "admin secret rotated");
                (Ok(RotationOutcome::Success), "Admin password changed".to_owned())
            }
        }
    }

    fn admin_matches(&self, candidate: &str) -> bool {
        self.state
            .admin
            .as_ref()
            .is_some_and(|admin| admin.secret_hash.matches(candidate))
    }

    fn terminate(&mut self) {
        self.terminated = true;
        self.session = None;
        log_system_event(
            Some(&LogContext::new().with_operation("admin_override")),
            "access.terminated",
            "admin override denied; session terminated",
            SystemEventOutcome::Fault,
        );
    }

    fn record(&self, role: Role, note: &str) {
        if let Err(err) = self.audit.append(self.clock.now(), role, note) {
            warn!(error = %err, path = %self.audit.path().display(), "audit log write failed");
        }
    }
}
