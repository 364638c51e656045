//! ---
//! pid_section: "06-security-access-control"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Credential persistence, audit trail, and access control."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::fmt;

use chrono::Duration;

use crate::credentials::Role;

/// Failed User logins before the persisted lockout engages.
pub const MAX_USER_ATTEMPTS: u8 = 3;

/// Failed Admin logins tolerated within one session.
pub const MAX_ADMIN_ATTEMPTS: u8 = 3;

/// Maximum age of the User secret, in whole days.
pub const USER_ROTATION_MAX_DAYS: i64 = 90;

/// Minimum secret length, in characters.
pub const MIN_SECRET_LENGTH: usize = 8;

/// Punctuation accepted as the required symbol.
pub const SECRET_SYMBOLS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Per-role policy table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RolePolicy {
    /// Maximum secret age; `None` means the secret never expires.
    pub max_secret_age: Option<Duration>,
    /// Failed attempts allowed before lockout.
    pub max_attempts: u8,
}

impl Role {
    /// Policy governing this role.
    pub fn policy(self) -> RolePolicy {
        match self {
            Role::User => RolePolicy {
                max_secret_age: Some(Duration::days(USER_ROTATION_MAX_DAYS)),
                max_attempts: MAX_USER_ATTEMPTS,
            },
            Role::Admin => RolePolicy {
                max_secret_age: None,
                max_attempts: MAX_ADMIN_ATTEMPTS,
            },
        }
    }
}

/// Individual strength rule a candidate secret broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrengthViolation {
    /// Fewer than [`MIN_SECRET_LENGTH`] characters.
    TooShort,
    /// No ASCII uppercase letter.
    MissingUppercase,
    /// No ASCII lowercase letter.
    MissingLowercase,
    /// No ASCII digit.
    MissingDigit,
    /// No character from [`SECRET_SYMBOLS`].
    MissingSymbol,
}

impl fmt::Display for StrengthViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StrengthViolation::TooShort => "at least 8 characters",
            StrengthViolation::MissingUppercase => "an uppercase letter",
            StrengthViolation::MissingLowercase => "a lowercase letter",
            StrengthViolation::MissingDigit => "a digit",
            StrengthViolation::MissingSymbol => "a symbol",
        };
        write!(f, "requires {text}")
    }
}

/// Every rule the candidate breaks; empty when it is acceptable.
pub fn strength_violations(candidate: &str) -> Vec<StrengthViolation> {
    let mut violations = Vec::new();
    if candidate.chars().count() < MIN_SECRET_LENGTH {
        violations.push(StrengthViolation::TooShort);
    }
    if !candidate.chars().any(|c| c.is_ascii_uppercase()) {
        violations.push(StrengthViolation::MissingUppercase);
    }
    if !candidate.chars().any(|c| c.is_ascii_lowercase()) {
        violations.push(StrengthViolation::MissingLowercase);
    }
    if !candidate.chars().any(|c| c.is_ascii_digit()) {
        violations.push(StrengthViolation::MissingDigit);
    }
    if !candidate.chars().any(|c| SECRET_SYMBOLS.contains(c)) {
        violations.push(StrengthViolation::MissingSymbol);
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strength_table() {
        let table = [
            ("short1!", Some(StrengthViolation::TooShort)),
            ("alllower1!", Some(StrengthViolation::MissingUppercase)),
            ("ALLUPPER1!", Some(StrengthViolation::MissingLowercase)),
            ("NoDigits!", Some(StrengthViolation::MissingDigit)),
            ("NoSymbol1A", Some(StrengthViolation::MissingSymbol)),
            ("Valid1Pass!", None),
        ];
        for (candidate, expected) in table {
            let violations = strength_violations(candidate);
            match expected {
                Some(rule) => assert!(
                    violations.contains(&rule),
                    "{candidate} should break {rule:?}, got {violations:?}"
                ),
                None => assert!(violations.is_empty(), "{candidate} should pass"),
            }
        }
    }

    #[test]
    fn symbols_outside_the_set_do_not_count() {
        assert_eq!(
            strength_violations("Abcdefg1_-"),
            vec![StrengthViolation::MissingSymbol]
        );
    }

    #[test]
    fn only_user_secrets_expire() {
        assert_eq!(
            Role::User.policy().max_secret_age,
            Some(Duration::days(90))
        );
        assert!(Role::Admin.policy().max_secret_age.is_none());
    }

    #[test]
    fn both_roles_allow_three_attempts() {
        assert_eq!(
            Role::User.policy(),
            RolePolicy {
                max_secret_age: Some(Duration::days(USER_ROTATION_MAX_DAYS)),
                max_attempts: 3,
            }
        );
        assert_eq!(Role::Admin.policy().max_attempts, 3);
    }
}
