//! ---
//! pid_section: "05-operator-interfaces"
//! pid_subsection: "binary"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Operator CLI for PIDGen installations."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use anyhow::{anyhow, bail, Result};
use clap::{Args, Subcommand};
use pidgen_common::time::{Clock, SystemClock};
use pidgen_core::Installation;
use pidgen_security::{
    AccessController, AuthOutcome, Authorization, OverrideOutcome, Role, RotationOutcome,
    StrengthViolation,
};
use tracing::warn;

use crate::setup::{new_secret_or_prompt, prompt_secret, secret_or_prompt};

#[derive(Debug, Subcommand)]
pub enum LoginCommand {
    /// Authenticate as the day-to-day operator.
    User {
        /// User secret; prompted for when absent.
        #[arg(long, env = "PIDGEN_USER_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },
    /// Authenticate as the supervisor.
    Admin {
        /// Admin secret; prompted for when absent.
        #[arg(long, env = "PIDGEN_ADMIN_SECRET", hide_env_values = true)]
        secret: Option<String>,
    },
}

#[derive(Debug, Args)]
pub struct OverrideCommand {
    /// Admin secret authorising the override.
    #[arg(long = "admin-secret", env = "PIDGEN_ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,
    /// Replacement User secret issued once the override is granted.
    #[arg(long = "new-secret", env = "PIDGEN_NEW_SECRET", hide_env_values = true)]
    new_secret: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum RotateCommand {
    /// Issue a new User secret (requires the Admin secret).
    User(RotateArgs),
    /// Replace the Admin secret (requires the current Admin secret).
    Admin(RotateArgs),
}

#[derive(Debug, Args)]
pub struct RotateArgs {
    /// Current Admin secret.
    #[arg(long = "admin-secret", env = "PIDGEN_ADMIN_SECRET", hide_env_values = true)]
    admin_secret: Option<String>,
    /// Replacement secret.
    #[arg(long = "new-secret", env = "PIDGEN_NEW_SECRET", hide_env_values = true)]
    new_secret: Option<String>,
}

/// Authenticate `role`, re-prompting on rejection when the secret was typed interactively.
pub fn authenticate<C: Clock>(
    access: &mut AccessController<C>,
    role: Role,
    supplied: Option<String>,
) -> Result<()> {
    let interactive = supplied.is_none();
    let mut candidate = secret_or_prompt(supplied, &format!("{role} secret"))?;
    loop {
        match access.authenticate(role, &candidate)? {
            AuthOutcome::Success => {
                if role == Role::Admin && access.admin_secret_is_default() {
                    eprintln!("warning: the Admin secret is still the default; rotate it with `pidgenctl rotate admin`");
                }
                return Ok(());
            }
            AuthOutcome::Rejected { remaining } if interactive => {
                eprintln!("Invalid secret. Attempts left: {remaining}");
                candidate = prompt_secret(&format!("{role} secret"))?;
            }
            AuthOutcome::Rejected { remaining } => {
                bail!("invalid {role} secret; attempts left: {remaining}")
            }
            AuthOutcome::Locked if role == Role::User => {
                bail!("User is locked after repeated failures; run `pidgenctl override`")
            }
            AuthOutcome::Locked => bail!("Admin attempts exhausted for this session"),
            AuthOutcome::ExpirationRequired => {
                bail!("User secret is unset or older than 90 days; run `pidgenctl rotate user`")
            }
        }
    }
}

pub fn login(install: &Installation, command: LoginCommand) -> Result<()> {
    let mut access = install.access_controller(SystemClock)?;
    let (role, secret) = match command {
        LoginCommand::User { secret } => (Role::User, secret),
        LoginCommand::Admin { secret } => (Role::Admin, secret),
    };
    authenticate(&mut access, role, secret)?;
    println!("{role} login successful");
    Ok(())
}

pub fn admin_override(install: &Installation, command: OverrideCommand) -> Result<()> {
    let mut access = install.access_controller(SystemClock)?;
    let admin_secret = secret_or_prompt(command.admin_secret, "Admin secret")?;
    match access.admin_override(&admin_secret) {
        OverrideOutcome::Granted => {}
        OverrideOutcome::NotLocked => {
            println!("User is not locked; nothing to override");
            return Ok(());
        }
        OverrideOutcome::Denied => {
            bail!("admin override denied; session terminated")
        }
    }

    let new_secret = new_secret_or_prompt(command.new_secret, "New User secret")?;
    let outcome =
        access.rotate_secret(Role::User, &new_secret, Authorization::AdminSecret(&admin_secret))?;
    report_rotation(Role::User, outcome)?;
    println!("Override complete; User reactivated");
    Ok(())
}

pub fn rotate(install: &Installation, command: RotateCommand) -> Result<()> {
    let mut access = install.access_controller(SystemClock)?;
    let (role, args) = match command {
        RotateCommand::User(args) => (Role::User, args),
        RotateCommand::Admin(args) => (Role::Admin, args),
    };
    let outcome = match role {
        Role::User => {
            let admin_secret = secret_or_prompt(args.admin_secret, "Admin secret")?;
            let new_secret = new_secret_or_prompt(args.new_secret, "New User secret")?;
            access.rotate_secret(role, &new_secret, Authorization::AdminSecret(&admin_secret))?
        }
        Role::Admin => {
            authenticate(&mut access, Role::Admin, args.admin_secret)?;
            let new_secret = new_secret_or_prompt(args.new_secret, "New Admin secret")?;
            access.rotate_secret(role, &new_secret, Authorization::AdminSession)?
        }
    };
    report_rotation(role, outcome)
}

fn report_rotation(role: Role, outcome: RotationOutcome) -> Result<()> {
    match outcome {
        RotationOutcome::Success => {
            println!("{role} secret updated");
            Ok(())
        }
        RotationOutcome::WeakSecret(violations) => {
            warn!(role = %role, "rotation rejected by strength policy");
            Err(anyhow!("weak secret: {}", describe(&violations)))
        }
        RotationOutcome::AuthorizationFailed => {
            Err(anyhow!("{role} secret change refused: admin authorisation failed"))
        }
    }
}

fn describe(violations: &[StrengthViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
