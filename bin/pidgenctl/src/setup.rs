//! ---
//! pid_section: "05-operator-interfaces"
//! pid_subsection: "binary"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Operator CLI for PIDGen installations."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::io::{self, IsTerminal, Write};

use anyhow::{anyhow, bail, Context, Result};
use pidgen_common::time::{format_dmy, SystemClock};
use pidgen_core::Installation;
use pidgen_logging::{log_system_event, SystemEventOutcome};
use pidgen_security::DEFAULT_ADMIN_SECRET;

/// Bootstrap the installation and report what was created.
pub fn run(install: &Installation) -> Result<()> {
    let report = match install.bootstrap(&SystemClock) {
        Ok(report) => report,
        Err(error) => {
            log_system_event(
                None,
                "setup.init",
                &format!("failed to bootstrap installation: {error:#}"),
                SystemEventOutcome::Fault,
            );
            return Err(error);
        }
    };

    let paths = &install.config().paths;
    if report.is_noop() {
        println!("Installation at {} is already initialised.", paths.base_dir.display());
        return Ok(());
    }
    for dir in &report.created_dirs {
        println!("Created directory {}", dir.display());
    }
    if report.primary_store_created {
        println!("Created primary record store {}", paths.primary_store().display());
    }
    if report.media_store_created {
        println!("Created media record store {}", paths.media_store().display());
    }
    if let Some(start) = report.license_started {
        println!("Trial license started on {}", format_dmy(start));
    }
    if report.admin_default_installed {
        println!(
            "Admin secret set to the default '{DEFAULT_ADMIN_SECRET}'. Rotate it with `pidgenctl rotate admin`."
        );
    }
    log_system_event(
        None,
        "setup.init",
        &format!("installation initialised at {}", paths.base_dir.display()),
        SystemEventOutcome::Success,
    );
    Ok(())
}

/// Use the supplied secret, or ask for one on stdin.
pub fn secret_or_prompt(supplied: Option<String>, prompt: &str) -> Result<String> {
    match supplied {
        Some(secret) => Ok(secret),
        None => prompt_secret(prompt),
    }
}

/// Like [`secret_or_prompt`], but a prompted secret must be typed twice.
pub fn new_secret_or_prompt(supplied: Option<String>, prompt: &str) -> Result<String> {
    if let Some(secret) = supplied {
        return Ok(secret);
    }
    let first = prompt_secret(prompt)?;
    let second = prompt_secret(&format!("Confirm {}", prompt.to_lowercase()))?;
    if first != second {
        bail!("secrets do not match; nothing was changed");
    }
    Ok(first)
}

/// Read a secret without echo on a terminal; piped input is read one line at a time.
pub fn prompt_secret(prompt: &str) -> Result<String> {
    if io::stdin().is_terminal() {
        return rpassword::prompt_password(format!("{prompt}: "))
            .context("failed to read secret from the terminal");
    }

    print!("{prompt}: ");
    io::stdout()
        .flush()
        .context("failed to flush prompt to stdout")?;
    let mut input = String::new();
    let read = io::stdin()
        .read_line(&mut input)
        .context("failed to read response from stdin")?;
    if read == 0 {
        return Err(anyhow!("input stream closed"));
    }
    Ok(input.trim_end_matches(['\r', '\n']).to_owned())
}
