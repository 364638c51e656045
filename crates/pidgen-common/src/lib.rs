//! ---
//! pid_section: "01-core-functionality"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Shared primitives and utilities for the enrollment runtime."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
//! Core shared primitives for the PIDGen workspace.
//! This crate exposes configuration loading, tracing initialisation, and
//! the clock/civil-calendar helpers consumed across the workspace.

pub mod config;
pub mod fs;
pub mod logging;
pub mod time;

pub use config::{
    AppConfig, IdentifierConfig, LoadedAppConfig, LoggingConfig, PathsConfig, RenderConfig,
};
pub use fs::write_atomic;
pub use logging::{init_tracing, LogFormat};
pub use time::{age_on, format_dmy, parse_dmy, Clock, FixedClock, SystemClock, DMY_FORMAT};
