//! ---
//! pid_section: "01-core-functionality"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Enrollment coordination and installation lifecycle."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
//! Enrollment pipeline for PIDGen: intake validation, card rendering, the
//! license-gated enrollment coordinator, and first-run installation setup.

pub mod bootstrap;
pub mod enrollment;
pub mod intake;
pub mod render;

pub use bootstrap::{BootstrapReport, Installation};
pub use enrollment::{EnrollmentCoordinator, EnrollmentError, EnrollmentOutcome, EnrollmentWarning};
pub use intake::{RecordInput, ValidatedRecordInput, ValidationError};
pub use render::{ArtifactRenderer, CardRenderer, RenderError, RenderStyle, RenderedArtifact};
