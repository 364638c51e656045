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
use std::io;
use std::path::{Path, PathBuf};

use pidgen_common::config::RenderConfig;
use pidgen_common::fs::write_atomic;
use pidgen_common::time::format_dmy;
use pidgen_persistence::PatientRecord;
use serde::Serialize;
use thiserror::Error;

const CARD_TITLE: &str = "Patient ID Card";
const FALLBACK_FONT: &str = "builtin-default";
const BUILTIN_FONT: &str = "builtin-sans";
const VITALS: [&str; 3] = [
    "BP: ________ mm/Hg     Pulse: ______/min",
    "Blood Sugar: FBS/RBS ________ mgs/dl",
    "Oral:",
];

/// Visual style requested from the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStyle {
    /// Configured font and logo.
    Standard,
    /// Built-in font, no logo. Used when standard resources are missing.
    Fallback,
}

/// Failure to produce the card artifact.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A drawing resource required by the requested style is missing.
    #[error("render resource unavailable: {}", .0.display())]
    ResourcesUnavailable(PathBuf),
    /// Writing the artifact failed.
    #[error("unable to write artifact {path}: {source}")]
    Io {
        /// Artifact location.
        path: PathBuf,
        /// Underlying IO failure.
        #[source]
        source: io::Error,
    },
    /// The card could not be encoded.
    #[error("card encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Files produced by one render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedArtifact {
    /// Composed card; the only file that persists.
    pub card_path: PathBuf,
    /// Intermediate QR payload; removed after enrollment.
    pub qr_path: PathBuf,
    /// Style that produced the card.
    pub style: RenderStyle,
}

/// External render capability: `render(record, qr_payload) -> artifact`.
pub trait ArtifactRenderer {
    /// Produce the card for `record` with `qr_payload` encoded alongside it.
    fn render(
        &self,
        record: &PatientRecord,
        qr_payload: &str,
        style: RenderStyle,
    ) -> Result<RenderedArtifact, RenderError>;
}

impl<T: ArtifactRenderer + ?Sized> ArtifactRenderer for &T {
    fn render(
        &self,
        record: &PatientRecord,
        qr_payload: &str,
        style: RenderStyle,
    ) -> Result<RenderedArtifact, RenderError> {
        (**self).render(record, qr_payload, style)
    }
}

/// Renders a structured card document (`<id>.card.json`) plus the QR
/// payload file (`<id>_qr.txt`) into the artifact directory.
#[derive(Debug, Clone)]
pub struct CardRenderer {
    output_dir: PathBuf,
    resources: RenderConfig,
}

#[derive(Serialize)]
struct CardDocument<'a> {
    title: &'static str,
    id: &'a str,
    style: RenderStyle,
    font: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    logo: Option<String>,
    details: Vec<(&'static str, String)>,
    qr: QrBlock<'a>,
    vitals: [&'static str; 3],
}

#[derive(Serialize)]
struct QrBlock<'a> {
    payload: &'a str,
    source: String,
}

impl CardRenderer {
    /// Renderer writing into `output_dir` with the given standard-style resources.
    pub fn new(output_dir: impl Into<PathBuf>, resources: RenderConfig) -> Self {
        Self {
            output_dir: output_dir.into(),
            resources,
        }
    }

    /// Directory receiving artifacts.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Card location for `id`.
    pub fn card_path(&self, id: &str) -> PathBuf {
        self.output_dir.join(format!("{id}.card.json"))
    }

    /// Transient QR payload location for `id`.
    pub fn qr_path(&self, id: &str) -> PathBuf {
        self.output_dir.join(format!("{id}_qr.txt"))
    }

    // Standard style needs a configured font to exist; a missing logo is skipped.
    fn resolve(&self, style: RenderStyle) -> Result<(String, Option<String>), RenderError> {
        match style {
            RenderStyle::Fallback => Ok((FALLBACK_FONT.to_owned(), None)),
            RenderStyle::Standard => {
                let font = match &self.resources.font {
                    Some(font) if font.is_file() => font.display().to_string(),
                    Some(font) => return Err(RenderError::ResourcesUnavailable(font.clone())),
                    None => BUILTIN_FONT.to_owned(),
                };
                let logo = self
                    .resources
                    .logo
                    .as_ref()
                    .filter(|logo| logo.is_file())
                    .map(|logo| logo.display().to_string());
                Ok((font, logo))
            }
        }
    }
}

impl ArtifactRenderer for CardRenderer {
    fn render(
        &self,
        record: &PatientRecord,
        qr_payload: &str,
        style: RenderStyle,
    ) -> Result<RenderedArtifact, RenderError> {
        let (font, logo) = self.resolve(style)?;
        let card_path = self.card_path(&record.id);
        let qr_path = self.qr_path(&record.id);

        write_atomic(&qr_path, qr_payload.as_bytes()).map_err(|source| RenderError::Io {
            path: qr_path.clone(),
            source,
        })?;

        let document = CardDocument {
            title: CARD_TITLE,
            id: &record.id,
            style,
            font,
            logo,
            details: vec![
                ("Patient Name", record.name.clone()),
                ("Date of Birth", format_dmy(record.dob)),
                ("Age", format!("{} years", record.age)),
                ("Gender", record.gender.to_string()),
                ("Care Of", record.care_of.clone()),
                ("Phone No", record.phone.clone()),
                ("Registration Date", format_dmy(record.registration_date)),
            ],
            qr: QrBlock {
                payload: qr_payload,
                source: qr_path.display().to_string(),
            },
            vitals: VITALS,
        };
        let body = match serde_json::to_vec_pretty(&document) {
            Ok(body) => body,
            Err(err) => {
                let _ = fs::remove_file(&qr_path);
                return Err(err.into());
            }
        };
        if let Err(source) = write_atomic(&card_path, &body) {
            let _ = fs::remove_file(&qr_path);
            return Err(RenderError::Io {
                path: card_path,
                source,
            });
        }

        Ok(RenderedArtifact {
            card_path,
            qr_path,
            style,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pidgen_persistence::Gender;
    use tempfile::tempdir;

    fn record() -> PatientRecord {
        let day = NaiveDate::from_ymd_opt(2025, 7, 23).unwrap();
        PatientRecord {
            id: "GKNMH-CERWP-1000".into(),
            name: "Asha Rao".into(),
            dob: NaiveDate::from_ymd_opt(1990, 6, 15).unwrap(),
            age: 35,
            gender: Gender::Female,
            care_of: "Ravi".into(),
            phone: "9876543210".into(),
            registration_date: day,
            timestamp: day.and_hms_opt(10, 0, 0).unwrap(),
        }
    }

    #[test]
    fn card_carries_identifier_and_fields() {
        let dir = tempdir().unwrap();
        let renderer = CardRenderer::new(dir.path(), RenderConfig::default());
        let artifact = renderer
            .render(&record(), "GKNMH-CERWP-1000", RenderStyle::Standard)
            .unwrap();

        assert_eq!(fs::read_to_string(&artifact.qr_path).unwrap(), "GKNMH-CERWP-1000");
        let card: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&artifact.card_path).unwrap()).unwrap();
        assert_eq!(card["id"], "GKNMH-CERWP-1000");
        assert_eq!(card["style"], "standard");
        assert_eq!(card["details"][2][1], "35 years");
        assert_eq!(card["details"][1][1], "15-06-1990");
    }

    #[test]
    fn missing_font_is_a_resource_failure_for_standard_only() {
        let dir = tempdir().unwrap();
        let resources = RenderConfig {
            logo: None,
            font: Some(dir.path().join("arial.ttf")),
        };
        let renderer = CardRenderer::new(dir.path().join("gen_id"), resources);
        let err = renderer
            .render(&record(), "GKNMH-CERWP-1000", RenderStyle::Standard)
            .unwrap_err();
        assert!(matches!(err, RenderError::ResourcesUnavailable(_)));
        assert!(!renderer.qr_path("GKNMH-CERWP-1000").exists());

        let artifact = renderer
            .render(&record(), "GKNMH-CERWP-1000", RenderStyle::Fallback)
            .unwrap();
        assert_eq!(artifact.style, RenderStyle::Fallback);
        assert!(artifact.card_path.exists());
    }
}
