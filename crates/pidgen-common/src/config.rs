//! ---
//! pid_section: "01-core-functionality"
//! pid_subsection: "module"
//! pid_type: "source"
//! pid_scope: "code"
//! pid_description: "Shared primitives and utilities for the enrollment runtime."
//! pid_version: "v0.0.0-prealpha"
//! pid_owner: "tbd"
//! ---
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::logging::LogFormat;

fn home_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn default_base_dir() -> PathBuf {
    match home_dir() {
        Some(home) => home.join("Documents").join("id_gen_admin"),
        None => PathBuf::from("id_gen_admin"),
    }
}

fn default_media_dir() -> PathBuf {
    match home_dir() {
        Some(home) => home.join("Pictures").join("GKNMH_ID_Generator"),
        None => PathBuf::from("GKNMH_ID_Generator"),
    }
}

fn default_prefix() -> String {
    "GKNMH-CERWP".to_owned()
}

fn default_logging_directory() -> PathBuf {
    PathBuf::from("target/logs")
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

/// Primary configuration object for the PIDGen runtime.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub identifier: IdentifierConfig,
    #[serde(default)]
    pub render: RenderConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata describing where an [`AppConfig`] was loaded from.
#[derive(Debug, Clone)]
pub struct LoadedAppConfig {
    pub config: AppConfig,
    /// `None` when no file was found and built-in defaults apply.
    pub source: Option<PathBuf>,
}

impl AppConfig {
    pub const ENV_CONFIG_PATH: &'static str = "PIDGEN_CONFIG";

    /// Load configuration from disk, respecting the `PIDGEN_CONFIG` override.
    pub fn load<P: AsRef<Path>>(candidates: &[P]) -> Result<Self> {
        Ok(Self::load_with_source(candidates)?.config)
    }

    /// Load configuration together with the effective source path.
    ///
    /// Unlike an explicit path, candidates are optional: when none of them
    /// exist the defaults are returned.
    pub fn load_with_source<P: AsRef<Path>>(candidates: &[P]) -> Result<LoadedAppConfig> {
        if let Ok(env_path) = std::env::var(Self::ENV_CONFIG_PATH) {
            if !env_path.trim().is_empty() {
                let path = PathBuf::from(env_path);
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        for candidate in candidates {
            if candidate.as_ref().exists() {
                let path = candidate.as_ref().to_path_buf();
                let config = Self::from_path(&path)?;
                return Ok(LoadedAppConfig {
                    config,
                    source: Some(path),
                });
            }
        }

        debug!("no configuration file found; using built-in defaults");
        Ok(LoadedAppConfig {
            config: Self::default(),
            source: None,
        })
    }

    /// Read and validate a configuration file.
    pub fn from_path(path: &Path) -> Result<Self> {
        debug!(config_path = %path.display(), "loading configuration");
        let contents = fs::read_to_string(path)
            .with_context(|| format!("unable to read config file {}", path.display()))?;
        let config = toml::from_str::<AppConfig>(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate structural invariants.
    pub fn validate(&self) -> Result<()> {
        self.identifier.validate()
    }
}

impl std::str::FromStr for AppConfig {
    type Err = anyhow::Error;

    fn from_str(content: &str) -> std::result::Result<Self, Self::Err> {
        let config: AppConfig =
            toml::from_str(content).with_context(|| "failed to parse configuration")?;
        config.validate()?;
        Ok(config)
    }
}

/// Filesystem layout of an installation.
///
/// Only `base_dir` and `media_dir` are required; every other location is
/// derived from them unless set explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default = "default_media_dir")]
    pub media_dir: PathBuf,
    #[serde(default)]
    pub primary_store: Option<PathBuf>,
    #[serde(default)]
    pub media_store: Option<PathBuf>,
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
    #[serde(default)]
    pub license_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: default_base_dir(),
            media_dir: default_media_dir(),
            primary_store: None,
            media_store: None,
            artifact_dir: None,
            license_dir: None,
        }
    }
}

impl PathsConfig {
    /// Rebase every derived location under a single root (tests, portable installs).
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            base_dir: root.join("id_gen_admin"),
            media_dir: root.join("Pictures").join("GKNMH_ID_Generator"),
            ..Self::default()
        }
    }

    /// Clinical ledger (primary record store).
    pub fn primary_store(&self) -> PathBuf {
        self.primary_store.clone().unwrap_or_else(|| {
            self.base_dir
                .join("data_base")
                .join("patient_data.csv")
        })
    }

    /// Advisory mirror of the ledger kept next to the media copies.
    pub fn media_store(&self) -> PathBuf {
        self.media_store
            .clone()
            .unwrap_or_else(|| self.media_dir.join("patient_data_pictures.csv"))
    }

    /// Directory receiving rendered cards and transient QR payloads.
    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("gen_id"))
    }

    /// Directory holding credential, license, and audit files.
    pub fn license_dir(&self) -> PathBuf {
        self.license_dir
            .clone()
            .unwrap_or_else(|| self.base_dir.join("logo").join("license"))
    }

    /// Persisted User credential (digest, rotation timestamp, attempt count).
    pub fn user_credential(&self) -> PathBuf {
        self.license_dir().join("cred.txt")
    }

    /// Persisted Admin digest.
    pub fn admin_credential(&self) -> PathBuf {
        self.license_dir().join("admin.txt")
    }

    /// Trial start date.
    pub fn license_file(&self) -> PathBuf {
        self.license_dir().join("start_date.txt")
    }

    /// Authentication audit trail.
    pub fn audit_log(&self) -> PathBuf {
        self.license_dir().join("user_login_log.txt")
    }
}

/// Identifier allocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifierConfig {
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for IdentifierConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
        }
    }
}

impl IdentifierConfig {
    pub fn validate(&self) -> Result<()> {
        if self.prefix.trim().is_empty() {
            return Err(anyhow!("identifier prefix cannot be empty"));
        }
        if self.prefix.chars().any(char::is_whitespace) {
            return Err(anyhow!(
                "identifier prefix '{}' must not contain whitespace",
                self.prefix
            ));
        }
        Ok(())
    }
}

/// Resources used by the standard card style.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub logo: Option<PathBuf>,
    #[serde(default)]
    pub font: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_logging_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_log_format")]
    pub format: LogFormat,
    #[serde(default)]
    pub file_prefix: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_logging_directory(),
            format: default_log_format(),
            file_prefix: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_follow_base_dir() {
        let paths = PathsConfig::rooted_at("/srv/clinic");
        assert_eq!(
            paths.primary_store(),
            PathBuf::from("/srv/clinic/id_gen_admin/data_base/patient_data.csv")
        );
        assert_eq!(
            paths.admin_credential(),
            PathBuf::from("/srv/clinic/id_gen_admin/logo/license/admin.txt")
        );
        assert_eq!(
            paths.media_store(),
            PathBuf::from("/srv/clinic/Pictures/GKNMH_ID_Generator/patient_data_pictures.csv")
        );
    }

    #[test]
    fn explicit_paths_override_derivation() {
        let config: AppConfig = r#"
            [paths]
            base_dir = "/data"
            media_dir = "/media"
            primary_store = "/ledger/records.csv"

            [identifier]
            prefix = "CLINIC"
        "#
        .parse()
        .unwrap();
        assert_eq!(config.paths.primary_store(), PathBuf::from("/ledger/records.csv"));
        assert_eq!(config.paths.artifact_dir(), PathBuf::from("/data/gen_id"));
        assert_eq!(config.identifier.prefix, "CLINIC");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn blank_prefix_is_rejected() {
        let err = "[identifier]\nprefix = \"  \"\n"
            .parse::<AppConfig>()
            .unwrap_err();
        assert!(err.to_string().contains("prefix"));
        assert!("[identifier]\nprefix = \"A B\"\n"
            .parse::<AppConfig>()
            .is_err());
    }
}
