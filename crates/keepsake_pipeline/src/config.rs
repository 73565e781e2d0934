//! Pipeline configuration.
//!
//! Loaded from a TOML file and overlaid with `KEEPSAKE__SECTION__KEY`
//! environment variables, then validated before anything else starts.

use config::{Config, Environment, File, FileFormat};
use keepsake_core::{ReplicaPolicy, TierBoundaries};
use keepsake_error::{ConfigError, KeepsakeError, KeepsakeResult};
use keepsake_storage::CompressionProfile;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, instrument};

/// Ledger database settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// SQLite file holding the ledger
    path: PathBuf,
    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pool_size: u32,
}

fn default_pool_size() -> u32 {
    4
}

/// Identifiers of the two replication destinations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(deny_unknown_fields)]
pub struct DestinationsConfig {
    /// Destination A (e.g. "nas")
    a: String,
    /// Destination B (e.g. "pixel")
    b: String,
}

/// Batch sizes, parallelism, timeouts and the quarantine threshold.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_getters::Getters,
    derive_builder::Builder,
)]
#[serde(default, deny_unknown_fields)]
#[builder(default)]
pub struct LimitsConfig {
    /// Records fetched per stage per pass
    batch_limit: usize,
    /// Records processed concurrently within a stage
    workers: usize,
    /// Upper bound on a single executor call
    executor_timeout_secs: u64,
    /// Consecutive failures before a record is quarantined
    max_failures: u32,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            batch_limit: 50,
            workers: 4,
            executor_timeout_secs: 300,
            max_failures: 5,
        }
    }
}

impl LimitsConfig {
    /// Creates a new limits builder.
    pub fn builder() -> LimitsConfigBuilder {
        LimitsConfigBuilder::default()
    }

    /// Executor timeout as a duration.
    pub fn executor_timeout(&self) -> Duration {
        Duration::from_secs(self.executor_timeout_secs)
    }
}

/// Tier age boundaries and codec settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(default, deny_unknown_fields)]
pub struct CompressionConfig {
    light_max_age_months: u32,
    medium_max_age_months: u32,
    light_quality: u8,
    medium_quality: u8,
    heavy_quality: u8,
    light_crf: u8,
    medium_crf: u8,
    heavy_crf: u8,
    /// ffmpeg binary name or path
    ffmpeg_path: PathBuf,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        let profile = CompressionProfile::default();
        let boundaries = TierBoundaries::default();
        Self {
            light_max_age_months: *boundaries.light_max_age_months(),
            medium_max_age_months: *boundaries.medium_max_age_months(),
            light_quality: *profile.light_quality(),
            medium_quality: *profile.medium_quality(),
            heavy_quality: *profile.heavy_quality(),
            light_crf: *profile.light_crf(),
            medium_crf: *profile.medium_crf(),
            heavy_crf: *profile.heavy_crf(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
        }
    }
}

impl CompressionConfig {
    /// Tier boundaries in months.
    pub fn tier_boundaries(&self) -> TierBoundaries {
        TierBoundaries::new(self.light_max_age_months, self.medium_max_age_months)
    }

    /// Per-tier codec settings.
    pub fn profile(&self) -> KeepsakeResult<CompressionProfile> {
        CompressionProfile::builder()
            .light_quality(self.light_quality)
            .medium_quality(self.medium_quality)
            .heavy_quality(self.heavy_quality)
            .light_crf(self.light_crf)
            .medium_crf(self.medium_crf)
            .heavy_crf(self.heavy_crf)
            .build()
            .map_err(|e| ConfigError::new(format!("Invalid compression profile: {}", e)).into())
    }
}

/// Where local media lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    /// Root for ledger paths that are not absolute
    media_root: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            media_root: PathBuf::from("media"),
        }
    }
}

/// Log output settings, applied by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    level: String,
    /// Emit JSON lines instead of text
    json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete pipeline configuration.
///
/// # Examples
///
/// ```
/// use keepsake_pipeline::PipelineConfig;
///
/// let config = PipelineConfig::from_toml_str(
///     r#"
///     [ledger]
///     path = "media.db"
///
///     [destinations]
///     a = "nas"
///     b = "pixel"
///     "#,
/// )
/// .unwrap();
///
/// assert_eq!(config.destinations().a(), "nas");
/// assert_eq!(*config.limits().max_failures(), 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    ledger: LedgerConfig,
    destinations: DestinationsConfig,
    #[serde(default)]
    limits: LimitsConfig,
    #[serde(default)]
    compression: CompressionConfig,
    #[serde(default)]
    storage: StorageConfig,
    #[serde(default)]
    logging: LoggingConfig,
    /// Compute eligibility without calling collaborators or writing records
    #[serde(default)]
    dry_run: bool,
}

impl PipelineConfig {
    /// A configuration with defaults for everything but the required values.
    pub fn new(
        ledger_path: impl Into<PathBuf>,
        destination_a: impl Into<String>,
        destination_b: impl Into<String>,
    ) -> Self {
        Self {
            ledger: LedgerConfig {
                path: ledger_path.into(),
                pool_size: default_pool_size(),
            },
            destinations: DestinationsConfig {
                a: destination_a.into(),
                b: destination_b.into(),
            },
            limits: LimitsConfig::default(),
            compression: CompressionConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::default(),
            dry_run: false,
        }
    }

    /// Replace the limits section.
    pub fn with_limits(mut self, limits: LimitsConfig) -> Self {
        self.limits = limits;
        self
    }

    /// Replace the media root.
    pub fn with_media_root(mut self, media_root: impl Into<PathBuf>) -> Self {
        self.storage.media_root = media_root.into();
        self
    }

    /// Toggle dry-run mode.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Load from a TOML file with environment overrides, then validate.
    ///
    /// `KEEPSAKE__LIMITS__WORKERS=8` overrides `[limits] workers`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when the file is unreadable, a required value
    /// is missing, or validation fails.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> KeepsakeResult<Self> {
        debug!("Loading pipeline configuration");
        let path = path.as_ref();
        let builder = Config::builder()
            .add_source(File::from(path).format(FileFormat::Toml))
            .add_source(
                Environment::with_prefix("KEEPSAKE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::build(builder, &path.display().to_string())
    }

    /// Parse and validate a TOML document without environment overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` on malformed input or failed validation.
    pub fn from_toml_str(toml: &str) -> KeepsakeResult<Self> {
        let builder = Config::builder().add_source(File::from_str(toml, FileFormat::Toml));
        Self::build(builder, "inline configuration")
    }

    fn build(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
        origin: &str,
    ) -> KeepsakeResult<Self> {
        let config: Self = builder
            .build()
            .map_err(|e| {
                KeepsakeError::from(ConfigError::new(format!(
                    "Failed to read configuration from {}: {}",
                    origin, e
                )))
            })?
            .try_deserialize()
            .map_err(|e| {
                KeepsakeError::from(ConfigError::new(format!(
                    "Failed to parse configuration: {}",
                    e
                )))
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check every value the pipeline relies on.
    ///
    /// # Errors
    ///
    /// Returns the first problem found as a `ConfigError`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.path.as_os_str().is_empty() {
            return Err(ConfigError::required("ledger.path"));
        }
        if self.ledger.pool_size == 0 {
            return Err(ConfigError::must_be_positive("ledger.pool_size"));
        }

        for (key, value) in [
            ("destinations.a", &self.destinations.a),
            ("destinations.b", &self.destinations.b),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::required(key));
            }
            if value.contains(',') {
                return Err(ConfigError::new(format!(
                    "{} must not contain ',' (got '{}')",
                    key, value
                )));
            }
        }
        if self.destinations.a == self.destinations.b {
            return Err(ConfigError::new(format!(
                "destinations.a and destinations.b must differ (both '{}')",
                self.destinations.a
            )));
        }

        let limits = &self.limits;
        for (key, value) in [
            ("limits.batch_limit", limits.batch_limit as u64),
            ("limits.workers", limits.workers as u64),
            ("limits.executor_timeout_secs", limits.executor_timeout_secs),
            ("limits.max_failures", u64::from(limits.max_failures)),
        ] {
            if value == 0 {
                return Err(ConfigError::must_be_positive(key));
            }
        }

        let compression = &self.compression;
        compression
            .tier_boundaries()
            .validate()
            .map_err(|e| ConfigError::new(format!("compression: {}", e)))?;
        for (key, value) in [
            ("compression.light_quality", compression.light_quality),
            ("compression.medium_quality", compression.medium_quality),
            ("compression.heavy_quality", compression.heavy_quality),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::new(format!(
                    "{} must be between 1 and 100 (got {})",
                    key, value
                )));
            }
        }
        for (key, value) in [
            ("compression.light_crf", compression.light_crf),
            ("compression.medium_crf", compression.medium_crf),
            ("compression.heavy_crf", compression.heavy_crf),
        ] {
            if value > 51 {
                return Err(ConfigError::new(format!(
                    "{} must be at most 51 (got {})",
                    key, value
                )));
            }
        }
        if compression.ffmpeg_path.as_os_str().is_empty() {
            return Err(ConfigError::new("compression.ffmpeg_path must not be empty"));
        }
        if self.storage.media_root.as_os_str().is_empty() {
            return Err(ConfigError::new("storage.media_root must not be empty"));
        }
        Ok(())
    }

    /// Destinations as a replica policy.
    pub fn replica_policy(&self) -> ReplicaPolicy {
        ReplicaPolicy::new(self.destinations.a.as_str(), self.destinations.b.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_config_is_valid() {
        let config = PipelineConfig::new("media.db", "nas", "pixel");
        assert!(config.validate().is_ok());
        assert_eq!(config.replica_policy(), ReplicaPolicy::new("nas", "pixel"));
        assert_eq!(config.limits().executor_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn profile_carries_configured_values() {
        let profile = CompressionConfig::default().profile().unwrap();
        assert_eq!(profile, CompressionProfile::default());
    }

    #[test]
    fn limits_builder_keeps_unset_defaults() {
        let limits = LimitsConfig::builder().workers(1usize).build().unwrap();
        assert_eq!(*limits.workers(), 1);
        assert_eq!(*limits.batch_limit(), 50);
    }
}
