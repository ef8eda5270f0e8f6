//! Configuration loading from the JSON store and environment variables.

use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};

use super::setup::SetupPrompt;
use super::{
    DocumentErrorPolicy, ExtractorConfig, MAX_COUPONS_PER_PAGE, MIN_COUPONS_PER_PAGE,
    default_convert_pdf, default_coupons_per_page, default_extract_images,
    default_min_image_bytes, default_source_extension,
};

/// Prefix for environment overrides, e.g. `COUPON_EXTRACTOR__DESTINATION_DIR`
const ENV_PREFIX: &str = "COUPON_EXTRACTOR";

/// Internal struct for loading a possibly absent configuration
#[derive(Debug, Clone, Deserialize)]
struct ConfigLoader {
    #[serde(default)]
    source_dir: Option<PathBuf>,

    #[serde(default)]
    destination_dir: Option<PathBuf>,

    #[serde(default = "default_extract_images")]
    extract_images: bool,

    #[serde(default = "default_convert_pdf")]
    convert_pdf: bool,

    #[serde(default)]
    suppress_messages: bool,

    #[serde(default)]
    delete_fdf: bool,

    #[serde(default = "default_coupons_per_page")]
    coupons_per_page: u8,

    #[serde(default)]
    merge_pdf: bool,

    #[serde(default = "default_min_image_bytes")]
    min_image_bytes: usize,

    #[serde(default = "default_source_extension")]
    source_extension: String,

    #[serde(default)]
    on_document_error: DocumentErrorPolicy,

    #[serde(default)]
    max_parallel_documents: Option<usize>,
}

/// Persisted key/value record holding the run configuration
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    use_environment: bool,
}

impl ConfigStore {
    /// Store backed by a JSON file, with environment overrides applied on load
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            use_environment: true,
        }
    }

    /// Store that only consults the file
    #[cfg(test)]
    pub fn file_only(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            use_environment: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored configuration.
    ///
    /// Returns `Ok(None)` when neither the file nor the environment name any
    /// directories, meaning setup has never run.
    pub fn load(&self) -> ServiceResult<Option<ExtractorConfig>> {
        let mut builder = Config::builder().add_source(
            File::from(self.path.as_path())
                .format(FileFormat::Json)
                .required(false),
        );
        if self.use_environment {
            builder = builder.add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let loader: ConfigLoader = builder
            .build()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to build config: {}", e),
            })?
            .try_deserialize()
            .map_err(|e| ServiceError::Config {
                message: format!("Failed to deserialize config: {}", e),
            })?;

        let (source_dir, destination_dir) = match (loader.source_dir, loader.destination_dir) {
            (None, None) => return Ok(None),
            (Some(source), Some(destination)) => (source, destination),
            (source, _) => {
                let missing = if source.is_none() {
                    "source_dir"
                } else {
                    "destination_dir"
                };
                return Err(ServiceError::Config {
                    message: format!("Configuration is missing {}", missing),
                });
            }
        };

        let config = ExtractorConfig {
            source_dir,
            destination_dir,
            extract_images: loader.extract_images,
            convert_pdf: loader.convert_pdf,
            suppress_messages: loader.suppress_messages,
            delete_fdf: loader.delete_fdf,
            coupons_per_page: loader.coupons_per_page,
            merge_pdf: loader.merge_pdf,
            min_image_bytes: loader.min_image_bytes,
            source_extension: loader.source_extension,
            on_document_error: loader.on_document_error,
            max_parallel_documents: loader.max_parallel_documents,
        };

        validate(&config)?;
        Ok(Some(config))
    }

    /// Write the configuration as the stored record
    pub fn save(&self, config: &ExtractorConfig) -> ServiceResult<()> {
        validate(config)?;

        let json = serde_json::to_string_pretty(config).map_err(|e| ServiceError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| ServiceError::Config {
                message: format!("Failed to create {}: {}", parent.display(), e),
            })?;
        }

        std::fs::write(&self.path, json).map_err(|e| ServiceError::Config {
            message: format!("Failed to write {}: {}", self.path.display(), e),
        })?;

        info!(path = %self.path.display(), "Configuration saved");
        Ok(())
    }
}

fn validate(config: &ExtractorConfig) -> ServiceResult<()> {
    if config.source_dir.as_os_str().is_empty() || config.destination_dir.as_os_str().is_empty() {
        return Err(ServiceError::Config {
            message: "Both source and destination folders must be set".to_string(),
        });
    }

    if !(MIN_COUPONS_PER_PAGE..=MAX_COUPONS_PER_PAGE).contains(&config.coupons_per_page) {
        warn!(
            coupons_per_page = config.coupons_per_page,
            "coupons_per_page outside 1-5, it will be clamped"
        );
    }

    if config.source_extension.trim_start_matches('.').is_empty() {
        return Err(ServiceError::Config {
            message: "source_extension must not be empty".to_string(),
        });
    }

    Ok(())
}

/// Load the stored configuration, running interactive setup once if none exists.
///
/// Setup results are persisted and then re-read so environment overrides apply
/// the same way on the first run as on later ones.
pub fn ensure_config(
    store: &ConfigStore,
    setup: &mut dyn SetupPrompt,
) -> ServiceResult<ExtractorConfig> {
    if let Some(config) = store.load()? {
        info!(path = %store.path().display(), "Loaded stored configuration");
        return Ok(config);
    }

    info!("No stored configuration, starting setup");
    let Some(collected) = setup.collect()? else {
        return Err(ServiceError::ConfigMissing);
    };

    store.save(&collected)?;
    store.load()?.ok_or(ServiceError::ConfigMissing)
}
