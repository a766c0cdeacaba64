use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, Environment, File, FileFormat};
use std::fs;

/// Name of the settings file inside the config directory
pub const SETTINGS_FILE: &str = "TinyThreading.yaml";

/// Prefix of environment variables that override the settings file
pub const ENV_PREFIX: &str = "TINYTHREADING";

/// Configuration manager for loading and saving the settings file.
///
/// Settings come from two layers, later ones winning:
/// - `TinyThreading.yaml` in the config directory (optional)
/// - `TINYTHREADING_` environment variables, with `__` between section and
///   key (`TINYTHREADING_DISPATCH__STRATEGY=pool`)
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a new ConfigManager with the specified configuration directory.
    ///
    /// # Arguments
    /// * `config_dir` - Directory containing the settings file (e.g., "TinyThreading Data")
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load settings from the file and environment.
    ///
    /// # Returns
    /// The merged, validated Settings. Keys absent from both layers keep
    /// their defaults.
    pub fn load_settings(&self) -> Result<Settings> {
        self.load_settings_with_env(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load settings using a caller-supplied environment source.
    ///
    /// Tests use this with [`Environment::source`] to avoid touching the
    /// process environment.
    pub fn load_settings_with_env(&self, environment: Environment) -> Result<Settings> {
        if self.settings_path.exists() {
            tracing::info!("Loading settings from {}", self.settings_path);
        } else {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
        }

        let settings: Settings = Config::builder()
            .add_source(
                File::from(self.settings_path.as_std_path())
                    .format(FileFormat::Yaml)
                    .required(false),
            )
            .add_source(
                environment
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read settings: {}", self.settings_path))?
            .try_deserialize()
            .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

        settings.validate().context("Invalid settings")?;
        Ok(settings)
    }

    /// Save settings to the settings file.
    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }
}
