#![deny(unsafe_code)]
#![deny(unused_must_use)]
#![deny(unused_features)]
#![warn(unused_crate_dependencies)]

pub mod args;
pub mod file;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use args::ServerModeArgs;
use error_stack::{Result, ResultExt};
use file::{ConfigFile, DataConfig, DEFAULT_VISION_API_URL, SocketConfig};
use url::Url;
use utils::ContextExt;

pub use self::file::ConfigFileError;

pub const ENV_IMAGE_MODERATION_ENABLED: &str = "IMAGE_MODERATION_ENABLED";
pub const ENV_GOOGLE_VISION_API_KEY: &str = "GOOGLE_VISION_API_KEY";
pub const ENV_GOOGLE_APPLICATION_CREDENTIALS_JSON: &str = "GOOGLE_APPLICATION_CREDENTIALS_JSON";

#[derive(thiserror::Error, Debug)]
pub enum GetConfigError {
    #[error("Get working directory error")]
    GetWorkingDir,
    #[error("File loading failed")]
    LoadFileError,

    #[error("Parsing String constant to Url failed.")]
    ConstUrlParsingFailed,

    #[error("SQLite in RAM mode is not allowed when debug mode is off")]
    SqliteInRamNotAllowed,
    #[error("Invalid configuration")]
    InvalidConfiguration,
    #[error("Reading service account key file failed")]
    ServiceAccountKeyFile,
}

/// Credentials for the image classifier. Contents are validated when
/// the classifier is created.
#[derive(Clone)]
pub enum ClassifierCredentials {
    ApiKey(String),
    /// Service account JSON containing `client_email` and `private_key`.
    ServiceAccountJson(String),
}

impl std::fmt::Debug for ClassifierCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(hidden)"),
            Self::ServiceAccountJson(_) => f.write_str("ServiceAccountJson(hidden)"),
        }
    }
}

/// Image moderation settings after environment overrides are applied.
#[derive(Debug, Clone)]
pub struct ImageModerationSettings {
    pub enabled: bool,
    pub api_url: Url,
    /// Always available when moderation is enabled.
    pub credentials: Option<ClassifierCredentials>,
    pub request_timeout: Duration,
    pub weapon_confidence_threshold: f32,
}

/// Environment variables which override config file values.
/// Values are read once when config is loaded.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    pub image_moderation_enabled: Option<String>,
    pub api_key: Option<String>,
    pub service_account_json: Option<String>,
}

impl EnvOverrides {
    pub fn from_env() -> Self {
        Self {
            image_moderation_enabled: std::env::var(ENV_IMAGE_MODERATION_ENABLED).ok(),
            api_key: std::env::var(ENV_GOOGLE_VISION_API_KEY).ok(),
            service_account_json: std::env::var(ENV_GOOGLE_APPLICATION_CREDENTIALS_JSON).ok(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    file: ConfigFile,

    /// Semver version of the backend.
    backend_semver_version: String,

    data_dir: PathBuf,
    sqlite_in_ram: bool,
    image_moderation: ImageModerationSettings,
}

impl Config {
    /// Directory where SQLite database and stored content is located.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn data(&self) -> &DataConfig {
        &self.file.data
    }

    pub fn socket(&self) -> &SocketConfig {
        &self.file.socket
    }

    pub fn sqlite_in_ram(&self) -> bool {
        self.sqlite_in_ram
    }

    /// Server should run in debug mode.
    ///
    /// Debug mode changes:
    /// * Swagger UI is enabled.
    /// * SQLite in RAM mode is allowed.
    pub fn debug_mode(&self) -> bool {
        self.file.general.debug.unwrap_or(false)
    }

    pub fn log_timestamp(&self) -> bool {
        self.file.general.log_timestamp.unwrap_or(true)
    }

    /// Accounts which are allowed to use the admin API.
    pub fn admin_accounts(&self) -> &[uuid::Uuid] {
        &self.file.admin.accounts
    }

    pub fn image_moderation(&self) -> &ImageModerationSettings {
        &self.image_moderation
    }

    pub fn backend_semver_version(&self) -> &str {
        &self.backend_semver_version
    }

    pub fn parsed_file(&self) -> &ConfigFile {
        &self.file
    }
}

/// Read config file from current directory.
pub fn get_config(
    args_config: ServerModeArgs,
    backend_semver_version: String,
) -> Result<Config, GetConfigError> {
    let current_dir = std::env::current_dir().change_context(GetConfigError::GetWorkingDir)?;
    let file_config =
        ConfigFile::load(current_dir).change_context(GetConfigError::LoadFileError)?;

    create_config(
        file_config,
        args_config,
        EnvOverrides::from_env(),
        backend_semver_version,
    )
}

pub fn create_config(
    file_config: ConfigFile,
    args_config: ServerModeArgs,
    env: EnvOverrides,
    backend_semver_version: String,
) -> Result<Config, GetConfigError> {
    let data_dir = if let Some(dir) = args_config.data_dir {
        dir
    } else {
        file_config.data.dir.clone()
    };

    let sqlite_in_ram = if args_config.sqlite_in_ram {
        if file_config.general.debug.unwrap_or_default() {
            true
        } else {
            return Err(GetConfigError::SqliteInRamNotAllowed)
                .attach_printable("SQLite in RAM mode is not allowed when debug mode is off");
        }
    } else {
        false
    };

    let image_moderation = image_moderation_settings(&file_config, env)?;

    if !image_moderation.enabled {
        tracing::warn!("Image moderation is disabled");
    }

    Ok(Config {
        file: file_config,
        backend_semver_version,
        data_dir,
        sqlite_in_ram,
        image_moderation,
    })
}

fn image_moderation_settings(
    file_config: &ConfigFile,
    env: EnvOverrides,
) -> Result<ImageModerationSettings, GetConfigError> {
    let config = &file_config.image_moderation;

    let enabled = match env.image_moderation_enabled.as_deref() {
        Some(value) => parse_bool(value).ok_or_else(|| {
            GetConfigError::InvalidConfiguration
                .report()
                .attach_printable(format!(
                    "Invalid {ENV_IMAGE_MODERATION_ENABLED} value: {value}"
                ))
        })?,
        None => config.enabled,
    };

    let api_url = match config.api_url.clone() {
        Some(url) => url,
        None => Url::parse(DEFAULT_VISION_API_URL)
            .change_context(GetConfigError::ConstUrlParsingFailed)?,
    };

    let service_account_json = match (env.service_account_json, &config.service_account_key_path)
    {
        (Some(json), _) => Some(json),
        (None, Some(path)) => Some(
            std::fs::read_to_string(path)
                .change_context(GetConfigError::ServiceAccountKeyFile)
                .attach_printable(path.display().to_string())?,
        ),
        (None, None) => None,
    };

    let api_key = env
        .api_key
        .or_else(|| config.api_key.clone())
        .filter(|key| !key.trim().is_empty());

    let credentials = match (service_account_json, api_key) {
        (Some(json), _) => Some(ClassifierCredentials::ServiceAccountJson(json)),
        (None, Some(key)) => Some(ClassifierCredentials::ApiKey(key)),
        (None, None) => None,
    };

    if enabled && credentials.is_none() {
        return Err(GetConfigError::InvalidConfiguration).attach_printable(
            "Image moderation is enabled but API key or service account key is not configured",
        );
    }

    if !(0.0..=1.0).contains(&config.weapon_confidence_threshold) {
        return Err(GetConfigError::InvalidConfiguration)
            .attach_printable("Weapon confidence threshold must be between 0 and 1");
    }

    Ok(ImageModerationSettings {
        enabled,
        api_url,
        credentials,
        request_timeout: Duration::from_secs(config.request_timeout_seconds.into()),
        weapon_confidence_threshold: config.weapon_confidence_threshold,
    })
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
