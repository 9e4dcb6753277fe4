use std::{
    io::Write,
    net::SocketAddr,
    path::{Path, PathBuf},
};

use error_stack::{Report, Result, ResultExt};
use serde::{Deserialize, Serialize};
use url::Url;

pub const CONFIG_FILE_NAME: &str = "moderation_backend_config.toml";

// Optional configs not in default file for safety:
// debug = false
//

pub const DEFAULT_CONFIG_FILE_TEXT: &str = r#"

# [general]
# log_timestamp = true

[socket]
public_api = "127.0.0.1:3000"

[data]
dir = "data"
public_content_url = "http://127.0.0.1:3000/content"

[image_moderation]
# Moderation can also be disabled with environment variable
# IMAGE_MODERATION_ENABLED=false
enabled = true
# api_url = "https://vision.googleapis.com/v1/images:annotate"
# request_timeout_seconds = 30
# weapon_confidence_threshold = 0.5

# Credentials. API key can also be set with environment variable
# GOOGLE_VISION_API_KEY and service account JSON with
# GOOGLE_APPLICATION_CREDENTIALS_JSON.
# api_key = "key"
# service_account_key_path = "server_config/service_account_key.json"

# [admin]
# Account IDs which can use the admin API
# accounts = ["00000000-0000-0000-0000-000000000000"]

"#;

#[derive(thiserror::Error, Debug)]
pub enum ConfigFileError {
    #[error("Save config file failed")]
    Save,
    #[error("Save default")]
    SaveDefault,
    #[error("Not a directory")]
    NotDirectory,
    #[error("Load config file")]
    LoadConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub general: GeneralConfig,

    pub data: DataConfig,
    pub socket: SocketConfig,
    #[serde(default)]
    pub image_moderation: ImageModerationConfig,
    #[serde(default)]
    pub admin: AdminConfig,
}

impl ConfigFile {
    pub fn load(dir: impl AsRef<Path>) -> Result<ConfigFile, ConfigFileError> {
        let config_string =
            ConfigFileUtils::load_string(dir, CONFIG_FILE_NAME, DEFAULT_CONFIG_FILE_TEXT)?;
        Self::parse(&config_string)
    }

    pub fn parse(config_string: &str) -> Result<ConfigFile, ConfigFileError> {
        toml::from_str(config_string).change_context(ConfigFileError::LoadConfig)
    }
}

pub struct ConfigFileUtils;

impl ConfigFileUtils {
    pub fn save_string(file_path: impl AsRef<Path>, text: &str) -> Result<(), ConfigFileError> {
        let mut file = std::fs::File::create(file_path).change_context(ConfigFileError::Save)?;
        file.write_all(text.as_bytes())
            .change_context(ConfigFileError::Save)?;
        Ok(())
    }

    pub fn join_dir_path_and_file_name(
        dir: impl AsRef<Path>,
        file_name: &str,
    ) -> Result<PathBuf, ConfigFileError> {
        if !dir.as_ref().is_dir() {
            return Err(Report::new(ConfigFileError::NotDirectory));
        }
        let mut file_path = dir.as_ref().to_path_buf();
        file_path.push(file_name);
        Ok(file_path)
    }

    pub fn load_string(
        dir: impl AsRef<Path>,
        file_name: &str,
        default: &str,
    ) -> Result<String, ConfigFileError> {
        let file_path = Self::join_dir_path_and_file_name(&dir, file_name)
            .change_context(ConfigFileError::LoadConfig)?;
        if !file_path.exists() {
            Self::save_string(&file_path, default).change_context(ConfigFileError::SaveDefault)?;
        }

        std::fs::read_to_string(&file_path).change_context(ConfigFileError::LoadConfig)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GeneralConfig {
    pub debug: Option<bool>,
    /// Write timestamp to log messages. Enabled by default.
    pub log_timestamp: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Data directory for SQLite database and stored content.
    pub dir: PathBuf,
    /// Public URL prefix for accepted content. Content URLs have format
    /// `{public_content_url}/{account_id}/{content_id}`.
    pub public_content_url: Url,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SocketConfig {
    pub public_api: SocketAddr,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub accounts: Vec<uuid::Uuid>,
}

pub const DEFAULT_VISION_API_URL: &str = "https://vision.googleapis.com/v1/images:annotate";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ImageModerationConfig {
    /// Moderation is bypassed when this is false. All images are then
    /// accepted without calling the classifier.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Image annotation API URL. Defaults to [DEFAULT_VISION_API_URL].
    pub api_url: Option<Url>,
    pub api_key: Option<String>,
    /// Path to service account key JSON file.
    pub service_account_key_path: Option<PathBuf>,
    #[serde(default = "default_request_timeout_seconds")]
    pub request_timeout_seconds: u32,
    /// Detected weapons with confidence greater than this make the
    /// violence rating very likely.
    #[serde(default = "default_weapon_confidence_threshold")]
    pub weapon_confidence_threshold: f32,
}

impl Default for ImageModerationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            api_url: None,
            api_key: None,
            service_account_key_path: None,
            request_timeout_seconds: default_request_timeout_seconds(),
            weapon_confidence_threshold: default_weapon_confidence_threshold(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_seconds() -> u32 {
    30
}

fn default_weapon_confidence_threshold() -> f32 {
    0.5
}
