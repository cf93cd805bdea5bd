use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::error::Result;

/// Looked up in the working directory when no explicit config file is given.
pub const DEFAULT_CONFIG_FILE: &str = "imgdrop";

const ENV_PREFIX: &str = "IMGDROP";
const ENV_SEPARATOR: &str = "__";

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the store, e.g. `http://localhost:8080`.
    pub server_url: String,
    pub request_timeout_secs: u64,
    /// Requests running longer than this are logged at warn level.
    pub slow_request_warn_secs: u64,
    /// Maximum number of entries returned by one directory read.
    pub directory_page_size: usize,
    /// Path prefix under which ingested files are publicly served.
    pub public_prefix: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_owned(),
            request_timeout_secs: 30,
            slow_request_warn_secs: 10,
            directory_page_size: 64,
            public_prefix: "uploads/".to_owned(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ServiceSettings {
    pub bind: String,
    pub upload_dir: PathBuf,
    /// Optional front-end assets served at `/`.
    pub static_dir: Option<PathBuf>,
    pub max_upload_bytes: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_owned(),
            upload_dir: PathBuf::from("uploads"),
            static_dir: None,
            max_upload_bytes: 32 * 1024 * 1024,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Settings {
    pub client: ClientSettings,
    pub service: ServiceSettings,
}

impl Settings {
    /// Loads settings from defaults, then the config file, then `IMGDROP__*`
    /// environment variables.
    ///
    /// An explicit `path` must exist; the default `imgdrop.{toml,json,...}` is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(
            path,
            Environment::with_prefix(ENV_PREFIX).separator(ENV_SEPARATOR),
        )
    }

    fn load_with_env(path: Option<&Path>, env: Environment) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        let settings = Config::builder()
            .add_source(file)
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }
}
