use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::download::{DownloadServiceConfig, NetworkTypes};
use crate::orchestrator::OrchestratorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub download: DownloadServiceConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
    #[serde(default)]
    pub permission: PermissionConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// The public "pictures" area downloads land in.
    #[serde(default = "default_pictures_dir")]
    pub pictures_dir: PathBuf,
    /// SQLite file holding orchestrator snapshots.
    #[serde(default = "default_state_path")]
    pub state_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            pictures_dir: default_pictures_dir(),
            state_path: default_state_path(),
        }
    }
}

fn default_pictures_dir() -> PathBuf {
    PathBuf::from("pictures")
}

fn default_state_path() -> PathBuf {
    PathBuf::from("imagedrop.db")
}

/// Sharable reference configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    #[serde(default = "default_authority")]
    pub authority: String,
    /// Name the pictures directory is exposed under.
    #[serde(default = "default_root_name")]
    pub root_name: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            authority: default_authority(),
            root_name: default_root_name(),
        }
    }
}

fn default_authority() -> String {
    "org.imagedrop.provider".to_string()
}

fn default_root_name() -> String {
    "pictures".to_string()
}

/// Permission gate configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PermissionConfig {
    #[serde(default)]
    pub method: PermissionMethod,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionMethod {
    /// Probe the pictures directory for write access.
    #[default]
    StorageProbe,
    /// Grant without checking. Must be chosen explicitly.
    Granted,
}

impl PermissionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionMethod::StorageProbe => "storage_probe",
            PermissionMethod::Granted => "granted",
        }
    }
}

/// Config as exposed by the API
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub provider: ProviderConfig,
    pub download: SanitizedDownloadConfig,
    pub orchestrator: SanitizedOrchestratorConfig,
    pub permission: SanitizedPermissionConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDownloadConfig {
    pub timeout_secs: u64,
    pub metered_link: bool,
    pub roaming_link: bool,
}

/// Orchestrator config with the source URL reduced to its host
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedOrchestratorConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_host: Option<String>,
    pub file_name_template: String,
    pub default_extension: String,
    pub allowed_networks: NetworkTypes,
    pub allow_roaming: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedPermissionConfig {
    pub method: String,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage: config.storage.clone(),
            provider: config.provider.clone(),
            download: SanitizedDownloadConfig {
                timeout_secs: config.download.timeout_secs,
                metered_link: config.download.network.metered,
                roaming_link: config.download.network.roaming,
            },
            orchestrator: SanitizedOrchestratorConfig {
                image_host: url::Url::parse(&config.orchestrator.image_url)
                    .ok()
                    .and_then(|u| u.host_str().map(str::to_string)),
                file_name_template: config.orchestrator.file_name_template.clone(),
                default_extension: config.orchestrator.default_extension.clone(),
                allowed_networks: config.orchestrator.allowed_networks,
                allow_roaming: config.orchestrator.allow_roaming,
            },
            permission: SanitizedPermissionConfig {
                method: config.permission.method.as_str().to_string(),
            },
        }
    }
}
