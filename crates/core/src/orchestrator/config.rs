//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

use crate::download::NetworkTypes;

/// Placeholder for the inferred file extension in [`OrchestratorConfig::file_name_template`].
pub const EXTENSION_PLACEHOLDER: &str = "{ext}";

/// Configuration for the display orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Image downloaded when a request names no URL.
    #[serde(default = "default_image_url")]
    pub image_url: String,

    /// Title shown by the download service's progress UI.
    #[serde(default = "default_title")]
    pub title: String,

    /// Destination file name.
    /// `{ticket}` is filled in by the download service, `{ext}` by the orchestrator.
    #[serde(default = "default_file_name_template")]
    pub file_name_template: String,

    /// Extension used when none can be inferred from the URL.
    #[serde(default = "default_extension")]
    pub default_extension: String,

    /// Transports the download may use.
    #[serde(default)]
    pub allowed_networks: NetworkTypes,

    /// Whether the download may proceed while roaming.
    #[serde(default)]
    pub allow_roaming: bool,
}

fn default_image_url() -> String {
    "http://luxfon.com/images/201203/luxfon.com_3795.jpg".to_string()
}

fn default_title() -> String {
    "imagedrop".to_string()
}

fn default_file_name_template() -> String {
    "image_{ticket}.{ext}".to_string()
}

fn default_extension() -> String {
    "jpg".to_string()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            image_url: default_image_url(),
            title: default_title(),
            file_name_template: default_file_name_template(),
            default_extension: default_extension(),
            allowed_networks: NetworkTypes::ANY,
            allow_roaming: false,
        }
    }
}

impl OrchestratorConfig {
    /// Render the destination file name for a given extension.
    pub fn file_name_for_extension(&self, extension: &str) -> String {
        self.file_name_template
            .replace(EXTENSION_PLACEHOLDER, extension)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = OrchestratorConfig::default();
        assert_eq!(
            config.image_url,
            "http://luxfon.com/images/201203/luxfon.com_3795.jpg"
        );
        assert_eq!(config.file_name_template, "image_{ticket}.{ext}");
        assert_eq!(config.default_extension, "jpg");
        assert_eq!(config.allowed_networks, NetworkTypes::ANY);
        assert!(!config.allow_roaming);
    }

    #[test]
    fn test_deserialize_minimal() {
        let toml = r#"
            image_url = "https://example.com/cat.png"
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.image_url, "https://example.com/cat.png");
        assert_eq!(config.default_extension, "jpg");
        assert!(config.allowed_networks.metered);
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            image_url = "https://example.com/cat.png"
            title = "Cat"
            file_name_template = "cat-{ticket}.{ext}"
            default_extension = "png"
            allow_roaming = true

            [allowed_networks]
            metered = false
        "#;
        let config: OrchestratorConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.title, "Cat");
        assert_eq!(config.file_name_for_extension("gif"), "cat-{ticket}.gif");
        assert!(config.allowed_networks.unmetered);
        assert!(!config.allowed_networks.metered);
        assert!(config.allow_roaming);
    }
}
