use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use super::{types::Config, ConfigError};

/// Prefix of environment overrides, e.g. `IMAGEDROP_SERVER__PORT`.
pub const ENV_PREFIX: &str = "IMAGEDROP_";

/// Separator between nested keys in an override name.
pub const ENV_NESTING: &str = "__";

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    figment
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Read `path`, then layer `IMAGEDROP_*` overrides on top.
///
/// `[download.network]` is reached as `IMAGEDROP_DOWNLOAD__NETWORK__ROAMING`.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    extract(Figment::from(Toml::file(path)).merge(Env::prefixed(ENV_PREFIX).split(ENV_NESTING)))
}

/// Parse TOML text alone, without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    extract(Figment::from(Toml::string(toml_str)))
}
