use super::{types::Config, ConfigError};
use crate::download::Destination;

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Download timeout and completion buffer are positive
/// - File name template carries the ticket placeholder
/// - Default extension is a plain alphanumeric word
/// - At least one network type is allowed
/// - Provider authority and root name are set
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |msg: &str| Err(ConfigError::ValidationError(msg.to_string()));

    if config.server.port == 0 {
        return invalid("server.port cannot be 0");
    }

    if config.download.timeout_secs == 0 {
        return invalid("download.timeout_secs must be greater than 0");
    }
    if config.download.completion_buffer == 0 {
        return invalid("download.completion_buffer must be greater than 0");
    }

    let orchestrator = &config.orchestrator;
    if !orchestrator
        .file_name_template
        .contains(Destination::TICKET_PLACEHOLDER)
    {
        return invalid("orchestrator.file_name_template must contain {ticket}");
    }
    if orchestrator.default_extension.is_empty()
        || !orchestrator
            .default_extension
            .chars()
            .all(|c| c.is_ascii_alphanumeric())
    {
        return invalid("orchestrator.default_extension must be non-empty and alphanumeric");
    }
    if orchestrator.allowed_networks.is_empty() {
        return invalid("orchestrator.allowed_networks must allow at least one network type");
    }

    if config.provider.authority.trim().is_empty() {
        return invalid("provider.authority cannot be empty");
    }
    if config.provider.root_name.trim().is_empty() || config.provider.root_name.contains('/') {
        return invalid("provider.root_name must be a single non-empty path segment");
    }

    Ok(())
}
