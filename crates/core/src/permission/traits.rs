use async_trait::async_trait;
use thiserror::Error;

use super::types::{Permission, PermissionStatus};

#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("Permission system unavailable: {0}")]
    Unavailable(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Ask for a permission. A refusal is `Ok(Denied)`, not an error.
    async fn request(&self, permission: Permission) -> Result<PermissionStatus, PermissionError>;

    /// Name of this gate
    fn method_name(&self) -> &'static str;
}
