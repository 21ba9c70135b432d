use async_trait::async_trait;

use super::{Permission, PermissionError, PermissionGate, PermissionStatus};

/// Gate that grants every request.
/// Must be explicitly configured - the system won't default to this
pub struct GrantedGate;

impl GrantedGate {
    pub fn new() -> Self {
        Self
    }
}

impl Default for GrantedGate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PermissionGate for GrantedGate {
    async fn request(&self, _permission: Permission) -> Result<PermissionStatus, PermissionError> {
        Ok(PermissionStatus::Granted)
    }

    fn method_name(&self) -> &'static str {
        "granted"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_granted_gate_grants() {
        let gate = GrantedGate::new();
        let status = gate.request(Permission::WriteStorage).await.unwrap();
        assert_eq!(status, PermissionStatus::Granted);
    }

    #[test]
    fn test_granted_gate_method_name() {
        assert_eq!(GrantedGate::default().method_name(), "granted");
    }
}
