use serde::{Deserialize, Serialize};

/// One-line notice the host shows when storage access is refused.
pub const DENIED_NOTICE: &str = "Storage permission is required to download images.";

/// Runtime permissions the host must hold before the orchestrator is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    WriteStorage,
}

/// Outcome of a permission request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied { reason: String },
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serialization() {
        let granted = serde_json::to_value(PermissionStatus::Granted).unwrap();
        assert_eq!(granted, serde_json::json!({ "status": "granted" }));

        let denied = PermissionStatus::Denied {
            reason: "read-only".to_string(),
        };
        let json = serde_json::to_value(&denied).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "status": "denied", "reason": "read-only" })
        );
        assert!(!denied.is_granted());
    }
}
