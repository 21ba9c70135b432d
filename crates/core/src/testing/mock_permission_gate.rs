//! Mock permission gate for testing.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::permission::{Permission, PermissionError, PermissionGate, PermissionStatus};

/// Permission gate with a scripted answer.
pub struct MockPermissionGate {
    status: Mutex<PermissionStatus>,
    requests: Mutex<Vec<Permission>>,
}

impl MockPermissionGate {
    /// A gate that grants everything.
    pub fn granting() -> Self {
        Self {
            status: Mutex::new(PermissionStatus::Granted),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A gate that denies everything with `reason`.
    pub fn denying(reason: impl Into<String>) -> Self {
        Self {
            status: Mutex::new(PermissionStatus::Denied {
                reason: reason.into(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn set_status(&self, status: PermissionStatus) {
        *self.status.lock().unwrap() = status;
    }

    /// Permissions requested so far.
    pub fn requests(&self) -> Vec<Permission> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PermissionGate for MockPermissionGate {
    async fn request(&self, permission: Permission) -> Result<PermissionStatus, PermissionError> {
        self.requests.lock().unwrap().push(permission);
        Ok(self.status.lock().unwrap().clone())
    }

    fn method_name(&self) -> &'static str {
        "mock"
    }
}
