mod granted;
mod storage_probe;
mod traits;
mod types;

pub use granted::*;
pub use storage_probe::*;
pub use traits::*;
pub use types::*;

use std::path::Path;

use crate::config::PermissionConfig;

/// Factory function to create a permission gate from config
pub fn create_permission_gate(
    config: &PermissionConfig,
    pictures_dir: &Path,
) -> Box<dyn PermissionGate> {
    use crate::config::PermissionMethod;

    match config.method {
        PermissionMethod::Granted => Box::new(GrantedGate::new()),
        PermissionMethod::StorageProbe => Box::new(StorageProbeGate::new(pictures_dir)),
    }
}
