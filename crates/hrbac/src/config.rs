//! Bootstrap configuration.
//!
//! A configuration document carries the default role, the role and resource
//! hierarchies, and the rule store in their transfer formats. It is loaded
//! once at startup and fed to the managers' `import` operations.
//!
//! ```json
//! {
//!   "default_role": "guest",
//!   "roles": { "user": ["guest"], "admin": ["user"] },
//!   "resources": { "comment": ["document"] },
//!   "permissions": [
//!     [null, [[null, [{ "type": "deny", "privileges": null }]]]],
//!     ["guest", [["document", [{ "type": "allow", "privileges": ["read"] }]]]]
//!   ]
//! }
//! ```
//!
//! Assertions cannot be expressed in a document; add guarded rules in code
//! after loading.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{HrbacError, HrbacResult};
use crate::parent_manager::ParentTransfer;
use crate::permission_manager::PermissionTransfer;

/// Environment variable naming a configuration file.
pub const CONFIG_PATH_ENV: &str = "HRBAC_CONFIG";

/// Environment variable overriding the default role.
pub const DEFAULT_ROLE_ENV: &str = "HRBAC_DEFAULT_ROLE";

/// Access control configuration document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HrbacConfig {
    /// Role assumed when no other role has been set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_role: Option<String>,

    /// Role hierarchy: role id to direct parent role ids.
    #[serde(default)]
    pub roles: ParentTransfer,

    /// Resource hierarchy: resource id to direct parent resource ids.
    #[serde(default)]
    pub resources: ParentTransfer,

    /// Rule store in transfer format.
    #[serde(default)]
    pub permissions: PermissionTransfer,
}

impl HrbacConfig {
    /// Parse a JSON document.
    pub fn from_json(json: &str) -> HrbacResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> HrbacResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Load configuration from environment variables.
    ///
    /// A configuration file that cannot be read or parsed is reported as
    /// [`HrbacError::ConfigError`] naming the variable.
    ///
    /// Environment variables:
    /// - `HRBAC_CONFIG`: path of a JSON configuration file (default: empty configuration)
    /// - `HRBAC_DEFAULT_ROLE`: default role, overrides the file's `default_role`
    pub fn from_env() -> HrbacResult<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(&path).map_err(|e| {
                HrbacError::ConfigError(format!("{}={}: {}", CONFIG_PATH_ENV, path, e))
            })?,
            _ => Self::default(),
        };

        if let Ok(role) = std::env::var(DEFAULT_ROLE_ENV) {
            if !role.is_empty() {
                config.default_role = Some(role);
            }
        }

        tracing::debug!(
            default_role = ?config.default_role,
            roles = config.roles.len(),
            resources = config.resources.len(),
            permissions = config.permissions.len(),
            "Loaded access control configuration"
        );

        Ok(config)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> HrbacResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
