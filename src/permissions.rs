//! Permission matrix
//!
//! Static table of which caller roles may run which operation on which
//! resource. Loaded once at startup (see `config`) and shared read-only.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::status::Status;

/// Role name used when the session carries no role
pub const ANONYMOUS_ROLE: &str = "anonymous";

/// Grant matching every role, including anonymous callers
pub const ANY_ROLE: &str = "*";

/// resource -> operation -> granted roles
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PermissionMatrix {
    grants: HashMap<String, HashMap<String, Vec<String>>>,
}

impl PermissionMatrix {
    /// A matrix that denies everything
    pub fn empty() -> Self {
        Self {
            grants: HashMap::new(),
        }
    }

    /// Grant `roles` the `operation` on `resource`
    pub fn grant(mut self, resource: &str, operation: &str, roles: &[&str]) -> Self {
        let granted = self
            .grants
            .entry(resource.to_string())
            .or_default()
            .entry(operation.to_string())
            .or_default();
        granted.extend(roles.iter().map(|role| role.to_string()));
        self
    }

    /// Pure allow/deny decision
    pub fn is_allowed(&self, role: Option<&str>, resource: &str, operation: &str) -> bool {
        let role = role.unwrap_or(ANONYMOUS_ROLE);
        self.grants
            .get(resource)
            .and_then(|operations| operations.get(operation))
            .map(|roles| roles.iter().any(|granted| granted == ANY_ROLE || granted == role))
            .unwrap_or(false)
    }

    /// Check a call and record a denial on `status`. Returns whether the call is allowed.
    pub fn check_permission(
        &self,
        role: Option<&str>,
        resource: &str,
        operation: &str,
        status: &mut Status,
    ) -> bool {
        if self.is_allowed(role, resource, operation) {
            debug!("Permission granted: role={:?}, {}.{}", role, resource, operation);
            return true;
        }
        warn!("Permission denied: role={:?}, {}.{}", role, resource, operation);
        status.set_error("permission.err", "permission denied");
        false
    }
}

impl Default for PermissionMatrix {
    fn default() -> Self {
        Self::empty()
            .grant("file", "add", &["admin", "agent", "client"])
            .grant("file", "get", &[ANY_ROLE])
            .grant("file", "list", &["admin", "agent"])
    }
}
