//! Current role holder.
//!
//! Applications typically evaluate access for "whoever is signed in". The
//! role store keeps that role, starting from the configured default, and
//! notifies subscribers whenever it changes so views can be re-evaluated.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::HrbacConfig;
use crate::error::{HrbacError, HrbacResult};
use crate::hrbac::AccessControl;
use crate::types::{Resource, Role};

/// Shared, observable current role.
///
/// # Example
///
/// ```rust,no_run
/// use hrbac::RoleStore;
///
/// # async fn example() {
/// let store = RoleStore::with_default_role("guest");
/// let mut changes = store.subscribe();
///
/// store.set_role_id("admin");
/// changes.changed().await.unwrap();
/// assert_eq!(changes.borrow().as_ref().unwrap().role_id(), "admin");
/// # }
/// ```
pub struct RoleStore {
    sender: watch::Sender<Option<Arc<dyn Role>>>,
}

impl RoleStore {
    /// Create a store holding `role`.
    pub fn new(role: Option<Arc<dyn Role>>) -> Self {
        let (sender, _) = watch::channel(role);
        Self { sender }
    }

    /// Create a store whose initial role is the bare id `role_id`.
    pub fn with_default_role(role_id: impl Into<String>) -> Self {
        let role_id: String = role_id.into();
        let role: Arc<dyn Role> = Arc::new(role_id);
        Self::new(Some(role))
    }

    /// Create a store from the configured default role.
    pub fn from_config(config: &HrbacConfig) -> Self {
        match &config.default_role {
            Some(role_id) => Self::with_default_role(role_id.clone()),
            None => Self::new(None),
        }
    }

    /// Replace the current role and notify subscribers.
    pub fn set_role(&self, role: Option<Arc<dyn Role>>) {
        let previous = self.sender.send_replace(role);
        tracing::debug!(
            previous = ?previous.as_ref().map(|r| r.role_id().to_string()),
            current = ?self.sender.borrow().as_ref().map(|r| r.role_id().to_string()),
            "Current role changed"
        );
    }

    /// Replace the current role with a bare id.
    pub fn set_role_id(&self, role_id: impl Into<String>) {
        let role_id: String = role_id.into();
        let role: Arc<dyn Role> = Arc::new(role_id);
        self.set_role(Some(role));
    }

    /// Unset the current role.
    pub fn clear(&self) {
        self.set_role(None);
    }

    /// The current role, if any.
    pub fn role(&self) -> Option<Arc<dyn Role>> {
        self.sender.borrow().clone()
    }

    /// The current role, failing when none is set.
    pub fn current_role(&self) -> HrbacResult<Arc<dyn Role>> {
        self.role().ok_or(HrbacError::NoCurrentRole)
    }

    /// Subscribe to role changes.
    ///
    /// The role held at subscription time counts as already seen; only later
    /// changes wake the receiver.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<dyn Role>>> {
        self.sender.subscribe()
    }

    /// Check access for the current role.
    pub async fn is_allowed(
        &self,
        engine: &dyn AccessControl,
        resource: &dyn Resource,
        privilege: Option<&str>,
    ) -> HrbacResult<bool> {
        let role = self.current_role()?;
        engine.is_allowed(&*role, resource, privilege).await
    }

    /// Check denial for the current role.
    pub async fn is_denied(
        &self,
        engine: &dyn AccessControl,
        resource: &dyn Resource,
        privilege: Option<&str>,
    ) -> HrbacResult<bool> {
        let role = self.current_role()?;
        engine.is_denied(&*role, resource, privilege).await
    }
}

impl Default for RoleStore {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for RoleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoleStore")
            .field("role", &self.sender.borrow().as_ref().map(|r| r.role_id().to_string()))
            .finish()
    }
}
