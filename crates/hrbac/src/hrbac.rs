//! # Decision Engine
//!
//! Combines the role hierarchy, the optional resource hierarchy and the rule
//! store into a single verdict.
//!
//! ## Algorithm
//!
//! 1. Resolve the ancestor closure of the role and of the resource, each
//!    reversed so the most general ancestor comes first.
//! 2. Fetch every candidate entry for those roles and resources, in storage
//!    order.
//! 3. Fold over the candidates starting from deny. An entry applies when its
//!    privilege scope covers the check and its assertion (if any) holds; an
//!    applicable entry replaces the running verdict.
//! 4. The last applicable entry wins.
//!
//! Mutations are not isolated from concurrent reads: a check that overlaps
//! with `allow`/`deny`/`set_parents` on shared state may observe either side
//! of the change. Callers that share an engine across tasks provide their own
//! synchronization.

use async_trait::async_trait;

use crate::config::HrbacConfig;
use crate::error::HrbacResult;
use crate::parent_manager::{
    FlatResourceManager, ParentManager, ResourceKind, RoleKind, StaticResourceManager,
    StaticRoleManager,
};
use crate::permission_manager::{AceType, PermissionManager, StaticPermissionManager};
use crate::types::{Resource, Role};

/// Access checks, as seen by assertions and other collaborators.
#[async_trait]
pub trait AccessControl: Send + Sync {
    /// Check whether `role` may access `resource`.
    ///
    /// With `privilege: None` only entries without a privilege scope are
    /// considered: the question is whether the role may access the resource
    /// unconditionally.
    async fn is_allowed(
        &self,
        role: &dyn Role,
        resource: &dyn Resource,
        privilege: Option<&str>,
    ) -> HrbacResult<bool>;

    /// Logical negation of [`AccessControl::is_allowed`].
    async fn is_denied(
        &self,
        role: &dyn Role,
        resource: &dyn Resource,
        privilege: Option<&str>,
    ) -> HrbacResult<bool> {
        Ok(!self.is_allowed(role, resource, privilege).await?)
    }
}

/// Hierarchical role-based access control.
///
/// The managers are constructed by the caller and owned by the engine; use
/// the `*_mut` accessors to add rules and parents after construction.
///
/// # Example
///
/// ```rust,no_run
/// use hrbac::{AccessControl, HierarchicalRbac, Rule, StaticPermissionManager, StaticRoleManager};
///
/// # async fn example() -> hrbac::HrbacResult<()> {
/// let mut hrbac = HierarchicalRbac::new(StaticRoleManager::new(), StaticPermissionManager::new());
/// hrbac.role_manager_mut().add_parents("user", ["guest"]);
/// hrbac.permission_manager_mut().deny(Rule::new());
/// hrbac.permission_manager_mut().allow(Rule::new().role("guest").resource("document").privilege("read"));
///
/// assert!(hrbac.is_allowed(&"user", &"document", Some("read")).await?);
/// assert!(hrbac.is_denied(&"user", &"document", Some("update")).await?);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HierarchicalRbac<R = StaticRoleManager, P = StaticPermissionManager, S = FlatResourceManager> {
    role_manager: R,
    permission_manager: P,
    resource_manager: S,
}

/// Engine backed entirely by in-memory managers, including resource
/// inheritance.
pub type StaticHierarchicalRbac =
    HierarchicalRbac<StaticRoleManager, StaticPermissionManager, StaticResourceManager>;

impl<R, P> HierarchicalRbac<R, P, FlatResourceManager> {
    /// Create an engine without resource inheritance.
    pub fn new(role_manager: R, permission_manager: P) -> Self {
        Self {
            role_manager,
            permission_manager,
            resource_manager: FlatResourceManager::new(),
        }
    }
}

impl<R, P, S> HierarchicalRbac<R, P, S> {
    /// Create an engine with resource inheritance.
    pub fn with_resource_manager(role_manager: R, permission_manager: P, resource_manager: S) -> Self {
        Self {
            role_manager,
            permission_manager,
            resource_manager,
        }
    }

    /// Role hierarchy.
    pub fn role_manager(&self) -> &R {
        &self.role_manager
    }

    /// Mutable role hierarchy.
    pub fn role_manager_mut(&mut self) -> &mut R {
        &mut self.role_manager
    }

    /// Rule store.
    pub fn permission_manager(&self) -> &P {
        &self.permission_manager
    }

    /// Mutable rule store.
    pub fn permission_manager_mut(&mut self) -> &mut P {
        &mut self.permission_manager
    }

    /// Resource hierarchy.
    pub fn resource_manager(&self) -> &S {
        &self.resource_manager
    }

    /// Mutable resource hierarchy.
    pub fn resource_manager_mut(&mut self) -> &mut S {
        &mut self.resource_manager
    }

    /// Split the engine back into its managers.
    pub fn into_parts(self) -> (R, P, S) {
        (self.role_manager, self.permission_manager, self.resource_manager)
    }
}

impl StaticHierarchicalRbac {
    /// Build in-memory managers from a configuration document.
    pub fn from_config(config: &HrbacConfig) -> Self {
        let mut role_manager = StaticRoleManager::new();
        role_manager.import(config.roles.clone());

        let mut resource_manager = StaticResourceManager::new();
        resource_manager.import(config.resources.clone());

        let mut permission_manager = StaticPermissionManager::new();
        permission_manager.import(config.permissions.clone());

        Self::with_resource_manager(role_manager, permission_manager, resource_manager)
    }
}

#[async_trait]
impl<R, P, S> AccessControl for HierarchicalRbac<R, P, S>
where
    R: ParentManager<RoleKind>,
    P: PermissionManager,
    S: ParentManager<ResourceKind>,
{
    async fn is_allowed(
        &self,
        role: &dyn Role,
        resource: &dyn Resource,
        privilege: Option<&str>,
    ) -> HrbacResult<bool> {
        let mut roles = self.role_manager.get_recursive_parents_of(role.role_id()).await?;
        roles.reverse();

        let mut resources = self
            .resource_manager
            .get_recursive_parents_of(resource.resource_id())
            .await?;
        resources.reverse();

        let aces = self
            .permission_manager
            .get_aces_for_roles_and_resources(&roles, &resources)
            .await?;

        let mut result = AceType::Deny;
        for ace in &aces {
            if !ace.covers(privilege) {
                continue;
            }

            if let Some(assertion) = ace.assertion() {
                match assertion.assert(self, role, resource, privilege).await {
                    Ok(true) => {}
                    Ok(false) => continue,
                    Err(e) => {
                        tracing::warn!(
                            role = %role.role_id(),
                            resource = %resource.resource_id(),
                            error = %e,
                            "Assertion raised an error"
                        );
                        return Err(e);
                    }
                }
            }

            result = ace.kind();
        }

        let allowed = result == AceType::Allow;

        tracing::debug!(
            role = %role.role_id(),
            resource = %resource.resource_id(),
            privilege = ?privilege,
            candidates = aces.len(),
            verdict = result.as_str(),
            "Access decision"
        );

        Ok(allowed)
    }
}
