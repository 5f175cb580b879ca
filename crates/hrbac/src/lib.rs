//! # HRBAC (Hierarchical Role-Based Access Control)
//!
//! This crate decides whether a role may access a resource, optionally for a
//! named privilege, from a set of ordered allow/deny rules.
//!
//! ## Overview
//!
//! The hrbac crate handles:
//! - **Role hierarchy**: roles inherit the rules of their parent roles
//! - **Resource hierarchy**: resources may inherit the rules of parent resources
//! - **Rules**: allow/deny entries keyed by role and resource, either of which
//!   may be a wildcard, optionally scoped to privileges and guarded by an
//!   assertion
//! - **Decisions**: the last applicable rule wins; no applicable rule means deny
//!
//! ## Architecture
//!
//! ```text
//! is_allowed(role, resource, privilege)
//!   roles     = reverse(ancestors(role))        most general first
//!   resources = reverse(ancestors(resource))
//!   aces      = permission_manager.get_aces_for_roles_and_resources(roles, resources)
//!   verdict   = last ace covering privilege whose assertion holds, else deny
//! ```
//!
//! Hierarchies are served by [`ParentManager`] implementations and rules by
//! [`PermissionManager`] implementations. The in-memory [`StaticRoleManager`],
//! [`StaticResourceManager`] and [`StaticPermissionManager`] cover the common
//! case; external backends implement the traits themselves.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use hrbac::{AccessControl, HierarchicalRbac, Rule, StaticPermissionManager, StaticRoleManager};
//!
//! # async fn example() -> hrbac::HrbacResult<()> {
//! let mut roles = StaticRoleManager::new();
//! roles.add_parents("user", ["guest"]);
//! roles.add_parents("admin", ["user"]);
//!
//! let mut permissions = StaticPermissionManager::new();
//! permissions.deny(Rule::new());
//! permissions.allow(Rule::new().role("admin"));
//! permissions.allow(Rule::new().role("guest").resource("document").privilege("read"));
//!
//! let hrbac = HierarchicalRbac::new(roles, permissions);
//!
//! assert!(hrbac.is_allowed(&"user", &"document", Some("read")).await?);
//! assert!(hrbac.is_denied(&"user", &"document", Some("delete")).await?);
//! assert!(hrbac.is_allowed(&"admin", &"settings", None).await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Bootstrapping from configuration
//!
//! ```rust,no_run
//! use hrbac::{HrbacConfig, RoleStore, StaticHierarchicalRbac};
//!
//! # fn example() -> hrbac::HrbacResult<()> {
//! let config = HrbacConfig::from_env()?;
//! let hrbac = StaticHierarchicalRbac::from_config(&config);
//! let current = RoleStore::from_config(&config);
//! # Ok(())
//! # }
//! ```

pub mod assertion;
pub mod config;
pub mod error;
pub mod hrbac;
pub mod parent_manager;
pub mod permission_manager;
pub mod role_store;
pub mod types;

// Re-export main types for convenience
pub use assertion::{Assert, Assertion};
pub use config::HrbacConfig;
pub use error::{HrbacError, HrbacResult};
pub use hrbac::{AccessControl, HierarchicalRbac, StaticHierarchicalRbac};
pub use parent_manager::{
    EntityKind, FlatParentManager, FlatResourceManager, Identify, ParentManager, ParentTransfer,
    ResourceKind, RoleKind, StaticParentManager, StaticResourceManager, StaticRoleManager,
};
pub use permission_manager::{
    Ace, AceTransfer, AceType, Acl, Acls, PermissionManager, PermissionTransfer, Rule,
    StaticPermissionManager,
};
pub use role_store::RoleStore;
pub use types::{Resource, Role};
