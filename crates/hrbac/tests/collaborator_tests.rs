//! Tests for caller-supplied collaborators: asynchronous assertions, external
//! parent backends and error propagation out of access checks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use hrbac::{
    AccessControl, Assert, Assertion, EntityKind, HierarchicalRbac, HrbacError, HrbacResult,
    ParentManager, Resource, Role, RoleKind, Rule, StaticPermissionManager, StaticResourceManager,
    StaticRoleManager,
};

/// Role hierarchy served by a remote directory.
///
/// Lookups yield to the scheduler to behave like a network call, and ids in
/// `unreachable` fail the way a dropped connection would.
struct DirectoryRoleManager {
    parents: HashMap<String, Vec<String>>,
    unreachable: Vec<String>,
    lookups: AtomicUsize,
}

impl DirectoryRoleManager {
    fn new() -> Self {
        let mut parents = HashMap::new();
        parents.insert("editor".to_string(), vec!["user".to_string(), "manager".to_string()]);
        parents.insert("user".to_string(), vec!["guest".to_string()]);
        parents.insert("manager".to_string(), vec!["guest".to_string()]);

        Self {
            parents,
            unreachable: Vec::new(),
            lookups: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ParentManager<RoleKind> for DirectoryRoleManager {
    async fn get_parents(&self, id: &str) -> HrbacResult<Option<Vec<String>>> {
        tokio::task::yield_now().await;
        self.lookups.fetch_add(1, Ordering::SeqCst);

        if self.unreachable.iter().any(|u| u == id) {
            return Err(HrbacError::parent_lookup(RoleKind::LABEL, id, "connection reset"));
        }
        Ok(self.parents.get(id).cloned())
    }
}

/// Comments may be edited by whoever may update the document they belong to.
struct CanUpdateParentDocument;

#[async_trait]
impl Assert for CanUpdateParentDocument {
    async fn assert(
        &self,
        engine: &dyn AccessControl,
        role: &dyn Role,
        _resource: &dyn Resource,
        _privilege: Option<&str>,
    ) -> HrbacResult<bool> {
        engine.is_allowed(role, &"document", Some("update")).await
    }
}

#[tokio::test]
async fn test_external_parent_manager() {
    let roles = DirectoryRoleManager::new();
    assert_eq!(
        roles.get_recursive_parents_of("editor").await.unwrap(),
        vec!["editor", "user", "manager", "guest"]
    );
    // guest appears once even though two paths lead to it
    assert_eq!(roles.lookups.load(Ordering::SeqCst), 4);

    let mut permissions = StaticPermissionManager::new();
    permissions.allow(Rule::new().role("guest").resource("document").privilege("read"));
    let hrbac = HierarchicalRbac::new(roles, permissions);

    assert!(hrbac.is_allowed(&"editor", &"document", Some("read")).await.unwrap());
}

#[tokio::test]
async fn test_parent_lookup_error_propagates() {
    let mut roles = DirectoryRoleManager::new();
    roles.unreachable.push("manager".to_string());

    let mut permissions = StaticPermissionManager::new();
    permissions.allow(Rule::new());
    let hrbac = HierarchicalRbac::new(roles, permissions);

    let err = hrbac.is_allowed(&"editor", &"document", None).await.unwrap_err();
    assert!(err.is_collaborator_error());
    assert_eq!(err.error_code(), "PARENT_LOOKUP_FAILED");
    assert_eq!(err.to_string(), "Parent lookup failed for role 'manager': connection reset");

    // branches that never reach the broken id still resolve
    assert!(hrbac.is_allowed(&"user", &"document", None).await.unwrap());
}

#[tokio::test]
async fn test_async_assertion_consults_engine() {
    let mut roles = StaticRoleManager::new();
    roles.add_parents("editor", ["user"]);

    let mut permissions = StaticPermissionManager::new();
    permissions.allow(Rule::new().role("editor").resource("document").privilege("update"));
    permissions.allow(
        Rule::new()
            .role("user")
            .resource("comment")
            .privilege("edit")
            .assertion(Assertion::from_assert(CanUpdateParentDocument)),
    );
    let hrbac = HierarchicalRbac::new(roles, permissions);

    assert!(hrbac.is_allowed(&"editor", &"comment", Some("edit")).await.unwrap());
    assert!(!hrbac.is_allowed(&"user", &"comment", Some("edit")).await.unwrap());
}

#[tokio::test]
async fn test_assertion_error_is_not_a_deny() {
    let mut permissions = StaticPermissionManager::new();
    permissions.deny(Rule::new());
    permissions.allow(
        Rule::new()
            .role("user")
            .resource("report")
            .assertion(Assertion::fallible(|_, _, resource, _| {
                Err(HrbacError::assertion(format!("no owner recorded for {}", resource.resource_id())))
            })),
    );
    let hrbac = HierarchicalRbac::new(StaticRoleManager::new(), permissions);

    let err = hrbac.is_allowed(&"user", &"report", None).await.unwrap_err();
    assert!(matches!(err, HrbacError::AssertionFailed(ref message) if message == "no owner recorded for report"));

    let err = hrbac.is_denied(&"user", &"report", None).await.unwrap_err();
    assert_eq!(err.error_code(), "ASSERTION_FAILED");

    // other roles never reach the guarded entry
    assert!(hrbac.is_denied(&"guest", &"report", None).await.unwrap());
}

#[tokio::test]
async fn test_assertion_receives_check_arguments() {
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let recorder = {
        let seen = Arc::clone(&seen);
        Assertion::new(move |_, role, resource, privilege| {
            if let Ok(mut seen) = seen.lock() {
                seen.push(format!(
                    "{}/{}/{}",
                    role.role_id(),
                    resource.resource_id(),
                    privilege.unwrap_or("-")
                ));
            }
            true
        })
    };

    let mut roles = StaticRoleManager::new();
    roles.add_parents("user", ["guest"]);
    let mut permissions = StaticPermissionManager::new();
    permissions.allow(Rule::new().role("guest").assertion(recorder));
    let hrbac = HierarchicalRbac::new(roles, permissions);

    assert!(hrbac.is_allowed(&"user", &"document", Some("read")).await.unwrap());
    assert!(hrbac.is_allowed(&"guest", &"profile", None).await.unwrap());

    // the queried role is passed through, not the ancestor that holds the rule
    assert_eq!(*seen.lock().unwrap(), vec!["user/document/read", "guest/profile/-"]);
}

#[tokio::test]
async fn test_resource_inheritance_with_role_inheritance() {
    let mut roles = StaticRoleManager::new();
    roles.add_parents("editor", ["user"]);

    let mut resources = StaticResourceManager::new();
    resources.add_parents("document-comment", ["document"]);
    resources.add_parents("document", ["content"]);

    let mut permissions = StaticPermissionManager::new();
    permissions.allow(Rule::new().role("user").resource("content").privilege("read"));
    permissions.deny(Rule::new().role("user").resource("document-comment").privilege("read"));
    permissions.allow(Rule::new().role("editor").resource("document").privilege("read"));

    let hrbac = HierarchicalRbac::with_resource_manager(roles, permissions, resources);

    assert!(hrbac.is_allowed(&"user", &"document", Some("read")).await.unwrap());
    assert!(!hrbac.is_allowed(&"user", &"document-comment", Some("read")).await.unwrap());
    assert!(hrbac.is_allowed(&"editor", &"document-comment", Some("read")).await.unwrap());
}
