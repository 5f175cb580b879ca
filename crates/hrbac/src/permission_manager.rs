//! # Permission Managers
//!
//! Storage of allow/deny rules. Rules are keyed by role id and resource id,
//! where a missing key is a wildcard matching every role or resource:
//!
//! ```text
//! Acls = role key     -> Acl
//! Acl  = resource key -> [Ace, Ace, ...]   (insertion order)
//! ```
//!
//! Every `allow`/`deny` appends a new entry; nothing is ever overwritten.
//! Lookups return candidate entries in storage order and leave privilege and
//! assertion filtering to the decision engine.

use async_trait::async_trait;
use indexmap::{Equivalent, IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

use crate::assertion::Assertion;
use crate::error::HrbacResult;
use crate::types::{Resource, Role};

/// Whether an entry grants or refuses access.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AceType {
    /// Grant access.
    Allow,
    /// Refuse access.
    Deny,
}

impl AceType {
    /// Get the string representation of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            AceType::Allow => "allow",
            AceType::Deny => "deny",
        }
    }
}

/// Access control entry.
///
/// `privileges: None` means the entry covers every privilege, including
/// privilege-less checks. An entry scoped to a set of privileges never
/// matches a privilege-less check.
#[derive(Debug, Clone, PartialEq)]
pub struct Ace {
    kind: AceType,
    privileges: Option<IndexSet<String>>,
    assertion: Option<Assertion>,
}

impl Ace {
    /// Create a new entry.
    pub fn new(kind: AceType, privileges: Option<IndexSet<String>>, assertion: Option<Assertion>) -> Self {
        Self {
            kind,
            privileges,
            assertion,
        }
    }

    /// Allow or deny.
    pub fn kind(&self) -> AceType {
        self.kind
    }

    /// Privilege scope, `None` for all privileges.
    pub fn privileges(&self) -> Option<&IndexSet<String>> {
        self.privileges.as_ref()
    }

    /// Guarding assertion, if any.
    pub fn assertion(&self) -> Option<&Assertion> {
        self.assertion.as_ref()
    }

    /// Check whether the entry's privilege scope covers a check.
    ///
    /// ```
    /// use hrbac::{Ace, AceType};
    ///
    /// let unscoped = Ace::new(AceType::Allow, None, None);
    /// assert!(unscoped.covers(None));
    /// assert!(unscoped.covers(Some("read")));
    ///
    /// let scoped = Ace::new(AceType::Allow, Some(["list".to_string()].into_iter().collect()), None);
    /// assert!(scoped.covers(Some("list")));
    /// assert!(!scoped.covers(Some("update")));
    /// assert!(!scoped.covers(None));
    /// ```
    pub fn covers(&self, privilege: Option<&str>) -> bool {
        match (privilege, &self.privileges) {
            (None, None) => true,
            (None, Some(_)) => false,
            (Some(_), None) => true,
            (Some(privilege), Some(privileges)) => privileges.contains(privilege),
        }
    }

    fn to_transfer(&self) -> AceTransfer {
        AceTransfer {
            kind: self.kind,
            privileges: self
                .privileges
                .as_ref()
                .map(|privileges| privileges.iter().cloned().collect()),
            assertion: self.assertion.clone(),
        }
    }
}

/// Borrowed form of a role or resource key.
///
/// Hashes exactly like the owned `Option<String>` key.
#[derive(Hash)]
struct KeyRef<'a>(Option<&'a str>);

impl Equivalent<Option<String>> for KeyRef<'_> {
    fn equivalent(&self, key: &Option<String>) -> bool {
        self.0 == key.as_deref()
    }
}

/// Entries of one role key, grouped by resource key in registration order.
#[derive(Debug, Clone, Default)]
pub struct Acl {
    entries: IndexMap<Option<String>, Vec<Ace>>,
}

impl Acl {
    /// Append an entry under `resource`, creating the group if needed.
    pub fn add(&mut self, resource: Option<String>, ace: Ace) {
        self.entries.entry(resource).or_default().push(ace);
    }

    /// Entries stored under `resource` (`None` is the wildcard key).
    pub fn get(&self, resource: Option<&str>) -> Option<&[Ace]> {
        self.entries.get(&KeyRef(resource)).map(Vec::as_slice)
    }

    /// Iterate resource groups in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &[Ace])> {
        self.entries
            .iter()
            .map(|(key, aces)| (key.as_deref(), aces.as_slice()))
    }

    /// Number of resource keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Acl {
    fn eq(&self, other: &Self) -> bool {
        self.entries.iter().eq(other.entries.iter())
    }
}

/// The whole rule store: one [`Acl`] per role key, in registration order.
#[derive(Debug, Clone, Default)]
pub struct Acls {
    entries: IndexMap<Option<String>, Acl>,
}

impl Acls {
    /// ACL of `role`, created empty on first access.
    pub fn acl_mut(&mut self, role: Option<String>) -> &mut Acl {
        self.entries.entry(role).or_default()
    }

    /// ACL of `role` (`None` is the wildcard key).
    pub fn get(&self, role: Option<&str>) -> Option<&Acl> {
        self.entries.get(&KeyRef(role))
    }

    /// Iterate role keys in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&str>, &Acl)> {
        self.entries.iter().map(|(key, acl)| (key.as_deref(), acl))
    }

    /// Number of role keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for Acls {
    fn eq(&self, other: &Self) -> bool {
        self.entries.iter().eq(other.entries.iter())
    }
}

/// Serialized form of one entry.
///
/// Assertions are carried by reference and skipped by serde: they survive an
/// in-process export/import but never a trip through JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AceTransfer {
    /// Allow or deny.
    #[serde(rename = "type")]
    pub kind: AceType,
    /// Privilege scope, `None` for all privileges.
    pub privileges: Option<Vec<String>>,
    /// Guarding assertion (in-process only).
    #[serde(skip)]
    pub assertion: Option<Assertion>,
}

/// Serialized rule store.
///
/// Mirrors the storage order exactly:
///
/// ```text
/// [ [role | null, [ [resource | null, [ { "type": "allow", "privileges": [..] | null } ] ] ] ] ]
/// ```
pub type PermissionTransfer = Vec<(Option<String>, Vec<(Option<String>, Vec<AceTransfer>)>)>;

/// Arguments of a single `allow` or `deny` call.
///
/// Every part is optional: a rule without a role applies to every role, a
/// rule without a resource to every resource, a rule without privileges to
/// every privilege.
///
/// # Example
///
/// ```
/// use hrbac::{Assertion, Rule, StaticPermissionManager};
///
/// let mut permissions = StaticPermissionManager::new();
/// permissions.deny(Rule::new());
/// permissions.allow(Rule::new().role("admin"));
/// permissions.allow(Rule::new().role("guest").resource("document").privilege("read"));
/// permissions.allow(
///     Rule::new()
///         .role("author")
///         .resource("document")
///         .privilege("update")
///         .assertion(Assertion::new(|_, _, _, _| true)),
/// );
///
/// assert_eq!(permissions.acls().len(), 4);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Rule {
    role: Option<String>,
    resource: Option<String>,
    privileges: Option<IndexSet<String>>,
    assertion: Option<Assertion>,
}

impl Rule {
    /// A rule matching every role, resource and privilege.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict the rule to one role.
    pub fn role(mut self, role: impl Role) -> Self {
        self.role = Some(role.role_id().to_string());
        self
    }

    /// Restrict the rule to one resource.
    pub fn resource(mut self, resource: impl Resource) -> Self {
        self.resource = Some(resource.resource_id().to_string());
        self
    }

    /// Add one privilege to the rule's scope.
    pub fn privilege(mut self, privilege: impl Into<String>) -> Self {
        self.privileges
            .get_or_insert_with(IndexSet::new)
            .insert(privilege.into());
        self
    }

    /// Add several privileges to the rule's scope.
    ///
    /// An empty list still scopes the rule, to no privilege at all.
    pub fn privileges<I, S>(mut self, privileges: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.privileges
            .get_or_insert_with(IndexSet::new)
            .extend(privileges.into_iter().map(Into::into));
        self
    }

    /// Guard the rule with an assertion.
    pub fn assertion(mut self, assertion: Assertion) -> Self {
        self.assertion = Some(assertion);
        self
    }

    fn from_transfer(role: Option<String>, resource: Option<String>, ace: AceTransfer) -> Self {
        Self {
            role,
            resource,
            privileges: ace.privileges.map(|privileges| privileges.into_iter().collect()),
            assertion: ace.assertion,
        }
    }
}

/// Source of candidate entries for the decision engine.
#[async_trait]
pub trait PermissionManager: Send + Sync {
    /// Entries for any of `roles` crossed with any of `resources`.
    ///
    /// Role keys are visited in registration order; a key matches when it is
    /// the wildcard or one of `roles`. Inside a matching role, resource keys
    /// are visited in registration order; a key matches when it is the
    /// wildcard or one of `resources`. Matching groups are concatenated in
    /// insertion order, without deduplication or filtering.
    async fn get_aces_for_roles_and_resources(
        &self,
        roles: &[String],
        resources: &[String],
    ) -> HrbacResult<Vec<Ace>>;

    /// Entries for any of `roles` on a single resource.
    ///
    /// `None` only matches wildcard resource keys.
    async fn get_aces_for_roles_and_resource(
        &self,
        roles: &[String],
        resource: Option<&str>,
    ) -> HrbacResult<Vec<Ace>> {
        let resources: Vec<String> = resource.map(str::to_string).into_iter().collect();
        self.get_aces_for_roles_and_resources(roles, &resources).await
    }
}

/// In-memory rule store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticPermissionManager {
    acls: Acls,
}

impl StaticPermissionManager {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an allow rule.
    pub fn allow(&mut self, rule: Rule) {
        self.add(AceType::Allow, rule);
    }

    /// Append a deny rule.
    pub fn deny(&mut self, rule: Rule) {
        self.add(AceType::Deny, rule);
    }

    fn add(&mut self, kind: AceType, rule: Rule) {
        self.acls
            .acl_mut(rule.role)
            .add(rule.resource, Ace::new(kind, rule.privileges, rule.assertion));
    }

    /// Read access to the stored rules.
    pub fn acls(&self) -> &Acls {
        &self.acls
    }

    /// Check if no rule has been added.
    pub fn is_empty(&self) -> bool {
        self.acls.is_empty()
    }

    /// Snapshot every rule in storage order.
    pub fn export(&self) -> PermissionTransfer {
        self.acls
            .iter()
            .map(|(role, acl)| {
                let resources = acl
                    .iter()
                    .map(|(resource, aces)| {
                        (
                            resource.map(str::to_string),
                            aces.iter().map(Ace::to_transfer).collect(),
                        )
                    })
                    .collect();
                (role.map(str::to_string), resources)
            })
            .collect()
    }

    /// Replay a snapshot through `allow`/`deny`, appending to existing rules.
    pub fn import(&mut self, data: PermissionTransfer) {
        let mut count = 0usize;

        for (role, resources) in data {
            for (resource, aces) in resources {
                for ace in aces {
                    let kind = ace.kind;
                    self.add(kind, Rule::from_transfer(role.clone(), resource.clone(), ace));
                    count += 1;
                }
            }
        }

        tracing::debug!(entries = count, "Imported permissions");
    }

    fn collect_aces<F>(&self, roles: &[String], matches_resource: F) -> Vec<Ace>
    where
        F: Fn(Option<&str>) -> bool,
    {
        let mut result = Vec::new();

        for (role, acl) in self.acls.iter() {
            let role_matches = match role {
                None => true,
                Some(role) => roles.iter().any(|r| r == role),
            };
            if !role_matches {
                continue;
            }

            for (resource, aces) in acl.iter() {
                if resource.is_none() || matches_resource(resource) {
                    result.extend_from_slice(aces);
                }
            }
        }

        result
    }
}

#[async_trait]
impl PermissionManager for StaticPermissionManager {
    async fn get_aces_for_roles_and_resources(
        &self,
        roles: &[String],
        resources: &[String],
    ) -> HrbacResult<Vec<Ace>> {
        Ok(self.collect_aces(roles, |key| {
            key.map_or(false, |key| resources.iter().any(|r| r == key))
        }))
    }

    async fn get_aces_for_roles_and_resource(
        &self,
        roles: &[String],
        resource: Option<&str>,
    ) -> HrbacResult<Vec<Ace>> {
        Ok(self.collect_aces(roles, |key| key == resource))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roles(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn privileges(ace: &Ace) -> Option<Vec<&str>> {
        ace.privileges()
            .map(|privileges| privileges.iter().map(String::as_str).collect())
    }

    #[tokio::test]
    async fn test_store_and_serve_permissions() {
        let assert_a = Assertion::new(|_, _, _, _| true);
        let assert_b = Assertion::new(|_, _, _, _| true);

        let mut permissions = StaticPermissionManager::new();
        permissions.allow(
            Rule::new()
                .role("roleA")
                .resource("resource")
                .privilege("privA")
                .assertion(assert_a.clone()),
        );
        permissions.deny(
            Rule::new()
                .role("roleB")
                .resource("resource")
                .privilege("privB")
                .assertion(assert_b.clone()),
        );
        permissions.allow(Rule::new().role("roleC").resource("resourceC"));
        permissions.allow(Rule::new().role("roleD"));

        let aces = permissions
            .get_aces_for_roles_and_resource(&roles(&["roleA", "roleB"]), Some("resource"))
            .await
            .unwrap();

        assert_eq!(aces.len(), 2);
        assert_eq!(aces[0].kind(), AceType::Allow);
        assert_eq!(privileges(&aces[0]), Some(vec!["privA"]));
        assert!(aces[0].assertion().unwrap().ptr_eq(&assert_a));
        assert_eq!(aces[1].kind(), AceType::Deny);
        assert_eq!(privileges(&aces[1]), Some(vec!["privB"]));
        assert!(aces[1].assertion().unwrap().ptr_eq(&assert_b));
    }

    #[tokio::test]
    async fn test_wildcards_follow_registration_order() {
        let mut permissions = StaticPermissionManager::new();
        permissions.deny(Rule::new());
        permissions.allow(Rule::new().role("user").resource("ffa"));
        permissions.allow(Rule::new().resource("ffa").privilege("read"));
        permissions.deny(Rule::new().role("user"));

        let aces = permissions
            .get_aces_for_roles_and_resource(&roles(&["guest", "user"]), Some("ffa"))
            .await
            .unwrap();

        let kinds: Vec<AceType> = aces.iter().map(Ace::kind).collect();
        // wildcard role first with both of its resource keys, then "user"
        assert_eq!(
            kinds,
            vec![AceType::Deny, AceType::Allow, AceType::Allow, AceType::Deny]
        );
        assert!(aces[0].privileges().is_none());
        assert_eq!(privileges(&aces[1]), Some(vec!["read"]));
    }

    #[tokio::test]
    async fn test_single_resource_none_matches_wildcards_only() {
        let mut permissions = StaticPermissionManager::new();
        permissions.allow(Rule::new().role("user").resource("document"));
        permissions.deny(Rule::new().role("user"));

        let aces = permissions
            .get_aces_for_roles_and_resource(&roles(&["user"]), None)
            .await
            .unwrap();
        assert_eq!(aces.len(), 1);
        assert_eq!(aces[0].kind(), AceType::Deny);
    }

    #[tokio::test]
    async fn test_multiple_resources() {
        let mut permissions = StaticPermissionManager::new();
        permissions.allow(Rule::new().role("user").resource("parent"));
        permissions.deny(Rule::new().role("user").resource("child"));
        permissions.allow(Rule::new().role("user").resource("unrelated"));

        let aces = permissions
            .get_aces_for_roles_and_resources(&roles(&["user"]), &roles(&["parent", "child"]))
            .await
            .unwrap();
        let kinds: Vec<AceType> = aces.iter().map(Ace::kind).collect();
        assert_eq!(kinds, vec![AceType::Allow, AceType::Deny]);
    }

    #[tokio::test]
    async fn test_wildcard_role_entries_returned_once() {
        let mut permissions = StaticPermissionManager::new();
        permissions.deny(Rule::new());
        permissions.allow(Rule::new().role("user"));

        // one copy per stored entry, however many roles are queried
        let aces = permissions
            .get_aces_for_roles_and_resource(&roles(&["guest", "user"]), Some("document"))
            .await
            .unwrap();
        let kinds: Vec<AceType> = aces.iter().map(Ace::kind).collect();
        assert_eq!(kinds, vec![AceType::Deny, AceType::Allow]);

        let aces = permissions
            .get_aces_for_roles_and_resources(&roles(&["guest", "manager", "user"]), &roles(&["a", "b"]))
            .await
            .unwrap();
        assert_eq!(aces.len(), 2);
    }

    #[test]
    fn test_lookup_by_key() {
        let mut permissions = StaticPermissionManager::new();
        permissions.deny(Rule::new().resource("document"));
        permissions.allow(Rule::new().role("user"));
        permissions.allow(Rule::new().role("user").resource("document"));

        let wildcard = permissions.acls().get(None).unwrap();
        assert_eq!(wildcard.get(Some("document")).unwrap().len(), 1);
        assert!(wildcard.get(None).is_none());

        let user = permissions.acls().get(Some("user")).unwrap();
        assert_eq!(user.get(None).unwrap()[0].kind(), AceType::Allow);
        assert_eq!(user.get(Some("document")).unwrap().len(), 1);
        assert!(user.get(Some("profile")).is_none());
        assert!(permissions.acls().get(Some("guest")).is_none());
    }

    #[test]
    fn test_ace_type_str() {
        assert_eq!(AceType::Allow.as_str(), "allow");
        assert_eq!(AceType::Deny.as_str(), "deny");
        assert_eq!(
            serde_json::to_value(AceType::Deny).unwrap(),
            serde_json::json!(AceType::Deny.as_str())
        );
    }

    #[test]
    fn test_rules_are_appended() {
        let mut permissions = StaticPermissionManager::new();
        assert!(permissions.is_empty());

        permissions.allow(Rule::new().role("user").resource("document").privilege("read"));
        permissions.allow(Rule::new().role("user").resource("document").privilege("read"));

        let acl = permissions.acls().get(Some("user")).unwrap();
        assert_eq!(acl.get(Some("document")).unwrap().len(), 2);
        assert!(acl.get(None).is_none());
        assert!(permissions.acls().get(None).is_none());
    }

    #[test]
    fn test_empty_privilege_list_scopes_to_nothing() {
        let ace = Ace::new(AceType::Allow, Some(IndexSet::new()), None);
        assert!(!ace.covers(None));
        assert!(!ace.covers(Some("read")));

        let rule = Rule::new().privileges(Vec::<String>::new());
        let mut permissions = StaticPermissionManager::new();
        permissions.allow(rule);
        let aces = permissions.acls().get(None).unwrap().get(None).unwrap();
        assert_eq!(aces[0].privileges().map(IndexSet::len), Some(0));
    }

    #[test]
    fn test_export_import_is_idempotent() {
        let guard = Assertion::new(|_, _, _, _| false);

        let mut permissions = StaticPermissionManager::new();
        permissions.deny(Rule::new());
        permissions.allow(Rule::new().role("admin"));
        permissions.allow(Rule::new().role("guest").resource("document").privilege("read"));
        permissions.allow(
            Rule::new()
                .role("guest")
                .resource("document-comment")
                .privileges(["read", "create"]),
        );
        permissions.allow(Rule::new().role("user").resource("profile").assertion(guard));
        permissions.deny(Rule::new().resource("secrets"));

        let exported = permissions.export();

        let mut imported = StaticPermissionManager::new();
        imported.import(exported.clone());

        assert_eq!(imported, permissions);
        assert_eq!(imported.export(), exported);
    }

    #[test]
    fn test_transfer_json_format() {
        let mut permissions = StaticPermissionManager::new();
        permissions.deny(Rule::new());
        permissions.allow(Rule::new().role("guest").resource("document").privileges(["read", "list"]));

        let json = serde_json::to_value(permissions.export()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                [null, [[null, [{ "type": "deny", "privileges": null }]]]],
                ["guest", [["document", [{ "type": "allow", "privileges": ["read", "list"] }]]]]
            ])
        );

        let parsed: PermissionTransfer = serde_json::from_value(json).unwrap();
        let mut imported = StaticPermissionManager::new();
        imported.import(parsed);
        assert_eq!(imported, permissions);
    }

    #[test]
    fn test_assertions_do_not_survive_json() {
        let mut permissions = StaticPermissionManager::new();
        permissions.allow(Rule::new().role("user").assertion(Assertion::new(|_, _, _, _| true)));

        let json = serde_json::to_string(&permissions.export()).unwrap();
        let parsed: PermissionTransfer = serde_json::from_str(&json).unwrap();
        assert!(parsed[0].1[0].1[0].assertion.is_none());
    }
}
