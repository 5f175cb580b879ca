//! # Parent Managers
//!
//! Hierarchy resolution shared by roles and resources. A parent manager
//! answers "what are the direct parents of X"; the ancestor closure (X
//! itself followed by every ancestor, breadth first) is computed once here for
//! both entity kinds.
//!
//! ```text
//! editor ──▶ user ──▶ guest
//!    └─────▶ manager
//!
//! ancestors(editor) = [editor, user, manager, guest]
//! ```

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::marker::PhantomData;

use crate::error::HrbacResult;
use crate::types::{Resource, Role};

/// Serializable snapshot of a hierarchy: entity id to direct parent ids.
pub type ParentTransfer = BTreeMap<String, Vec<String>>;

/// Kind of entity a hierarchy is built over.
pub trait EntityKind: Send + Sync + 'static {
    /// Human-readable kind name, used in logs and errors.
    const LABEL: &'static str;
}

/// Role hierarchy marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct RoleKind;

/// Resource hierarchy marker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ResourceKind;

impl EntityKind for RoleKind {
    const LABEL: &'static str = "role";
}

impl EntityKind for ResourceKind {
    const LABEL: &'static str = "resource";
}

/// Id extraction for an entity kind.
///
/// Every [`Role`] identifies as a role and every [`Resource`] as a resource,
/// so managers accept ids and domain objects interchangeably.
pub trait Identify<K: EntityKind> {
    /// The id of this entity within hierarchy `K`.
    fn identify(&self) -> &str;
}

impl<T: Role + ?Sized> Identify<RoleKind> for T {
    fn identify(&self) -> &str {
        self.role_id()
    }
}

impl<T: Resource + ?Sized> Identify<ResourceKind> for T {
    fn identify(&self) -> &str {
        self.resource_id()
    }
}

/// Source of direct parents for one hierarchy.
///
/// Implementations backed by an external system report lookup failures as
/// [`HrbacError::ParentLookup`](crate::HrbacError::ParentLookup); unknown ids
/// are not an error and yield `None`.
#[async_trait]
pub trait ParentManager<K: EntityKind>: Send + Sync {
    /// Direct parent ids of `id`, or `None` if the id is unknown.
    async fn get_parents(&self, id: &str) -> HrbacResult<Option<Vec<String>>>;

    /// Breadth-first ancestor closure of `id`, starting with `id` itself.
    ///
    /// Every id appears once, in first-discovery order. Cycles are safe: an
    /// id already visited is skipped when it comes up again.
    async fn get_recursive_parents_of(&self, id: &str) -> HrbacResult<Vec<String>> {
        let mut queue = VecDeque::from([id.to_string()]);
        let mut visited = HashSet::new();
        let mut ancestors = Vec::new();

        while let Some(current) = queue.pop_front() {
            if !visited.insert(current.clone()) {
                continue;
            }
            ancestors.push(current.clone());

            if let Some(parents) = self.get_parents(&current).await? {
                queue.extend(parents);
            }
        }

        tracing::trace!(kind = K::LABEL, id = %id, ancestors = ?ancestors, "Resolved ancestor closure");

        Ok(ancestors)
    }
}

/// In-memory hierarchy.
///
/// Parent lists keep first-seen order and never contain duplicates.
///
/// # Example
///
/// ```
/// use hrbac::StaticRoleManager;
///
/// let mut roles = StaticRoleManager::new();
/// roles.add_parents("editor", ["user", "manager"]);
/// roles.add_parents("editor", ["user"]);
///
/// assert_eq!(roles.parents_of("editor"), Some(&["user".to_string(), "manager".to_string()][..]));
/// assert_eq!(roles.parents_of("admin"), None);
/// ```
pub struct StaticParentManager<K: EntityKind> {
    parents: HashMap<String, Vec<String>>,
    kind: PhantomData<K>,
}

/// In-memory role hierarchy.
pub type StaticRoleManager = StaticParentManager<RoleKind>;

/// In-memory resource hierarchy.
pub type StaticResourceManager = StaticParentManager<ResourceKind>;

impl<K: EntityKind> StaticParentManager<K> {
    /// Create an empty hierarchy.
    pub fn new() -> Self {
        Self {
            parents: HashMap::new(),
            kind: PhantomData,
        }
    }

    /// Union `parents` into the parent list of `entity`.
    ///
    /// The entity is registered even when `parents` is empty.
    pub fn add_parents<E, I>(&mut self, entity: E, parents: I)
    where
        E: Identify<K>,
        I: IntoIterator,
        I::Item: Identify<K>,
    {
        let id = Identify::<K>::identify(&entity).to_string();
        let parents = parents
            .into_iter()
            .map(|parent| Identify::<K>::identify(&parent).to_string());
        self.union_ids(id, parents);
    }

    /// Replace the parent list of `entity`.
    pub fn set_parents<E, I>(&mut self, entity: E, parents: I)
    where
        E: Identify<K>,
        I: IntoIterator,
        I::Item: Identify<K>,
    {
        self.parents.remove(Identify::<K>::identify(&entity));
        self.add_parents(entity, parents);
    }

    fn union_ids(&mut self, id: String, parents: impl IntoIterator<Item = String>) {
        let list = self.parents.entry(id).or_default();

        for parent in parents {
            if !list.contains(&parent) {
                list.push(parent);
            }
        }
    }

    /// Direct parents of `entity`, `None` if it was never registered.
    pub fn parents_of<E: Identify<K>>(&self, entity: E) -> Option<&[String]> {
        self.parents.get(Identify::<K>::identify(&entity)).map(Vec::as_slice)
    }

    /// Check whether `entity` has been registered.
    pub fn contains<E: Identify<K>>(&self, entity: E) -> bool {
        self.parents.contains_key(Identify::<K>::identify(&entity))
    }

    /// Number of registered entities.
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Check if no entity has been registered.
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }

    /// Snapshot the whole hierarchy.
    pub fn export(&self) -> ParentTransfer {
        self.parents
            .iter()
            .map(|(id, parents)| (id.clone(), parents.clone()))
            .collect()
    }

    /// Load a snapshot, replacing the parents of every entity it names.
    ///
    /// Entities absent from `data` are left untouched.
    pub fn import(&mut self, data: ParentTransfer) {
        let count = data.len();

        for (id, parents) in data {
            self.parents.remove(&id);
            self.union_ids(id, parents);
        }

        tracing::debug!(kind = K::LABEL, entities = count, "Imported hierarchy");
    }
}

impl<K: EntityKind> Default for StaticParentManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityKind> Clone for StaticParentManager<K> {
    fn clone(&self) -> Self {
        Self {
            parents: self.parents.clone(),
            kind: PhantomData,
        }
    }
}

impl<K: EntityKind> PartialEq for StaticParentManager<K> {
    fn eq(&self, other: &Self) -> bool {
        self.parents == other.parents
    }
}

impl<K: EntityKind> fmt::Debug for StaticParentManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticParentManager")
            .field("kind", &K::LABEL)
            .field("parents", &self.parents)
            .finish()
    }
}

#[async_trait]
impl<K: EntityKind> ParentManager<K> for StaticParentManager<K> {
    async fn get_parents(&self, id: &str) -> HrbacResult<Option<Vec<String>>> {
        Ok(self.parents.get(id).cloned())
    }
}

/// Hierarchy without parents: every entity is its own only ancestor.
///
/// The default resource manager of the engine, for deployments that do not
/// use resource inheritance.
pub struct FlatParentManager<K: EntityKind> {
    kind: PhantomData<K>,
}

/// Resource manager that disables resource inheritance.
pub type FlatResourceManager = FlatParentManager<ResourceKind>;

impl<K: EntityKind> FlatParentManager<K> {
    /// Create a flat hierarchy.
    pub fn new() -> Self {
        Self { kind: PhantomData }
    }
}

impl<K: EntityKind> Default for FlatParentManager<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityKind> Clone for FlatParentManager<K> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<K: EntityKind> fmt::Debug for FlatParentManager<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FlatParentManager").field("kind", &K::LABEL).finish()
    }
}

#[async_trait]
impl<K: EntityKind> ParentManager<K> for FlatParentManager<K> {
    async fn get_parents(&self, _id: &str) -> HrbacResult<Option<Vec<String>>> {
        Ok(None)
    }
}
