//! # Identity Types
//!
//! Roles and resources are identified by a string id. Applications attach
//! their own fields (an author, an owner) by implementing [`Role`] or
//! [`Resource`] for their own types; the core only ever reads the id, while
//! assertions may downcast to the concrete type.

use std::any::Any;
use std::sync::Arc;

/// Something that acts as a role.
///
/// Bare strings are roles whose id is the string itself.
///
/// # Example
///
/// ```
/// use std::any::Any;
/// use hrbac::Role;
///
/// struct UserRole {
///     user_id: String,
///     role: String,
/// }
///
/// impl Role for UserRole {
///     fn role_id(&self) -> &str {
///         &self.role
///     }
///
///     fn as_any(&self) -> Option<&(dyn Any + 'static)> {
///         Some(self)
///     }
/// }
///
/// let user = UserRole { user_id: "u".into(), role: "user".into() };
/// let role: &dyn Role = &user;
/// assert_eq!(role.role_id(), "user");
/// assert_eq!(role.downcast_ref::<UserRole>().unwrap().user_id, "u");
/// assert_eq!("guest".role_id(), "guest");
/// ```
pub trait Role: Send + Sync {
    /// The role id used for hierarchy and rule lookups.
    fn role_id(&self) -> &str;

    /// Expose the concrete value for downcasting, if the type opts in.
    fn as_any(&self) -> Option<&(dyn Any + 'static)> {
        None
    }
}

/// Something that acts as a resource.
///
/// Bare strings are resources whose id is the string itself.
pub trait Resource: Send + Sync {
    /// The resource id used for hierarchy and rule lookups.
    fn resource_id(&self) -> &str;

    /// Expose the concrete value for downcasting, if the type opts in.
    fn as_any(&self) -> Option<&(dyn Any + 'static)> {
        None
    }
}

impl<'a> dyn Role + 'a {
    /// Downcast to a concrete role type.
    ///
    /// Returns `None` for bare string ids and for types that do not expose
    /// themselves through [`Role::as_any`].
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any()?.downcast_ref::<T>()
    }
}

impl<'a> dyn Resource + 'a {
    /// Downcast to a concrete resource type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_any()?.downcast_ref::<T>()
    }
}

impl Role for str {
    fn role_id(&self) -> &str {
        self
    }
}

impl Role for String {
    fn role_id(&self) -> &str {
        self
    }
}

impl<T: Role + ?Sized> Role for &T {
    fn role_id(&self) -> &str {
        (**self).role_id()
    }

    fn as_any(&self) -> Option<&(dyn Any + 'static)> {
        (**self).as_any()
    }
}

impl<T: Role + ?Sized> Role for Arc<T> {
    fn role_id(&self) -> &str {
        (**self).role_id()
    }

    fn as_any(&self) -> Option<&(dyn Any + 'static)> {
        (**self).as_any()
    }
}

impl Resource for str {
    fn resource_id(&self) -> &str {
        self
    }
}

impl Resource for String {
    fn resource_id(&self) -> &str {
        self
    }
}

impl<T: Resource + ?Sized> Resource for &T {
    fn resource_id(&self) -> &str {
        (**self).resource_id()
    }

    fn as_any(&self) -> Option<&(dyn Any + 'static)> {
        (**self).as_any()
    }
}

impl<T: Resource + ?Sized> Resource for Arc<T> {
    fn resource_id(&self) -> &str {
        (**self).resource_id()
    }

    fn as_any(&self) -> Option<&(dyn Any + 'static)> {
        (**self).as_any()
    }
}
