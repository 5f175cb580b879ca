//! # Assertions
//!
//! Runtime predicates attached to access control entries. An entry that
//! carries an assertion only applies when the predicate holds for the role,
//! resource and privilege being checked.

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::HrbacResult;
use crate::hrbac::AccessControl;
use crate::types::{Resource, Role};

/// Predicate evaluated for every candidate entry that carries it.
///
/// Implement this directly for predicates that need to await something (a
/// database lookup, another access check). Plain closures are wrapped with
/// [`Assertion::new`] or [`Assertion::fallible`].
///
/// Errors are propagated out of `is_allowed` as is.
#[async_trait]
pub trait Assert: Send + Sync {
    /// Decide whether the entry applies.
    async fn assert(
        &self,
        engine: &dyn AccessControl,
        role: &dyn Role,
        resource: &dyn Resource,
        privilege: Option<&str>,
    ) -> HrbacResult<bool>;
}

struct FnAssertion<F>(F);

#[async_trait]
impl<F> Assert for FnAssertion<F>
where
    F: Fn(&dyn AccessControl, &dyn Role, &dyn Resource, Option<&str>) -> bool + Send + Sync,
{
    async fn assert(
        &self,
        engine: &dyn AccessControl,
        role: &dyn Role,
        resource: &dyn Resource,
        privilege: Option<&str>,
    ) -> HrbacResult<bool> {
        Ok((self.0)(engine, role, resource, privilege))
    }
}

struct FallibleFnAssertion<F>(F);

#[async_trait]
impl<F> Assert for FallibleFnAssertion<F>
where
    F: Fn(&dyn AccessControl, &dyn Role, &dyn Resource, Option<&str>) -> HrbacResult<bool> + Send + Sync,
{
    async fn assert(
        &self,
        engine: &dyn AccessControl,
        role: &dyn Role,
        resource: &dyn Resource,
        privilege: Option<&str>,
    ) -> HrbacResult<bool> {
        (self.0)(engine, role, resource, privilege)
    }
}

/// Shared handle to an assertion.
///
/// Cloning is cheap and two handles are equal only when they point at the
/// same predicate, so exported rules compare equal to the rules they were
/// imported from within one process.
///
/// # Example
///
/// ```
/// use hrbac::Assertion;
///
/// let always = Assertion::new(|_engine, _role, _resource, _privilege| true);
/// let copy = always.clone();
/// assert_eq!(always, copy);
/// assert_ne!(always, Assertion::new(|_, _, _, _| true));
/// ```
#[derive(Clone)]
pub struct Assertion {
    inner: Arc<dyn Assert>,
}

impl Assertion {
    /// Wrap an infallible synchronous predicate.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&dyn AccessControl, &dyn Role, &dyn Resource, Option<&str>) -> bool + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(FnAssertion(predicate)),
        }
    }

    /// Wrap a synchronous predicate that may fail.
    pub fn fallible<F>(predicate: F) -> Self
    where
        F: Fn(&dyn AccessControl, &dyn Role, &dyn Resource, Option<&str>) -> HrbacResult<bool>
            + Send
            + Sync
            + 'static,
    {
        Self {
            inner: Arc::new(FallibleFnAssertion(predicate)),
        }
    }

    /// Wrap any [`Assert`] implementation, typically an asynchronous one.
    pub fn from_assert<A: Assert + 'static>(assert: A) -> Self {
        Self {
            inner: Arc::new(assert),
        }
    }

    /// Evaluate the predicate.
    pub async fn assert(
        &self,
        engine: &dyn AccessControl,
        role: &dyn Role,
        resource: &dyn Resource,
        privilege: Option<&str>,
    ) -> HrbacResult<bool> {
        self.inner.assert(engine, role, resource, privilege).await
    }

    /// Check whether two handles share the same predicate.
    pub fn ptr_eq(&self, other: &Assertion) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for Assertion {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for Assertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assertion")
            .field("ptr", &Arc::as_ptr(&self.inner).cast::<()>())
            .finish()
    }
}
