//! The resolution contract.
//!
//! [`ServiceResolver`] is the object-safe core every container must
//! implement. [`ResolveExt`] layers the typed operations on top and is
//! implemented for every resolver, including `dyn ServiceResolver`.

use std::sync::Arc;

use crate::binding::{ErasedService, downcast};
use crate::error::Result;
use crate::key::{ServiceKey, ServiceType};

/// Retrieves bound services.
///
/// This is what component constructors receive, and what the injector
/// reads from.
pub trait ServiceResolver: Send + Sync {
    /// Realizes the binding registered under `key`.
    ///
    /// # Errors
    /// [`UnresolvedService`](crate::error::TrellisError::UnresolvedService)
    /// if nothing is bound under exactly that key.
    fn resolve_erased(&self, key: &ServiceKey) -> Result<ErasedService>;

    /// Realizes every binding of `service`, keyed or not, in
    /// registration order. Empty when nothing is bound.
    fn resolve_all_erased(&self, service: ServiceType) -> Result<Vec<ErasedService>>;

    fn can_resolve(&self, key: &ServiceKey) -> bool;
}

/// Typed resolution on top of [`ServiceResolver`].
///
/// ```rust,ignore
/// let mailer: Arc<dyn Mailer> = registry.resolve()?;
/// let backup: Arc<dyn Mailer> = registry.resolve_keyed("backup")?;
/// let checks: Vec<Arc<dyn HealthCheck>> = registry.resolve_all()?;
/// ```
pub trait ResolveExt: ServiceResolver {
    /// The default (unkeyed) binding for `S`.
    fn resolve<S>(&self) -> Result<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        resolve_typed(self, &ServiceKey::of::<S>())
    }

    /// The binding for `S` under `key`.
    fn resolve_keyed<S>(&self, key: &str) -> Result<Arc<S>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        resolve_typed(self, &ServiceKey::keyed::<S>(key))
    }

    /// Every binding for `S`, in registration order.
    fn resolve_all<S>(&self) -> Result<Vec<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let key = ServiceKey::of::<S>();
        self.resolve_all_erased(key.service())?
            .iter()
            .map(|erased| downcast::<S>(&key, erased))
            .collect()
    }

    /// Like [`resolve`](ResolveExt::resolve) but `Ok(None)` when `S` is
    /// not bound. Other failures still propagate.
    fn try_resolve<S>(&self) -> Result<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        optional(self.resolve::<S>())
    }

    fn try_resolve_keyed<S>(&self, key: &str) -> Result<Option<Arc<S>>>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        optional(self.resolve_keyed::<S>(key))
    }
}

impl<R: ServiceResolver + ?Sized> ResolveExt for R {}

fn resolve_typed<R, S>(resolver: &R, key: &ServiceKey) -> Result<Arc<S>>
where
    R: ServiceResolver + ?Sized,
    S: ?Sized + Send + Sync + 'static,
{
    let erased = resolver.resolve_erased(key)?;
    downcast::<S>(key, &erased)
}

fn optional<S: ?Sized>(result: Result<Arc<S>>) -> Result<Option<Arc<S>>> {
    match result {
        Ok(service) => Ok(Some(service)),
        Err(err) if err.is_unresolved() => Ok(None),
        Err(err) => Err(err),
    }
}
