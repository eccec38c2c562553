//! Bindings: how a registered service is realized.
//!
//! A [`Binding`] is one of three strategies. [`Binding::realize`] is the
//! single dispatch point that turns any of them into a value.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::component::{CastFn, ImplType, Provides, cast_erased};
use crate::error::{InvalidBindingError, Result, TrellisError};
use crate::key::{ServiceKey, ServiceType};
use crate::resolver::ServiceResolver;

/// A realized service, type-erased.
///
/// The concrete value inside is always `Arc<S>` for the service `S` it
/// was resolved as, so `downcast_ref::<Arc<S>>()` recovers it.
pub type ErasedService = Arc<dyn Any + Send + Sync>;

/// A zero-argument producer.
pub type FactoryFn = Arc<dyn Fn() -> ErasedService + Send + Sync>;

/// The resolution strategy for one registration.
#[derive(Clone)]
pub enum Binding {
    /// A pre-built value, shared by every resolve.
    Instance(ErasedService),
    /// A producer invoked on every resolve.
    Factory(FactoryFn),
    /// A component constructed on every resolve, then cast to the service.
    Type { implementation: ImplType, cast: CastFn },
}

impl Binding {
    pub fn instance<S>(value: Arc<S>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        Binding::Instance(Arc::new(value))
    }

    pub fn factory<S, F>(factory: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        Binding::Factory(Arc::new(move || {
            let erased: ErasedService = Arc::new(factory());
            erased
        }))
    }

    /// A factory invoked at most once; later resolves share its result.
    pub fn singleton<S, F>(factory: F) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        let cell: Arc<OnceCell<ErasedService>> = Arc::new(OnceCell::new());
        Binding::Factory(Arc::new(move || {
            cell.get_or_init(|| {
                let erased: ErasedService = Arc::new(factory());
                erased
            })
            .clone()
        }))
    }

    /// Binds component `T` as service `S`. Assignability is checked by
    /// the compiler.
    pub fn component<S, T>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Provides<S>,
    {
        Binding::Type {
            implementation: ImplType::builder::<T>().implements::<S>().build(),
            cast: cast_erased::<T, S>,
        }
    }

    /// Binds a runtime implementation token as `service`.
    ///
    /// # Errors
    /// [`TrellisError::InvalidBinding`] if the token was not declared to
    /// provide `service`.
    pub fn to_type(implementation: &ImplType, service: ServiceType) -> Result<Self> {
        let cast = implementation.cast_for(service).ok_or_else(|| {
            TrellisError::InvalidBinding(InvalidBindingError {
                service,
                implementation: implementation.implementation(),
            })
        })?;

        Ok(Binding::Type {
            implementation: implementation.clone(),
            cast,
        })
    }

    /// Short strategy name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Binding::Instance(_) => "instance",
            Binding::Factory(_) => "factory",
            Binding::Type { .. } => "type",
        }
    }

    pub fn is_type(&self) -> bool {
        matches!(self, Binding::Type { .. })
    }

    /// Realizes the binding for `key`.
    ///
    /// Instances are shared, factories are invoked, components are
    /// constructed with `resolver` and cast. Cycle tracking is the
    /// caller's job; this only dispatches.
    pub fn realize(&self, key: &ServiceKey, resolver: &dyn ServiceResolver) -> Result<ErasedService> {
        match self {
            Binding::Instance(value) => Ok(Arc::clone(value)),
            Binding::Factory(factory) => Ok(factory()),
            Binding::Type { implementation, cast } => {
                let component = implementation.construct(resolver)?;
                cast(component).ok_or_else(|| TrellisError::TypeMismatch {
                    key: key.clone(),
                    expected: key.type_name(),
                })
            }
        }
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Instance(_) => f.write_str("Binding::Instance"),
            Binding::Factory(_) => f.write_str("Binding::Factory"),
            Binding::Type { implementation, .. } => f
                .debug_struct("Binding::Type")
                .field("implementation", &implementation.implementation())
                .finish(),
        }
    }
}

/// Recovers `Arc<S>` from a realized value.
pub fn downcast<S>(key: &ServiceKey, erased: &ErasedService) -> Result<Arc<S>>
where
    S: ?Sized + Send + Sync + 'static,
{
    erased
        .downcast_ref::<Arc<S>>()
        .cloned()
        .ok_or_else(|| TrellisError::TypeMismatch {
            key: key.clone(),
            expected: type_name::<Arc<S>>(),
        })
}
