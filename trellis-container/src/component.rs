//! Concrete component types and what they can be bound as.
//!
//! Rust has no runtime reflection, so "is this implementation assignable
//! to that service?" is answered by explicit declarations:
//!
//! - [`Component`] says how to build a type from a resolver.
//! - [`Provides<S>`] says a component can stand in for service `S`.
//!   The [`provides!`](crate::provides) macro writes these impls.
//! - [`ImplType`] is the runtime token carrying both, used by the
//!   type-token registration operations and by plugin discovery.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::binding::ErasedService;
use crate::error::Result;
use crate::key::{ServiceKey, ServiceType};
use crate::resolver::ServiceResolver;

/// A concrete type the registry knows how to construct.
///
/// `construct` receives the resolver so it can pull its own
/// dependencies: `resolve` for required ones, `try_resolve` for ones
/// that have a default.
///
/// ```rust,ignore
/// struct SignupService {
///     mailer: Arc<dyn Mailer>,
///     clock: Arc<dyn Clock>,
/// }
///
/// impl Component for SignupService {
///     fn construct(r: &dyn ServiceResolver) -> Result<Self> {
///         Ok(SignupService {
///             mailer: r.resolve()?,
///             clock: r.try_resolve()?.unwrap_or_else(|| Arc::new(SystemClock)),
///         })
///     }
///
///     fn dependencies() -> Vec<ServiceKey> {
///         vec![ServiceKey::of::<dyn Mailer>()]
///     }
/// }
/// ```
pub trait Component: Sized + Send + Sync + 'static {
    fn construct(resolver: &dyn ServiceResolver) -> Result<Self>;

    /// Required dependencies, checked by
    /// [`ServiceRegistry::validate`](crate::registry::ServiceRegistry::validate).
    /// Optional ones are left out.
    fn dependencies() -> Vec<ServiceKey> {
        Vec::new()
    }
}

/// Declares that component `Self` can be resolved as service `S`.
///
/// Every component provides itself. Implement this (usually through
/// [`provides!`](crate::provides)) for each trait object it should be
/// bound under.
pub trait Provides<S: ?Sized>: Component {
    fn upcast(self: Arc<Self>) -> Arc<S>;
}

impl<T: Component> Provides<T> for T {
    fn upcast(self: Arc<Self>) -> Arc<T> {
        self
    }
}

/// Implements [`Provides`] for a component and one or more services.
///
/// ```rust,ignore
/// provides!(SmtpMailer => dyn Mailer, dyn HealthCheck);
/// ```
#[macro_export]
macro_rules! provides {
    ($component:ty => $($service:ty),+ $(,)?) => {
        $(
            impl $crate::component::Provides<$service> for $component {
                fn upcast(self: ::std::sync::Arc<Self>) -> ::std::sync::Arc<$service> {
                    self
                }
            }
        )+
    };
}

pub(crate) type ConstructFn = fn(&dyn ServiceResolver) -> Result<Arc<dyn Any + Send + Sync>>;

/// Turns a freshly built component into a realized service value.
///
/// Returns `None` if the component is not the expected concrete type.
pub type CastFn = fn(Arc<dyn Any + Send + Sync>) -> Option<ErasedService>;

fn construct_erased<T: Component>(resolver: &dyn ServiceResolver) -> Result<Arc<dyn Any + Send + Sync>> {
    let component: Arc<dyn Any + Send + Sync> = Arc::new(T::construct(resolver)?);
    Ok(component)
}

pub(crate) fn cast_erased<T, S>(component: Arc<dyn Any + Send + Sync>) -> Option<ErasedService>
where
    T: Provides<S>,
    S: ?Sized + Send + Sync + 'static,
{
    let concrete = component.downcast::<T>().ok()?;
    let service: Arc<S> = <T as Provides<S>>::upcast(concrete);
    let erased: ErasedService = Arc::new(service);
    Some(erased)
}

/// Runtime token for a concrete component type.
///
/// Carries the constructor and the list of services the component was
/// declared to provide. Registration through a token checks that list
/// and fails with [`InvalidBinding`](crate::error::TrellisError::InvalidBinding)
/// when the service is missing from it.
#[derive(Clone)]
pub struct ImplType {
    implementation: ServiceType,
    construct: ConstructFn,
    dependencies: fn() -> Vec<ServiceKey>,
    casts: Vec<(ServiceType, CastFn)>,
}

impl ImplType {
    /// A token for `T` that provides only `T` itself.
    pub fn of<T: Component>() -> Self {
        Self {
            implementation: ServiceType::of::<T>(),
            construct: construct_erased::<T>,
            dependencies: <T as Component>::dependencies,
            casts: vec![(ServiceType::of::<T>(), cast_erased::<T, T> as CastFn)],
        }
    }

    /// Starts a token for `T` that can list extra services.
    ///
    /// ```rust,ignore
    /// let smtp = ImplType::builder::<SmtpMailer>()
    ///     .implements::<dyn Mailer>()
    ///     .build();
    /// ```
    pub fn builder<T: Component>() -> ImplTypeBuilder<T> {
        ImplTypeBuilder {
            inner: Self::of::<T>(),
            _marker: PhantomData,
        }
    }

    /// The concrete type this token stands for.
    pub fn implementation(&self) -> ServiceType {
        self.implementation
    }

    /// Whether the component was declared to provide `service`.
    pub fn provides(&self, service: ServiceType) -> bool {
        self.cast_for(service).is_some()
    }

    /// Services this component can be bound as, itself first.
    pub fn services(&self) -> impl Iterator<Item = ServiceType> + '_ {
        self.casts.iter().map(|(service, _)| *service)
    }

    /// Declared required dependencies.
    pub fn dependencies(&self) -> Vec<ServiceKey> {
        (self.dependencies)()
    }

    pub(crate) fn cast_for(&self, service: ServiceType) -> Option<CastFn> {
        self.casts
            .iter()
            .find(|(provided, _)| *provided == service)
            .map(|(_, cast)| *cast)
    }

    pub(crate) fn construct(&self, resolver: &dyn ServiceResolver) -> Result<Arc<dyn Any + Send + Sync>> {
        (self.construct)(resolver)
    }
}

impl fmt::Debug for ImplType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImplType")
            .field("implementation", &self.implementation)
            .field("services", &self.services().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder returned by [`ImplType::builder`].
pub struct ImplTypeBuilder<T> {
    inner: ImplType,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Component> ImplTypeBuilder<T> {
    /// Adds `S` to the services this component can be bound as.
    pub fn implements<S>(mut self) -> Self
    where
        T: Provides<S>,
        S: ?Sized + Send + Sync + 'static,
    {
        let service = ServiceType::of::<S>();
        if !self.inner.provides(service) {
            self.inner.casts.push((service, cast_erased::<T, S> as CastFn));
        }
        self
    }

    pub fn build(self) -> ImplType {
        self.inner
    }
}

impl<T: Component> From<ImplTypeBuilder<T>> for ImplType {
    fn from(builder: ImplTypeBuilder<T>) -> Self {
        builder.build()
    }
}
