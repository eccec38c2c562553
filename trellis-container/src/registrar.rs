//! The registration contract.
//!
//! [`ServiceRegistrar`] is the object-safe core a container implements.
//! [`RegistrarExt`] provides every registration form on top of it and
//! is available on `&dyn ServiceRegistrar` too, so modules can register
//! without knowing the concrete container.

use std::sync::Arc;

use tracing::debug;

use crate::binding::Binding;
use crate::component::{ImplType, Provides};
use crate::error::Result;
use crate::key::{ServiceKey, ServiceType};

/// Accepts bindings during startup.
pub trait ServiceRegistrar: Send + Sync {
    /// Stores `binding` under `key`.
    ///
    /// An existing binding under the same key is replaced or rejected
    /// according to the container's duplicate policy. A failed call
    /// leaves earlier registrations untouched.
    fn add_binding(&self, key: ServiceKey, binding: Binding) -> Result<()>;

    /// Stores every binding or none of them.
    ///
    /// The default forwards to [`add_binding`](Self::add_binding) one at
    /// a time. Containers whose registration can fail part way through a
    /// batch override it.
    fn add_bindings(&self, bindings: Vec<(ServiceKey, Binding)>) -> Result<()> {
        bindings
            .into_iter()
            .try_for_each(|(key, binding)| self.add_binding(key, binding))
    }

    /// Implementations of `service` visible to batch registration.
    fn implementations_of(&self, service: ServiceType) -> Vec<ImplType>;

    /// Releases registrar-held resources such as scan caches.
    ///
    /// Never disposes bound services.
    fn dispose(&self) {}
}

/// Every registration form, built on [`ServiceRegistrar::add_binding`].
pub trait RegistrarExt: ServiceRegistrar {
    /// Registers every known implementation of `S`, each keyed by its
    /// own type name. Returns how many were registered; zero is not an
    /// error.
    fn register_all<S>(&self) -> Result<usize>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        let service = ServiceType::of::<S>();
        let bindings = self
            .implementations_of(service)
            .iter()
            .map(|implementation| -> Result<(ServiceKey, Binding)> {
                let key = service.keyed(implementation.implementation().type_name());
                Ok((key, Binding::to_type(implementation, service)?))
            })
            .collect::<Result<Vec<_>>>()?;
        let count = bindings.len();

        self.add_bindings(bindings)?;
        debug!(service = %service, count, "Registered all implementations");
        Ok(count)
    }

    /// Binds a runtime implementation token as the default `S`.
    fn register_type<S>(&self, implementation: &ImplType) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.register_service(ServiceType::of::<S>(), implementation)
    }

    /// Binds component `T` as the default `S`.
    fn register<S, T>(&self) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
        T: Provides<S>,
    {
        self.add_binding(ServiceKey::of::<S>(), Binding::component::<S, T>())
    }

    /// Binds component `T` as `S` under `key`.
    fn register_keyed<S, T>(&self, key: impl Into<Arc<str>>) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
        T: Provides<S>,
    {
        self.add_binding(ServiceKey::keyed::<S>(key), Binding::component::<S, T>())
    }

    /// Binds an implementation token under `key`, as its own type.
    fn register_named(&self, key: impl Into<Arc<str>>, implementation: &ImplType) -> Result<()> {
        self.register_service_keyed(implementation.implementation(), implementation, key)
    }

    /// Binds an implementation token as the default `service`.
    fn register_service(&self, service: ServiceType, implementation: &ImplType) -> Result<()> {
        self.add_binding(service.key(), Binding::to_type(implementation, service)?)
    }

    fn register_service_keyed(
        &self,
        service: ServiceType,
        implementation: &ImplType,
        key: impl Into<Arc<str>>,
    ) -> Result<()> {
        self.add_binding(service.keyed(key), Binding::to_type(implementation, service)?)
    }

    /// Binds a pre-built value as the default `S`.
    ///
    /// The registry holds a reference; the value is dropped when the
    /// last holder lets go.
    fn register_instance<S>(&self, instance: Arc<S>) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.add_binding(ServiceKey::of::<S>(), Binding::instance(instance))
    }

    fn register_instance_keyed<S>(&self, key: impl Into<Arc<str>>, instance: Arc<S>) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
    {
        self.add_binding(ServiceKey::keyed::<S>(key), Binding::instance(instance))
    }

    /// Binds a producer invoked on every resolve.
    fn register_factory<S, F>(&self, factory: F) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        self.add_binding(ServiceKey::of::<S>(), Binding::factory(factory))
    }

    fn register_factory_keyed<S, F>(&self, key: impl Into<Arc<str>>, factory: F) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        self.add_binding(ServiceKey::keyed::<S>(key), Binding::factory(factory))
    }

    /// Binds a producer invoked on first resolve only.
    fn register_singleton<S, F>(&self, factory: F) -> Result<()>
    where
        S: ?Sized + Send + Sync + 'static,
        F: Fn() -> Arc<S> + Send + Sync + 'static,
    {
        self.add_binding(ServiceKey::of::<S>(), Binding::singleton(factory))
    }
}

impl<R: ServiceRegistrar + ?Sized> RegistrarExt for R {}
