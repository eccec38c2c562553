//! Implementation discovery for batch registration.
//!
//! Plugins announce themselves at link time with
//! [`register_plugin!`](crate::register_plugin):
//!
//! ```rust,ignore
//! register_plugin!(dyn ReportExporter => CsvExporter);
//! register_plugin!(dyn ReportExporter => PdfExporter);
//! ```
//!
//! [`ImplCatalog`] collects those submissions plus any implementations
//! added explicitly, and answers "which implementations provide this
//! service?" for [`RegistrarExt::register_all`](crate::registrar::RegistrarExt::register_all).

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::component::{ImplType, Provides};
use crate::error::{InvalidBindingError, Result, TrellisError};
use crate::key::ServiceType;

/// A link-time plugin submission.
///
/// Built by [`register_plugin!`](crate::register_plugin); `new` is a
/// `const fn` so it can sit in a static.
pub struct PluginEntry {
    service: fn() -> ServiceType,
    implementation: fn() -> ImplType,
}

impl PluginEntry {
    pub const fn new<S, T>() -> Self
    where
        S: ?Sized + Send + Sync + 'static,
        T: Provides<S>,
    {
        Self {
            service: ServiceType::of::<S>,
            implementation: plugin_impl::<S, T>,
        }
    }

    pub fn service(&self) -> ServiceType {
        (self.service)()
    }

    pub fn implementation(&self) -> ImplType {
        (self.implementation)()
    }
}

fn plugin_impl<S, T>() -> ImplType
where
    S: ?Sized + Send + Sync + 'static,
    T: Provides<S>,
{
    ImplType::builder::<T>().implements::<S>().build()
}

inventory::collect!(PluginEntry);

/// Submits component `T` as a plugin implementation of service `S`.
#[macro_export]
macro_rules! register_plugin {
    ($service:ty => $component:ty) => {
        $crate::__private::inventory::submit! {
            $crate::catalog::PluginEntry::new::<$service, $component>()
        }
    };
}

/// Known implementations, per service.
///
/// Answers are cached per service until [`clear_cache`](Self::clear_cache);
/// adding an implementation drops the cached answer for its service.
pub struct ImplCatalog {
    scan_plugins: bool,
    explicit: RwLock<Vec<(ServiceType, ImplType)>>,
    cache: DashMap<ServiceType, Arc<[ImplType]>>,
}

impl ImplCatalog {
    /// A catalog that includes link-time plugins.
    pub fn new() -> Self {
        Self {
            scan_plugins: true,
            explicit: RwLock::new(Vec::new()),
            cache: DashMap::new(),
        }
    }

    /// A catalog that only knows explicitly added implementations.
    pub fn explicit_only() -> Self {
        Self {
            scan_plugins: false,
            ..Self::new()
        }
    }

    /// Adds component `T` as an implementation of `S`.
    pub fn add<S, T>(&self)
    where
        S: ?Sized + Send + Sync + 'static,
        T: Provides<S>,
    {
        let service = ServiceType::of::<S>();
        self.push(service, plugin_impl::<S, T>());
    }

    /// Adds a runtime token as an implementation of `service`.
    ///
    /// # Errors
    /// [`TrellisError::InvalidBinding`] if the token does not provide
    /// `service`.
    pub fn add_type(&self, service: ServiceType, implementation: ImplType) -> Result<()> {
        if !implementation.provides(service) {
            return Err(TrellisError::InvalidBinding(InvalidBindingError {
                service,
                implementation: implementation.implementation(),
            }));
        }
        self.push(service, implementation);
        Ok(())
    }

    /// Implementations of `service`, sorted by type name, without
    /// duplicates.
    pub fn implementations_of(&self, service: ServiceType) -> Arc<[ImplType]> {
        if let Some(hit) = self.cache.get(&service) {
            trace!(service = %service, "Catalog cache hit");
            return Arc::clone(hit.value());
        }

        // Held until the insert, so a concurrent `push` cannot be
        // overwritten by this scan's older answer.
        let explicit = self.explicit.read();
        let found: Arc<[ImplType]> = self.scan(service, &explicit).into();
        debug!(service = %service, count = found.len(), "Scanned implementations");
        self.cache.insert(service, Arc::clone(&found));
        found
    }

    /// Drops every cached answer.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cached_services(&self) -> usize {
        self.cache.len()
    }

    fn push(&self, service: ServiceType, implementation: ImplType) {
        let mut explicit = self.explicit.write();
        explicit.push((service, implementation));
        self.cache.remove(&service);
    }

    fn scan(&self, service: ServiceType, explicit: &[(ServiceType, ImplType)]) -> Vec<ImplType> {
        let mut found: Vec<ImplType> = Vec::new();

        if self.scan_plugins {
            found.extend(
                inventory::iter::<PluginEntry>
                    .into_iter()
                    .filter(|entry| entry.service() == service)
                    .map(PluginEntry::implementation),
            );
        }

        found.extend(
            explicit
                .iter()
                .filter(|(provided, _)| *provided == service)
                .map(|(_, implementation)| implementation.clone()),
        );

        found.sort_by_key(|implementation| implementation.implementation().type_name());
        found.dedup_by_key(|implementation| implementation.implementation());
        found
    }
}

impl Default for ImplCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ImplCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImplCatalog")
            .field("scan_plugins", &self.scan_plugins)
            .field("explicit", &self.explicit.read().len())
            .field("cached", &self.cache.len())
            .finish()
    }
}
