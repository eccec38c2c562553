//! # The in-memory registry
//!
//! [`ServiceRegistry`] is the reference container behind the
//! registration and resolution contracts.
//!
//! # Lifecycle
//! ```text
//! startup:  new() ── register…() ── validate() ── freeze()
//!                                                    │
//! requests:                          resolve…() / inject()  (concurrent)
//!                                                    │
//! teardown:                                      shutdown()
//! ```
//!
//! # Examples
//! ```rust
//! use std::sync::Arc;
//! use trellis_container::prelude::*;
//!
//! trait Clock: Send + Sync {
//!     fn now(&self) -> u64;
//! }
//!
//! struct FixedClock;
//! impl Clock for FixedClock {
//!     fn now(&self) -> u64 { 42 }
//! }
//!
//! let registry = ServiceRegistry::new();
//! registry
//!     .register_instance::<dyn Clock>(Arc::new(FixedClock))
//!     .expect("register");
//!
//! let clock: Arc<dyn Clock> = registry.resolve().expect("resolve");
//! assert_eq!(clock.now(), 42);
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tracing::{debug, info, trace, warn};
use trellis_support::rendering::did_you_mean;

use crate::binding::{Binding, ErasedService};
use crate::catalog::ImplCatalog;
use crate::component::ImplType;
use crate::error::{CircularDependencyError, Result, TrellisError, UnresolvedServiceError};
use crate::graph::GraphValidator;
use crate::key::{ServiceKey, ServiceType};
use crate::module::ServiceModule;
use crate::registrar::ServiceRegistrar;
use crate::resolver::ServiceResolver;

// ============================================================
// Options
// ============================================================

/// What a second registration under the same key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Last write wins. The replaced binding is dropped and the new one
    /// takes the last place in registration order.
    #[default]
    Replace,
    /// The second registration fails with
    /// [`TrellisError::AlreadyRegistered`].
    Reject,
}

/// Registry settings.
///
/// Deserializable so hosts can keep them in their own config files:
///
/// ```toml
/// [registry]
/// duplicates = "reject"
/// suggestions = 5
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryOptions {
    pub duplicates: DuplicatePolicy,
    /// Maximum "did you mean?" entries on an unresolved service.
    pub suggestions: usize,
}

impl Default for RegistryOptions {
    fn default() -> Self {
        Self {
            duplicates: DuplicatePolicy::Replace,
            suggestions: 3,
        }
    }
}

impl RegistryOptions {
    pub fn duplicates(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates = policy;
        self
    }

    pub fn suggestions(mut self, limit: usize) -> Self {
        self.suggestions = limit;
        self
    }
}

// ============================================================
// Storage
// ============================================================

#[derive(Clone)]
struct Registration {
    key: Option<Arc<str>>,
    binding: Binding,
}

/// Every registration of one service type, oldest first.
struct ServiceEntry {
    service: ServiceType,
    registrations: Vec<Registration>,
}

impl ServiceEntry {
    fn new(service: ServiceType) -> Self {
        Self {
            service,
            registrations: Vec::new(),
        }
    }

    fn position(&self, key: Option<&str>) -> Option<usize> {
        self.registrations
            .iter()
            .position(|r| r.key.as_deref() == key)
    }

    fn service_key(&self, registration: &Registration) -> ServiceKey {
        match &registration.key {
            Some(key) => self.service.keyed(Arc::clone(key)),
            None => self.service.key(),
        }
    }
}

// ============================================================
// ServiceRegistry
// ============================================================

/// Thread-safe in-memory container.
///
/// All methods take `&self`. Registration takes the write lock,
/// resolution takes the read lock only long enough to clone a binding
/// out, so constructors and factories can resolve recursively.
pub struct ServiceRegistry {
    services: RwLock<HashMap<ServiceType, ServiceEntry>>,
    catalog: ImplCatalog,
    options: RegistryOptions,
    frozen: AtomicBool,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::with_options(RegistryOptions::default())
    }

    pub fn with_options(options: RegistryOptions) -> Self {
        Self {
            services: RwLock::new(HashMap::new()),
            catalog: ImplCatalog::new(),
            options,
            frozen: AtomicBool::new(false),
        }
    }

    /// Replaces the implementation catalog used by batch registration.
    pub fn with_catalog(mut self, catalog: ImplCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn options(&self) -> &RegistryOptions {
        &self.options
    }

    pub fn catalog(&self) -> &ImplCatalog {
        &self.catalog
    }

    /// Runs a [`ServiceModule`] against this registry.
    pub fn add_module(&self, module: &dyn ServiceModule) -> Result<()> {
        debug!(module = module.name(), "Registering module");
        module.register(self)
    }

    /// Ends the registration phase.
    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
        info!(bindings = self.len(), "Registry frozen");
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen.load(Ordering::Acquire)
    }

    /// Number of bindings across all services.
    pub fn len(&self) -> usize {
        self.services
            .read()
            .values()
            .map(|entry| entry.registrations.len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every registered key.
    pub fn registered_keys(&self) -> Vec<ServiceKey> {
        self.services
            .read()
            .values()
            .flat_map(|entry| entry.registrations.iter().map(move |r| entry.service_key(r)))
            .collect()
    }

    /// Checks declared dependencies of every type binding.
    ///
    /// # Errors
    /// [`TrellisError::UnresolvedService`] for a declared dependency with
    /// no binding, [`TrellisError::CircularDependency`] for a cycle.
    pub fn validate(&self) -> Result<()> {
        let nodes: HashMap<ServiceKey, Vec<ServiceKey>> = {
            let services = self.services.read();
            services
                .values()
                .flat_map(|entry| {
                    entry.registrations.iter().map(move |r| {
                        let dependencies = match &r.binding {
                            Binding::Type { implementation, .. } => implementation.dependencies(),
                            _ => Vec::new(),
                        };
                        (entry.service_key(r), dependencies)
                    })
                })
                .collect()
        };

        GraphValidator::new(nodes, self.options.suggestions).validate()?;
        info!("Registry validated");
        Ok(())
    }

    /// Drops every binding and clears the scan cache.
    ///
    /// Bound instances are released when their last reference goes.
    pub fn shutdown(&self) {
        let released = {
            let mut services = self.services.write();
            let count = services.values().map(|e| e.registrations.len()).sum::<usize>();
            services.clear();
            count
        };
        self.catalog.clear_cache();
        info!(released, "Registry shut down");
    }

    fn binding(&self, key: &ServiceKey) -> Option<Binding> {
        let services = self.services.read();
        let entry = services.get(&key.service())?;
        let index = entry.position(key.key())?;
        Some(entry.registrations[index].binding.clone())
    }

    fn bindings_of(&self, service: ServiceType) -> Vec<(ServiceKey, Binding)> {
        let services = self.services.read();
        match services.get(&service) {
            Some(entry) => entry
                .registrations
                .iter()
                .map(|r| (entry.service_key(r), r.binding.clone()))
                .collect(),
            None => Vec::new(),
        }
    }

    fn unresolved(&self, key: &ServiceKey, required_by: Option<ServiceKey>) -> TrellisError {
        let registered: Vec<&'static str> = self
            .services
            .read()
            .values()
            .filter(|entry| !entry.registrations.is_empty())
            .map(|entry| entry.service.type_name())
            .collect();

        TrellisError::UnresolvedService(UnresolvedServiceError {
            requested: key.clone(),
            required_by,
            suggestions: did_you_mean(key.type_name(), &registered, self.options.suggestions),
        })
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.read().len())
            .field("bindings", &self.len())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}

impl ServiceRegistrar for ServiceRegistry {
    fn add_binding(&self, key: ServiceKey, binding: Binding) -> Result<()> {
        self.add_bindings(vec![(key, binding)])
    }

    fn add_bindings(&self, bindings: Vec<(ServiceKey, Binding)>) -> Result<()> {
        if self.is_frozen() {
            return Err(TrellisError::RegistryFrozen);
        }

        let mut services = self.services.write();

        if self.options.duplicates == DuplicatePolicy::Reject {
            let mut batch: HashSet<&ServiceKey> = HashSet::with_capacity(bindings.len());
            for (key, _) in &bindings {
                let taken = services
                    .get(&key.service())
                    .and_then(|entry| entry.position(key.key()))
                    .is_some();
                if taken || !batch.insert(key) {
                    return Err(TrellisError::AlreadyRegistered { key: key.clone() });
                }
            }
        }

        for (key, binding) in bindings {
            let entry = services
                .entry(key.service())
                .or_insert_with(|| ServiceEntry::new(key.service()));

            if let Some(index) = entry.position(key.key()) {
                let replaced = entry.registrations.remove(index);
                debug!(key = %key, replaced = replaced.binding.kind(), "Replacing binding");
            }

            debug!(key = %key, kind = binding.kind(), "Registered binding");
            entry.registrations.push(Registration {
                key: key.shared_key().cloned(),
                binding,
            });
        }
        Ok(())
    }

    fn implementations_of(&self, service: ServiceType) -> Vec<ImplType> {
        self.catalog.implementations_of(service).to_vec()
    }

    fn dispose(&self) {
        debug!(cached = self.catalog.cached_services(), "Disposing registrar caches");
        self.catalog.clear_cache();
    }
}

impl ServiceResolver for ServiceRegistry {
    fn resolve_erased(&self, key: &ServiceKey) -> Result<ErasedService> {
        trace!(key = %key, "Resolving");
        Resolution::new(self).resolve_erased(key)
    }

    fn resolve_all_erased(&self, service: ServiceType) -> Result<Vec<ErasedService>> {
        trace!(service = %service, "Resolving all");
        Resolution::new(self).resolve_all_erased(service)
    }

    fn can_resolve(&self, key: &ServiceKey) -> bool {
        self.binding(key).is_some()
    }
}

// ============================================================
// Resolution (one top-level resolve call)
// ============================================================

/// Resolver handed to component constructors.
///
/// Lives for one top-level resolve and remembers which type bindings
/// are mid-construction, so re-entering one is reported as a cycle
/// instead of recursing forever.
struct Resolution<'a> {
    registry: &'a ServiceRegistry,
    in_progress: Mutex<Vec<ServiceKey>>,
}

impl<'a> Resolution<'a> {
    fn new(registry: &'a ServiceRegistry) -> Self {
        Self {
            registry,
            in_progress: Mutex::new(Vec::new()),
        }
    }

    fn realize(&self, key: &ServiceKey, binding: &Binding) -> Result<ErasedService> {
        if !binding.is_type() {
            return binding.realize(key, self);
        }

        {
            let mut in_progress = self.in_progress.lock();
            if let Some(start) = in_progress.iter().position(|k| k == key) {
                let mut chain = in_progress[start..].to_vec();
                chain.push(key.clone());
                warn!(cycle = ?chain, "Circular dependency while resolving");
                return Err(TrellisError::CircularDependency(CircularDependencyError { chain }));
            }
            in_progress.push(key.clone());
        }

        let realized = binding.realize(key, self);
        self.in_progress.lock().pop();
        realized
    }
}

impl ServiceResolver for Resolution<'_> {
    fn resolve_erased(&self, key: &ServiceKey) -> Result<ErasedService> {
        let binding = self.registry.binding(key).ok_or_else(|| {
            let required_by = self.in_progress.lock().last().cloned();
            self.registry.unresolved(key, required_by)
        })?;
        self.realize(key, &binding)
    }

    fn resolve_all_erased(&self, service: ServiceType) -> Result<Vec<ErasedService>> {
        self.registry
            .bindings_of(service)
            .iter()
            .map(|(key, binding)| self.realize(key, binding))
            .collect()
    }

    fn can_resolve(&self, key: &ServiceKey) -> bool {
        self.registry.can_resolve(key)
    }
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, Provides};
    use crate::registrar::RegistrarExt;
    use crate::resolver::ResolveExt;
    use std::sync::atomic::AtomicU32;

    trait Greeter: Send + Sync + std::fmt::Debug {
        fn greet(&self) -> String;
    }

    #[derive(Debug)]
    struct English;
    #[derive(Debug)]
    struct French;

    impl Greeter for English {
        fn greet(&self) -> String {
            "hello".into()
        }
    }

    impl Greeter for French {
        fn greet(&self) -> String {
            "bonjour".into()
        }
    }

    impl Component for English {
        fn construct(_: &dyn ServiceResolver) -> Result<Self> {
            Ok(English)
        }
    }

    impl Component for French {
        fn construct(_: &dyn ServiceResolver) -> Result<Self> {
            Ok(French)
        }
    }

    crate::provides!(English => dyn Greeter);
    crate::provides!(French => dyn Greeter);

    /// Needs a greeter; falls back to English when none is bound under "fallback".
    #[derive(Debug)]
    struct Welcome {
        greeter: Arc<dyn Greeter>,
        fallback: Arc<dyn Greeter>,
    }

    impl Component for Welcome {
        fn construct(r: &dyn ServiceResolver) -> Result<Self> {
            Ok(Welcome {
                greeter: r.resolve()?,
                fallback: r
                    .try_resolve_keyed("fallback")?
                    .unwrap_or_else(|| Arc::new(English) as Arc<dyn Greeter>),
            })
        }

        fn dependencies() -> Vec<ServiceKey> {
            vec![ServiceKey::of::<dyn Greeter>()]
        }
    }

    /// Requires itself.
    #[derive(Debug)]
    struct Ouroboros;

    impl Component for Ouroboros {
        fn construct(r: &dyn ServiceResolver) -> Result<Self> {
            let _me: Arc<Ouroboros> = r.resolve()?;
            Ok(Ouroboros)
        }

        fn dependencies() -> Vec<ServiceKey> {
            vec![ServiceKey::of::<Ouroboros>()]
        }
    }

    #[derive(Debug)]
    struct Ping;
    #[derive(Debug)]
    struct Pong;

    impl Component for Ping {
        fn construct(r: &dyn ServiceResolver) -> Result<Self> {
            let _pong: Arc<Pong> = r.resolve()?;
            Ok(Ping)
        }
    }

    impl Component for Pong {
        fn construct(r: &dyn ServiceResolver) -> Result<Self> {
            let _ping: Arc<Ping> = r.resolve()?;
            Ok(Pong)
        }
    }

    fn greet(registry: &ServiceRegistry) -> String {
        registry.resolve::<dyn Greeter>().unwrap().greet()
    }

    #[test]
    fn second_unkeyed_registration_replaces_first() {
        let registry = ServiceRegistry::new();
        registry.register::<dyn Greeter, English>().unwrap();
        registry.register::<dyn Greeter, French>().unwrap();

        assert_eq!(greet(&registry), "bonjour");
        assert_eq!(registry.resolve_all::<dyn Greeter>().unwrap().len(), 1);
    }

    #[test]
    fn keyed_bindings_are_additive_and_independent() {
        let registry = ServiceRegistry::new();
        registry.register_keyed::<dyn Greeter, English>("a").unwrap();
        registry.register_keyed::<dyn Greeter, French>("b").unwrap();

        assert_eq!(registry.resolve_all::<dyn Greeter>().unwrap().len(), 2);
        assert_eq!(registry.resolve_keyed::<dyn Greeter>("a").unwrap().greet(), "hello");
        assert_eq!(registry.resolve_keyed::<dyn Greeter>("b").unwrap().greet(), "bonjour");
    }

    #[test]
    fn same_key_twice_replaces() {
        let registry = ServiceRegistry::new();
        registry.register_keyed::<dyn Greeter, English>("a").unwrap();
        registry.register_keyed::<dyn Greeter, French>("a").unwrap();

        assert_eq!(registry.resolve_keyed::<dyn Greeter>("a").unwrap().greet(), "bonjour");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn resolve_all_keeps_registration_order() {
        let registry = ServiceRegistry::new();
        registry.register_keyed::<dyn Greeter, French>("fr").unwrap();
        registry.register::<dyn Greeter, English>().unwrap();
        registry.register_keyed::<dyn Greeter, English>("en").unwrap();

        let all: Vec<String> = registry
            .resolve_all::<dyn Greeter>()
            .unwrap()
            .iter()
            .map(|g| g.greet())
            .collect();
        assert_eq!(all, ["bonjour", "hello", "hello"]);
    }

    #[test]
    fn replaced_binding_moves_to_end() {
        let registry = ServiceRegistry::new();
        registry.register::<dyn Greeter, English>().unwrap();
        registry.register_keyed::<dyn Greeter, English>("en").unwrap();
        registry.register::<dyn Greeter, French>().unwrap();

        let all: Vec<String> = registry
            .resolve_all::<dyn Greeter>()
            .unwrap()
            .iter()
            .map(|g| g.greet())
            .collect();
        assert_eq!(all, ["hello", "bonjour"]);
    }

    #[test]
    fn unbound_resolve_fails_but_resolve_all_is_empty() {
        let registry = ServiceRegistry::new();

        let err = registry.resolve::<dyn Greeter>().unwrap_err();
        assert!(err.is_unresolved());
        assert!(registry.resolve_all::<dyn Greeter>().unwrap().is_empty());
    }

    #[test]
    fn keyed_only_service_has_no_default() {
        let registry = ServiceRegistry::new();
        registry.register_keyed::<dyn Greeter, English>("a").unwrap();

        assert!(registry.resolve::<dyn Greeter>().unwrap_err().is_unresolved());
        assert!(registry.resolve_keyed::<dyn Greeter>("z").unwrap_err().is_unresolved());
    }

    #[test]
    fn reject_policy_refuses_duplicates() {
        let registry =
            ServiceRegistry::with_options(RegistryOptions::default().duplicates(DuplicatePolicy::Reject));
        registry.register::<dyn Greeter, English>().unwrap();
        registry.register_keyed::<dyn Greeter, English>("a").unwrap();

        let err = registry.register::<dyn Greeter, French>().unwrap_err();
        assert!(matches!(err, TrellisError::AlreadyRegistered { .. }));
        let err = registry.register_keyed::<dyn Greeter, French>("a").unwrap_err();
        assert!(matches!(err, TrellisError::AlreadyRegistered { .. }));

        assert_eq!(greet(&registry), "hello");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn instance_binding_returns_same_value() {
        let registry = ServiceRegistry::new();
        let english: Arc<dyn Greeter> = Arc::new(English);
        registry.register_instance(english.clone()).unwrap();

        let a = registry.resolve::<dyn Greeter>().unwrap();
        let b = registry.resolve::<dyn Greeter>().unwrap();
        assert!(Arc::ptr_eq(&a, &english));
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn factory_invoked_per_resolve() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = ServiceRegistry::new();
        registry
            .register_factory({
                let calls = calls.clone();
                move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Arc::new(French) as Arc<dyn Greeter>
                }
            })
            .unwrap();

        greet(&registry);
        greet(&registry);
        greet(&registry);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn singleton_invoked_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let registry = ServiceRegistry::new();
        registry
            .register_singleton({
                let calls = calls.clone();
                move || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Arc::new(French) as Arc<dyn Greeter>
                }
            })
            .unwrap();

        let a = registry.resolve::<dyn Greeter>().unwrap();
        let b = registry.resolve::<dyn Greeter>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn type_binding_resolves_constructor_parameters() {
        let registry = ServiceRegistry::new();
        registry.register::<dyn Greeter, French>().unwrap();
        registry.register::<Welcome, Welcome>().unwrap();

        let welcome: Arc<Welcome> = registry.resolve().unwrap();
        assert_eq!(welcome.greeter.greet(), "bonjour");
        assert_eq!(welcome.fallback.greet(), "hello");
    }

    #[test]
    fn optional_parameter_uses_binding_when_present() {
        let registry = ServiceRegistry::new();
        registry.register::<dyn Greeter, English>().unwrap();
        registry.register_keyed::<dyn Greeter, French>("fallback").unwrap();
        registry.register::<Welcome, Welcome>().unwrap();

        let welcome: Arc<Welcome> = registry.resolve().unwrap();
        assert_eq!(welcome.fallback.greet(), "bonjour");
    }

    #[test]
    fn missing_constructor_parameter_is_unresolved() {
        let registry = ServiceRegistry::new();
        registry.register::<Welcome, Welcome>().unwrap();

        match registry.resolve::<Welcome>().unwrap_err() {
            TrellisError::UnresolvedService(err) => {
                assert_eq!(err.requested, ServiceKey::of::<dyn Greeter>());
                assert_eq!(err.required_by, Some(ServiceKey::of::<Welcome>()));
            }
            other => panic!("Expected UnresolvedService, got: {other:?}"),
        }
    }

    #[test]
    fn self_reference_is_circular() {
        let registry = ServiceRegistry::new();
        registry.register::<Ouroboros, Ouroboros>().unwrap();

        match registry.resolve::<Ouroboros>().unwrap_err() {
            TrellisError::CircularDependency(err) => {
                assert_eq!(err.chain, vec![ServiceKey::of::<Ouroboros>(); 2]);
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }
    }

    #[test]
    fn transitive_cycle_is_circular() {
        let registry = ServiceRegistry::new();
        registry.register::<Ping, Ping>().unwrap();
        registry.register::<Pong, Pong>().unwrap();

        match registry.resolve::<Ping>().unwrap_err() {
            TrellisError::CircularDependency(err) => {
                assert_eq!(
                    err.chain,
                    vec![ServiceKey::of::<Ping>(), ServiceKey::of::<Pong>(), ServiceKey::of::<Ping>()]
                );
            }
            other => panic!("Expected CircularDependency, got: {other:?}"),
        }

        // A failed resolution leaves nothing behind for the next call.
        assert!(matches!(
            registry.resolve::<Pong>(),
            Err(TrellisError::CircularDependency(_))
        ));
    }

    #[test]
    fn runtime_token_registration_checks_assignability() {
        let registry = ServiceRegistry::new();

        let err = registry.register_type::<dyn Greeter>(&ImplType::of::<English>()).unwrap_err();
        assert!(matches!(err, TrellisError::InvalidBinding(_)));
        assert!(registry.is_empty());

        let english = ImplType::builder::<English>().implements::<dyn Greeter>().build();
        registry.register_type::<dyn Greeter>(&english).unwrap();
        assert_eq!(greet(&registry), "hello");
    }

    #[test]
    fn runtime_service_token_registration() {
        let registry = ServiceRegistry::new();
        let french = ImplType::builder::<French>().implements::<dyn Greeter>().build();

        registry.register_service(ServiceType::of::<dyn Greeter>(), &french).unwrap();
        registry
            .register_service_keyed(ServiceType::of::<dyn Greeter>(), &french, "fr")
            .unwrap();
        assert_eq!(registry.resolve_all::<dyn Greeter>().unwrap().len(), 2);

        let err = registry
            .register_service(ServiceType::of::<Welcome>(), &french)
            .unwrap_err();
        assert!(matches!(err, TrellisError::InvalidBinding(_)));
    }

    #[test]
    fn named_registration_binds_the_implementation_itself() {
        let registry = ServiceRegistry::new();
        registry.register_named("primary", &ImplType::of::<English>()).unwrap();

        let english: Arc<English> = registry.resolve_keyed("primary").unwrap();
        assert_eq!(english.greet(), "hello");
        assert!(registry.resolve::<English>().unwrap_err().is_unresolved());
    }

    #[test]
    fn register_all_registers_each_implementation() {
        let catalog = ImplCatalog::explicit_only();
        catalog.add::<dyn Greeter, English>();
        catalog.add::<dyn Greeter, French>();
        let registry = ServiceRegistry::new().with_catalog(catalog);

        assert_eq!(registry.register_all::<dyn Greeter>().unwrap(), 2);
        let mut all: Vec<String> = registry
            .resolve_all::<dyn Greeter>()
            .unwrap()
            .iter()
            .map(|g| g.greet())
            .collect();
        all.sort();
        assert_eq!(all, ["bonjour", "hello"]);

        // Self-keyed, so running it again replaces rather than duplicates.
        registry.register_all::<dyn Greeter>().unwrap();
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn register_all_is_all_or_nothing_under_reject() {
        let catalog = ImplCatalog::explicit_only();
        catalog.add::<dyn Greeter, English>();
        catalog.add::<dyn Greeter, French>();
        let registry = ServiceRegistry::with_options(RegistryOptions::default().duplicates(DuplicatePolicy::Reject))
            .with_catalog(catalog);
        registry
            .register_keyed::<dyn Greeter, French>(std::any::type_name::<French>())
            .unwrap();

        let err = registry.register_all::<dyn Greeter>().unwrap_err();
        assert!(matches!(err, TrellisError::AlreadyRegistered { .. }));
        assert_eq!(registry.len(), 1);
        assert!(
            !registry.can_resolve(&ServiceKey::keyed::<dyn Greeter>(std::any::type_name::<English>()))
        );
    }

    #[test]
    fn reject_fails_duplicates_within_one_batch() {
        let registry =
            ServiceRegistry::with_options(RegistryOptions::default().duplicates(DuplicatePolicy::Reject));
        let key = ServiceKey::keyed::<dyn Greeter>("twice");

        let err = registry
            .add_bindings(vec![
                (key.clone(), Binding::component::<dyn Greeter, English>()),
                (key, Binding::component::<dyn Greeter, French>()),
            ])
            .unwrap_err();
        assert!(matches!(err, TrellisError::AlreadyRegistered { .. }));
        assert!(registry.is_empty());
    }

    #[test]
    fn register_all_without_implementations_is_noop() {
        let registry = ServiceRegistry::new().with_catalog(ImplCatalog::explicit_only());
        assert_eq!(registry.register_all::<dyn Greeter>().unwrap(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn dispose_clears_scan_cache_but_keeps_bindings() {
        let catalog = ImplCatalog::explicit_only();
        catalog.add::<dyn Greeter, English>();
        let registry = ServiceRegistry::new().with_catalog(catalog);
        registry.register_all::<dyn Greeter>().unwrap();
        assert_eq!(registry.catalog().cached_services(), 1);

        registry.dispose();
        assert_eq!(registry.catalog().cached_services(), 0);
        assert_eq!(registry.resolve_all::<dyn Greeter>().unwrap().len(), 1);
    }

    #[test]
    fn freeze_blocks_registration() {
        let registry = ServiceRegistry::new();
        registry.register::<dyn Greeter, English>().unwrap();
        registry.freeze();

        let err = registry.register::<dyn Greeter, French>().unwrap_err();
        assert!(matches!(err, TrellisError::RegistryFrozen));
        assert_eq!(greet(&registry), "hello");
    }

    #[test]
    fn shutdown_releases_instances() {
        let registry = ServiceRegistry::new();
        let english: Arc<dyn Greeter> = Arc::new(English);
        registry.register_instance(english.clone()).unwrap();
        assert_eq!(Arc::strong_count(&english), 2);

        registry.shutdown();
        assert_eq!(Arc::strong_count(&english), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn validate_reports_missing_and_cycles() {
        let registry = ServiceRegistry::new();
        registry.register::<Welcome, Welcome>().unwrap();
        assert!(matches!(
            registry.validate(),
            Err(TrellisError::UnresolvedService(_))
        ));

        registry.register::<dyn Greeter, English>().unwrap();
        assert!(registry.validate().is_ok());

        registry.register::<Ouroboros, Ouroboros>().unwrap();
        assert!(matches!(
            registry.validate(),
            Err(TrellisError::CircularDependency(_))
        ));
    }

    #[test]
    fn unresolved_error_suggests_similar_names() {
        struct GreeterCache;
        let registry = ServiceRegistry::new();
        registry.register_instance(Arc::new(GreeterCache)).unwrap();

        match registry.resolve::<dyn Greeter>().unwrap_err() {
            TrellisError::UnresolvedService(err) => {
                assert!(err.suggestions.iter().any(|s| s.contains("GreeterCache")));
            }
            other => panic!("Expected UnresolvedService, got: {other:?}"),
        }
    }

    #[test]
    fn concurrent_resolution() {
        let registry = Arc::new(ServiceRegistry::new());
        registry.register::<dyn Greeter, French>().unwrap();
        registry.register::<Welcome, Welcome>().unwrap();
        registry.freeze();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        let welcome: Arc<Welcome> = registry.resolve().unwrap();
                        assert_eq!(welcome.greeter.greet(), "bonjour");
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
    }

    #[test]
    fn options_from_json() {
        let options: RegistryOptions =
            serde_json::from_str(r#"{ "duplicates": "reject" }"#).unwrap();
        assert_eq!(options.duplicates, DuplicatePolicy::Reject);
        assert_eq!(options.suggestions, 3);
    }

    #[test]
    fn provides_is_checked_at_compile_time() {
        fn assert_provides<S: ?Sized, T: Provides<S>>() {}
        assert_provides::<dyn Greeter, English>();
        assert_provides::<English, English>();
    }
}
