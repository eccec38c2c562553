//! Property injection into objects the registry did not create.
//!
//! A host framework builds some objects itself (filters, handlers) and
//! only hands them over afterwards. Such an object opts in by
//! implementing [`Injectable`], listing its slots explicitly:
//!
//! ```rust,ignore
//! #[derive(Injectable)]
//! struct AuditFilter {
//!     #[inject]
//!     log: Option<Arc<dyn AuditLog>>,
//!     #[inject(key = "audit")]
//!     clock: Option<Arc<dyn Clock>>,
//!     label: String,
//! }
//!
//! injector.inject(&mut filter)?;
//! ```

use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, instrument, trace};

use crate::binding::ErasedService;
use crate::error::{InjectionError, Result, TrellisError};
use crate::key::ServiceKey;
use crate::resolver::ServiceResolver;

/// Storage for one injectable dependency.
///
/// Implemented for `Option<Arc<S>>`; `None` means unset.
pub trait SlotValue {
    fn is_set(&self) -> bool;

    /// Stores `value` if it holds the slot's type. Returns `false`
    /// otherwise and leaves the slot as it was.
    fn fill(&mut self, value: &ErasedService) -> bool;
}

impl<S> SlotValue for Option<Arc<S>>
where
    S: ?Sized + Send + Sync + 'static,
{
    fn is_set(&self) -> bool {
        self.is_some()
    }

    fn fill(&mut self, value: &ErasedService) -> bool {
        match value.downcast_ref::<Arc<S>>() {
            Some(service) => {
                *self = Some(Arc::clone(service));
                true
            }
            None => false,
        }
    }
}

/// One named dependency slot of an [`Injectable`] target.
pub struct InjectionSlot<'a> {
    name: &'static str,
    key: ServiceKey,
    value: &'a mut dyn SlotValue,
}

impl<'a> InjectionSlot<'a> {
    /// A slot filled from the default binding of `S`.
    pub fn new<S>(name: &'static str, value: &'a mut Option<Arc<S>>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        Self {
            name,
            key: ServiceKey::of::<S>(),
            value,
        }
    }

    /// A slot filled from the binding of `S` under `key`.
    pub fn keyed<S>(name: &'static str, key: &str, value: &'a mut Option<Arc<S>>) -> Self
    where
        S: ?Sized + Send + Sync + 'static,
    {
        Self {
            name,
            key: ServiceKey::keyed::<S>(key),
            value,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn key(&self) -> &ServiceKey {
        &self.key
    }

    pub fn is_set(&self) -> bool {
        self.value.is_set()
    }
}

/// An object that exposes its dependency slots for injection.
///
/// Usually derived with `#[derive(Injectable)]`.
pub trait Injectable {
    /// Every injectable slot, set or not.
    fn injection_slots(&mut self) -> Vec<InjectionSlot<'_>>;

    /// Type name used in [`InjectionError`].
    fn target_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// What to do when a slot cannot be filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionMode {
    /// Unresolved slots stay unset. Cycles, failed constructors and type
    /// mismatches still fail: those are configuration bugs, not
    /// optional dependencies.
    #[default]
    Permissive,
    /// Any slot that cannot be filled fails the injection.
    Strict,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct InjectorOptions {
    pub mode: InjectionMode,
}

impl InjectorOptions {
    pub fn mode(mut self, mode: InjectionMode) -> Self {
        self.mode = mode;
        self
    }
}

/// Fills the slots of existing objects.
pub trait ServiceInjector: Send + Sync {
    /// Resolves and assigns every unset slot of `target`.
    ///
    /// # Errors
    /// [`TrellisError::Injection`] naming the target and slot, subject to
    /// the injector's [`InjectionMode`].
    fn inject(&self, target: &mut dyn Injectable) -> Result<()>;
}

/// [`ServiceInjector`] backed by any [`ServiceResolver`].
pub struct DependencyInjector {
    resolver: Arc<dyn ServiceResolver>,
    options: InjectorOptions,
}

impl DependencyInjector {
    /// A permissive injector.
    pub fn new(resolver: Arc<dyn ServiceResolver>) -> Self {
        Self::with_options(resolver, InjectorOptions::default())
    }

    pub fn with_options(resolver: Arc<dyn ServiceResolver>, options: InjectorOptions) -> Self {
        Self { resolver, options }
    }

    /// A strict injector.
    pub fn strict(resolver: Arc<dyn ServiceResolver>) -> Self {
        Self::with_options(resolver, InjectorOptions::default().mode(InjectionMode::Strict))
    }

    pub fn mode(&self) -> InjectionMode {
        self.options.mode
    }
}

impl ServiceInjector for DependencyInjector {
    #[instrument(skip_all, fields(object = target.target_name()))]
    fn inject(&self, target: &mut dyn Injectable) -> Result<()> {
        let object = target.target_name();
        let mut filled = 0usize;

        for slot in target.injection_slots() {
            if slot.is_set() {
                trace!(slot = slot.name, "Slot already set");
                continue;
            }

            let failure = match self.resolver.resolve_erased(&slot.key) {
                Ok(value) => {
                    if slot.value.fill(&value) {
                        filled += 1;
                        continue;
                    }
                    TrellisError::TypeMismatch {
                        key: slot.key.clone(),
                        expected: slot.key.type_name(),
                    }
                }
                // Only the slot's own service may be missing. A missing
                // dependency of its implementation is a broken binding.
                Err(TrellisError::UnresolvedService(missing))
                    if missing.requested == slot.key && self.options.mode == InjectionMode::Permissive =>
                {
                    debug!(slot = slot.name, key = %slot.key, "Leaving unresolved slot unset");
                    continue;
                }
                Err(err) => err,
            };

            return Err(TrellisError::Injection(InjectionError {
                target: object,
                slot: slot.name,
                source: Box::new(failure),
            }));
        }

        trace!(filled, "Injection complete");
        Ok(())
    }
}

impl std::fmt::Debug for DependencyInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyInjector")
            .field("mode", &self.options.mode)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::registrar::RegistrarExt;
    use crate::registry::ServiceRegistry;

    trait Clock: Send + Sync {
        fn now(&self) -> u64;
    }

    trait Ledger: Send + Sync {}

    struct Fixed(u64);

    impl Clock for Fixed {
        fn now(&self) -> u64 {
            self.0
        }
    }

    #[derive(Default)]
    struct Report {
        clock: Option<Arc<dyn Clock>>,
        backup: Option<Arc<dyn Clock>>,
        ledger: Option<Arc<dyn Ledger>>,
    }

    impl Injectable for Report {
        fn injection_slots(&mut self) -> Vec<InjectionSlot<'_>> {
            vec![
                InjectionSlot::new("clock", &mut self.clock),
                InjectionSlot::keyed("backup", "backup", &mut self.backup),
                InjectionSlot::new("ledger", &mut self.ledger),
            ]
        }
    }

    struct Plain;

    impl Injectable for Plain {
        fn injection_slots(&mut self) -> Vec<InjectionSlot<'_>> {
            Vec::new()
        }
    }

    struct Loop;

    impl Component for Loop {
        fn construct(r: &dyn ServiceResolver) -> Result<Self> {
            use crate::resolver::ResolveExt;
            let _again: Arc<Loop> = r.resolve()?;
            Ok(Loop)
        }
    }

    trait Archive: Send + Sync {}

    /// Needs a ledger, which the test registry never binds.
    struct DiskArchive;

    impl Component for DiskArchive {
        fn construct(r: &dyn ServiceResolver) -> Result<Self> {
            use crate::resolver::ResolveExt;
            let _ledger: Arc<dyn Ledger> = r.resolve()?;
            Ok(DiskArchive)
        }
    }

    impl Archive for DiskArchive {}

    crate::provides!(DiskArchive => dyn Archive);

    #[derive(Default)]
    struct NeedsArchive {
        archive: Option<Arc<dyn Archive>>,
    }

    impl Injectable for NeedsArchive {
        fn injection_slots(&mut self) -> Vec<InjectionSlot<'_>> {
            vec![InjectionSlot::new("archive", &mut self.archive)]
        }
    }

    #[derive(Default)]
    struct NeedsLoop {
        looped: Option<Arc<Loop>>,
    }

    impl Injectable for NeedsLoop {
        fn injection_slots(&mut self) -> Vec<InjectionSlot<'_>> {
            vec![InjectionSlot::new("looped", &mut self.looped)]
        }
    }

    fn registry() -> Arc<ServiceRegistry> {
        let registry = ServiceRegistry::new();
        registry.register_instance::<dyn Clock>(Arc::new(Fixed(1))).unwrap();
        registry
            .register_instance_keyed::<dyn Clock>("backup", Arc::new(Fixed(2)))
            .unwrap();
        Arc::new(registry)
    }

    #[test]
    fn fills_unset_slots() {
        let injector = DependencyInjector::new(registry());
        let mut report = Report::default();

        injector.inject(&mut report).unwrap();
        assert_eq!(report.clock.unwrap().now(), 1);
        assert_eq!(report.backup.unwrap().now(), 2);
    }

    #[test]
    fn no_slots_is_noop() {
        let injector = DependencyInjector::strict(registry());
        assert!(injector.inject(&mut Plain).is_ok());
    }

    #[test]
    fn set_slots_are_left_alone() {
        let injector = DependencyInjector::new(registry());
        let mine: Arc<dyn Clock> = Arc::new(Fixed(99));
        let mut report = Report {
            clock: Some(mine.clone()),
            ..Report::default()
        };

        injector.inject(&mut report).unwrap();
        assert!(Arc::ptr_eq(report.clock.as_ref().unwrap(), &mine));
    }

    #[test]
    fn permissive_leaves_unresolved_slot_unset() {
        let injector = DependencyInjector::new(registry());
        let mut report = Report::default();

        injector.inject(&mut report).unwrap();
        assert!(report.ledger.is_none());
        assert!(report.clock.is_some());
    }

    #[test]
    fn strict_fails_on_unresolved_slot() {
        let injector = DependencyInjector::strict(registry());
        let mut report = Report::default();

        match injector.inject(&mut report).unwrap_err() {
            TrellisError::Injection(err) => {
                assert!(err.target.ends_with("Report"));
                assert_eq!(err.slot, "ledger");
                assert!(err.source.is_unresolved());
            }
            other => panic!("Expected Injection, got: {other:?}"),
        }
        assert!(report.ledger.is_none());
    }

    #[test]
    fn permissive_still_fails_on_cycles() {
        let registry = ServiceRegistry::new();
        registry.register::<Loop, Loop>().unwrap();
        let injector = DependencyInjector::new(Arc::new(registry));

        match injector.inject(&mut NeedsLoop::default()).unwrap_err() {
            TrellisError::Injection(err) => {
                assert_eq!(err.slot, "looped");
                assert!(matches!(*err.source, TrellisError::CircularDependency(_)));
            }
            other => panic!("Expected Injection, got: {other:?}"),
        }
    }

    #[test]
    fn permissive_fails_when_bound_slot_misses_a_dependency() {
        let registry = registry();
        registry.register::<dyn Archive, DiskArchive>().unwrap();
        let injector = DependencyInjector::new(registry);
        let mut target = NeedsArchive::default();

        match injector.inject(&mut target).unwrap_err() {
            TrellisError::Injection(err) => {
                assert_eq!(err.slot, "archive");
                match *err.source {
                    TrellisError::UnresolvedService(missing) => {
                        assert_eq!(missing.requested, ServiceKey::of::<dyn Ledger>());
                    }
                    other => panic!("Expected UnresolvedService, got: {other:?}"),
                }
            }
            other => panic!("Expected Injection, got: {other:?}"),
        }
        assert!(target.archive.is_none());
    }

    #[test]
    fn slot_value_rejects_wrong_type() {
        let mut slot: Option<Arc<dyn Clock>> = None;
        let wrong: ErasedService = Arc::new(Arc::new(5u8));
        assert!(!slot.fill(&wrong));
        assert!(slot.is_none());
    }

    #[test]
    fn options_from_json() {
        let options: InjectorOptions = serde_json::from_str(r#"{ "mode": "strict" }"#).unwrap();
        assert_eq!(options.mode, InjectionMode::Strict);
        assert_eq!(InjectorOptions::default().mode, InjectionMode::Permissive);
    }
}
