//! Core container for Trellis DI.
//!
//! Components are registered against the services they provide, then
//! resolved, enumerated, or injected into objects built elsewhere.

pub mod binding;
pub mod catalog;
pub mod component;
pub mod error;
pub(crate) mod graph;
pub mod injector;
pub mod key;
pub mod locator;
pub mod module;
pub mod registrar;
pub mod registry;
pub mod resolver;

pub use binding::{Binding, ErasedService};
pub use catalog::{ImplCatalog, PluginEntry};
pub use component::{Component, ImplType, ImplTypeBuilder, Provides};
pub use error::{Result, TrellisError};
pub use injector::{
    DependencyInjector, Injectable, InjectionMode, InjectionSlot, InjectorOptions,
    ServiceInjector, SlotValue,
};
pub use key::{ServiceKey, ServiceType};
pub use module::ServiceModule;
pub use registrar::{RegistrarExt, ServiceRegistrar};
pub use registry::{DuplicatePolicy, RegistryOptions, ServiceRegistry};
pub use resolver::{ResolveExt, ServiceResolver};

#[doc(hidden)]
pub mod __private {
    pub use inventory;
}

pub mod prelude {
    pub use crate::component::{Component, Provides};
    pub use crate::injector::{Injectable, InjectionSlot, ServiceInjector};
    pub use crate::module::ServiceModule;
    pub use crate::registrar::{RegistrarExt, ServiceRegistrar};
    pub use crate::registry::ServiceRegistry;
    pub use crate::resolver::{ResolveExt, ServiceResolver};
    pub use crate::{provides, register_plugin};
}
