//! # Trellis: dependency injection with a filter adapter
//!
//! Register components against the services they provide, resolve them
//! by type or key, and inject them into objects a host framework built
//! on its own, such as action filters.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trellis::prelude::*;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> String;
//! }
//!
//! struct Hello;
//!
//! impl Component for Hello {
//!     fn construct(_: &dyn ServiceResolver) -> trellis::Result<Self> {
//!         Ok(Hello)
//!     }
//! }
//!
//! impl Greeter for Hello {
//!     fn greet(&self) -> String {
//!         "hello".into()
//!     }
//! }
//!
//! provides!(Hello => dyn Greeter);
//!
//! let registry = ServiceRegistry::new();
//! registry.register::<dyn Greeter, Hello>()?;
//! let greeter: Arc<dyn Greeter> = registry.resolve()?;
//! ```

pub use trellis_container::*;
pub use trellis_macros::*;
pub use trellis_support::*;

pub use trellis_web as web;

pub mod prelude {
    pub use trellis_container::{
        Component, Injectable, InjectionSlot, Provides, RegistrarExt, ResolveExt, ServiceInjector,
        ServiceModule, ServiceRegistrar, ServiceRegistry, ServiceResolver, provides, register_plugin,
    };
    pub use trellis_macros::Injectable;
    pub use trellis_web::{ActionFilter, FilterProvider};
}
