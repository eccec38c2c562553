//! Host-framework filter model and the injecting filter adapter.
//!
//! The host discovers [`Filter`]s for an action through a
//! [`FilterProvider`]. Wrapping that provider in an
//! [`InjectingFilterProvider`] fills each filter's slots from the
//! container before the host runs it.

pub mod filter;
pub mod injecting;
pub mod provider;

pub use filter::{ActionContext, ActionDescriptor, ActionFilter, Filter, FilterScope, run_action};
pub use injecting::InjectingFilterProvider;
pub use provider::{AttributeFilterProvider, FilterProvider};
