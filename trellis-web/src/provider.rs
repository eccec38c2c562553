//! Where the host gets its filters from.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, trace};
use trellis_container::Result;

use crate::filter::{ActionDescriptor, ActionFilter, Filter, FilterScope};

/// Produces the ordered filters for one action.
///
/// Called once per request; every call returns fresh instances.
pub trait FilterProvider: Send + Sync {
    fn filters(&self, action: &ActionDescriptor) -> Result<Vec<Filter>>;
}

type FilterFactory = Arc<dyn Fn() -> Box<dyn ActionFilter> + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Global,
    Controller(String),
    Action { controller: String, action: String },
}

impl Target {
    fn scope(&self) -> FilterScope {
        match self {
            Target::Global => FilterScope::Global,
            Target::Controller(_) => FilterScope::Controller,
            Target::Action { .. } => FilterScope::Action,
        }
    }

    fn matches(&self, descriptor: &ActionDescriptor) -> bool {
        match self {
            Target::Global => true,
            Target::Controller(controller) => controller == descriptor.controller(),
            Target::Action { controller, action } => {
                controller == descriptor.controller() && action == descriptor.action()
            }
        }
    }
}

struct Declaration {
    target: Target,
    order: i32,
    factory: FilterFactory,
}

/// Filters declared against controllers and actions up front, the way
/// attributes on a controller class would be.
///
/// ```rust,ignore
/// let provider = AttributeFilterProvider::new();
/// provider.add_global(0, || RequestLog::default());
/// provider.add_for_action("Home", "Index", 10, || Greeting::default());
/// ```
#[derive(Default)]
pub struct AttributeFilterProvider {
    declarations: RwLock<Vec<Declaration>>,
}

impl AttributeFilterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a filter that runs for every action.
    pub fn add_global<F, M>(&self, order: i32, make: M) -> &Self
    where
        F: ActionFilter + 'static,
        M: Fn() -> F + Send + Sync + 'static,
    {
        self.declare(Target::Global, order, make)
    }

    /// Declares a filter for every action of `controller`.
    pub fn add_for_controller<F, M>(&self, controller: impl Into<String>, order: i32, make: M) -> &Self
    where
        F: ActionFilter + 'static,
        M: Fn() -> F + Send + Sync + 'static,
    {
        self.declare(Target::Controller(controller.into()), order, make)
    }

    /// Declares a filter for one action.
    pub fn add_for_action<F, M>(
        &self,
        controller: impl Into<String>,
        action: impl Into<String>,
        order: i32,
        make: M,
    ) -> &Self
    where
        F: ActionFilter + 'static,
        M: Fn() -> F + Send + Sync + 'static,
    {
        let target = Target::Action {
            controller: controller.into(),
            action: action.into(),
        };
        self.declare(target, order, make)
    }

    pub fn len(&self) -> usize {
        self.declarations.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.read().is_empty()
    }

    fn declare<F, M>(&self, target: Target, order: i32, make: M) -> &Self
    where
        F: ActionFilter + 'static,
        M: Fn() -> F + Send + Sync + 'static,
    {
        debug!(filter = std::any::type_name::<F>(), ?target, order, "Declaring filter");
        let factory: FilterFactory = Arc::new(move || {
            let filter: Box<dyn ActionFilter> = Box::new(make());
            filter
        });
        self.declarations.write().push(Declaration { target, order, factory });
        self
    }
}

impl FilterProvider for AttributeFilterProvider {
    fn filters(&self, action: &ActionDescriptor) -> Result<Vec<Filter>> {
        let matching: Vec<(FilterScope, i32, FilterFactory)> = self
            .declarations
            .read()
            .iter()
            .filter(|d| d.target.matches(action))
            .map(|d| (d.target.scope(), d.order, Arc::clone(&d.factory)))
            .collect();

        let mut filters: Vec<Filter> = matching
            .into_iter()
            .map(|(scope, order, factory)| Filter::boxed(factory(), scope, order))
            .collect();
        filters.sort_by_key(|f| (f.scope(), f.order()));

        trace!(%action, count = filters.len(), "Filters instantiated");
        Ok(filters)
    }
}

impl std::fmt::Debug for AttributeFilterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AttributeFilterProvider")
            .field("declarations", &self.len())
            .finish()
    }
}
