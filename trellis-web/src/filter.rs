//! Filters attached to controller actions.

use std::collections::HashMap;
use std::fmt;

use tracing::trace;
use trellis_container::Injectable;

/// Identifies the action a request is routed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActionDescriptor {
    controller: String,
    action: String,
}

impl ActionDescriptor {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }

    pub fn controller(&self) -> &str {
        &self.controller
    }

    pub fn action(&self) -> &str {
        &self.action
    }
}

impl fmt::Display for ActionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.controller, self.action)
    }
}

/// Per-request state the filters and the action share.
#[derive(Debug, Clone)]
pub struct ActionContext {
    descriptor: ActionDescriptor,
    view_data: HashMap<String, String>,
}

impl ActionContext {
    pub fn new(descriptor: ActionDescriptor) -> Self {
        Self {
            descriptor,
            view_data: HashMap::new(),
        }
    }

    pub fn descriptor(&self) -> &ActionDescriptor {
        &self.descriptor
    }

    pub fn view_data(&self) -> &HashMap<String, String> {
        &self.view_data
    }

    pub fn view_value(&self, key: &str) -> Option<&str> {
        self.view_data.get(key).map(String::as_str)
    }

    pub fn set_view_data(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.view_data.insert(key.into(), value.into());
    }
}

/// A filter the host runs around an action.
///
/// Filters are plain objects built by the host, so their dependencies
/// arrive through [`Injectable`] slots rather than a constructor.
pub trait ActionFilter: Injectable + Send {
    fn on_action_executing(&mut self, _context: &mut ActionContext) {}

    fn on_action_executed(&mut self, _context: &mut ActionContext) {}
}

/// Where a filter was declared. Broader scopes run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FilterScope {
    Global,
    Controller,
    Action,
}

/// A filter instance plus its position in the pipeline.
pub struct Filter {
    instance: Box<dyn ActionFilter>,
    scope: FilterScope,
    order: i32,
}

impl Filter {
    pub fn new(instance: impl ActionFilter + 'static, scope: FilterScope, order: i32) -> Self {
        Self::boxed(Box::new(instance), scope, order)
    }

    pub fn boxed(instance: Box<dyn ActionFilter>, scope: FilterScope, order: i32) -> Self {
        Self { instance, scope, order }
    }

    pub fn instance(&self) -> &dyn ActionFilter {
        self.instance.as_ref()
    }

    pub fn instance_mut(&mut self) -> &mut dyn ActionFilter {
        self.instance.as_mut()
    }

    /// The instance as an injection target.
    pub fn injectable_mut(&mut self) -> &mut dyn Injectable {
        self.instance.as_mut()
    }

    pub fn scope(&self) -> FilterScope {
        self.scope
    }

    pub fn order(&self) -> i32 {
        self.order
    }

    pub fn name(&self) -> &'static str {
        self.instance.target_name()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("instance", &self.name())
            .field("scope", &self.scope)
            .field("order", &self.order)
            .finish()
    }
}

/// Runs `action` inside `filters`: executing hooks in order, then the
/// action, then executed hooks in reverse.
pub fn run_action<F>(filters: &mut [Filter], context: &mut ActionContext, action: F)
where
    F: FnOnce(&mut ActionContext),
{
    for filter in filters.iter_mut() {
        trace!(filter = filter.name(), "on_action_executing");
        filter.instance.on_action_executing(context);
    }

    action(context);

    for filter in filters.iter_mut().rev() {
        trace!(filter = filter.name(), "on_action_executed");
        filter.instance.on_action_executed(context);
    }
}
