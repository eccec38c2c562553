//! Request pipeline with injected action filters.
//!
//! Run with `RUST_LOG=trellis=trace cargo run --example filters`.

use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use trellis::prelude::*;
use trellis::web::{ActionContext, ActionDescriptor, AttributeFilterProvider, InjectingFilterProvider, run_action};
use trellis::{DependencyInjector, Result};

trait Greeter: Send + Sync {
    fn greet(&self, who: &str) -> String;
}

trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

struct EnglishGreeter;

impl Component for EnglishGreeter {
    fn construct(_: &dyn ServiceResolver) -> Result<Self> {
        Ok(EnglishGreeter)
    }
}

impl Greeter for EnglishGreeter {
    fn greet(&self, who: &str) -> String {
        format!("Hello, {who}")
    }
}

provides!(EnglishGreeter => dyn Greeter);

struct FrozenClock;

impl Clock for FrozenClock {
    fn now(&self) -> u64 {
        1_700_000_000
    }
}

#[derive(Default, Injectable)]
struct GreetingFilter {
    #[inject]
    greeter: Option<Arc<dyn Greeter>>,
}

impl ActionFilter for GreetingFilter {
    fn on_action_executing(&mut self, context: &mut ActionContext) {
        if let Some(greeter) = &self.greeter {
            let message = greeter.greet(context.descriptor().controller());
            context.set_view_data("message", message);
        }
    }
}

#[derive(Default, Injectable)]
struct TimingFilter {
    #[inject(key = "request")]
    clock: Option<Arc<dyn Clock>>,
}

impl ActionFilter for TimingFilter {
    fn on_action_executed(&mut self, context: &mut ActionContext) {
        if let Some(clock) = &self.clock {
            context.set_view_data("served_at", clock.now().to_string());
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trellis=debug")))
        .init();

    let registry = ServiceRegistry::new();
    registry.register::<dyn Greeter, EnglishGreeter>()?;
    registry.register_instance_keyed::<dyn Clock>("request", Arc::new(FrozenClock))?;
    registry.validate()?;
    registry.freeze();
    let registry = Arc::new(registry);

    let declared = AttributeFilterProvider::new();
    declared
        .add_global(0, TimingFilter::default)
        .add_for_controller("Home", 0, GreetingFilter::default);

    let provider = InjectingFilterProvider::new(declared, Arc::new(DependencyInjector::new(registry.clone())));

    for action in [ActionDescriptor::new("Home", "Index"), ActionDescriptor::new("Admin", "Index")] {
        let mut filters = provider.filters(&action)?;
        let mut context = ActionContext::new(action);
        run_action(&mut filters, &mut context, |ctx| {
            info!(action = %ctx.descriptor(), "Executing action");
        });
        info!(action = %context.descriptor(), view_data = ?context.view_data(), "Request complete");
    }

    registry.shutdown();
    Ok(())
}
