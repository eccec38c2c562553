//! Injects container services into host-built filters.

use std::sync::Arc;

use tracing::{debug, instrument};
use trellis_container::{Result, ServiceInjector};

use crate::filter::{ActionDescriptor, Filter};
use crate::provider::FilterProvider;

/// Wraps the host's [`FilterProvider`] and passes every filter it
/// produces through a [`ServiceInjector`].
///
/// The returned list has the same filters in the same order. Injection
/// errors are returned as is and nothing is retried.
///
/// ```rust,ignore
/// let injector = Arc::new(DependencyInjector::new(registry.clone()));
/// let provider = InjectingFilterProvider::new(AttributeFilterProvider::new(), injector);
/// let filters = provider.filters(&ActionDescriptor::new("Home", "Index"))?;
/// ```
pub struct InjectingFilterProvider<P> {
    inner: P,
    injector: Arc<dyn ServiceInjector>,
}

impl<P: FilterProvider> InjectingFilterProvider<P> {
    pub fn new(inner: P, injector: Arc<dyn ServiceInjector>) -> Self {
        Self { inner, injector }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }

    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P: FilterProvider> FilterProvider for InjectingFilterProvider<P> {
    #[instrument(skip_all, fields(action = %action))]
    fn filters(&self, action: &ActionDescriptor) -> Result<Vec<Filter>> {
        let mut filters = self.inner.filters(action)?;

        for filter in &mut filters {
            self.injector.inject(filter.injectable_mut())?;
        }

        debug!(count = filters.len(), "Filters injected");
        Ok(filters)
    }
}

impl<P: std::fmt::Debug> std::fmt::Debug for InjectingFilterProvider<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectingFilterProvider")
            .field("inner", &self.inner)
            .finish_non_exhaustive()
    }
}
