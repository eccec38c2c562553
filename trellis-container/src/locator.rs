//! The process-wide registry.
//!
//! A host installs one registry during startup and every request path
//! reads it through [`current`]. Teardown goes through [`shutdown`].

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::info;

use crate::error::{Result, TrellisError};
use crate::registry::ServiceRegistry;

static CURRENT: Lazy<RwLock<Option<Arc<ServiceRegistry>>>> = Lazy::new(|| RwLock::new(None));

/// Installs `registry` as the process-wide registry.
///
/// # Errors
/// [`TrellisError::LocatorInstalled`] if one is already installed.
pub fn install(registry: Arc<ServiceRegistry>) -> Result<()> {
    let mut current = CURRENT.write();
    if current.is_some() {
        return Err(TrellisError::LocatorInstalled);
    }
    info!(bindings = registry.len(), "Installed process-wide registry");
    *current = Some(registry);
    Ok(())
}

/// The installed registry.
///
/// # Errors
/// [`TrellisError::LocatorNotInstalled`] before [`install`] or after
/// [`shutdown`].
pub fn current() -> Result<Arc<ServiceRegistry>> {
    CURRENT
        .read()
        .as_ref()
        .cloned()
        .ok_or(TrellisError::LocatorNotInstalled)
}

pub fn is_installed() -> bool {
    CURRENT.read().is_some()
}

/// Uninstalls the registry and shuts it down.
///
/// Returns the registry that was installed, if any.
pub fn shutdown() -> Option<Arc<ServiceRegistry>> {
    let registry = CURRENT.write().take()?;
    registry.shutdown();
    Some(registry)
}
