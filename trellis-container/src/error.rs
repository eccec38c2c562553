//! Error types for registration, resolution and injection.
//!
//! Every error carries enough context to find the offending
//! registration without a debugger: the service key, what required it,
//! and where possible a hint.

use std::fmt;

use trellis_support::rendering::{render_chain, short_type_name};

use crate::key::{ServiceKey, ServiceType};

/// Main error type for all trellis operations.
#[derive(Debug, thiserror::Error)]
pub enum TrellisError {
    /// An implementation type was bound to a service it does not provide.
    #[error("{}", .0)]
    InvalidBinding(InvalidBindingError),

    /// A duplicate registration under [`DuplicatePolicy::Reject`](crate::registry::DuplicatePolicy).
    #[error("Service already registered: {key}\n  Hint: use DuplicatePolicy::Replace for last-write-wins registration")]
    AlreadyRegistered { key: ServiceKey },

    /// The registry was frozen and no longer accepts registrations.
    #[error("Registry is frozen. Register services during startup, before .freeze()")]
    RegistryFrozen,

    /// No binding exists for the requested service and key.
    #[error("{}", .0)]
    UnresolvedService(UnresolvedServiceError),

    /// Constructing a type binding re-entered a binding already being constructed.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),

    /// A realized value did not have the requested type.
    #[error("Type mismatch resolving {key}: expected {expected}")]
    TypeMismatch {
        key: ServiceKey,
        expected: &'static str,
    },

    /// A component constructor failed.
    #[error("Failed to construct {key}: {source}")]
    ConstructionFailed {
        key: ServiceKey,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Strict-mode injection failed for one slot of a target.
    #[error("{}", .0)]
    Injection(InjectionError),

    #[error("A registry is already installed as the process-wide locator")]
    LocatorInstalled,

    #[error("No registry installed. Call locator::install() during startup")]
    LocatorNotInstalled,
}

impl TrellisError {
    /// Wraps a foreign constructor error.
    pub fn construction(
        key: ServiceKey,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        TrellisError::ConstructionFailed { key, source: source.into() }
    }

    /// `true` for "nothing is bound" errors, the only kind callers are
    /// expected to recover from.
    pub fn is_unresolved(&self) -> bool {
        matches!(self, TrellisError::UnresolvedService(_))
    }
}

/// An implementation type is not assignable to the declared service.
#[derive(Debug)]
pub struct InvalidBindingError {
    pub service: ServiceType,
    pub implementation: ServiceType,
}

impl fmt::Display for InvalidBindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid binding: {} does not provide {}",
            self.implementation, self.service
        )?;
        write!(
            f,
            "\n  Hint: declare it with ImplType::builder::<{}>().implements::<{}>() and provides!",
            self.implementation, self.service
        )
    }
}

/// No binding was found for a service key.
#[derive(Debug)]
pub struct UnresolvedServiceError {
    /// The key that was requested.
    pub requested: ServiceKey,
    /// The binding whose constructor asked for it, if any.
    pub required_by: Option<ServiceKey>,
    /// Registered type names that look similar.
    pub suggestions: Vec<&'static str>,
}

impl fmt::Display for UnresolvedServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not registered: {}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n    - {suggestion}")?;
            }
        }

        Ok(())
    }
}

/// A cycle among type bindings.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// The keys forming the cycle, first and last equal.
    pub chain: Vec<ServiceKey>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.chain.iter().map(ToString::to_string).collect();
        write!(f, "Circular dependency detected:\n  {}", render_chain(&names))?;
        write!(
            f,
            "\n  Hint: break the cycle with a factory binding or an optional slot"
        )
    }
}

/// Injection into one slot of a target failed.
#[derive(Debug)]
pub struct InjectionError {
    /// Type name of the object being injected.
    pub target: &'static str,
    /// Name of the slot.
    pub slot: &'static str,
    pub source: Box<TrellisError>,
}

impl fmt::Display for InjectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Cannot inject {}.{}: {}",
            short_type_name(self.target),
            self.slot,
            self.source
        )
    }
}

/// Convenient Result type for trellis operations.
pub type Result<T> = std::result::Result<T, TrellisError>;
