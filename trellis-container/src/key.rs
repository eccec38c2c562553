//! Service identification.
//!
//! [`ServiceType`] names a service contract by its [`TypeId`].
//! [`ServiceKey`] adds an optional string key so several bindings can
//! live under one contract.

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Identifies a service contract.
///
/// Contracts are usually trait objects, so `ServiceType::of::<dyn Mailer>()`
/// names the contract resolved as `Arc<dyn Mailer>`.
///
/// # Examples
/// ```
/// use trellis_container::key::ServiceType;
///
/// trait Mailer {}
///
/// let mailer = ServiceType::of::<dyn Mailer>();
/// assert!(mailer.type_name().contains("Mailer"));
/// assert_ne!(mailer, ServiceType::of::<String>());
/// ```
#[derive(Clone, Copy)]
pub struct ServiceType {
    type_id: TypeId,
    type_name: &'static str,
}

impl ServiceType {
    /// The service type for `S`.
    #[inline]
    pub fn of<S: ?Sized + 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            type_name: type_name::<S>(),
        }
    }

    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Human-readable type name, used in diagnostics only.
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// The unkeyed [`ServiceKey`] for this service type.
    #[inline]
    pub fn key(self) -> ServiceKey {
        ServiceKey { service: self, key: None }
    }

    /// A keyed [`ServiceKey`] for this service type.
    pub fn keyed(self, key: impl Into<Arc<str>>) -> ServiceKey {
        ServiceKey { service: self, key: Some(key.into()) }
    }
}

impl PartialEq for ServiceType {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ServiceType {}

impl Hash for ServiceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServiceType({})", self.type_name)
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name)
    }
}

/// A service type plus an optional key.
///
/// Two keys are equal when both the type and the key match, so
/// `keyed::<S>("a")`, `keyed::<S>("b")` and `of::<S>()` are three
/// distinct bindings.
///
/// ```
/// use trellis_container::key::ServiceKey;
///
/// let primary = ServiceKey::keyed::<String>("primary");
/// assert_eq!(primary.key(), Some("primary"));
/// assert_ne!(primary, ServiceKey::of::<String>());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ServiceKey {
    service: ServiceType,
    key: Option<Arc<str>>,
}

impl ServiceKey {
    /// The unkeyed key for `S`.
    #[inline]
    pub fn of<S: ?Sized + 'static>() -> Self {
        ServiceType::of::<S>().key()
    }

    /// A keyed key for `S`.
    pub fn keyed<S: ?Sized + 'static>(key: impl Into<Arc<str>>) -> Self {
        ServiceType::of::<S>().keyed(key)
    }

    #[inline]
    pub fn service(&self) -> ServiceType {
        self.service
    }

    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.service.type_name
    }

    #[inline]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    pub(crate) fn shared_key(&self) -> Option<&Arc<str>> {
        self.key.as_ref()
    }
}

impl fmt::Debug for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "ServiceKey({}, key={key:?})", self.type_name()),
            None => write!(f, "ServiceKey({})", self.type_name()),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.key() {
            Some(key) => write!(f, "{} (key={key:?})", self.type_name()),
            None => f.write_str(self.type_name()),
        }
    }
}

impl From<ServiceType> for ServiceKey {
    fn from(service: ServiceType) -> Self {
        service.key()
    }
}
