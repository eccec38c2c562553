//! Service modules: groups of related registrations.
//!
//! ```rust,ignore
//! struct MailModule;
//!
//! impl ServiceModule for MailModule {
//!     fn register(&self, registrar: &dyn ServiceRegistrar) -> Result<()> {
//!         registrar.register::<dyn Mailer, SmtpMailer>()?;
//!         registrar.register_keyed::<dyn Mailer, LogMailer>("debug")?;
//!         Ok(())
//!     }
//! }
//!
//! registry.add_module(&MailModule)?;
//! registry.add_module(&BillingModule)?;
//! ```

use crate::error::Result;
use crate::registrar::ServiceRegistrar;

/// A unit of startup registration.
///
/// Modules only see the [`ServiceRegistrar`] contract, so the same
/// module works against any container, and against a recording
/// registrar in tests.
pub trait ServiceModule: Send + Sync {
    /// Registers this module's services. Called once at startup.
    fn register(&self, registrar: &dyn ServiceRegistrar) -> Result<()>;

    /// Human-readable name for logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}
