//! Command implementations for shop-notify.
//!
//! Every command returns the text to print, formatted for the requested
//! output format.

mod emit;
mod records;
mod registry;
mod script;

pub use emit::{emit, parse_var};
pub use records::{log_entries, notifications, outbox};
pub use registry::{completions, events, registry};
pub use script::script;

use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, EngineSettings};
use crate::error::NotifyError;
use crate::notify::{NotifyStore, Registry, Runner, ScriptStore, Services};

/// Everything a command needs: providers, storage and settings.
pub struct Engine {
    /// Provider registry with the built-in providers
    pub registry: Arc<Registry>,
    /// Database-backed store
    pub store: Arc<NotifyStore>,
    /// Settings handed to every run
    pub settings: EngineSettings,
}

impl Engine {
    /// Open the engine over the database at `db`, or the default one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(db: Option<&Path>, config: &Config) -> Result<Self, NotifyError> {
        let store = match db {
            Some(path) => NotifyStore::open_at(path)?,
            None => NotifyStore::new()?,
        };
        Self::with_store(store, config)
    }

    /// Build the engine over an existing store.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in provider is invalid.
    pub fn with_store(store: NotifyStore, config: &Config) -> Result<Self, NotifyError> {
        Ok(Self {
            registry: Arc::new(Registry::with_defaults()?),
            store: Arc::new(store),
            settings: config.engine_settings(),
        })
    }

    /// A runner whose actions write to the store.
    #[must_use]
    pub fn runner(&self) -> Runner {
        let services = Services::new()
            .with_log_entries(self.store.clone())
            .with_mailer(self.store.clone())
            .with_notifications(self.store.clone())
            .with_settings(self.settings.clone());
        let store: Arc<dyn ScriptStore> = self.store.clone();
        Runner::new(Arc::clone(&self.registry), store).with_services(services)
    }
}
