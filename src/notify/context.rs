//! Execution context for one script run.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, trace, warn, Level};

use super::event::Event;
use super::services::{LogEntry, LogEntryKind, NewLogEntry, Services};
use super::typology::ModelRef;
use crate::config::EngineSettings;

/// Tenant a script or event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopId(pub i64);

impl fmt::Display for ShopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message logged through a context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Severity
    pub level: Level,
    /// Message text
    pub message: String,
}

/// Mutable variable store and logging sink for one script execution.
///
/// A context is created per script run and never shared between scripts.
#[derive(Debug, Default)]
pub struct Context {
    variables: BTreeMap<String, Value>,
    shop: Option<ShopId>,
    event_identifier: Option<String>,
    log_target: Option<ModelRef>,
    services: Services,
    records: RefCell<Vec<LogRecord>>,
}

impl Context {
    /// Create a context seeded with the given variables.
    pub fn from_variables<I, K>(variables: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            variables: variables.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            ..Self::default()
        }
    }

    /// Create a context for running scripts subscribed to an event.
    #[must_use]
    pub fn from_event(event: &Event, shop: ShopId) -> Self {
        Self {
            variables: event.variable_values().clone(),
            shop: Some(shop),
            event_identifier: Some(event.identifier().to_string()),
            log_target: event.log_target().cloned(),
            ..Self::default()
        }
    }

    /// Attach collaborators.
    #[must_use]
    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    /// Set the log target.
    #[must_use]
    pub fn with_log_target(mut self, target: ModelRef) -> Self {
        self.log_target = Some(target);
        self
    }

    /// Set the shop.
    #[must_use]
    pub const fn with_shop(mut self, shop: ShopId) -> Self {
        self.shop = Some(shop);
        self
    }

    /// Get a variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Get a variable or a default.
    #[must_use]
    pub fn get_or(&self, name: &str, default: Value) -> Value {
        self.variables.get(name).cloned().unwrap_or(default)
    }

    /// Set a variable.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.variables.insert(name.into(), value.into());
    }

    /// All variables.
    #[must_use]
    pub const fn variables(&self) -> &BTreeMap<String, Value> {
        &self.variables
    }

    /// Shop of the current run.
    #[must_use]
    pub const fn shop(&self) -> Option<ShopId> {
        self.shop
    }

    /// Identifier of the event being handled.
    #[must_use]
    pub fn event_identifier(&self) -> Option<&str> {
        self.event_identifier.as_deref()
    }

    /// Entity receiving audit log entries.
    #[must_use]
    pub const fn log_target(&self) -> Option<&ModelRef> {
        self.log_target.as_ref()
    }

    /// Attached collaborators.
    #[must_use]
    pub const fn services(&self) -> &Services {
        &self.services
    }

    /// Engine settings.
    #[must_use]
    pub fn settings(&self) -> &EngineSettings {
        &self.services.settings
    }

    /// Log a message for this run.
    ///
    /// The message is kept on the context and forwarded to `tracing`.
    pub fn log(&self, level: Level, message: impl Into<String>) {
        let message = message.into();
        let event = self.event_identifier.as_deref().unwrap_or("-");
        if level == Level::ERROR {
            error!(target: "notify", event, "{message}");
        } else if level == Level::WARN {
            warn!(target: "notify", event, "{message}");
        } else if level == Level::INFO {
            info!(target: "notify", event, "{message}");
        } else if level == Level::DEBUG {
            debug!(target: "notify", event, "{message}");
        } else {
            trace!(target: "notify", event, "{message}");
        }
        self.records.borrow_mut().push(LogRecord { level, message });
    }

    /// Messages logged so far.
    #[must_use]
    pub fn log_records(&self) -> Vec<LogRecord> {
        self.records.borrow().clone()
    }

    /// Append a log entry to any entity that supports it.
    ///
    /// Returns whether an entry was stored. Storage errors are logged, not
    /// raised.
    pub fn add_log_entry(
        &self,
        target: &ModelRef,
        message: impl Into<String>,
        identifier: Option<&str>,
        kind: LogEntryKind,
        extra: Value,
    ) -> bool {
        let Some(store) = self.services.log_entries.as_ref() else {
            return false;
        };
        if !store.supports(target) {
            return false;
        }
        let entry = NewLogEntry {
            target: target.clone(),
            message: message.into(),
            identifier: identifier.map(str::to_string),
            kind,
            extra,
        };
        match store.add_log_entry(entry) {
            Ok(_) => true,
            Err(e) => {
                self.log(Level::WARN, format!("Could not add log entry on {target}: {e}"));
                false
            }
        }
    }

    /// Append a log entry on the log target.
    ///
    /// A no-op when there is no log target or it cannot carry log entries.
    pub fn add_log_entry_on_log_target(
        &self,
        message: impl Into<String>,
        identifier: Option<&str>,
        kind: LogEntryKind,
        extra: Value,
    ) -> bool {
        match self.log_target.as_ref() {
            Some(target) => self.add_log_entry(target, message, identifier, kind, extra),
            None => false,
        }
    }

    /// Log entries of the log target, optionally filtered by identifier.
    #[must_use]
    pub fn log_entries(&self, identifier: Option<&str>) -> Vec<LogEntry> {
        let (Some(target), Some(store)) = (self.log_target.as_ref(), self.services.log_entries.as_ref())
        else {
            return Vec::new();
        };
        if !store.supports(target) {
            return Vec::new();
        }
        store.log_entries(target, identifier).unwrap_or_else(|e| {
            self.log(Level::WARN, format!("Could not read log entries of {target}: {e}"));
            Vec::new()
        })
    }
}
