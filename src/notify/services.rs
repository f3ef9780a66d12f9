//! Host collaborators used by actions.
//!
//! The engine never owns host entities. Actions reach the outside world only
//! through these traits, bundled per run in [`Services`].

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::context::ShopId;
use super::enums::{Priority, RecipientType};
use super::typology::ModelRef;
use crate::config::EngineSettings;
use crate::error::NotifyError;

/// Kind of an audit log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEntryKind {
    /// Uncategorized
    #[default]
    Other,
    /// Free-form note
    Note,
    /// An email was sent
    Email,
    /// Something looked wrong
    Warning,
    /// Something failed
    Error,
}

impl LogEntryKind {
    /// Stored name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Other => "other",
            Self::Note => "note",
            Self::Email => "email",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Parse a stored name, falling back to `Other`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "note" => Self::Note,
            "email" => Self::Email,
            "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Other,
        }
    }
}

/// A log entry about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLogEntry {
    /// Entity the entry belongs to
    pub target: ModelRef,
    /// Message text
    pub message: String,
    /// Identifier used for send-once tracking
    pub identifier: Option<String>,
    /// Entry kind
    pub kind: LogEntryKind,
    /// Extra structured data
    pub extra: Value,
}

/// A stored log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Row id
    pub id: i64,
    /// Entity the entry belongs to
    pub target: ModelRef,
    /// Message text
    pub message: String,
    /// Identifier used for send-once tracking
    pub identifier: Option<String>,
    /// Entry kind
    pub kind: LogEntryKind,
    /// Extra structured data
    pub extra: Value,
    /// Creation time
    pub created_on: DateTime<Utc>,
}

/// Storage of audit log entries attached to host entities.
pub trait LogEntryStore: Send + Sync {
    /// Whether entities of this model can carry log entries.
    fn supports(&self, target: &ModelRef) -> bool;

    /// Append an entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be stored.
    fn add_log_entry(&self, entry: NewLogEntry) -> Result<LogEntry, NotifyError>;

    /// Entries of a target, optionally filtered by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the entries cannot be read.
    fn log_entries(
        &self,
        target: &ModelRef,
        identifier: Option<&str>,
    ) -> Result<Vec<LogEntry>, NotifyError>;
}

/// Email body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// text/plain
    #[default]
    Plain,
    /// text/html
    Html,
}

impl ContentType {
    /// Parse a template value; anything but `html` is plain text.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("html") {
            Self::Html
        } else {
            Self::Plain
        }
    }

    /// Stored name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Html => "html",
        }
    }
}

/// An outgoing email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailMessage {
    /// Sender address
    pub from: Option<String>,
    /// Recipients
    pub to: Vec<String>,
    /// Carbon copy recipients
    pub cc: Vec<String>,
    /// Blind carbon copy recipients
    pub bcc: Vec<String>,
    /// Reply-To addresses
    pub reply_to: Vec<String>,
    /// Single-line subject
    pub subject: String,
    /// Body
    pub body: String,
    /// Body type
    pub content_type: ContentType,
}

/// Outbound email transport.
#[cfg_attr(test, mockall::automock)]
pub trait Mailer: Send + Sync {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be handed over.
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError>;
}

/// An in-app notification about to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    /// Tenant
    pub shop: Option<ShopId>,
    /// Who should see it
    pub recipient_type: RecipientType,
    /// The user, for `SpecificUser`
    pub recipient: Option<ModelRef>,
    /// Priority
    pub priority: Priority,
    /// Message text
    pub message: String,
    /// Identifier for deduplication by hosts
    pub identifier: Option<String>,
    /// Link target
    pub url: Option<String>,
}

/// A stored in-app notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Row id
    pub id: i64,
    /// Tenant
    pub shop: Option<ShopId>,
    /// Who should see it
    pub recipient_type: RecipientType,
    /// The user, for `SpecificUser`
    pub recipient: Option<ModelRef>,
    /// Priority
    pub priority: Priority,
    /// Message text
    pub message: String,
    /// Identifier for deduplication by hosts
    pub identifier: Option<String>,
    /// Link target
    pub url: Option<String>,
    /// Creation time
    pub created_on: DateTime<Utc>,
    /// When it was marked read
    pub read_on: Option<DateTime<Utc>>,
}

/// Destination for in-app notifications.
pub trait NotificationSink: Send + Sync {
    /// Store a notification.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be stored.
    fn add_notification(&self, notification: NewNotification) -> Result<Notification, NotifyError>;
}

/// Collaborators shared by every context of a run.
#[derive(Clone, Default)]
pub struct Services {
    /// Audit log storage
    pub log_entries: Option<Arc<dyn LogEntryStore>>,
    /// Email transport
    pub mailer: Option<Arc<dyn Mailer>>,
    /// In-app notification storage
    pub notifications: Option<Arc<dyn NotificationSink>>,
    /// Engine settings
    pub settings: Arc<EngineSettings>,
}

impl Services {
    /// Services with nothing attached and default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a log entry store.
    #[must_use]
    pub fn with_log_entries(mut self, store: Arc<dyn LogEntryStore>) -> Self {
        self.log_entries = Some(store);
        self
    }

    /// Attach a mailer.
    #[must_use]
    pub fn with_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = Some(mailer);
        self
    }

    /// Attach a notification sink.
    #[must_use]
    pub fn with_notifications(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notifications = Some(sink);
        self
    }

    /// Replace the settings.
    #[must_use]
    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }
}

impl fmt::Debug for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Services")
            .field("log_entries", &self.log_entries.is_some())
            .field("mailer", &self.mailer.is_some())
            .field("notifications", &self.notifications.is_some())
            .field("settings", &self.settings)
            .finish()
    }
}

/// Log entry store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryLogStore {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl LogEntryStore for MemoryLogStore {
    fn supports(&self, _target: &ModelRef) -> bool {
        true
    }

    fn add_log_entry(&self, entry: NewLogEntry) -> Result<LogEntry, NotifyError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let stored = LogEntry {
            id: i64::try_from(entries.len()).unwrap_or(i64::MAX) + 1,
            target: entry.target,
            message: entry.message,
            identifier: entry.identifier,
            kind: entry.kind,
            extra: entry.extra,
            created_on: Utc::now(),
        };
        entries.push(stored.clone());
        Ok(stored)
    }

    fn log_entries(
        &self,
        target: &ModelRef,
        identifier: Option<&str>,
    ) -> Result<Vec<LogEntry>, NotifyError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| &e.target == target)
            .filter(|e| identifier.map_or(true, |id| e.identifier.as_deref() == Some(id)))
            .cloned()
            .collect())
    }
}

/// Mailer that keeps sent messages in memory.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<EmailMessage>>,
}

impl MemoryMailer {
    /// Create an empty mailer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<EmailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Mailer for MemoryMailer {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

/// Notification sink kept in memory.
#[derive(Debug, Default)]
pub struct MemoryNotifications {
    stored: Mutex<Vec<Notification>>,
}

impl MemoryNotifications {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications stored so far.
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.stored
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for MemoryNotifications {
    fn add_notification(&self, notification: NewNotification) -> Result<Notification, NotifyError> {
        let mut stored = self.stored.lock().unwrap_or_else(PoisonError::into_inner);
        let notification = Notification {
            id: i64::try_from(stored.len()).unwrap_or(i64::MAX) + 1,
            shop: notification.shop,
            recipient_type: notification.recipient_type,
            recipient: notification.recipient,
            priority: notification.priority,
            message: notification.message,
            identifier: notification.identifier,
            url: notification.url,
            created_on: Utc::now(),
            read_on: None,
        };
        stored.push(notification.clone());
        Ok(notification)
    }
}
