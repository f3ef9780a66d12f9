//! SQLite-backed collaborators.
//!
//! [`NotifyStore`] keeps scripts, log entries, notifications and outgoing
//! mail in the local database and implements every store trait the engine
//! consumes.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use tracing::{debug, warn};

use super::context::ShopId;
use super::enums::{Priority, RecipientType};
use super::events::{ORDER_MODEL, USER_MODEL};
use super::registry::Registry;
use super::script::{Script, ScriptStore};
use super::services::{
    EmailMessage, LogEntry, LogEntryKind, LogEntryStore, Mailer, NewLogEntry, NewNotification,
    Notification, NotificationSink,
};
use super::step::StepRecord;
use super::typology::ModelRef;
use crate::error::NotifyError;
use crate::storage::Database;

/// Models whose entities can carry log entries.
const LOG_ENTRY_MODELS: [&str; 2] = [ORDER_MODEL, USER_MODEL];

const SCRIPT_COLUMNS: &str =
    "id, identifier, shop, event_identifier, name, enabled, template, step_data, created_on";

const NOTIFICATION_COLUMNS: &str = "id, shop, recipient_type, recipient_model, recipient_pk, \
     priority, message, identifier, url, created_on, read_on";

/// A message waiting in the mail outbox.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboxMessage {
    /// Row id
    pub id: i64,
    /// The message as handed to the mailer
    pub message: EmailMessage,
    /// When it was queued
    pub created_on: DateTime<Utc>,
}

/// A script row before its steps are loaded.
struct ScriptRow {
    id: i64,
    identifier: String,
    shop: i64,
    event_identifier: String,
    name: String,
    enabled: bool,
    template: Option<String>,
    step_data: String,
    created_on: String,
}

/// Database-backed store for everything the engine persists.
pub struct NotifyStore {
    db: Mutex<Database>,
}

impl NotifyStore {
    /// Open the store at the default location.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn new() -> Result<Self, NotifyError> {
        Ok(Self::with_database(Database::open()?))
    }

    /// Open the store at a specific database path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open_at(path: &Path) -> Result<Self, NotifyError> {
        Ok(Self::with_database(Database::open_at(path)?))
    }

    /// Open a store kept in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be created.
    pub fn open_in_memory() -> Result<Self, NotifyError> {
        Ok(Self::with_database(Database::open_in_memory()?))
    }

    /// Create a store over an existing database connection.
    #[must_use]
    pub const fn with_database(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    fn lock(&self) -> MutexGuard<'_, Database> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn query_scripts(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<ScriptRow>, NotifyError> {
        let db = self.lock();
        let mut stmt = db
            .connection()
            .prepare(sql)
            .map_err(|e| NotifyError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params, row_to_script)
            .map_err(|e| NotifyError::Database(format!("Failed to query scripts: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| NotifyError::Database(format!("Failed to read script row: {e}")))
    }

    /// Scripts of the given rows that load; the rest are logged and skipped.
    fn load_rows(registry: &Registry, rows: Vec<ScriptRow>) -> Vec<Script> {
        rows.into_iter()
            .filter_map(|row| {
                let identifier = row.identifier.clone();
                match script_from_row(registry, row) {
                    Ok(script) => Some(script),
                    Err(e) => {
                        warn!(target: "notify", script = %identifier, "Skipping unreadable script: {e}");
                        None
                    }
                }
            })
            .collect()
    }

    fn insert_script(&self, script: &mut Script, step_data: &str) -> Result<(), NotifyError> {
        let db = self.lock();
        let conn = db.connection();

        conn.execute(
            r"INSERT INTO notify_scripts
              (identifier, shop, event_identifier, name, enabled, template, step_data, created_on)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                script.identifier,
                script.shop.0,
                script.event_identifier,
                script.name,
                script.enabled,
                script.template,
                step_data,
                script.created_on.to_rfc3339(),
            ],
        )
        .map_err(|e| NotifyError::Database(format!("Failed to insert script: {e}")))?;

        script.id = Some(conn.last_insert_rowid());
        Ok(())
    }

    fn update_script(&self, id: i64, script: &Script, step_data: &str) -> Result<(), NotifyError> {
        let db = self.lock();

        let updated = db
            .connection()
            .execute(
                r"UPDATE notify_scripts SET
                  identifier = ?1,
                  shop = ?2,
                  event_identifier = ?3,
                  name = ?4,
                  enabled = ?5,
                  template = ?6,
                  step_data = ?7
                  WHERE id = ?8",
                params![
                    script.identifier,
                    script.shop.0,
                    script.event_identifier,
                    script.name,
                    script.enabled,
                    script.template,
                    step_data,
                    id,
                ],
            )
            .map_err(|e| NotifyError::Database(format!("Failed to update script: {e}")))?;

        if updated == 0 {
            return Err(NotifyError::NotFound(format!("script #{id}")));
        }
        Ok(())
    }

    /// Messages in the mail outbox, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the outbox cannot be read.
    pub fn outbox(&self) -> Result<Vec<OutboxMessage>, NotifyError> {
        let db = self.lock();
        let mut stmt = db
            .connection()
            .prepare("SELECT id, message, created_on FROM mail_outbox ORDER BY id")
            .map_err(|e| NotifyError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            })
            .map_err(|e| NotifyError::Database(format!("Failed to query outbox: {e}")))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| NotifyError::Database(format!("Failed to read outbox row: {e}")))?;

        rows.into_iter()
            .map(|(id, message, created_on)| {
                Ok(OutboxMessage {
                    id,
                    message: serde_json::from_str(&message)?,
                    created_on: parse_timestamp(&created_on)?,
                })
            })
            .collect()
    }

    /// Notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the notifications cannot be read.
    pub fn notifications(
        &self,
        shop: Option<ShopId>,
        unread_only: bool,
    ) -> Result<Vec<Notification>, NotifyError> {
        let db = self.lock();
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notify_notifications
             WHERE (?1 IS NULL OR shop = ?1) AND (?2 = 0 OR read_on IS NULL)
             ORDER BY id DESC"
        );
        let mut stmt = db
            .connection()
            .prepare(&sql)
            .map_err(|e| NotifyError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![shop.map(|s| s.0), unread_only], row_to_notification)
            .map_err(|e| NotifyError::Database(format!("Failed to query notifications: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| NotifyError::Database(format!("Failed to read notification row: {e}")))
    }

    /// Mark a notification read. Returns whether an unread one was found.
    ///
    /// # Errors
    ///
    /// Returns an error if the notification cannot be updated.
    pub fn mark_read(&self, id: i64) -> Result<bool, NotifyError> {
        let db = self.lock();
        let updated = db
            .connection()
            .execute(
                "UPDATE notify_notifications SET read_on = ?1 WHERE id = ?2 AND read_on IS NULL",
                params![Utc::now().to_rfc3339(), id],
            )
            .map_err(|e| NotifyError::Database(format!("Failed to update notification: {e}")))?;
        Ok(updated > 0)
    }
}

impl ScriptStore for NotifyStore {
    fn load(
        &self,
        registry: &Registry,
        event_identifier: &str,
        shop: ShopId,
        enabled_only: bool,
    ) -> Result<Vec<Script>, NotifyError> {
        let sql = format!(
            "SELECT {SCRIPT_COLUMNS} FROM notify_scripts
             WHERE event_identifier = ?1 AND shop = ?2 AND (?3 = 0 OR enabled = 1)
             ORDER BY id"
        );
        let rows = self.query_scripts(&sql, params![event_identifier, shop.0, enabled_only])?;
        Ok(Self::load_rows(registry, rows))
    }

    fn save(&self, script: &mut Script) -> Result<(), NotifyError> {
        let step_data = serde_json::to_string(&script.get_serialized_steps())?;
        match script.id {
            Some(id) => self.update_script(id, script, &step_data),
            None => self.insert_script(script, &step_data),
        }?;
        debug!(target: "notify", script = %script.identifier, "Script saved");
        Ok(())
    }

    fn get(&self, registry: &Registry, identifier: &str) -> Result<Option<Script>, NotifyError> {
        let sql = format!("SELECT {SCRIPT_COLUMNS} FROM notify_scripts WHERE identifier = ?1");
        let row = {
            let db = self.lock();
            let mut stmt = db
                .connection()
                .prepare(&sql)
                .map_err(|e| NotifyError::Database(format!("Failed to prepare query: {e}")))?;
            stmt.query_row([identifier], row_to_script)
                .optional()
                .map_err(|e| NotifyError::Database(format!("Failed to query script: {e}")))?
        };

        row.map(|row| script_from_row(registry, row)).transpose()
    }

    fn list(&self, registry: &Registry, shop: Option<ShopId>) -> Result<Vec<Script>, NotifyError> {
        let sql = format!(
            "SELECT {SCRIPT_COLUMNS} FROM notify_scripts
             WHERE ?1 IS NULL OR shop = ?1
             ORDER BY shop, event_identifier, id"
        );
        let rows = self.query_scripts(&sql, params![shop.map(|s| s.0)])?;
        Ok(Self::load_rows(registry, rows))
    }

    fn delete(&self, identifier: &str) -> Result<bool, NotifyError> {
        let db = self.lock();
        let deleted = db
            .connection()
            .execute("DELETE FROM notify_scripts WHERE identifier = ?1", [identifier])
            .map_err(|e| NotifyError::Database(format!("Failed to delete script: {e}")))?;
        Ok(deleted > 0)
    }
}

impl LogEntryStore for NotifyStore {
    fn supports(&self, target: &ModelRef) -> bool {
        LOG_ENTRY_MODELS.contains(&target.model.as_str())
    }

    fn add_log_entry(&self, entry: NewLogEntry) -> Result<LogEntry, NotifyError> {
        if !self.supports(&entry.target) {
            return Err(NotifyError::Database(format!(
                "Model `{}` does not carry log entries",
                entry.target.model
            )));
        }

        let created_on = Utc::now();
        let db = self.lock();
        let conn = db.connection();
        conn.execute(
            r"INSERT INTO notify_log_entries
              (target_model, target_pk, message, identifier, kind, extra, created_on)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                entry.target.model,
                entry.target.pk,
                entry.message,
                entry.identifier,
                entry.kind.as_str(),
                entry.extra.to_string(),
                created_on.to_rfc3339(),
            ],
        )
        .map_err(|e| NotifyError::Database(format!("Failed to insert log entry: {e}")))?;

        Ok(LogEntry {
            id: conn.last_insert_rowid(),
            target: entry.target,
            message: entry.message,
            identifier: entry.identifier,
            kind: entry.kind,
            extra: entry.extra,
            created_on,
        })
    }

    fn log_entries(
        &self,
        target: &ModelRef,
        identifier: Option<&str>,
    ) -> Result<Vec<LogEntry>, NotifyError> {
        let db = self.lock();
        let mut stmt = db
            .connection()
            .prepare(
                r"SELECT id, target_model, target_pk, message, identifier, kind, extra, created_on
                  FROM notify_log_entries
                  WHERE target_model = ?1 AND target_pk = ?2 AND (?3 IS NULL OR identifier = ?3)
                  ORDER BY id",
            )
            .map_err(|e| NotifyError::Database(format!("Failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![target.model, target.pk, identifier], row_to_log_entry)
            .map_err(|e| NotifyError::Database(format!("Failed to query log entries: {e}")))?;

        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|e| NotifyError::Database(format!("Failed to read log entry row: {e}")))
    }
}

impl NotificationSink for NotifyStore {
    fn add_notification(&self, notification: NewNotification) -> Result<Notification, NotifyError> {
        let created_on = Utc::now();
        let db = self.lock();
        let conn = db.connection();
        conn.execute(
            r"INSERT INTO notify_notifications
              (shop, recipient_type, recipient_model, recipient_pk, priority,
               message, identifier, url, created_on)
              VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                notification.shop.map(|s| s.0),
                notification.recipient_type.value(),
                notification.recipient.as_ref().map(|r| r.model.as_str()),
                notification.recipient.as_ref().map(|r| r.pk.as_str()),
                notification.priority.value(),
                notification.message,
                notification.identifier,
                notification.url,
                created_on.to_rfc3339(),
            ],
        )
        .map_err(|e| NotifyError::Database(format!("Failed to insert notification: {e}")))?;

        Ok(Notification {
            id: conn.last_insert_rowid(),
            shop: notification.shop,
            recipient_type: notification.recipient_type,
            recipient: notification.recipient,
            priority: notification.priority,
            message: notification.message,
            identifier: notification.identifier,
            url: notification.url,
            created_on,
            read_on: None,
        })
    }
}

impl Mailer for NotifyStore {
    fn send(&self, message: &EmailMessage) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(message)?;
        let db = self.lock();
        db.connection()
            .execute(
                r"INSERT INTO mail_outbox (to_addresses, subject, message, created_on)
                  VALUES (?1, ?2, ?3, ?4)",
                params![
                    message.to.join(", "),
                    message.subject,
                    payload,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| NotifyError::Database(format!("Failed to queue email: {e}")))?;
        Ok(())
    }
}

fn row_to_script(row: &Row) -> rusqlite::Result<ScriptRow> {
    Ok(ScriptRow {
        id: row.get(0)?,
        identifier: row.get(1)?,
        shop: row.get(2)?,
        event_identifier: row.get(3)?,
        name: row.get(4)?,
        enabled: row.get(5)?,
        template: row.get(6)?,
        step_data: row.get(7)?,
        created_on: row.get(8)?,
    })
}

fn script_from_row(registry: &Registry, row: ScriptRow) -> Result<Script, NotifyError> {
    let records: Vec<StepRecord> = serde_json::from_str(&row.step_data).map_err(|e| {
        NotifyError::Parse(format!("Invalid step data of script `{}`: {e}", row.identifier))
    })?;

    let mut script = Script::new(ShopId(row.shop), row.event_identifier, row.name)
        .with_identifier(row.identifier)
        .with_enabled(row.enabled);
    script.id = Some(row.id);
    script.template = row.template;
    script.created_on = parse_timestamp(&row.created_on)?;
    script.set_serialized_steps(registry, records)?;
    Ok(script)
}

fn row_to_log_entry(row: &Row) -> rusqlite::Result<LogEntry> {
    let kind: String = row.get(5)?;
    let extra: String = row.get(6)?;
    let created_on: String = row.get(7)?;

    Ok(LogEntry {
        id: row.get(0)?,
        target: ModelRef::new(row.get::<_, String>(1)?, row.get::<_, String>(2)?),
        message: row.get(3)?,
        identifier: row.get(4)?,
        kind: LogEntryKind::parse(&kind),
        extra: serde_json::from_str(&extra).unwrap_or(serde_json::Value::Null),
        created_on: timestamp_or_now(&created_on),
    })
}

fn row_to_notification(row: &Row) -> rusqlite::Result<Notification> {
    let recipient_type: i64 = row.get(2)?;
    let recipient_model: Option<String> = row.get(3)?;
    let recipient_pk: Option<String> = row.get(4)?;
    let priority: i64 = row.get(5)?;
    let created_on: String = row.get(9)?;
    let read_on: Option<String> = row.get(10)?;

    Ok(Notification {
        id: row.get(0)?,
        shop: row.get::<_, Option<i64>>(1)?.map(ShopId),
        recipient_type: RecipientType::from_value(recipient_type).unwrap_or(RecipientType::Admins),
        recipient: recipient_model.zip(recipient_pk).map(|(model, pk)| ModelRef::new(model, pk)),
        priority: Priority::from_value(priority).unwrap_or(Priority::Normal),
        message: row.get(6)?,
        identifier: row.get(7)?,
        url: row.get(8)?,
        created_on: timestamp_or_now(&created_on),
        read_on: read_on.as_deref().map(timestamp_or_now),
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, NotifyError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NotifyError::Parse(format!("Invalid timestamp `{s}`: {e}")))
}

fn timestamp_or_now(s: &str) -> DateTime<Utc> {
    parse_timestamp(s).unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::item::ItemRecord;
    use crate::notify::services::ContentType;
    use crate::notify::variable::BindingValue;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::with_defaults().unwrap()
    }

    fn script(registry: &Registry, shop: i64, event: &str) -> Script {
        let step = StepRecord {
            actions: vec![ItemRecord::new("set_debug_flag")],
            ..StepRecord::default()
        };
        let mut script = Script::new(ShopId(shop), event, "Debug").with_enabled(true);
        script.set_serialized_steps(registry, vec![step]).unwrap();
        script
    }

    fn email() -> EmailMessage {
        EmailMessage {
            from: None,
            to: vec!["a@example.com".to_string(), "b@example.com".to_string()],
            cc: Vec::new(),
            bcc: Vec::new(),
            reply_to: Vec::new(),
            subject: "Hello".to_string(),
            body: "World".to_string(),
            content_type: ContentType::Plain,
        }
    }

    #[test]
    fn test_save_and_get_script() {
        let registry = registry();
        let store = NotifyStore::open_in_memory().unwrap();
        let mut script = script(&registry, 1, "order_received");

        store.save(&mut script).unwrap();
        assert!(script.id.is_some());

        let loaded = store.get(&registry, &script.identifier).unwrap().unwrap();
        assert_eq!(loaded.id, script.id);
        assert_eq!(loaded.name, "Debug");
        assert!(loaded.enabled);
        assert_eq!(loaded.get_serialized_steps(), script.get_serialized_steps());
        assert!(store.get(&registry, "missing").unwrap().is_none());
    }

    #[test]
    fn test_update_script() {
        let registry = registry();
        let store = NotifyStore::open_in_memory().unwrap();
        let mut script = script(&registry, 1, "order_received");
        store.save(&mut script).unwrap();

        script.name = "Renamed".to_string();
        script.enabled = false;
        store.save(&mut script).unwrap();

        let loaded = store.get(&registry, &script.identifier).unwrap().unwrap();
        assert_eq!(loaded.name, "Renamed");
        assert!(!loaded.enabled);
        assert_eq!(store.list(&registry, None).unwrap().len(), 1);
    }

    #[test]
    fn test_load_filters_by_event_shop_and_enabled() {
        let registry = registry();
        let store = NotifyStore::open_in_memory().unwrap();
        store.save(&mut script(&registry, 1, "order_received")).unwrap();
        store.save(&mut script(&registry, 2, "order_received")).unwrap();
        store.save(&mut script(&registry, 1, "shipment_created")).unwrap();
        store
            .save(&mut script(&registry, 1, "order_received").with_enabled(false))
            .unwrap();

        let enabled = store.load(&registry, "order_received", ShopId(1), true).unwrap();
        assert_eq!(enabled.len(), 1);
        let all = store.load(&registry, "order_received", ShopId(1), false).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(store.list(&registry, Some(ShopId(2))).unwrap().len(), 1);
    }

    #[test]
    fn test_unreadable_scripts_are_skipped() {
        let registry = registry();
        let store = NotifyStore::open_in_memory().unwrap();
        store.save(&mut script(&registry, 1, "order_received")).unwrap();
        store
            .lock()
            .connection()
            .execute(
                r#"INSERT INTO notify_scripts
                   (identifier, shop, event_identifier, name, enabled, step_data, created_on)
                   VALUES ('broken', 1, 'order_received', 'Broken', 1,
                           '[{"actions": [{"identifier": "nope"}]}]', '2024-01-01T00:00:00Z')"#,
                [],
            )
            .unwrap();

        let scripts = store.load(&registry, "order_received", ShopId(1), true).unwrap();
        assert_eq!(scripts.len(), 1);
        assert!(matches!(
            store.get(&registry, "broken").unwrap_err(),
            NotifyError::UnknownItem { .. }
        ));
    }

    #[test]
    fn test_delete_script() {
        let registry = registry();
        let store = NotifyStore::open_in_memory().unwrap();
        let mut script = script(&registry, 1, "order_received");
        store.save(&mut script).unwrap();

        assert!(store.delete(&script.identifier).unwrap());
        assert!(!store.delete(&script.identifier).unwrap());
    }

    #[test]
    fn test_log_entries() {
        let store = NotifyStore::open_in_memory().unwrap();
        let order = ModelRef::new(ORDER_MODEL, "5");
        assert!(store.supports(&order));
        assert!(!store.supports(&ModelRef::new("shop.product", "5")));

        store
            .add_log_entry(NewLogEntry {
                target: order.clone(),
                message: "Sent".to_string(),
                identifier: Some("confirmation".to_string()),
                kind: LogEntryKind::Email,
                extra: json!({"to": "a@example.com"}),
            })
            .unwrap();

        let entries = store.log_entries(&order, Some("confirmation")).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kind, LogEntryKind::Email);
        assert_eq!(entries[0].extra, json!({"to": "a@example.com"}));
        assert!(store.log_entries(&order, Some("other")).unwrap().is_empty());

        let unsupported = NewLogEntry {
            target: ModelRef::new("shop.product", "1"),
            message: "x".to_string(),
            identifier: None,
            kind: LogEntryKind::Other,
            extra: serde_json::Value::Null,
        };
        assert!(store.add_log_entry(unsupported).is_err());
    }

    #[test]
    fn test_notifications() {
        let store = NotifyStore::open_in_memory().unwrap();
        let stored = store
            .add_notification(NewNotification {
                shop: Some(ShopId(1)),
                recipient_type: RecipientType::SpecificUser,
                recipient: Some(ModelRef::new(USER_MODEL, "3")),
                priority: Priority::High,
                message: "Check order".to_string(),
                identifier: None,
                url: Some("https://example.com/orders/1".to_string()),
            })
            .unwrap();

        let listed = store.notifications(Some(ShopId(1)), true).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].priority, Priority::High);
        assert_eq!(listed[0].recipient, Some(ModelRef::new(USER_MODEL, "3")));
        assert!(store.notifications(Some(ShopId(2)), false).unwrap().is_empty());

        assert!(store.mark_read(stored.id).unwrap());
        assert!(!store.mark_read(stored.id).unwrap());
        assert!(store.notifications(None, true).unwrap().is_empty());
        assert!(store.notifications(None, false).unwrap()[0].read_on.is_some());
    }

    #[test]
    fn test_outbox() {
        let store = NotifyStore::open_in_memory().unwrap();
        store.send(&email()).unwrap();

        let outbox = store.outbox().unwrap();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].message, email());
    }

    #[test]
    fn test_store_as_services_backend() {
        use crate::notify::context::Context;
        use crate::notify::services::Services;
        use std::sync::Arc;

        let store = Arc::new(NotifyStore::open_in_memory().unwrap());
        let ctx = Context::default().with_services(Services::new().with_log_entries(store.clone()));
        let order = ModelRef::new(ORDER_MODEL, "1");

        assert!(ctx.add_log_entry(&order, "Hi", None, LogEntryKind::Note, json!(null)));
        assert_eq!(store.log_entries(&order, None).unwrap().len(), 1);
    }
}
