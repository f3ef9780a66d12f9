//! Commands showing what scripts left behind: mail, notifications and log
//! entries.

use super::Engine;
use crate::cli::args::OutputFormat;
use crate::error::NotifyError;
use crate::notify::{LogEntryStore, ModelRef, ShopId};
use crate::output::{format_log_entries, format_notifications, format_outbox};

/// Show the mail outbox.
///
/// # Errors
///
/// Returns an error if the outbox cannot be read.
pub fn outbox(engine: &Engine, format: OutputFormat) -> Result<String, NotifyError> {
    format_outbox(&engine.store.outbox()?, format)
}

/// Show notifications, after marking one read if asked to.
///
/// # Errors
///
/// Returns an error if the notification to mark does not exist or storage
/// fails.
pub fn notifications(
    engine: &Engine,
    shop: Option<i64>,
    unread: bool,
    mark_read: Option<i64>,
    format: OutputFormat,
) -> Result<String, NotifyError> {
    if let Some(id) = mark_read {
        if !engine.store.mark_read(id)? {
            return Err(NotifyError::NotFound(format!("unread notification #{id}")));
        }
    }
    format_notifications(&engine.store.notifications(shop.map(ShopId), unread)?, format)
}

/// Show the log entries of one entity.
///
/// # Errors
///
/// Returns an error if the model cannot carry log entries.
pub fn log_entries(
    engine: &Engine,
    model: &str,
    pk: &str,
    identifier: Option<&str>,
    format: OutputFormat,
) -> Result<String, NotifyError> {
    let target = ModelRef::new(model, pk);
    if !engine.store.supports(&target) {
        return Err(NotifyError::Parse(format!("Model `{model}` does not carry log entries")));
    }
    let entries = engine.store.log_entries(&target, identifier)?;
    format_log_entries(&target.to_string(), &entries, format)
}
