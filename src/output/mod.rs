//! Output formatting for shop-notify.
//!
//! This module provides formatters for displaying engine data in various formats.

mod json;
mod pretty;

use serde_json::Value;

use crate::cli::args::OutputFormat;
use crate::error::NotifyError;
use crate::notify::{
    EventSpec, LogEntry, Notification, OutboxMessage, ProviderInfo, RunReport, Script,
};

pub use json::*;
pub use pretty::*;

/// Format registered providers based on output format
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_providers(providers: &[ProviderInfo], format: OutputFormat) -> Result<String, NotifyError> {
    match format {
        OutputFormat::Pretty => Ok(format_providers_pretty(providers)),
        OutputFormat::Json => format_list_json(providers),
    }
}

/// Format event declarations based on output format
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_events(events: &[&EventSpec], format: OutputFormat) -> Result<String, NotifyError> {
    match format {
        OutputFormat::Pretty => Ok(format_events_pretty(events)),
        OutputFormat::Json => {
            let views: Vec<Value> = events.iter().map(|spec| event_view(spec)).collect();
            format_list_json(&views)
        }
    }
}

/// Format scripts based on output format
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_scripts(scripts: &[Script], format: OutputFormat) -> Result<String, NotifyError> {
    match format {
        OutputFormat::Pretty => Ok(format_scripts_pretty(scripts)),
        OutputFormat::Json => {
            let views: Vec<Value> = scripts.iter().map(script_view).collect();
            format_list_json(&views)
        }
    }
}

/// Format a single script based on output format
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_script(script: &Script, format: OutputFormat) -> Result<String, NotifyError> {
    match format {
        OutputFormat::Pretty => Ok(format_script_pretty(script)),
        OutputFormat::Json => to_json(&script_view(script)),
    }
}

/// Format the outcome of publishing an event based on output format
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_run_report(report: &RunReport, format: OutputFormat) -> Result<String, NotifyError> {
    match format {
        OutputFormat::Pretty => Ok(format_run_report_pretty(report)),
        OutputFormat::Json => to_json(report),
    }
}

/// Format the mail outbox based on output format
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_outbox(messages: &[OutboxMessage], format: OutputFormat) -> Result<String, NotifyError> {
    match format {
        OutputFormat::Pretty => Ok(format_outbox_pretty(messages)),
        OutputFormat::Json => format_list_json(messages),
    }
}

/// Format notifications based on output format
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_notifications(
    notifications: &[Notification],
    format: OutputFormat,
) -> Result<String, NotifyError> {
    match format {
        OutputFormat::Pretty => Ok(format_notifications_pretty(notifications)),
        OutputFormat::Json => format_list_json(notifications),
    }
}

/// Format log entries of one entity based on output format
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_log_entries(
    target: &str,
    entries: &[LogEntry],
    format: OutputFormat,
) -> Result<String, NotifyError> {
    match format {
        OutputFormat::Pretty => Ok(format_log_entries_pretty(target, entries)),
        OutputFormat::Json => format_list_json(entries),
    }
}

/// Format binding problems of a script based on output format
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_problems(
    identifier: &str,
    problems: &[String],
    format: OutputFormat,
) -> Result<String, NotifyError> {
    match format {
        OutputFormat::Pretty => Ok(format_problems_pretty(identifier, problems)),
        OutputFormat::Json => to_json(&serde_json::json!({
            "identifier": identifier,
            "ok": problems.is_empty(),
            "problems": problems,
        })),
    }
}
