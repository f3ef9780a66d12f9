//! JSON output formatting for shop-notify.
//!
//! Engine types that are not serializable themselves are shown through the
//! views built here.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::NotifyError;
use crate::notify::{EventSpec, Script, ScriptDocument};

/// JSON view of an event declaration.
#[must_use]
pub fn event_view(spec: &EventSpec) -> Value {
    let variables: Vec<Value> = spec
        .variables()
        .into_iter()
        .map(|v| {
            json!({
                "name": v.name,
                "type": v.ty.identifier(),
                "type_name": v.ty.name(),
                "required": v.required,
                "help_text": v.help_text,
            })
        })
        .collect();

    json!({
        "identifier": spec.identifier,
        "name": spec.name,
        "description": spec.description,
        "log_target": spec.log_target_variable(),
        "variables": variables,
    })
}

/// JSON view of a script, including its steps.
#[must_use]
pub fn script_view(script: &Script) -> Value {
    json!({
        "id": script.id,
        "identifier": script.identifier,
        "shop": script.shop,
        "event_identifier": script.event_identifier,
        "name": script.name,
        "enabled": script.enabled,
        "template": script.template,
        "created_on": script.created_on.to_rfc3339(),
        "steps": script.get_serialized_steps(),
    })
}

/// Format a list as `{"count": n, "items": [...]}`.
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_list_json<T: Serialize>(items: &[T]) -> Result<String, NotifyError> {
    let output = json!({
        "count": items.len(),
        "items": items
    });
    Ok(serde_json::to_string_pretty(&output)?)
}

/// Format a script as its portable document.
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn format_script_document(script: &Script) -> Result<String, NotifyError> {
    to_json(&ScriptDocument::from_script(script))
}

/// Generic JSON formatter for any serializable type
///
/// # Errors
///
/// Returns `NotifyError::Parse` if JSON serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String, NotifyError> {
    Ok(serde_json::to_string_pretty(value)?)
}
