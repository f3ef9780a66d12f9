//! Publishing events from the command line.

use serde_json::Value;

use super::Engine;
use crate::cli::args::OutputFormat;
use crate::error::NotifyError;
use crate::notify::{Event, ShopId};
use crate::output::format_run_report;

/// Parse a `name=value` pair.
///
/// The value is read as JSON when it parses, otherwise kept as text.
///
/// # Errors
///
/// Returns an error if there is no `=` or the name is empty.
pub fn parse_var(pair: &str) -> Result<(String, Value), NotifyError> {
    let (name, raw) = pair
        .split_once('=')
        .ok_or_else(|| NotifyError::Parse(format!("Expected NAME=VALUE, got `{pair}`")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(NotifyError::Parse(format!("Missing variable name in `{pair}`")));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((name.to_string(), value))
}

/// Publish an event for `shop` and run its scripts.
///
/// # Errors
///
/// Returns an error if the event is unknown, a variable is invalid, or the
/// scripts cannot be loaded.
pub fn emit(
    engine: &Engine,
    event: &str,
    shop: i64,
    vars: &[String],
    format: OutputFormat,
) -> Result<String, NotifyError> {
    let spec = engine.registry.event(event)?;
    let values = vars
        .iter()
        .map(|pair| parse_var(pair))
        .collect::<Result<Vec<_>, _>>()?;

    let event = Event::new(spec, values)?;
    let report = event.run(&engine.runner(), ShopId(shop))?;
    format_run_report(&report, format)
}
