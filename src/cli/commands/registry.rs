//! Registry, event and completion commands.

use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::Shell;

use super::Engine;
use crate::cli::args::{Cli, OutputFormat};
use crate::error::NotifyError;
use crate::notify::{Category, EventSpec};
use crate::output::{format_events, format_providers};

/// List registered providers, optionally of one category.
///
/// # Errors
///
/// Returns an error if the category is unknown.
pub fn registry(
    engine: &Engine,
    category: Option<&str>,
    format: OutputFormat,
) -> Result<String, NotifyError> {
    let categories = match category {
        Some(name) => vec![Category::parse(name).ok_or_else(|| {
            NotifyError::Parse(format!(
                "Unknown category: {name}. Supported: condition, action, event, template"
            ))
        })?],
        None => Category::ALL.to_vec(),
    };

    let providers: Vec<_> = categories
        .into_iter()
        .flat_map(|category| engine.registry.list(category))
        .collect();
    format_providers(&providers, format)
}

/// Show one event or all of them.
///
/// # Errors
///
/// Returns an error if the event is unknown.
pub fn events(
    engine: &Engine,
    identifier: Option<&str>,
    format: OutputFormat,
) -> Result<String, NotifyError> {
    let specs = match identifier {
        Some(identifier) => vec![engine.registry.event(identifier)?],
        None => engine
            .registry
            .list(Category::Event)
            .iter()
            .map(|info| engine.registry.event(&info.identifier))
            .collect::<Result<Vec<_>, _>>()?,
    };

    let refs: Vec<&EventSpec> = specs.iter().map(Arc::as_ref).collect();
    format_events(&refs, format)
}

/// Generate a completion script for `shell`.
///
/// # Errors
///
/// Returns an error if the script is not valid UTF-8.
pub fn completions(shell: Shell) -> Result<String, NotifyError> {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, "shop-notify", &mut buf);
    String::from_utf8(buf).map_err(|e| NotifyError::Parse(format!("UTF-8 error: {e}")))
}
