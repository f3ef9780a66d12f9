//! Script management commands.

use std::io::Read;
use std::path::Path;

use colored::Colorize;
use serde_json::json;

use super::Engine;
use crate::cli::args::{OutputFormat, ScriptCommands};
use crate::error::NotifyError;
use crate::notify::{Script, ScriptDocument, ScriptStore, ShopId};
use crate::output::{
    format_problems, format_script, format_script_document, format_scripts, to_json,
};

/// Execute script subcommands.
///
/// # Errors
///
/// Returns an error if a script is missing or cannot be stored.
pub fn script(engine: &Engine, cmd: ScriptCommands, format: OutputFormat) -> Result<String, NotifyError> {
    match cmd {
        ScriptCommands::List { shop } => {
            let scripts = engine.store.list(&engine.registry, shop.map(ShopId))?;
            format_scripts(&scripts, format)
        }

        ScriptCommands::Show { identifier } => format_script(&get(engine, &identifier)?, format),

        ScriptCommands::Create {
            shop,
            template,
            event,
            name,
            enable,
        } => create(engine, ShopId(shop), template.as_deref(), event.as_deref(), name, enable, format),

        ScriptCommands::Import { file, shop } => import(engine, &file, ShopId(shop), format),

        ScriptCommands::Export { identifier } => format_script_document(&get(engine, &identifier)?),

        ScriptCommands::Enable { identifier } => set_enabled(engine, &identifier, true, format),

        ScriptCommands::Disable { identifier } => set_enabled(engine, &identifier, false, format),

        ScriptCommands::Delete { identifier } => {
            if !engine.store.delete(&identifier)? {
                return Err(not_found(&identifier));
            }
            match format {
                OutputFormat::Pretty => Ok(format!("{} script {identifier}", "Deleted".red())),
                OutputFormat::Json => to_json(&json!({"identifier": identifier, "deleted": true})),
            }
        }

        ScriptCommands::Check { identifier } => {
            let script = get(engine, &identifier)?;
            let spec = engine.registry.event(&script.event_identifier)?;
            format_problems(&identifier, &script.check(&spec), format)
        }
    }
}

fn not_found(identifier: &str) -> NotifyError {
    NotifyError::NotFound(format!("script `{identifier}`"))
}

fn get(engine: &Engine, identifier: &str) -> Result<Script, NotifyError> {
    engine
        .store
        .get(&engine.registry, identifier)?
        .ok_or_else(|| not_found(identifier))
}

fn create(
    engine: &Engine,
    shop: ShopId,
    template: Option<&str>,
    event: Option<&str>,
    name: Option<String>,
    enable: bool,
    format: OutputFormat,
) -> Result<String, NotifyError> {
    let mut script = match (template, event) {
        (Some(template), _) => engine
            .registry
            .script_template(template)?
            .create_script(shop, &engine.registry)?,
        (None, Some(event)) => {
            let spec = engine.registry.event(event)?;
            Script::new(shop, event, spec.name.clone())
        }
        (None, None) => {
            return Err(NotifyError::Parse(
                "Either --template or --event is required".to_string(),
            ))
        }
    };

    if let Some(name) = name {
        script.name = name;
    }
    script.enabled = enable;
    engine.store.save(&mut script)?;
    format_script(&script, format)
}

fn read_document(file: &Path) -> Result<String, NotifyError> {
    if file == Path::new("-") {
        let mut contents = String::new();
        std::io::stdin().read_to_string(&mut contents)?;
        return Ok(contents);
    }
    std::fs::read_to_string(file).map_err(|e| {
        NotifyError::Parse(format!("Failed to read {}: {e}", file.display()))
    })
}

fn import(engine: &Engine, file: &Path, shop: ShopId, format: OutputFormat) -> Result<String, NotifyError> {
    let document: ScriptDocument = serde_json::from_str(&read_document(file)?)
        .map_err(|e| NotifyError::Parse(format!("Invalid script document: {e}")))?;
    let mut script = document.into_script(&engine.registry, shop)?;

    // Replace a script with the same identifier in place, within one shop only
    if let Some(existing) = engine.store.get(&engine.registry, &script.identifier)? {
        if existing.shop != shop {
            return Err(NotifyError::DuplicateIdentifier {
                category: "script",
                identifier: script.identifier,
            });
        }
        script.id = existing.id;
        script.created_on = existing.created_on;
    }
    engine.store.save(&mut script)?;
    format_script(&script, format)
}

fn set_enabled(
    engine: &Engine,
    identifier: &str,
    enabled: bool,
    format: OutputFormat,
) -> Result<String, NotifyError> {
    let mut script = get(engine, identifier)?;
    script.enabled = enabled;
    engine.store.save(&mut script)?;

    match format {
        OutputFormat::Pretty => {
            let verb = if enabled { "Enabled".green() } else { "Disabled".yellow() };
            Ok(format!("{verb} script {} ({identifier})", script.name.bold()))
        }
        OutputFormat::Json => to_json(&json!({"identifier": identifier, "enabled": enabled})),
    }
}
