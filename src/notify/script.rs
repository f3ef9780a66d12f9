//! Scripts: persisted, tenant-scoped step lists bound to one event.

use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::context::{Context, ShopId};
use super::enums::StepNext;
use super::event::EventSpec;
use super::registry::Registry;
use super::step::{Step, StepRecord, StepState};
use crate::error::NotifyError;

/// A script.
///
/// The step list is an immutable snapshot. Replacing it never affects an
/// execution that already started.
#[derive(Debug, Clone)]
pub struct Script {
    /// Row id, once saved
    pub id: Option<i64>,
    /// Stable external identifier
    pub identifier: String,
    /// Tenant
    pub shop: ShopId,
    /// Event the script listens to
    pub event_identifier: String,
    /// Display name
    pub name: String,
    /// Whether the runner picks the script up
    pub enabled: bool,
    /// Script template the script was created from
    pub template: Option<String>,
    /// Creation time
    pub created_on: DateTime<Utc>,
    steps: Arc<Vec<Step>>,
}

impl Script {
    /// Create a disabled script without steps.
    #[must_use]
    pub fn new(shop: ShopId, event_identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            identifier: Uuid::new_v4().simple().to_string(),
            shop,
            event_identifier: event_identifier.into(),
            name: name.into(),
            enabled: false,
            template: None,
            created_on: Utc::now(),
            steps: Arc::new(Vec::new()),
        }
    }

    /// Set the identifier.
    #[must_use]
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Set the enabled flag.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the steps.
    #[must_use]
    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.set_steps(steps);
        self
    }

    /// Current step snapshot.
    #[must_use]
    pub fn steps(&self) -> Arc<Vec<Step>> {
        Arc::clone(&self.steps)
    }

    /// Replace the whole step list.
    pub fn set_steps(&mut self, steps: Vec<Step>) {
        self.steps = Arc::new(steps);
    }

    /// Steps in their persisted form.
    #[must_use]
    pub fn get_serialized_steps(&self) -> Vec<StepRecord> {
        self.steps.iter().map(Step::serialize).collect()
    }

    /// Replace the step list from its persisted form.
    ///
    /// Nothing changes if any step fails to load.
    ///
    /// # Errors
    ///
    /// Returns an error if an item is unknown or misses a required binding.
    pub fn set_serialized_steps(
        &mut self,
        registry: &Registry,
        records: Vec<StepRecord>,
    ) -> Result<(), NotifyError> {
        let steps = records
            .into_iter()
            .map(|record| Step::unserialize(registry, record))
            .collect::<Result<Vec<_>, _>>()?;
        self.set_steps(steps);
        Ok(())
    }

    /// Run the steps in order until one emits `Stop`.
    ///
    /// # Errors
    ///
    /// Returns the first action error.
    pub fn execute(&self, context: &mut Context) -> Result<ScriptReport, NotifyError> {
        let steps = self.steps();
        let mut report = ScriptReport::default();

        for (index, step) in steps.iter().enumerate() {
            let result = step.execute(context)?;
            report.steps_evaluated += 1;
            if result.state == StepState::Executed {
                report.steps_executed += 1;
            }
            if result.next == StepNext::Stop {
                debug!(target: "notify", script = %self.identifier, step = index, "Script stopped");
                report.stopped_at = Some(index);
                break;
            }
        }

        Ok(report)
    }

    /// List binding problems against the event the script listens to.
    ///
    /// Reports variable references the event does not declare and variables
    /// whose type cannot feed the binding. The problems are not fatal.
    #[must_use]
    pub fn check(&self, event: &EventSpec) -> Vec<String> {
        let mut problems = Vec::new();
        if event.identifier != self.event_identifier {
            problems.push(format!(
                "Script listens to `{}`, checked against `{}`",
                self.event_identifier, event.identifier
            ));
        }

        for (index, step) in self.steps.iter().enumerate() {
            let items = step
                .conditions
                .iter()
                .map(|c| (c.spec(), c.data()))
                .chain(step.actions.iter().map(|a| (a.spec(), a.data())));

            for (spec, data) in items {
                for binding in &spec.bindings {
                    let Some(name) = data
                        .get(binding.name())
                        .and_then(|value| value.variable.as_deref())
                        .filter(|_| binding.allow_variable())
                    else {
                        continue;
                    };
                    match event.get_variable(name) {
                        None => problems.push(format!(
                            "Step {}: `{}.{}` uses unknown variable `{name}`",
                            index + 1,
                            spec.identifier,
                            binding.name()
                        )),
                        Some(variable) if !binding.ty().is_coercible_from(&variable.ty) => {
                            problems.push(format!(
                                "Step {}: `{}.{}` expects {}, `{name}` is {}",
                                index + 1,
                                spec.identifier,
                                binding.name(),
                                binding.ty().name(),
                                variable.ty.name()
                            ));
                        }
                        Some(_) => {}
                    }
                }
            }
        }

        problems
    }
}

/// Result of executing a script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScriptReport {
    /// Steps that were looked at
    pub steps_evaluated: usize,
    /// Steps whose actions ran
    pub steps_executed: usize,
    /// Index of the step that stopped the script
    pub stopped_at: Option<usize>,
}

/// Portable form of a script, used for import and export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptDocument {
    /// Stable external identifier; a fresh one is made when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Event the script listens to
    pub event_identifier: String,
    /// Display name
    pub name: String,
    /// Whether the runner picks the script up
    #[serde(default)]
    pub enabled: bool,
    /// Script template the script was created from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template: Option<String>,
    /// Steps in their persisted form
    #[serde(default)]
    pub steps: Vec<StepRecord>,
}

impl ScriptDocument {
    /// Capture a script.
    #[must_use]
    pub fn from_script(script: &Script) -> Self {
        Self {
            identifier: Some(script.identifier.clone()),
            event_identifier: script.event_identifier.clone(),
            name: script.name.clone(),
            enabled: script.enabled,
            template: script.template.clone(),
            steps: script.get_serialized_steps(),
        }
    }

    /// Build a script of `shop` from the document.
    ///
    /// # Errors
    ///
    /// Returns an error if the event or a step item is unknown.
    pub fn into_script(self, registry: &Registry, shop: ShopId) -> Result<Script, NotifyError> {
        registry.event(&self.event_identifier)?;

        let mut script = Script::new(shop, self.event_identifier, self.name).with_enabled(self.enabled);
        if let Some(identifier) = self.identifier.filter(|id| !id.trim().is_empty()) {
            script = script.with_identifier(identifier);
        }
        script.template = self.template;
        script.set_serialized_steps(registry, self.steps)?;
        Ok(script)
    }
}

/// Persistence of scripts.
pub trait ScriptStore: Send + Sync {
    /// Scripts of `shop` listening to an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the scripts cannot be read.
    fn load(
        &self,
        registry: &Registry,
        event_identifier: &str,
        shop: ShopId,
        enabled_only: bool,
    ) -> Result<Vec<Script>, NotifyError>;

    /// Insert or update a script, assigning its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be written.
    fn save(&self, script: &mut Script) -> Result<(), NotifyError>;

    /// Get a script by identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be read.
    fn get(&self, registry: &Registry, identifier: &str) -> Result<Option<Script>, NotifyError>;

    /// All scripts, optionally of one shop.
    ///
    /// # Errors
    ///
    /// Returns an error if the scripts cannot be read.
    fn list(&self, registry: &Registry, shop: Option<ShopId>) -> Result<Vec<Script>, NotifyError>;

    /// Delete a script. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the script cannot be deleted.
    fn delete(&self, identifier: &str) -> Result<bool, NotifyError>;
}

/// Script store kept in memory.
#[derive(Debug, Default)]
pub struct MemoryScriptStore {
    scripts: Mutex<Vec<Script>>,
}

impl MemoryScriptStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl ScriptStore for MemoryScriptStore {
    fn load(
        &self,
        _registry: &Registry,
        event_identifier: &str,
        shop: ShopId,
        enabled_only: bool,
    ) -> Result<Vec<Script>, NotifyError> {
        let scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(scripts
            .iter()
            .filter(|s| s.event_identifier == event_identifier && s.shop == shop)
            .filter(|s| s.enabled || !enabled_only)
            .cloned()
            .collect())
    }

    fn save(&self, script: &mut Script) -> Result<(), NotifyError> {
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(existing) = scripts.iter_mut().find(|s| s.identifier == script.identifier) {
            script.id = existing.id;
            *existing = script.clone();
        } else {
            script.id = Some(i64::try_from(scripts.len()).unwrap_or(i64::MAX) + 1);
            scripts.push(script.clone());
        }
        Ok(())
    }

    fn get(&self, _registry: &Registry, identifier: &str) -> Result<Option<Script>, NotifyError> {
        let scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(scripts.iter().find(|s| s.identifier == identifier).cloned())
    }

    fn list(&self, _registry: &Registry, shop: Option<ShopId>) -> Result<Vec<Script>, NotifyError> {
        let scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(scripts
            .iter()
            .filter(|s| shop.map_or(true, |shop| s.shop == shop))
            .cloned()
            .collect())
    }

    fn delete(&self, identifier: &str) -> Result<bool, NotifyError> {
        let mut scripts = self.scripts.lock().unwrap_or_else(PoisonError::into_inner);
        let before = scripts.len();
        scripts.retain(|s| s.identifier != identifier);
        Ok(scripts.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::events;
    use crate::notify::item::ItemRecord;
    use crate::notify::variable::BindingValue;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::with_defaults().unwrap()
    }

    fn flag_step(registry: &Registry, flag: &str, next: StepNext) -> Step {
        let action = registry
            .load_action(ItemRecord::new("set_debug_flag").bind("flag_name", BindingValue::constant(flag)))
            .unwrap();
        Step::new(Vec::new(), vec![action]).with_next(next)
    }

    #[test]
    fn test_new_script_is_disabled() {
        let script = Script::new(ShopId(1), "order_received", "Test");
        assert!(!script.enabled);
        assert_eq!(script.identifier.len(), 32);
        assert_ne!(script.identifier, Script::new(ShopId(1), "order_received", "Test").identifier);
    }

    #[test]
    fn test_stop_halts_script() {
        let registry = registry();
        let script = Script::new(ShopId(1), "order_received", "Test").with_steps(vec![
            flag_step(&registry, "first", StepNext::Continue),
            flag_step(&registry, "second", StepNext::Stop),
            flag_step(&registry, "third", StepNext::Continue),
        ]);
        let mut ctx = Context::default();

        let report = script.execute(&mut ctx).unwrap();
        assert_eq!(report.steps_evaluated, 2);
        assert_eq!(report.stopped_at, Some(1));
        assert_eq!(ctx.get("second"), Some(&json!(true)));
        assert_eq!(ctx.get("third"), None);
    }

    #[test]
    fn test_empty_script_is_noop() {
        let script = Script::new(ShopId(1), "order_received", "Empty");
        let report = script.execute(&mut Context::default()).unwrap();
        assert_eq!(report, ScriptReport::default());
    }

    #[test]
    fn test_snapshot_survives_replacement() {
        let registry = registry();
        let mut script = Script::new(ShopId(1), "order_received", "Test")
            .with_steps(vec![flag_step(&registry, "old", StepNext::Continue)]);
        let snapshot = script.steps();

        script.set_steps(Vec::new());
        assert_eq!(snapshot.len(), 1);
        assert!(script.steps().is_empty());
    }

    #[test]
    fn test_serialized_steps_round_trip() {
        let registry = registry();
        let raw = json!([{
            "conditions": [{"identifier": "text_equal", "v1": {"variable": "new_status"}, "v2": {"constant": "shipped"}}],
            "actions": [{"identifier": "set_debug_flag", "flag_name": {"constant": "seen"}}],
            "next": "stop",
            "cond_op": "all",
            "enabled": true
        }]);
        let mut script = Script::new(ShopId(1), "order_status_changed", "Test");
        script
            .set_serialized_steps(&registry, serde_json::from_value(raw.clone()).unwrap())
            .unwrap();

        assert_eq!(serde_json::to_value(script.get_serialized_steps()).unwrap(), raw);
    }

    #[test]
    fn test_bad_serialized_steps_keep_old_steps() {
        let registry = registry();
        let mut script = Script::new(ShopId(1), "order_received", "Test")
            .with_steps(vec![flag_step(&registry, "kept", StepNext::Continue)]);
        let records = vec![StepRecord {
            actions: vec![ItemRecord::new("add_order_log_entry")],
            ..StepRecord::default()
        }];

        let err = script.set_serialized_steps(&registry, records).unwrap_err();
        assert!(matches!(err, NotifyError::MissingBinding { .. }));
        assert_eq!(script.steps().len(), 1);
    }

    #[test]
    fn test_check_reports_unknown_and_incompatible_variables() {
        let registry = registry();
        let records: Vec<StepRecord> = serde_json::from_value(json!([{
            "conditions": [{"identifier": "language_equal", "v1": {"variable": "lang"}, "v2": {"constant": "fi"}}],
            "actions": [{"identifier": "add_order_log_entry", "order": {"variable": "customer_email"}, "message": {"constant": "Hi"}}]
        }]))
        .unwrap();
        let mut script = Script::new(ShopId(1), "order_received", "Test");
        script.set_serialized_steps(&registry, records).unwrap();

        let problems = script.check(&events::order_received());
        assert_eq!(problems.len(), 2);
        assert!(problems[0].contains("unknown variable `lang`"));
        assert!(problems[1].contains("`customer_email` is Email Address"));
    }

    #[test]
    fn test_memory_store_filters() {
        let registry = registry();
        let store = MemoryScriptStore::new();
        let mut enabled = Script::new(ShopId(1), "order_received", "On").with_enabled(true);
        let mut disabled = Script::new(ShopId(1), "order_received", "Off");
        let mut other_shop = Script::new(ShopId(2), "order_received", "Other").with_enabled(true);
        store.save(&mut enabled).unwrap();
        store.save(&mut disabled).unwrap();
        store.save(&mut other_shop).unwrap();

        let loaded = store.load(&registry, "order_received", ShopId(1), true).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].name, "On");
        assert_eq!(store.load(&registry, "order_received", ShopId(1), false).unwrap().len(), 2);
        assert!(store.delete(&disabled.identifier).unwrap());
        assert!(!store.delete(&disabled.identifier).unwrap());
    }

    #[test]
    fn test_document_keeps_steps_and_identifier() {
        let registry = registry();
        let script = Script::new(ShopId(1), "order_received", "Flags")
            .with_identifier("flags")
            .with_steps(vec![flag_step(&registry, "first", StepNext::Stop)]);

        let text = serde_json::to_string(&ScriptDocument::from_script(&script)).unwrap();
        let document: ScriptDocument = serde_json::from_str(&text).unwrap();
        let imported = document.into_script(&registry, ShopId(2)).unwrap();

        assert_eq!(imported.identifier, "flags");
        assert_eq!(imported.shop, ShopId(2));
        assert_eq!(imported.get_serialized_steps(), script.get_serialized_steps());
    }

    #[test]
    fn test_document_for_unknown_event_is_rejected() {
        let document: ScriptDocument =
            serde_json::from_value(json!({"event_identifier": "nope", "name": "x"})).unwrap();
        assert!(matches!(
            document.into_script(&registry(), ShopId(1)),
            Err(NotifyError::UnknownItem { .. })
        ));
    }
}
