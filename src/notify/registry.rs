//! Provider registry.
//!
//! Condition kinds, action kinds, events and script templates are looked up
//! by identifier within their category. The registry is filled explicitly at
//! startup, usually through [`Registry::with_defaults`].

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use super::event::EventSpec;
use super::item::{Action, ActionKind, Condition, ConditionKind, ItemRecord, ItemSpec};
use super::script_template::ScriptTemplate;
use super::{actions, conditions, events, script_template};
use crate::error::NotifyError;

/// Provider category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// `notify_condition`
    Condition,
    /// `notify_action`
    Action,
    /// `notify_event`
    Event,
    /// `notify_script_template`
    ScriptTemplate,
}

impl Category {
    /// Every category.
    pub const ALL: [Self; 4] = [Self::Condition, Self::Action, Self::Event, Self::ScriptTemplate];

    /// Category key.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Condition => "notify_condition",
            Self::Action => "notify_action",
            Self::Event => "notify_event",
            Self::ScriptTemplate => "notify_script_template",
        }
    }

    /// Parse a category key, with or without the `notify_` prefix.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let key = s.trim().to_lowercase();
        let key = key.strip_prefix("notify_").unwrap_or(&key);
        match key.replace('-', "_").as_str() {
            "condition" | "conditions" => Some(Self::Condition),
            "action" | "actions" => Some(Self::Action),
            "event" | "events" => Some(Self::Event),
            "script_template" | "script_templates" | "template" | "templates" => {
                Some(Self::ScriptTemplate)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Summary of a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderInfo {
    /// Category
    pub category: Category,
    /// Identifier
    pub identifier: String,
    /// Display name
    pub name: String,
    /// Description
    pub description: String,
}

/// Registry of providers by category.
#[derive(Default)]
pub struct Registry {
    conditions: BTreeMap<String, Arc<dyn ConditionKind>>,
    actions: BTreeMap<String, Arc<dyn ActionKind>>,
    events: BTreeMap<String, Arc<EventSpec>>,
    script_templates: BTreeMap<String, Arc<dyn ScriptTemplate>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding every built-in provider.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in definition is invalid.
    pub fn with_defaults() -> Result<Self, NotifyError> {
        let mut registry = Self::new();
        conditions::register_all(&mut registry)?;
        actions::register_all(&mut registry)?;
        for spec in events::builtin() {
            registry.register_event(spec)?;
        }
        script_template::register_all(&mut registry)?;
        Ok(registry)
    }

    /// Register a condition kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind's declaration is invalid or its
    /// identifier is taken.
    pub fn register_condition<K: ConditionKind + 'static>(&mut self, kind: K) -> Result<(), NotifyError> {
        kind.spec().validate()?;
        let identifier = kind.spec().identifier.clone();
        let kind: Arc<dyn ConditionKind> = Arc::new(kind);
        insert(&mut self.conditions, Category::Condition, identifier, kind)
    }

    /// Register an action kind.
    ///
    /// # Errors
    ///
    /// Returns an error if the kind's declaration is invalid or its
    /// identifier is taken.
    pub fn register_action<K: ActionKind + 'static>(&mut self, kind: K) -> Result<(), NotifyError> {
        kind.spec().validate()?;
        let identifier = kind.spec().identifier.clone();
        let kind: Arc<dyn ActionKind> = Arc::new(kind);
        insert(&mut self.actions, Category::Action, identifier, kind)
    }

    /// Register an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the declaration is invalid or its identifier is
    /// taken.
    pub fn register_event(&mut self, spec: EventSpec) -> Result<(), NotifyError> {
        spec.validate()?;
        let identifier = spec.identifier.clone();
        insert(&mut self.events, Category::Event, identifier, Arc::new(spec))
    }

    /// Register a script template.
    ///
    /// # Errors
    ///
    /// Returns an error if the identifier is empty or taken.
    pub fn register_script_template<T: ScriptTemplate + 'static>(
        &mut self,
        template: T,
    ) -> Result<(), NotifyError> {
        let identifier = template.identifier().to_string();
        if identifier.trim().is_empty() {
            return Err(NotifyError::MissingIdentifier);
        }
        let template: Arc<dyn ScriptTemplate> = Arc::new(template);
        insert(&mut self.script_templates, Category::ScriptTemplate, identifier, template)
    }

    /// List the providers of a category, sorted by identifier.
    #[must_use]
    pub fn list(&self, category: Category) -> Vec<ProviderInfo> {
        match category {
            Category::Condition => self
                .conditions
                .values()
                .map(|k| item_info(category, k.spec()))
                .collect(),
            Category::Action => self
                .actions
                .values()
                .map(|k| item_info(category, k.spec()))
                .collect(),
            Category::Event => self.events.values().map(|e| event_info(e)).collect::<Vec<_>>(),
            Category::ScriptTemplate => self
                .script_templates
                .values()
                .map(|t| template_info(t.as_ref()))
                .collect(),
        }
    }

    /// Look up one provider.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` if nothing is registered under `identifier`.
    pub fn lookup(&self, category: Category, identifier: &str) -> Result<ProviderInfo, NotifyError> {
        match category {
            Category::Condition => self.condition(identifier).map(|k| item_info(category, k.spec())),
            Category::Action => self.action(identifier).map(|k| item_info(category, k.spec())),
            Category::Event => self.event(identifier).map(|e| event_info(&e)),
            Category::ScriptTemplate => self
                .script_template(identifier)
                .map(|t| template_info(t.as_ref())),
        }
    }

    /// Get a condition kind.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` if it is not registered.
    pub fn condition(&self, identifier: &str) -> Result<Arc<dyn ConditionKind>, NotifyError> {
        get(&self.conditions, Category::Condition, identifier)
    }

    /// Get an action kind.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` if it is not registered.
    pub fn action(&self, identifier: &str) -> Result<Arc<dyn ActionKind>, NotifyError> {
        get(&self.actions, Category::Action, identifier)
    }

    /// Get an event declaration.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` if it is not registered.
    pub fn event(&self, identifier: &str) -> Result<Arc<EventSpec>, NotifyError> {
        get(&self.events, Category::Event, identifier)
    }

    /// Get a script template.
    ///
    /// # Errors
    ///
    /// Returns `UnknownItem` if it is not registered.
    pub fn script_template(&self, identifier: &str) -> Result<Arc<dyn ScriptTemplate>, NotifyError> {
        get(&self.script_templates, Category::ScriptTemplate, identifier)
    }

    /// Build a condition from its persisted record.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier`, `UnknownItem` or `MissingBinding`.
    pub fn load_condition(&self, record: ItemRecord) -> Result<Condition, NotifyError> {
        if record.identifier.is_empty() {
            return Err(NotifyError::MissingIdentifier);
        }
        let kind = self.condition(&record.identifier)?;
        Condition::from_record(kind, record)
    }

    /// Build an action from its persisted record.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier`, `UnknownItem` or `MissingBinding`.
    pub fn load_action(&self, record: ItemRecord) -> Result<Action, NotifyError> {
        if record.identifier.is_empty() {
            return Err(NotifyError::MissingIdentifier);
        }
        let kind = self.action(&record.identifier)?;
        Action::from_record(kind, record)
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("conditions", &self.conditions.keys().collect::<Vec<_>>())
            .field("actions", &self.actions.keys().collect::<Vec<_>>())
            .field("events", &self.events.keys().collect::<Vec<_>>())
            .field("script_templates", &self.script_templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn insert<V: ?Sized>(
    map: &mut BTreeMap<String, Arc<V>>,
    category: Category,
    identifier: String,
    value: Arc<V>,
) -> Result<(), NotifyError> {
    if map.contains_key(&identifier) {
        return Err(NotifyError::DuplicateIdentifier {
            category: category.as_str(),
            identifier,
        });
    }
    debug!(target: "notify", "Registering {category}: {identifier}");
    map.insert(identifier, value);
    Ok(())
}

fn get<V: ?Sized>(
    map: &BTreeMap<String, Arc<V>>,
    category: Category,
    identifier: &str,
) -> Result<Arc<V>, NotifyError> {
    map.get(identifier).cloned().ok_or_else(|| {
        warn!(target: "notify", "Unknown {category}: {identifier}");
        NotifyError::UnknownItem {
            category: category.as_str(),
            identifier: identifier.to_string(),
        }
    })
}

fn item_info(category: Category, spec: &ItemSpec) -> ProviderInfo {
    ProviderInfo {
        category,
        identifier: spec.identifier.clone(),
        name: spec.name.clone(),
        description: spec.description.clone(),
    }
}

fn event_info(spec: &EventSpec) -> ProviderInfo {
    ProviderInfo {
        category: Category::Event,
        identifier: spec.identifier.clone(),
        name: spec.name.clone(),
        description: spec.description.clone(),
    }
}

fn template_info(template: &dyn ScriptTemplate) -> ProviderInfo {
    ProviderInfo {
        category: Category::ScriptTemplate,
        identifier: template.identifier().to_string(),
        name: template.name().to_string(),
        description: template.description().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::conditions::TextEqual;
    use crate::notify::variable::BindingValue;

    #[test]
    fn test_defaults_cover_every_category() {
        let registry = Registry::with_defaults().unwrap();
        for category in Category::ALL {
            assert!(!registry.list(category).is_empty(), "{category} is empty");
        }
        assert!(registry.lookup(Category::Condition, "language_equal").is_ok());
        assert!(registry.lookup(Category::Action, "send_email").is_ok());
        assert!(registry.lookup(Category::Event, "order_received").is_ok());
    }

    #[test]
    fn test_unknown_identifier() {
        let registry = Registry::with_defaults().unwrap();
        let err = registry.lookup(Category::Action, "launch_rocket").unwrap_err();
        assert!(matches!(
            err,
            NotifyError::UnknownItem { category: "notify_action", .. }
        ));
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = Registry::new();
        registry.register_condition(TextEqual::new()).unwrap();
        let err = registry.register_condition(TextEqual::new()).unwrap_err();
        assert!(matches!(err, NotifyError::DuplicateIdentifier { .. }));
    }

    #[test]
    fn test_load_condition() {
        let registry = Registry::with_defaults().unwrap();
        let record = ItemRecord::new("text_equal")
            .bind("v1", BindingValue::variable("name"))
            .bind("v2", BindingValue::constant("Foo"));
        assert_eq!(registry.load_condition(record).unwrap().identifier(), "text_equal");

        let err = registry.load_condition(ItemRecord::default()).unwrap_err();
        assert!(matches!(err, NotifyError::MissingIdentifier));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::parse("notify_condition"), Some(Category::Condition));
        assert_eq!(Category::parse("actions"), Some(Category::Action));
        assert_eq!(Category::parse("script-template"), Some(Category::ScriptTemplate));
        assert_eq!(Category::parse("widgets"), None);
    }
}
