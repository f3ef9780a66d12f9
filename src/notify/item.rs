//! Script items: conditions and actions.
//!
//! A registered *kind* declares its bindings once in an [`ItemSpec`] and
//! implements the behavior. A [`ScriptItem`] pairs a kind with the binding
//! data a script supplies for it, and serializes to an [`ItemRecord`]:
//!
//! ```json
//! {"identifier": "text_equal", "v1": {"variable": "name"}, "v2": {"constant": "Foo"}}
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::context::Context;
use super::enums::TemplateUse;
use super::template::{RenderedTemplate, Template, TemplateData, TemplateField, UNILINGUAL_KEY};
use super::variable::{Binding, BindingValue};
use crate::error::NotifyError;

/// Declaration of a condition or action kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSpec {
    /// Unique identifier within its category
    pub identifier: String,
    /// Display name
    pub name: String,
    /// Description for editors
    pub description: String,
    /// Declared bindings
    pub bindings: Vec<Binding>,
    /// Whether the item carries a template
    pub template_use: TemplateUse,
    /// Fields of the template
    pub template_fields: Vec<TemplateField>,
}

impl ItemSpec {
    /// Start a new declaration.
    #[must_use]
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            description: String::new(),
            bindings: Vec::new(),
            template_use: TemplateUse::None,
            template_fields: Vec::new(),
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a binding.
    #[must_use]
    pub fn binding(mut self, binding: Binding) -> Self {
        self.bindings.push(binding);
        self
    }

    /// Declare a template.
    #[must_use]
    pub fn template(mut self, template_use: TemplateUse, fields: Vec<TemplateField>) -> Self {
        self.template_use = template_use;
        self.template_fields = fields;
        self
    }

    /// Look up a binding by name.
    #[must_use]
    pub fn get_binding(&self, name: &str) -> Option<&Binding> {
        self.bindings.iter().find(|b| b.name() == name)
    }

    /// Check the declaration for consistency.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` for an empty identifier and
    /// `InvalidDefinition` for duplicate bindings, templated bindings that
    /// accept variables, or a template without fields.
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.identifier.trim().is_empty() {
            return Err(NotifyError::MissingIdentifier);
        }

        let mut seen = HashSet::new();
        for binding in &self.bindings {
            if !seen.insert(binding.name()) {
                return Err(self.invalid(format!("binding `{}` declared twice", binding.name())));
            }
            if binding.is_templated() && binding.allow_variable() {
                return Err(self.invalid(format!(
                    "templated binding `{}` must not accept variables",
                    binding.name()
                )));
            }
        }

        if self.template_use != TemplateUse::None && self.template_fields.is_empty() {
            return Err(self.invalid("template declared without fields".to_string()));
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> NotifyError {
        NotifyError::InvalidDefinition {
            identifier: self.identifier.clone(),
            reason,
        }
    }
}

/// Anything registered as a condition or action kind.
pub trait ItemKind: Send + Sync {
    /// The kind's declaration.
    fn spec(&self) -> &ItemSpec;
}

/// Behavior of a condition kind.
pub trait ConditionKind: ItemKind {
    /// Evaluate the condition.
    fn test(&self, item: &Condition, context: &Context) -> bool;
}

/// Behavior of an action kind.
pub trait ActionKind: ItemKind {
    /// Perform the action's side effects.
    ///
    /// # Errors
    ///
    /// Returns an error if the action fails; the step and script stop.
    fn execute(&self, item: &Action, context: &mut Context) -> Result<(), NotifyError>;
}

/// Implement [`ItemKind`] and `Default` for kinds that keep their spec in a
/// `spec` field and have a `new` constructor.
macro_rules! item_kind {
    ($($kind:ty),+ $(,)?) => {
        $(
            impl $crate::notify::item::ItemKind for $kind {
                fn spec(&self) -> &$crate::notify::item::ItemSpec {
                    &self.spec
                }
            }

            impl Default for $kind {
                fn default() -> Self {
                    Self::new()
                }
            }
        )+
    };
}

pub(crate) use item_kind;

/// Persisted form of a script item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Kind identifier
    #[serde(default)]
    pub identifier: String,
    /// Template sources, for templated actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_data: Option<TemplateData>,
    /// Binding data by binding name
    #[serde(flatten)]
    pub data: BTreeMap<String, BindingValue>,
}

impl ItemRecord {
    /// Create a record without bindings.
    #[must_use]
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            ..Self::default()
        }
    }

    /// Add binding data.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: BindingValue) -> Self {
        self.data.insert(name.into(), value);
        self
    }

    /// Attach template sources.
    #[must_use]
    pub fn with_template_data(mut self, data: TemplateData) -> Self {
        self.template_data = Some(data);
        self
    }
}

/// A kind together with the binding data a script supplies for it.
pub struct ScriptItem<K: ?Sized> {
    kind: Arc<K>,
    data: BTreeMap<String, BindingValue>,
    template_data: Option<TemplateData>,
}

/// A condition in a step.
pub type Condition = ScriptItem<dyn ConditionKind>;

/// An action in a step.
pub type Action = ScriptItem<dyn ActionKind>;

impl<K: ItemKind + ?Sized> ScriptItem<K> {
    /// Pair a kind with binding data.
    ///
    /// # Errors
    ///
    /// Returns `MissingBinding` if a required binding has no data.
    pub fn new(
        kind: Arc<K>,
        data: BTreeMap<String, BindingValue>,
        template_data: Option<TemplateData>,
    ) -> Result<Self, NotifyError> {
        let item = Self {
            kind,
            data,
            template_data,
        };
        item.verify_bindings()?;
        Ok(item)
    }

    /// Build an item from its persisted record.
    ///
    /// # Errors
    ///
    /// Returns `MissingBinding` if a required binding has no data.
    pub fn from_record(kind: Arc<K>, record: ItemRecord) -> Result<Self, NotifyError> {
        Self::new(kind, record.data, record.template_data)
    }

    /// Check that every required binding is bound.
    ///
    /// # Errors
    ///
    /// Returns `MissingBinding` for the first unbound required binding.
    pub fn verify_bindings(&self) -> Result<(), NotifyError> {
        for binding in &self.spec().bindings {
            let bound = self.data.get(binding.name()).is_some_and(BindingValue::is_set);
            if binding.is_required() && !bound {
                return Err(NotifyError::MissingBinding {
                    identifier: self.identifier().to_string(),
                    binding: binding.name().to_string(),
                });
            }
        }
        Ok(())
    }

    /// The kind's declaration.
    #[must_use]
    pub fn spec(&self) -> &ItemSpec {
        self.kind.spec()
    }

    /// Kind identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.spec().identifier
    }

    /// Binding data.
    #[must_use]
    pub const fn data(&self) -> &BTreeMap<String, BindingValue> {
        &self.data
    }

    /// Template sources.
    #[must_use]
    pub const fn template_data(&self) -> Option<&TemplateData> {
        self.template_data.as_ref()
    }

    /// Resolve a binding against the context.
    ///
    /// Undeclared bindings resolve to `null`.
    #[must_use]
    pub fn get_value(&self, context: &Context, binding_name: &str) -> Value {
        match self.spec().get_binding(binding_name) {
            Some(binding) => binding.get_value(context, self.data.get(binding_name)),
            None => {
                debug!(target: "notify", item = self.identifier(), "No binding named `{binding_name}`");
                Value::Null
            }
        }
    }

    /// Persisted form.
    #[must_use]
    pub fn serialize(&self) -> ItemRecord {
        ItemRecord {
            identifier: self.identifier().to_string(),
            template_data: self.template_data.clone(),
            data: self.data.clone(),
        }
    }
}

impl Condition {
    /// Evaluate the condition.
    #[must_use]
    pub fn test(&self, context: &Context) -> bool {
        self.kind.test(self, context)
    }
}

impl Action {
    /// Run the action.
    ///
    /// # Errors
    ///
    /// Propagates the kind's failure.
    pub fn execute(&self, context: &mut Context) -> Result<(), NotifyError> {
        self.kind.execute(self, context)
    }

    /// Whether the action carries a template.
    #[must_use]
    pub fn template_use(&self) -> TemplateUse {
        self.spec().template_use
    }

    /// Fields of the action's template.
    #[must_use]
    pub fn template_fields(&self) -> &[TemplateField] {
        &self.spec().template_fields
    }

    /// Render the template in the first suitable language.
    ///
    /// Unilingual templates ignore `languages`.
    ///
    /// # Errors
    ///
    /// Returns `NoLanguageMatches` if no language has every required field,
    /// or `InvalidDefinition` if the action has no template.
    pub fn get_template_values<S: AsRef<str>>(
        &self,
        context: &Context,
        languages: &[S],
    ) -> Result<RenderedTemplate, NotifyError> {
        let empty = TemplateData::new();
        let data = self.template_data.as_ref().unwrap_or(&empty);
        let fields = self.template_fields();
        let names: Vec<&str> = fields.iter().map(|f| f.name.as_str()).collect();
        let template = Template::new(context, data, fields);

        match self.template_use() {
            TemplateUse::Multilingual => template.render_first_match(languages, &names),
            TemplateUse::Unilingual => template.render_first_match(&[UNILINGUAL_KEY], &names),
            TemplateUse::None => Err(NotifyError::InvalidDefinition {
                identifier: self.identifier().to_string(),
                reason: "action has no template".to_string(),
            }),
        }
    }
}

impl<K: ?Sized> Clone for ScriptItem<K> {
    fn clone(&self) -> Self {
        Self {
            kind: Arc::clone(&self.kind),
            data: self.data.clone(),
            template_data: self.template_data.clone(),
        }
    }
}

impl<K: ItemKind + ?Sized> PartialEq for ScriptItem<K> {
    fn eq(&self, other: &Self) -> bool {
        self.identifier() == other.identifier()
            && self.data == other.data
            && self.template_data == other.template_data
    }
}

impl<K: ItemKind + ?Sized> fmt::Debug for ScriptItem<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptItem")
            .field("identifier", &self.identifier())
            .field("data", &self.data)
            .field("template_data", &self.template_data)
            .finish()
    }
}
