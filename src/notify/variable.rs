//! Variables published by events and bindings declared by script items.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{warn, Level};

use super::context::Context;
use super::enums::ConstantUse;
use super::template::render_in_context;
use super::typology::Type;

static CREATION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A typed, named value slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    /// Variable name
    pub name: String,
    /// Value type
    pub ty: Type,
    /// Whether a value must be present
    pub required: bool,
    /// Description for editors
    pub help_text: String,
    position: u64,
}

impl Variable {
    /// Create a required variable.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
            required: true,
            help_text: String::new(),
            position: CREATION_COUNTER.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Mark the variable optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.help_text = text.into();
        self
    }

    /// Creation order, used for stable listing.
    #[must_use]
    pub const fn position(&self) -> u64 {
        self.position
    }
}

/// How a binding is satisfied in persisted item data.
///
/// Normally exactly one field is set. When both are, `constant` wins if the
/// binding allows constants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BindingValue {
    /// Literal constant
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constant: Option<Value>,
    /// Name of a context variable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
}

impl BindingValue {
    /// Bind to a constant.
    #[must_use]
    pub fn constant(value: impl Into<Value>) -> Self {
        Self {
            constant: Some(value.into()),
            variable: None,
        }
    }

    /// Bind to a context variable.
    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self {
            constant: None,
            variable: Some(name.into()),
        }
    }

    /// Whether either field is set.
    #[must_use]
    pub const fn is_set(&self) -> bool {
        self.constant.is_some() || self.variable.is_some()
    }
}

/// An input slot declared by a condition or action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The underlying variable description
    pub variable: Variable,
    /// Whether constants, variables or both are accepted
    pub constant_use: ConstantUse,
    /// Value used when nothing is bound
    pub default: Value,
    templated: bool,
}

impl Binding {
    /// Create an optional, variable-only binding.
    #[must_use]
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            variable: Variable::new(name, ty).optional(),
            constant_use: ConstantUse::VariableOnly,
            default: Value::Null,
            templated: false,
        }
    }

    /// Create a binding whose constant is rendered as a template.
    ///
    /// Template sources may only come from constants, never from variables.
    #[must_use]
    pub fn templated(name: impl Into<String>, ty: Type) -> Self {
        Self {
            constant_use: ConstantUse::ConstantOnly,
            templated: true,
            ..Self::new(name, ty)
        }
    }

    /// Mark the binding required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.variable.required = true;
        self
    }

    /// Set the constant use policy.
    #[must_use]
    pub const fn constant_use(mut self, constant_use: ConstantUse) -> Self {
        self.constant_use = constant_use;
        self
    }

    /// Set the default value.
    #[must_use]
    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = value.into();
        self
    }

    /// Set help text.
    #[must_use]
    pub fn help_text(mut self, text: impl Into<String>) -> Self {
        self.variable.help_text = text.into();
        self
    }

    /// Binding name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.variable.name
    }

    /// Binding type.
    #[must_use]
    pub const fn ty(&self) -> &Type {
        &self.variable.ty
    }

    /// Whether the binding must be present in item data.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        self.variable.required
    }

    /// Whether this is a templated binding.
    #[must_use]
    pub const fn is_templated(&self) -> bool {
        self.templated
    }

    /// Whether a constant may satisfy the binding.
    #[must_use]
    pub const fn allow_constant(&self) -> bool {
        self.constant_use.allows_constant()
    }

    /// Whether a variable may satisfy the binding.
    #[must_use]
    pub const fn allow_variable(&self) -> bool {
        self.constant_use.allows_variable()
    }

    /// Resolve the binding against a context.
    ///
    /// Never fails: anything that cannot be resolved yields the default.
    #[must_use]
    pub fn get_value(&self, context: &Context, bind_data: Option<&BindingValue>) -> Value {
        let value = self.resolve(context, bind_data);
        if !self.templated {
            return value;
        }
        if let Value::String(source) = &value {
            return match render_in_context(context, source) {
                Ok(rendered) => Value::String(rendered),
                Err(e) => {
                    warn!(target: "notify", binding = self.name(), "Template error, using raw source: {e}");
                    value.clone()
                }
            };
        }
        value
    }

    fn resolve(&self, context: &Context, bind_data: Option<&BindingValue>) -> Value {
        let Some(data) = bind_data else {
            return self.default.clone();
        };
        if let Some(constant) = data.constant.as_ref().filter(|_| self.allow_constant()) {
            return match self.ty().unserialize(constant) {
                // Enum constants outside the member list fall back to the default
                Ok(Value::Null) if matches!(self.ty(), Type::Enum(_)) => {
                    context.log(
                        Level::WARN,
                        format!("Binding `{}`: {constant} is not a known choice", self.name()),
                    );
                    self.default.clone()
                }
                Ok(value) => value,
                Err(e) => {
                    context.log(Level::WARN, format!("Binding `{}`: {e}", self.name()));
                    self.default.clone()
                }
            };
        }
        if let Some(name) = data.variable.as_deref().filter(|_| self.allow_variable()) {
            return context.get_or(name, self.default.clone());
        }
        self.default.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn context() -> Context {
        Context::from_variables([("name", json!("variable value")), ("count", json!(5))])
    }

    #[test]
    fn test_constant_wins_over_variable() {
        let binding = Binding::new("v", Type::Text).constant_use(ConstantUse::VariableOrConstant);
        let data = BindingValue {
            constant: Some(json!("constant value")),
            variable: Some("name".to_string()),
        };
        assert_eq!(binding.get_value(&context(), Some(&data)), json!("constant value"));
    }

    #[test]
    fn test_unknown_enum_constant_uses_default() {
        let binding = Binding::new("priority", Type::Enum(&crate::notify::enums::PRIORITY))
            .constant_use(ConstantUse::ConstantOnly)
            .default_value(1);
        let data = BindingValue::constant(99);
        assert_eq!(binding.get_value(&context(), Some(&data)), json!(1));

        let known = BindingValue::constant(2);
        assert_eq!(binding.get_value(&context(), Some(&known)), json!(2));
    }

    #[test]
    fn test_variable_only_ignores_constant() {
        let binding = Binding::new("v", Type::Text);
        let data = BindingValue {
            constant: Some(json!("constant value")),
            variable: Some("name".to_string()),
        };
        assert_eq!(binding.get_value(&context(), Some(&data)), json!("variable value"));
    }

    #[test]
    fn test_constant_only_ignores_variable() {
        let binding = Binding::new("v", Type::Text)
            .constant_use(ConstantUse::ConstantOnly)
            .default_value("fallback");
        let data = BindingValue::variable("name");
        assert_eq!(binding.get_value(&context(), Some(&data)), json!("fallback"));
    }

    #[test]
    fn test_missing_data_yields_default() {
        let binding = Binding::new("v", Type::Integer).default_value(7);
        assert_eq!(binding.get_value(&context(), None), json!(7));
        assert_eq!(
            binding.get_value(&context(), Some(&BindingValue::variable("nope"))),
            json!(7)
        );
    }

    #[test]
    fn test_bad_constant_yields_default() {
        let binding = Binding::new("v", Type::Integer)
            .constant_use(ConstantUse::ConstantOnly)
            .default_value(1);
        let ctx = context();
        assert_eq!(binding.get_value(&ctx, Some(&BindingValue::constant("many"))), json!(1));
        assert_eq!(ctx.log_records().len(), 1);
    }

    #[test]
    fn test_templated_binding_renders_constant() {
        let binding = Binding::templated("message", Type::Text);
        let data = BindingValue::constant("Count is {{ count }}");
        assert_eq!(binding.get_value(&context(), Some(&data)), json!("Count is 5"));
    }

    #[test]
    fn test_templated_binding_returns_source_on_syntax_error() {
        let binding = Binding::templated("message", Type::Text);
        let data = BindingValue::constant("Broken {{ count");
        assert_eq!(binding.get_value(&context(), Some(&data)), json!("Broken {{ count"));
    }

    #[test]
    fn test_positions_are_monotonic() {
        let first = Variable::new("a", Type::Text);
        let second = Variable::new("b", Type::Text);
        assert!(second.position() > first.position());
    }

    #[test]
    fn test_binding_value_shape() {
        assert_eq!(
            serde_json::to_value(BindingValue::variable("order")).unwrap(),
            json!({"variable": "order"})
        );
        let parsed: BindingValue = serde_json::from_value(json!({"constant": "fi"})).unwrap();
        assert_eq!(parsed, BindingValue::constant("fi"));
    }
}
