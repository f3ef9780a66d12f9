//! Event definitions and published events.
//!
//! An [`EventSpec`] declares the variables an event publishes. An [`Event`]
//! is one ephemeral occurrence of it, validated against its declaration when it is
//! constructed and never persisted.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use super::context::ShopId;
use super::runner::{RunReport, Runner};
use super::typology::{ModelRef, Type};
use super::variable::Variable;
use crate::error::NotifyError;

/// Declaration of an event type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpec {
    /// Unique identifier, e.g. `order_received`
    pub identifier: String,
    /// Display name
    pub name: String,
    /// Description for editors
    pub description: String,
    variables: Vec<Variable>,
    log_target_variable: Option<String>,
}

impl EventSpec {
    /// Start a new event declaration.
    #[must_use]
    pub fn new(identifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: name.into(),
            description: String::new(),
            variables: Vec::new(),
            log_target_variable: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Declare a variable.
    #[must_use]
    pub fn variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// Embed a shared base map of variables.
    #[must_use]
    pub fn variables_from(mut self, base: impl IntoIterator<Item = Variable>) -> Self {
        self.variables.extend(base);
        self
    }

    /// Name the variable whose value receives audit log entries.
    #[must_use]
    pub fn log_target(mut self, variable: impl Into<String>) -> Self {
        self.log_target_variable = Some(variable.into());
        self
    }

    /// Declared variables in creation order.
    #[must_use]
    pub fn variables(&self) -> Vec<&Variable> {
        let mut variables: Vec<&Variable> = self.variables.iter().collect();
        variables.sort_by_key(|v| v.position());
        variables
    }

    /// Look up a declared variable.
    #[must_use]
    pub fn get_variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Name of the log target variable.
    #[must_use]
    pub fn log_target_variable(&self) -> Option<&str> {
        self.log_target_variable.as_deref()
    }

    /// Check the declaration for consistency.
    ///
    /// # Errors
    ///
    /// Returns `MissingIdentifier` for an empty identifier and
    /// `InvalidDefinition` for duplicate variables or a log target that is
    /// not a declared model variable.
    pub fn validate(&self) -> Result<(), NotifyError> {
        if self.identifier.trim().is_empty() {
            return Err(NotifyError::MissingIdentifier);
        }

        let mut seen = HashSet::new();
        for variable in &self.variables {
            if !seen.insert(variable.name.as_str()) {
                return Err(self.invalid(format!("variable `{}` declared twice", variable.name)));
            }
        }

        if let Some(target) = &self.log_target_variable {
            match self.get_variable(target) {
                Some(Variable { ty: Type::Model(_), .. }) => {}
                Some(_) => return Err(self.invalid(format!("log target `{target}` is not a model"))),
                None => return Err(self.invalid(format!("log target `{target}` is not declared"))),
            }
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

/// One occurrence of an event.
#[derive(Debug, Clone)]
pub struct Event {
    spec: Arc<EventSpec>,
    variable_values: BTreeMap<String, Value>,
    log_target: Option<ModelRef>,
}

impl Event {
    /// Construct an event, converting every value to its declared type.
    ///
    /// Optional variables that are not given are published as `null`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownVariable` for keys the event does not declare,
    /// `MissingVariable` when a required variable is absent or `null`, and
    /// `InvalidValue` when a value does not fit its type.
    pub fn new<I, K>(spec: Arc<EventSpec>, values: I) -> Result<Self, NotifyError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut given: BTreeMap<String, Value> =
            values.into_iter().map(|(k, v)| (k.into(), v)).collect();

        if let Some(unknown) = given.keys().find(|name| spec.get_variable(name).is_none()) {
            return Err(NotifyError::UnknownVariable {
                event: spec.identifier.clone(),
                variable: unknown.clone(),
            });
        }

        let mut variable_values = BTreeMap::new();
        for variable in spec.variables() {
            let raw = given.remove(&variable.name).unwrap_or(Value::Null);
            let value = variable
                .ty
                .unserialize(&raw)
                .map_err(|source| NotifyError::InvalidValue {
                    name: variable.name.clone(),
                    source,
                })?;
            if value.is_null() && variable.required {
                return Err(NotifyError::MissingVariable {
                    event: spec.identifier.clone(),
                    variable: variable.name.clone(),
                });
            }
            variable_values.insert(variable.name.clone(), value);
        }

        let log_target = spec
            .log_target_variable()
            .and_then(|name| variable_values.get(name))
            .and_then(ModelRef::from_value);

        Ok(Self {
            spec,
            variable_values,
            log_target,
        })
    }

    /// Event identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.spec.identifier
    }

    /// The event's declaration.
    #[must_use]
    pub fn spec(&self) -> &EventSpec {
        &self.spec
    }

    /// Published values by variable name.
    #[must_use]
    pub const fn variable_values(&self) -> &BTreeMap<String, Value> {
        &self.variable_values
    }

    /// Get one published value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variable_values.get(name)
    }

    /// Entity receiving audit log entries, if any.
    #[must_use]
    pub const fn log_target(&self) -> Option<&ModelRef> {
        self.log_target.as_ref()
    }

    /// Publish the event to every enabled script of `shop`.
    ///
    /// # Errors
    ///
    /// See [`Runner::run`].
    pub fn run(&self, runner: &Runner, shop: ShopId) -> Result<RunReport, NotifyError> {
        runner.run(self, shop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> Arc<EventSpec> {
        Arc::new(
            EventSpec::new("order_received", "Order Received")
                .variable(Variable::new("order", Type::model("shop.order")))
                .variable(Variable::new("customer_email", Type::Email).optional())
                .variable(Variable::new("language", Type::Language).optional())
                .log_target("order"),
        )
    }

    #[test]
    fn test_event_converts_values() {
        let event = Event::new(
            spec(),
            [("order", json!(42)), ("customer_email", json!(" a@example.com "))],
        )
        .unwrap();

        assert_eq!(event.identifier(), "order_received");
        assert_eq!(event.get("customer_email"), Some(&json!("a@example.com")));
        assert_eq!(event.get("language"), Some(&Value::Null));
        assert_eq!(event.log_target(), Some(&ModelRef::new("shop.order", "42")));
    }

    #[test]
    fn test_unknown_variable_is_rejected() {
        let err = Event::new(spec(), [("order", json!(1)), ("coupon", json!("X"))]).unwrap_err();
        assert!(matches!(err, NotifyError::UnknownVariable { variable, .. } if variable == "coupon"));
    }

    #[test]
    fn test_missing_required_variable_is_rejected() {
        let err = Event::new(spec(), [("language", json!("fi"))]).unwrap_err();
        assert!(matches!(err, NotifyError::MissingVariable { variable, .. } if variable == "order"));

        let err = Event::new(spec(), [("order", Value::Null)]).unwrap_err();
        assert!(matches!(err, NotifyError::MissingVariable { .. }));
    }

    #[test]
    fn test_invalid_value_is_rejected() {
        let err = Event::new(spec(), [("order", json!(1)), ("customer_email", json!("nope"))])
            .unwrap_err();
        assert!(matches!(err, NotifyError::InvalidValue { name, .. } if name == "customer_email"));
    }

    #[test]
    fn test_validate() {
        assert!(spec().validate().is_ok());

        let missing_id = EventSpec::new(" ", "Nameless");
        assert!(matches!(missing_id.validate(), Err(NotifyError::MissingIdentifier)));

        let duplicate = EventSpec::new("e", "E")
            .variable(Variable::new("a", Type::Text))
            .variable(Variable::new("a", Type::Integer));
        assert!(matches!(duplicate.validate(), Err(NotifyError::InvalidDefinition { .. })));

        let bad_target = EventSpec::new("e", "E")
            .variable(Variable::new("a", Type::Text))
            .log_target("a");
        assert!(matches!(bad_target.validate(), Err(NotifyError::InvalidDefinition { .. })));
    }

    #[test]
    fn test_variables_keep_declaration_order() {
        let spec = spec();
        let names: Vec<&str> = spec.variables().iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, ["order", "customer_email", "language"]);
    }
}
