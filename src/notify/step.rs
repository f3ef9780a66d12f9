//! Steps: condition-guarded groups of actions.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::context::Context;
use super::enums::{StepConditionOperator, StepNext};
use super::item::{Action, Condition, ItemRecord};
use super::registry::Registry;
use crate::error::NotifyError;

/// Persisted form of a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Condition records
    #[serde(default)]
    pub conditions: Vec<ItemRecord>,
    /// Action records
    #[serde(default)]
    pub actions: Vec<ItemRecord>,
    /// What happens after the step matched
    #[serde(default)]
    pub next: StepNext,
    /// How conditions are combined
    #[serde(default)]
    pub cond_op: StepConditionOperator,
    /// Whether the step runs at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl Default for StepRecord {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            actions: Vec::new(),
            next: StepNext::Continue,
            cond_op: StepConditionOperator::All,
            enabled: true,
        }
    }
}

const fn default_enabled() -> bool {
    true
}

/// Outcome state of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepState {
    /// Disabled, or conditions did not match
    Skipped,
    /// Conditions matched and every action ran
    Executed,
}

/// Result of executing a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepResult {
    /// Final state
    pub state: StepState,
    /// Directive for the script
    pub next: StepNext,
}

impl StepResult {
    const fn skipped() -> Self {
        Self {
            state: StepState::Skipped,
            next: StepNext::Continue,
        }
    }
}

/// A condition-guarded list of actions.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// Conditions deciding whether the actions run
    pub conditions: Vec<Condition>,
    /// Actions, run in order
    pub actions: Vec<Action>,
    /// How conditions are combined
    pub cond_op: StepConditionOperator,
    /// What happens after the step matched
    pub next: StepNext,
    /// Whether the step runs at all
    pub enabled: bool,
}

impl Default for Step {
    fn default() -> Self {
        Self {
            conditions: Vec::new(),
            actions: Vec::new(),
            cond_op: StepConditionOperator::All,
            next: StepNext::Continue,
            enabled: true,
        }
    }
}

impl Step {
    /// Create an enabled step.
    #[must_use]
    pub fn new(conditions: Vec<Condition>, actions: Vec<Action>) -> Self {
        Self {
            conditions,
            actions,
            ..Self::default()
        }
    }

    /// Set the condition operator.
    #[must_use]
    pub const fn with_cond_op(mut self, cond_op: StepConditionOperator) -> Self {
        self.cond_op = cond_op;
        self
    }

    /// Set the directive emitted after a match.
    #[must_use]
    pub const fn with_next(mut self, next: StepNext) -> Self {
        self.next = next;
        self
    }

    /// Enable or disable the step.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Whether the conditions match in this context.
    #[must_use]
    pub fn matches(&self, context: &Context) -> bool {
        self.cond_op
            .evaluate(self.conditions.iter().map(|condition| condition.test(context)))
    }

    /// Execute the step.
    ///
    /// Only a matched step can emit `Stop`.
    ///
    /// # Errors
    ///
    /// Returns the first action error; later actions do not run.
    pub fn execute(&self, context: &mut Context) -> Result<StepResult, NotifyError> {
        if !self.enabled {
            debug!(target: "notify", "Step disabled, skipping");
            return Ok(StepResult::skipped());
        }

        if !self.matches(context) {
            debug!(target: "notify", cond_op = ?self.cond_op, "Step conditions not met");
            return Ok(StepResult::skipped());
        }

        for action in &self.actions {
            debug!(target: "notify", action = action.identifier(), "Executing action");
            action.execute(context)?;
        }

        Ok(StepResult {
            state: StepState::Executed,
            next: self.next,
        })
    }

    /// Persisted form.
    #[must_use]
    pub fn serialize(&self) -> StepRecord {
        StepRecord {
            conditions: self.conditions.iter().map(Condition::serialize).collect(),
            actions: self.actions.iter().map(Action::serialize).collect(),
            next: self.next,
            cond_op: self.cond_op,
            enabled: self.enabled,
        }
    }

    /// Build a step from its persisted form.
    ///
    /// # Errors
    ///
    /// Returns an error if an item is unknown or misses a required binding.
    pub fn unserialize(registry: &Registry, record: StepRecord) -> Result<Self, NotifyError> {
        let conditions = record
            .conditions
            .into_iter()
            .map(|c| registry.load_condition(c))
            .collect::<Result<Vec<_>, _>>()?;
        let actions = record
            .actions
            .into_iter()
            .map(|a| registry.load_action(a))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            conditions,
            actions,
            cond_op: record.cond_op,
            next: record.next,
            enabled: record.enabled,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::variable::BindingValue;
    use serde_json::json;

    fn registry() -> Registry {
        Registry::with_defaults().unwrap()
    }

    fn text_equal(registry: &Registry, variable: &str, constant: &str) -> Condition {
        registry
            .load_condition(
                ItemRecord::new("text_equal")
                    .bind("v1", BindingValue::variable(variable))
                    .bind("v2", BindingValue::constant(constant)),
            )
            .unwrap()
    }

    fn set_flag(registry: &Registry, flag: &str) -> Action {
        registry
            .load_action(ItemRecord::new("set_debug_flag").bind("flag_name", BindingValue::constant(flag)))
            .unwrap()
    }

    #[test]
    fn test_wire_format_round_trip() {
        let raw = json!({
            "conditions": [
                {"identifier": "language_equal", "v1": {"variable": "order_language"}, "v2": {"constant": "fi"}}
            ],
            "actions": [
                {"identifier": "add_order_log_entry", "order": {"variable": "order"}, "message": {"constant": "Hi"}}
            ],
            "next": "stop",
            "cond_op": "any",
            "enabled": false
        });
        let registry = registry();
        let record: StepRecord = serde_json::from_value(raw.clone()).unwrap();
        let step = Step::unserialize(&registry, record).unwrap();

        assert_eq!(step.next, StepNext::Stop);
        assert_eq!(step.cond_op, StepConditionOperator::Any);
        assert!(!step.enabled);
        assert_eq!(serde_json::to_value(step.serialize()).unwrap(), raw);

        let again = Step::unserialize(&registry, step.serialize()).unwrap();
        assert_eq!(again, step);
    }

    #[test]
    fn test_record_defaults() {
        let record: StepRecord = serde_json::from_value(json!({})).unwrap();
        assert_eq!(record, StepRecord::default());
    }

    #[test]
    fn test_none_operator() {
        let registry = registry();
        let mut ctx = Context::from_variables([("a", json!("x")), ("b", json!("y"))]);

        let both_false = Step::new(
            vec![text_equal(&registry, "a", "no"), text_equal(&registry, "b", "no")],
            vec![set_flag(&registry, "hit")],
        )
        .with_cond_op(StepConditionOperator::None);
        assert_eq!(both_false.execute(&mut ctx).unwrap().state, StepState::Executed);

        let one_true = Step::new(
            vec![text_equal(&registry, "a", "x"), text_equal(&registry, "b", "no")],
            Vec::new(),
        )
        .with_cond_op(StepConditionOperator::None);
        assert_eq!(one_true.execute(&mut ctx).unwrap().state, StepState::Skipped);
    }

    #[test]
    fn test_empty_conditions() {
        let ctx = Context::default();
        assert!(Step::default().matches(&ctx));
        assert!(Step::default().with_cond_op(StepConditionOperator::None).matches(&ctx));
        assert!(!Step::default().with_cond_op(StepConditionOperator::Any).matches(&ctx));
    }

    #[test]
    fn test_disabled_step_never_executes() {
        let registry = registry();
        let mut ctx = Context::default();
        let step = Step::new(Vec::new(), vec![set_flag(&registry, "hit")])
            .with_next(StepNext::Stop)
            .with_enabled(false);

        let result = step.execute(&mut ctx).unwrap();
        assert_eq!(result, StepResult::skipped());
        assert_eq!(ctx.get("hit"), None);
    }

    #[test]
    fn test_unmatched_step_continues() {
        let registry = registry();
        let mut ctx = Context::from_variables([("a", json!("x"))]);
        let step = Step::new(vec![text_equal(&registry, "a", "y")], vec![set_flag(&registry, "hit")])
            .with_next(StepNext::Stop);

        assert_eq!(step.execute(&mut ctx).unwrap().next, StepNext::Continue);
        assert_eq!(ctx.get("hit"), None);
    }

    #[test]
    fn test_unknown_item_fails_unserialize() {
        let record = StepRecord {
            actions: vec![ItemRecord::new("launch_rocket")],
            ..StepRecord::default()
        };
        let err = Step::unserialize(&registry(), record).unwrap_err();
        assert!(matches!(err, NotifyError::UnknownItem { .. }));
    }
}
