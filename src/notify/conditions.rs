//! Built-in conditions.

use serde_json::Value;

use super::context::Context;
use super::enums::ConstantUse;
use super::item::{item_kind, Condition, ConditionKind, ItemSpec};
use super::registry::Registry;
use super::typology::{as_text, is_truthy, Type};
use super::variable::Binding;
use crate::error::NotifyError;

/// Register every built-in condition.
///
/// # Errors
///
/// Returns an error if an identifier is already taken.
pub fn register_all(registry: &mut Registry) -> Result<(), NotifyError> {
    registry.register_condition(LanguageEqual::new())?;
    registry.register_condition(BooleanEqual::new())?;
    registry.register_condition(IntegerEqual::new())?;
    registry.register_condition(TextEqual::new())?;
    registry.register_condition(Empty::new())?;
    registry.register_condition(NonEmpty::new())?;
    Ok(())
}

fn comparison(identifier: &str, name: &str, ty: Type) -> ItemSpec {
    ItemSpec::new(identifier, name)
        .binding(
            Binding::new("v1", ty.clone())
                .required()
                .constant_use(ConstantUse::VariableOrConstant),
        )
        .binding(
            Binding::new("v2", ty)
                .required()
                .constant_use(ConstantUse::VariableOrConstant),
        )
}

fn emptiness(identifier: &str, name: &str) -> ItemSpec {
    ItemSpec::new(identifier, name).binding(Binding::new("v", Type::Text).required())
}

fn operands(item: &Condition, context: &Context) -> (Value, Value) {
    (item.get_value(context, "v1"), item.get_value(context, "v2"))
}

fn language_key(value: &Value) -> String {
    as_text(value).trim().to_lowercase().replace('_', "-")
}

fn text_key(value: &Value) -> String {
    as_text(value).trim().to_lowercase()
}

/// Language codes are equal, ignoring case and `-`/`_`.
pub struct LanguageEqual {
    spec: ItemSpec,
}

impl LanguageEqual {
    /// Create the condition kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: comparison("language_equal", "Language Equal", Type::Language),
        }
    }
}

impl ConditionKind for LanguageEqual {
    fn test(&self, item: &Condition, context: &Context) -> bool {
        let (v1, v2) = operands(item, context);
        let (v1, v2) = (language_key(&v1), language_key(&v2));
        !v1.is_empty() && v1 == v2
    }
}

/// Both values are truthy, or both are not.
pub struct BooleanEqual {
    spec: ItemSpec,
}

impl BooleanEqual {
    /// Create the condition kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: comparison("boolean_equal", "Boolean Equal", Type::Boolean),
        }
    }
}

impl ConditionKind for BooleanEqual {
    fn test(&self, item: &Condition, context: &Context) -> bool {
        let (v1, v2) = operands(item, context);
        is_truthy(&v1) == is_truthy(&v2)
    }
}

/// Both values are the same integer.
pub struct IntegerEqual {
    spec: ItemSpec,
}

impl IntegerEqual {
    /// Create the condition kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: comparison("integer_equal", "Integer Equal", Type::Integer),
        }
    }
}

impl ConditionKind for IntegerEqual {
    fn test(&self, item: &Condition, context: &Context) -> bool {
        let (v1, v2) = operands(item, context);
        let as_integer = |v: &Value| Type::Integer.unserialize(v).ok().and_then(|v| v.as_i64());
        matches!((as_integer(&v1), as_integer(&v2)), (Some(a), Some(b)) if a == b)
    }
}

/// Texts are equal, ignoring case and surrounding whitespace.
pub struct TextEqual {
    spec: ItemSpec,
}

impl TextEqual {
    /// Create the condition kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: comparison("text_equal", "Text Equal", Type::Text),
        }
    }
}

impl ConditionKind for TextEqual {
    fn test(&self, item: &Condition, context: &Context) -> bool {
        let (v1, v2) = operands(item, context);
        text_key(&v1) == text_key(&v2)
    }
}

/// The value is empty.
pub struct Empty {
    spec: ItemSpec,
}

impl Empty {
    /// Create the condition kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: emptiness("empty", "Empty"),
        }
    }
}

impl ConditionKind for Empty {
    fn test(&self, item: &Condition, context: &Context) -> bool {
        !is_truthy(&item.get_value(context, "v"))
    }
}

/// The value is not empty.
pub struct NonEmpty {
    spec: ItemSpec,
}

impl NonEmpty {
    /// Create the condition kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: emptiness("non_empty", "Non-Empty"),
        }
    }
}

impl ConditionKind for NonEmpty {
    fn test(&self, item: &Condition, context: &Context) -> bool {
        is_truthy(&item.get_value(context, "v"))
    }
}

item_kind!(LanguageEqual, BooleanEqual, IntegerEqual, TextEqual, Empty, NonEmpty);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::item::ItemRecord;
    use crate::notify::variable::BindingValue;
    use serde_json::json;

    fn condition(identifier: &str, v1: BindingValue, v2: BindingValue) -> Condition {
        Registry::with_defaults()
            .unwrap()
            .load_condition(ItemRecord::new(identifier).bind("v1", v1).bind("v2", v2))
            .unwrap()
    }

    #[test]
    fn test_text_equal_ignores_case_and_whitespace() {
        let cond = condition(
            "text_equal",
            BindingValue::variable("v"),
            BindingValue::constant("  Foo  "),
        );
        assert!(cond.test(&Context::from_variables([("v", json!("foo"))])));
        assert!(!cond.test(&Context::from_variables([("v", json!("faa"))])));
    }

    #[test]
    fn test_language_equal() {
        let cond = condition(
            "language_equal",
            BindingValue::variable("language"),
            BindingValue::constant("pt-BR"),
        );
        assert!(cond.test(&Context::from_variables([("language", json!("pt_br"))])));
        assert!(!cond.test(&Context::from_variables([("language", json!("pt"))])));
        assert!(!cond.test(&Context::default()));
    }

    #[test]
    fn test_integer_equal() {
        let cond = condition(
            "integer_equal",
            BindingValue::variable("n"),
            BindingValue::constant("3"),
        );
        assert!(cond.test(&Context::from_variables([("n", json!(3))])));
        assert!(cond.test(&Context::from_variables([("n", json!("3"))])));
        assert!(!cond.test(&Context::from_variables([("n", json!("three"))])));
        assert!(!cond.test(&Context::default()));
    }

    #[test]
    fn test_boolean_equal() {
        let cond = condition(
            "boolean_equal",
            BindingValue::variable("paid"),
            BindingValue::constant("yes"),
        );
        assert!(cond.test(&Context::from_variables([("paid", json!(true))])));
        assert!(!cond.test(&Context::from_variables([("paid", json!(false))])));
    }

    #[test]
    fn test_emptiness() {
        let registry = Registry::with_defaults().unwrap();
        let empty = registry
            .load_condition(ItemRecord::new("empty").bind("v", BindingValue::variable("phone")))
            .unwrap();
        let non_empty = registry
            .load_condition(ItemRecord::new("non_empty").bind("v", BindingValue::variable("phone")))
            .unwrap();

        let blank = Context::from_variables([("phone", json!(""))]);
        let set = Context::from_variables([("phone", json!("+358 40 123"))]);
        assert!(empty.test(&blank));
        assert!(!non_empty.test(&blank));
        assert!(non_empty.test(&set));
        assert!(empty.test(&Context::default()));
    }
}
