//! Debugging aid for script authors.

use serde_json::Value;

use crate::error::NotifyError;
use crate::notify::context::Context;
use crate::notify::enums::ConstantUse;
use crate::notify::item::{item_kind, Action, ActionKind, ItemSpec};
use crate::notify::typology::{as_text, Type};
use crate::notify::variable::Binding;

/// Set a flag variable to `true` in the context.
pub struct SetDebugFlag {
    spec: ItemSpec,
}

impl SetDebugFlag {
    /// Create the action kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: ItemSpec::new("set_debug_flag", "Set Debug Flag")
                .description("Set a flag in the context, for testing scripts")
                .binding(
                    Binding::new("flag_name", Type::Text)
                        .constant_use(ConstantUse::ConstantOnly)
                        .default_value("debug"),
                ),
        }
    }
}

impl ActionKind for SetDebugFlag {
    fn execute(&self, item: &Action, context: &mut Context) -> Result<(), NotifyError> {
        let flag = as_text(&item.get_value(context, "flag_name"));
        let flag = if flag.trim().is_empty() { "debug" } else { flag.trim() };
        context.set(flag, Value::Bool(true));
        Ok(())
    }
}

item_kind!(SetDebugFlag);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::item::ItemRecord;
    use crate::notify::variable::BindingValue;
    use serde_json::json;
    use std::sync::Arc;

    fn action(record: ItemRecord) -> Action {
        Action::from_record(Arc::new(SetDebugFlag::new()), record).unwrap()
    }

    #[test]
    fn test_sets_named_flag() {
        let mut ctx = Context::default();
        action(ItemRecord::new("set_debug_flag").bind("flag_name", BindingValue::constant("seen")))
            .execute(&mut ctx)
            .unwrap();
        assert_eq!(ctx.get("seen"), Some(&json!(true)));
    }

    #[test]
    fn test_defaults_to_debug() {
        let mut ctx = Context::default();
        action(ItemRecord::new("set_debug_flag")).execute(&mut ctx).unwrap();
        assert_eq!(ctx.get("debug"), Some(&json!(true)));
    }
}
