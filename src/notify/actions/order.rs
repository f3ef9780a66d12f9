//! Order audit log entries.

use serde_json::Value;
use tracing::Level;

use crate::error::NotifyError;
use crate::notify::context::Context;
use crate::notify::enums::ConstantUse;
use crate::notify::events::ORDER_MODEL;
use crate::notify::item::{item_kind, Action, ActionKind, ItemSpec};
use crate::notify::services::LogEntryKind;
use crate::notify::typology::{as_text, ModelRef, Type};
use crate::notify::variable::Binding;

/// Append a log entry to an order.
pub struct AddOrderLogEntry {
    spec: ItemSpec,
}

impl AddOrderLogEntry {
    /// Create the action kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: ItemSpec::new("add_order_log_entry", "Add Order Log Entry")
                .description("Add a log entry to an order")
                .binding(Binding::new("order", Type::model(ORDER_MODEL)).required())
                .binding(Binding::templated("message", Type::Text).required())
                .binding(
                    Binding::new("message_identifier", Type::Text)
                        .constant_use(ConstantUse::ConstantOnly),
                ),
        }
    }
}

impl ActionKind for AddOrderLogEntry {
    fn execute(&self, item: &Action, context: &mut Context) -> Result<(), NotifyError> {
        let Some(order) = ModelRef::from_value(&item.get_value(context, "order")) else {
            context.log(Level::WARN, "add_order_log_entry: no order bound, skipping");
            return Ok(());
        };
        let message = as_text(&item.get_value(context, "message"));
        if message.trim().is_empty() {
            context.log(Level::INFO, "add_order_log_entry: empty message, skipping");
            return Ok(());
        }
        let identifier = as_text(&item.get_value(context, "message_identifier"));
        let identifier = Some(identifier.trim()).filter(|id| !id.is_empty());

        if !context.add_log_entry(&order, message, identifier, LogEntryKind::Note, Value::Null) {
            context.log(Level::WARN, format!("add_order_log_entry: {order} does not take log entries"));
        }
        Ok(())
    }
}

item_kind!(AddOrderLogEntry);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::item::ItemRecord;
    use crate::notify::services::{MemoryLogStore, Services};
    use crate::notify::variable::BindingValue;
    use serde_json::json;
    use std::sync::Arc;

    fn action() -> Action {
        let record = ItemRecord::new("add_order_log_entry")
            .bind("order", BindingValue::variable("order"))
            .bind("message", BindingValue::constant("Order {{ order.pk }} paid"))
            .bind("message_identifier", BindingValue::constant("paid"));
        Action::from_record(Arc::new(AddOrderLogEntry::new()), record).unwrap()
    }

    #[test]
    fn test_adds_rendered_entry() {
        let store = Arc::new(MemoryLogStore::new());
        let mut ctx = Context::from_variables([("order", ModelRef::new(ORDER_MODEL, "12").to_value())])
            .with_services(Services::new().with_log_entries(store.clone()));

        action().execute(&mut ctx).unwrap();

        let entries = store.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "Order 12 paid");
        assert_eq!(entries[0].identifier.as_deref(), Some("paid"));
        assert_eq!(entries[0].target, ModelRef::new(ORDER_MODEL, "12"));
    }

    #[test]
    fn test_missing_order_is_skipped() {
        let store = Arc::new(MemoryLogStore::new());
        let mut ctx = Context::from_variables([("order", json!(null))])
            .with_services(Services::new().with_log_entries(store.clone()));

        action().execute(&mut ctx).unwrap();
        assert!(store.entries().is_empty());
        assert_eq!(ctx.log_records().len(), 1);
    }

    #[test]
    fn test_missing_message_binding_is_rejected() {
        let record = ItemRecord::new("add_order_log_entry").bind("order", BindingValue::variable("order"));
        let err = Action::from_record(Arc::new(AddOrderLogEntry::new()), record).unwrap_err();
        assert!(matches!(err, NotifyError::MissingBinding { binding, .. } if binding == "message"));
    }
}
