//! In-app notifications for shop staff.

use serde_json::Value;
use tracing::Level;

use crate::error::NotifyError;
use crate::notify::context::Context;
use crate::notify::enums::{ConstantUse, Priority, RecipientType, PRIORITY, RECIPIENT_TYPE};
use crate::notify::events::USER_MODEL;
use crate::notify::item::{item_kind, Action, ActionKind, ItemSpec};
use crate::notify::services::NewNotification;
use crate::notify::typology::{as_text, ModelRef, Type};
use crate::notify::variable::Binding;

/// Store an in-app notification for admins or one user.
pub struct AddNotification {
    spec: ItemSpec,
}

impl AddNotification {
    /// Create the action kind.
    #[must_use]
    pub fn new() -> Self {
        Self {
            spec: ItemSpec::new("add_notification", "Add Notification")
                .description("Show a notification in the admin")
                .binding(Binding::templated("message", Type::Text).required())
                .binding(
                    Binding::new("message_identifier", Type::Text)
                        .constant_use(ConstantUse::ConstantOnly),
                )
                .binding(
                    Binding::new("priority", Type::Enum(&PRIORITY))
                        .constant_use(ConstantUse::ConstantOnly)
                        .default_value(Priority::Normal.value()),
                )
                .binding(
                    Binding::new("recipient_type", Type::Enum(&RECIPIENT_TYPE))
                        .constant_use(ConstantUse::ConstantOnly)
                        .default_value(RecipientType::Admins.value()),
                )
                .binding(
                    Binding::new("recipient", Type::model(USER_MODEL))
                        .constant_use(ConstantUse::VariableOrConstant),
                )
                .binding(Binding::new("url", Type::Url).constant_use(ConstantUse::VariableOrConstant)),
        }
    }
}

fn optional_text(value: &Value) -> Option<String> {
    let text = as_text(value);
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

impl ActionKind for AddNotification {
    fn execute(&self, item: &Action, context: &mut Context) -> Result<(), NotifyError> {
        let message = as_text(&item.get_value(context, "message"));
        if message.trim().is_empty() {
            context.log(Level::INFO, "add_notification: empty message, skipping");
            return Ok(());
        }

        let recipient_type = item
            .get_value(context, "recipient_type")
            .as_i64()
            .and_then(RecipientType::from_value)
            .unwrap_or(RecipientType::Admins);
        let recipient = ModelRef::from_value(&item.get_value(context, "recipient"));
        if recipient_type == RecipientType::SpecificUser && recipient.is_none() {
            return Err(NotifyError::action(
                self.spec.identifier.as_str(),
                "a specific user notification needs a recipient",
            ));
        }

        let Some(sink) = context.services().notifications.clone() else {
            context.log(Level::WARN, "add_notification: no notification sink configured");
            return Ok(());
        };

        let notification = NewNotification {
            shop: context.shop(),
            recipient_type,
            recipient,
            priority: item
                .get_value(context, "priority")
                .as_i64()
                .and_then(Priority::from_value)
                .unwrap_or(Priority::Normal),
            message,
            identifier: optional_text(&item.get_value(context, "message_identifier")),
            url: optional_text(&item.get_value(context, "url")),
        };
        sink.add_notification(notification)?;
        Ok(())
    }
}

item_kind!(AddNotification);
