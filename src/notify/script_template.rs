//! Ready-made scripts a shop can start from.

use serde_json::json;

use super::context::ShopId;
use super::item::ItemRecord;
use super::registry::Registry;
use super::script::Script;
use super::step::StepRecord;
use super::template::TemplateData;
use super::variable::BindingValue;
use crate::error::NotifyError;

/// A factory for a preconfigured script.
pub trait ScriptTemplate: Send + Sync {
    /// Unique identifier.
    fn identifier(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Description for editors.
    fn description(&self) -> &str;

    /// Event the created script listens to.
    fn event_identifier(&self) -> &str;

    /// Create a new, disabled script for `shop`.
    ///
    /// # Errors
    ///
    /// Returns an error if an item the script uses is not registered.
    fn create_script(&self, shop: ShopId, registry: &Registry) -> Result<Script, NotifyError>;
}

/// Register every built-in script template.
///
/// # Errors
///
/// Returns an error if an identifier is already taken.
pub fn register_all(registry: &mut Registry) -> Result<(), NotifyError> {
    registry.register_script_template(OrderConfirmationEmail)
}

/// Email the customer when an order is received.
pub struct OrderConfirmationEmail;

impl OrderConfirmationEmail {
    const IDENTIFIER: &'static str = "order_confirmation_email";

    fn template_data() -> Result<TemplateData, NotifyError> {
        let data = json!({
            "en": {
                "subject": "Order {{ order.reference_number | default(order.pk) }} received",
                "body": "Thank you for your order!\n\n\
                         We will let you know when it has been shipped.",
                "content_type": "plain"
            }
        });
        Ok(serde_json::from_value(data)?)
    }
}

impl ScriptTemplate for OrderConfirmationEmail {
    fn identifier(&self) -> &str {
        Self::IDENTIFIER
    }

    fn name(&self) -> &str {
        "Order Confirmation Email"
    }

    fn description(&self) -> &str {
        "Send an email to the customer when an order is received"
    }

    fn event_identifier(&self) -> &str {
        "order_received"
    }

    fn create_script(&self, shop: ShopId, registry: &Registry) -> Result<Script, NotifyError> {
        let send_email = ItemRecord::new("send_email")
            .bind("recipient", BindingValue::variable("customer_email"))
            .bind("language", BindingValue::variable("language"))
            .bind("send_identifier", BindingValue::constant(Self::IDENTIFIER))
            .with_template_data(Self::template_data()?);
        let step = StepRecord {
            actions: vec![send_email],
            ..StepRecord::default()
        };

        let mut script = Script::new(shop, self.event_identifier(), self.name());
        script.template = Some(Self::IDENTIFIER.to_string());
        script.set_serialized_steps(registry, vec![step])?;
        Ok(script)
    }
}
