//! Built-in events published by the shop.

use super::event::EventSpec;
use super::typology::Type;
use super::variable::Variable;

/// Model label of orders.
pub const ORDER_MODEL: &str = "shop.order";

/// Model label of users.
pub const USER_MODEL: &str = "auth.user";

/// Model label of shipments.
pub const SHIPMENT_MODEL: &str = "shop.shipment";

/// Variables shared by every order event.
#[must_use]
pub fn order_variables() -> Vec<Variable> {
    vec![
        Variable::new("order", Type::model(ORDER_MODEL)).help_text("The order"),
        Variable::new("customer_email", Type::Email)
            .optional()
            .help_text("Customer's email address"),
        Variable::new("customer_phone", Type::Phone)
            .optional()
            .help_text("Customer's phone number"),
        Variable::new("language", Type::Language)
            .optional()
            .help_text("Language the order was placed in"),
    ]
}

/// An order was placed.
#[must_use]
pub fn order_received() -> EventSpec {
    EventSpec::new("order_received", "Order Received")
        .description("An order was placed in the shop")
        .variables_from(order_variables())
        .log_target("order")
}

/// An order moved to another status.
#[must_use]
pub fn order_status_changed() -> EventSpec {
    EventSpec::new("order_status_changed", "Order Status Changed")
        .description("An order's status was changed")
        .variables_from(order_variables())
        .variable(Variable::new("old_status", Type::Text).optional())
        .variable(Variable::new("new_status", Type::Text))
        .log_target("order")
}

/// Part of an order was shipped.
#[must_use]
pub fn shipment_created() -> EventSpec {
    EventSpec::new("shipment_created", "Shipment Created")
        .description("A shipment was created for an order")
        .variables_from(order_variables())
        .variable(Variable::new("shipment", Type::model(SHIPMENT_MODEL)))
        .log_target("order")
}

/// A user registered and needs to activate their account.
#[must_use]
pub fn registration_received() -> EventSpec {
    EventSpec::new("registration_received", "Registration Received")
        .description("A new user registered")
        .variable(Variable::new("user", Type::model(USER_MODEL)))
        .variable(Variable::new("customer_email", Type::Email))
        .variable(Variable::new("activation_url", Type::Url).optional())
        .variable(Variable::new("language", Type::Language).optional())
        .log_target("user")
}

/// Every built-in event.
#[must_use]
pub fn builtin() -> Vec<EventSpec> {
    vec![
        order_received(),
        order_status_changed(),
        shipment_created(),
        registration_received(),
    ]
}
