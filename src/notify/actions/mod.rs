//! Built-in actions.

mod debug;
mod email;
mod notification;
mod order;

pub use debug::SetDebugFlag;
pub use email::SendEmail;
pub use notification::AddNotification;
pub use order::AddOrderLogEntry;

use super::registry::Registry;
use crate::error::NotifyError;

/// Register every built-in action.
///
/// # Errors
///
/// Returns an error if an identifier is already taken.
pub fn register_all(registry: &mut Registry) -> Result<(), NotifyError> {
    registry.register_action(SetDebugFlag::new())?;
    registry.register_action(AddOrderLogEntry::new())?;
    registry.register_action(AddNotification::new())?;
    registry.register_action(SendEmail::new())?;
    Ok(())
}
