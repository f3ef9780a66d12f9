//! Error types for shop-notify.

use thiserror::Error;

use crate::notify::typology::TypeError;

/// Errors produced by the notification engine and its collaborators.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A required binding has no entry in the item's binding data.
    #[error("Missing required binding `{binding}` for `{identifier}`")]
    MissingBinding {
        /// Item identifier
        identifier: String,
        /// Binding name
        binding: String,
    },

    /// An event was given a value for a variable it does not declare.
    #[error("Event `{event}` has no variable `{variable}`")]
    UnknownVariable {
        /// Event identifier
        event: String,
        /// Offending variable name
        variable: String,
    },

    /// An event was constructed without a required variable.
    #[error("Event `{event}` requires variable `{variable}`")]
    MissingVariable {
        /// Event identifier
        event: String,
        /// Missing variable name
        variable: String,
    },

    /// A value could not be converted to its declared type.
    #[error("Invalid value for `{name}`: {source}")]
    InvalidValue {
        /// Variable or binding name
        name: String,
        /// Underlying type error
        #[source]
        source: TypeError,
    },

    /// No provider is registered under this identifier.
    #[error("Unknown {category} `{identifier}`")]
    UnknownItem {
        /// Registry category
        category: &'static str,
        /// Requested identifier
        identifier: String,
    },

    /// A definition or serialized item carries no identifier.
    #[error("Item has no identifier")]
    MissingIdentifier,

    /// An identifier is already taken, by a provider or another shop's script.
    #[error("Duplicate {category} `{identifier}`")]
    DuplicateIdentifier {
        /// Registry category, or `script`
        category: &'static str,
        /// Duplicated identifier
        identifier: String,
    },

    /// A provider definition is internally inconsistent.
    #[error("Invalid definition for `{identifier}`: {reason}")]
    InvalidDefinition {
        /// Item or event identifier
        identifier: String,
        /// What is wrong with it
        reason: String,
    },

    /// Template compilation or rendering failed.
    #[error("Template error: {0}")]
    Template(String),

    /// None of the preferred languages has a complete template.
    #[error("No template language matches (tried: {})", .0.join(", "))]
    NoLanguageMatches(Vec<String>),

    /// An action failed while executing.
    #[error("Action `{identifier}` failed: {message}")]
    Action {
        /// Action identifier
        identifier: String,
        /// Failure description
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Lookup by identifier found nothing
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl NotifyError {
    /// Shorthand for an action failure.
    pub fn action(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Action {
            identifier: identifier.into(),
            message: message.into(),
        }
    }

    /// Whether this error belongs to the construction-time family.
    #[must_use]
    pub const fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::MissingBinding { .. }
                | Self::UnknownVariable { .. }
                | Self::MissingVariable { .. }
                | Self::InvalidValue { .. }
                | Self::UnknownItem { .. }
                | Self::MissingIdentifier
                | Self::DuplicateIdentifier { .. }
                | Self::InvalidDefinition { .. }
        )
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
