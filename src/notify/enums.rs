//! Enumerations shared by the engine.
//!
//! `Priority` and `RecipientType` double as value types (`Type::Enum`) through
//! their static [`EnumSpec`] descriptors.

use serde::{Deserialize, Serialize};

/// One member of an enumeration value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumMember {
    /// Stored integer value
    pub value: i64,
    /// Machine name
    pub name: &'static str,
    /// Human readable label
    pub label: &'static str,
}

/// Descriptor of an enumeration usable as a value type.
#[derive(Debug, PartialEq, Eq)]
pub struct EnumSpec {
    /// Enum name, e.g. `priority`
    pub name: &'static str,
    /// Members in declaration order
    pub members: &'static [EnumMember],
}

impl EnumSpec {
    /// Find a member by stored value.
    #[must_use]
    pub fn by_value(&self, value: i64) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.value == value)
    }

    /// Find a member by machine name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// How a binding may be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConstantUse {
    /// Only a context variable
    #[default]
    VariableOnly,
    /// Only a literal constant
    ConstantOnly,
    /// Either, constant wins when both are given
    VariableOrConstant,
}

impl ConstantUse {
    /// Whether a constant may satisfy the binding.
    #[must_use]
    pub const fn allows_constant(self) -> bool {
        matches!(self, Self::ConstantOnly | Self::VariableOrConstant)
    }

    /// Whether a variable may satisfy the binding.
    #[must_use]
    pub const fn allows_variable(self) -> bool {
        matches!(self, Self::VariableOnly | Self::VariableOrConstant)
    }
}

/// Whether and how an action uses a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TemplateUse {
    /// No template
    #[default]
    None,
    /// One template for all languages
    Unilingual,
    /// One template per language
    Multilingual,
}

/// What happens after a matched step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepNext {
    /// Go on with the next step
    #[default]
    Continue,
    /// Stop processing the script
    Stop,
}

/// How a step combines its conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepConditionOperator {
    /// Every condition holds
    #[default]
    All,
    /// At least one condition holds
    Any,
    /// No condition holds
    None,
}

impl StepConditionOperator {
    /// Combine condition results lazily.
    pub fn evaluate<I: IntoIterator<Item = bool>>(self, results: I) -> bool {
        let mut results = results.into_iter();
        match self {
            Self::All => results.all(|r| r),
            Self::Any => results.any(|r| r),
            Self::None => !results.any(|r| r),
        }
    }
}

/// Notification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    /// Low
    Low,
    /// Normal
    Normal,
    /// High
    High,
    /// Critical
    Critical,
}

/// Value type descriptor for [`Priority`].
pub static PRIORITY: EnumSpec = EnumSpec {
    name: "priority",
    members: &[
        EnumMember { value: 0, name: "low", label: "Low" },
        EnumMember { value: 1, name: "normal", label: "Normal" },
        EnumMember { value: 2, name: "high", label: "High" },
        EnumMember { value: 3, name: "critical", label: "Critical" },
    ],
};

impl Priority {
    /// Stored value.
    #[must_use]
    pub const fn value(self) -> i64 {
        match self {
            Self::Low => 0,
            Self::Normal => 1,
            Self::High => 2,
            Self::Critical => 3,
        }
    }

    /// Parse a stored value.
    #[must_use]
    pub const fn from_value(value: i64) -> Option<Self> {
        match value {
            0 => Some(Self::Low),
            1 => Some(Self::Normal),
            2 => Some(Self::High),
            3 => Some(Self::Critical),
            _ => None,
        }
    }

    /// Get display name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Normal => "Normal",
            Self::High => "High",
            Self::Critical => "Critical",
        }
    }
}

/// Who receives an in-app notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipientType {
    /// Every shop administrator
    Admins,
    /// One user given by the `recipient` binding
    SpecificUser,
}

/// Value type descriptor for [`RecipientType`].
pub static RECIPIENT_TYPE: EnumSpec = EnumSpec {
    name: "recipient_type",
    members: &[
        EnumMember { value: 1, name: "admins", label: "Any Admins" },
        EnumMember { value: 2, name: "specific_user", label: "Specific User" },
    ],
};

impl RecipientType {
    /// Stored value.
    #[must_use]
    pub const fn value(self) -> i64 {
        match self {
            Self::Admins => 1,
            Self::SpecificUser => 2,
        }
    }

    /// Parse a stored value.
    #[must_use]
    pub const fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Admins),
            2 => Some(Self::SpecificUser),
            _ => None,
        }
    }
}
