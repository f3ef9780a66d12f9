//! Notification engine.
//!
//! The host publishes typed [`Event`]s. The [`Runner`] loads the enabled
//! [`Script`]s of the shop that listen to the event and executes each with
//! its own [`Context`]. A script is a list of [`Step`]s; each step guards
//! its actions with conditions.
//!
//! Conditions and actions are registered kinds looked up by identifier in
//! the [`Registry`]. Their inputs are [`Binding`]s, satisfied in persisted
//! script data by either a constant or the name of a context variable.

pub mod actions;
pub mod conditions;
pub mod context;
pub mod enums;
pub mod event;
pub mod events;
pub mod item;
pub mod registry;
pub mod runner;
pub mod script;
pub mod script_template;
pub mod services;
pub mod step;
pub mod storage;
pub mod template;
pub mod typology;
pub mod variable;

pub use context::{Context, LogRecord, ShopId};
pub use enums::{ConstantUse, Priority, RecipientType, StepConditionOperator, StepNext, TemplateUse};
pub use event::{Event, EventSpec};
pub use item::{Action, ActionKind, Condition, ConditionKind, ItemKind, ItemRecord, ItemSpec};
pub use registry::{Category, ProviderInfo, Registry};
pub use runner::{RunReport, Runner, ScriptOutcome};
pub use script::{MemoryScriptStore, Script, ScriptDocument, ScriptReport, ScriptStore};
pub use script_template::ScriptTemplate;
pub use services::{
    EmailMessage, LogEntry, LogEntryKind, LogEntryStore, Mailer, Notification, NotificationSink,
    Services,
};
pub use step::{Step, StepRecord, StepResult, StepState};
pub use storage::{NotifyStore, OutboxMessage};
pub use template::{RenderedTemplate, Template, TemplateData, TemplateField};
pub use typology::{ModelRef, Type, TypeError};
pub use variable::{Binding, BindingValue, Variable};
