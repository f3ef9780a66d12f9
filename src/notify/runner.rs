//! Dispatching events to scripts.
//!
//! Every script runs with its own context. A failing or panicking script is
//! logged and recorded; the scripts after it still run, unless the engine is
//! configured to fail loud.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info};

use super::context::{Context, ShopId};
use super::event::Event;
use super::registry::Registry;
use super::script::{Script, ScriptReport, ScriptStore};
use super::services::Services;
use crate::error::NotifyError;

/// Outcome of one script in a run.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptOutcome {
    /// Script identifier
    pub identifier: String,
    /// Script name
    pub name: String,
    /// Execution report, when the script completed
    pub report: Option<ScriptReport>,
    /// Failure description, when it did not
    pub error: Option<String>,
    /// Messages logged on the script's context
    pub messages: Vec<String>,
}

impl ScriptOutcome {
    /// Whether the script completed.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of publishing one event.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Event identifier
    pub event_identifier: String,
    /// Tenant
    pub shop: ShopId,
    /// Per-script outcomes, in execution order
    pub scripts: Vec<ScriptOutcome>,
}

impl RunReport {
    fn new(event_identifier: &str, shop: ShopId) -> Self {
        Self {
            event_identifier: event_identifier.to_string(),
            shop,
            scripts: Vec::new(),
        }
    }

    /// Number of scripts that completed.
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.scripts.iter().filter(|s| s.succeeded()).count()
    }

    /// Number of scripts that failed.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.scripts.len() - self.succeeded()
    }
}

/// Runs the scripts subscribed to published events.
pub struct Runner {
    registry: Arc<Registry>,
    store: Arc<dyn ScriptStore>,
    services: Services,
}

impl Runner {
    /// Create a runner without collaborators.
    #[must_use]
    pub fn new(registry: Arc<Registry>, store: Arc<dyn ScriptStore>) -> Self {
        Self {
            registry,
            store,
            services: Services::default(),
        }
    }

    /// Attach the collaborators handed to every context.
    #[must_use]
    pub fn with_services(mut self, services: Services) -> Self {
        self.services = services;
        self
    }

    /// The provider registry.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The collaborators handed to every context.
    #[must_use]
    pub const fn services(&self) -> &Services {
        &self.services
    }

    /// Run every enabled script of `shop` listening to the event.
    ///
    /// # Errors
    ///
    /// Returns an error if the scripts cannot be loaded. Script failures are
    /// only returned when `fail_loud` is set.
    pub fn run(&self, event: &Event, shop: ShopId) -> Result<RunReport, NotifyError> {
        let scripts = self.store.load(&self.registry, event.identifier(), shop, true)?;
        debug!(
            target: "notify",
            event = event.identifier(),
            %shop,
            "Dispatching to {} script(s)",
            scripts.len()
        );

        let mut report = RunReport::new(event.identifier(), shop);
        for script in &scripts {
            report.scripts.push(self.run_script(script, event, shop)?);
        }

        info!(
            target: "notify",
            event = event.identifier(),
            %shop,
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Event dispatched"
        );
        Ok(report)
    }

    fn run_script(&self, script: &Script, event: &Event, shop: ShopId) -> Result<ScriptOutcome, NotifyError> {
        let mut context = Context::from_event(event, shop).with_services(self.services.clone());
        let fail_loud = self.services.settings.fail_loud;

        let result = panic::catch_unwind(AssertUnwindSafe(|| script.execute(&mut context)));
        let (report, error) = match result {
            Ok(Ok(report)) => (Some(report), None),
            Ok(Err(e)) => {
                error!(
                    target: "notify",
                    script = %script.identifier,
                    event = event.identifier(),
                    "Script failed: {e}"
                );
                if fail_loud {
                    return Err(e);
                }
                (None, Some(e.to_string()))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(
                    target: "notify",
                    script = %script.identifier,
                    event = event.identifier(),
                    "Script panicked: {message}"
                );
                if fail_loud {
                    panic::resume_unwind(payload);
                }
                (None, Some(format!("panic: {message}")))
            }
        };

        Ok(ScriptOutcome {
            identifier: script.identifier.clone(),
            name: script.name.clone(),
            report,
            error,
            messages: context
                .log_records()
                .into_iter()
                .map(|r| format!("{}: {}", r.level, r.message))
                .collect(),
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::notify::event::EventSpec;
    use crate::notify::item::{Action, ActionKind, ItemKind, ItemRecord, ItemSpec};
    use crate::notify::script::MemoryScriptStore;
    use crate::notify::services::MemoryLogStore;
    use crate::notify::step::StepRecord;
    use crate::notify::typology::Type;
    use crate::notify::variable::{BindingValue, Variable};
    use serde_json::json;

    struct Explode(ItemSpec);

    impl ItemKind for Explode {
        fn spec(&self) -> &ItemSpec {
            &self.0
        }
    }

    impl ActionKind for Explode {
        fn execute(&self, _item: &Action, _context: &mut Context) -> Result<(), NotifyError> {
            panic!("boom");
        }
    }

    struct Fail(ItemSpec);

    impl ItemKind for Fail {
        fn spec(&self) -> &ItemSpec {
            &self.0
        }
    }

    impl ActionKind for Fail {
        fn execute(&self, _item: &Action, _context: &mut Context) -> Result<(), NotifyError> {
            Err(NotifyError::action("fail", "nope"))
        }
    }

    struct Count(ItemSpec);

    impl ItemKind for Count {
        fn spec(&self) -> &ItemSpec {
            &self.0
        }
    }

    impl ActionKind for Count {
        fn execute(&self, _item: &Action, context: &mut Context) -> Result<(), NotifyError> {
            let count = context.get("count").and_then(serde_json::Value::as_i64).unwrap_or(0) + 1;
            context.set("count", count);
            context.log(tracing::Level::INFO, format!("count={count}"));
            Ok(())
        }
    }

    fn registry() -> Arc<Registry> {
        let mut registry = Registry::with_defaults().unwrap();
        registry.register_action(Explode(ItemSpec::new("explode", "Explode"))).unwrap();
        registry.register_action(Fail(ItemSpec::new("fail", "Fail"))).unwrap();
        registry
            .register_event(
                EventSpec::new("ping", "Ping")
                    .variable(Variable::new("order", Type::model("shop.order")))
                    .log_target("order"),
            )
            .unwrap();
        Arc::new(registry)
    }

    fn script(registry: &Registry, shop: i64, actions: &[&str]) -> Script {
        let records = vec![StepRecord {
            actions: actions
                .iter()
                .map(|identifier| match *identifier {
                    "log" => ItemRecord::new("add_order_log_entry")
                        .bind("order", BindingValue::variable("order"))
                        .bind("message", BindingValue::constant("Pinged {{ order.pk }}")),
                    other => ItemRecord::new(other),
                })
                .collect(),
            ..StepRecord::default()
        }];
        let mut script = Script::new(ShopId(shop), "ping", actions.join("+")).with_enabled(true);
        script.set_serialized_steps(registry, records).unwrap();
        script
    }

    fn event(registry: &Registry) -> Event {
        Event::new(registry.event("ping").unwrap(), [("order", json!(7))]).unwrap()
    }

    #[test]
    fn test_failures_are_isolated() {
        let registry = registry();
        let store = Arc::new(MemoryScriptStore::new());
        let log = Arc::new(MemoryLogStore::new());
        for actions in [&["fail"][..], &["explode"], &["log"]] {
            store.save(&mut script(&registry, 1, actions)).unwrap();
        }
        let runner = Runner::new(Arc::clone(&registry), store)
            .with_services(Services::new().with_log_entries(log.clone()));

        let report = event(&registry).run(&runner, ShopId(1)).unwrap();
        assert_eq!(report.scripts.len(), 3);
        assert_eq!(report.failed(), 2);
        assert!(report.scripts[1].error.as_deref().unwrap().contains("boom"));
        assert_eq!(log.entries().len(), 1);
        assert_eq!(log.entries()[0].message, "Pinged 7");
    }

    #[test]
    fn test_only_enabled_scripts_of_the_shop_run() {
        let registry = registry();
        let store = Arc::new(MemoryScriptStore::new());
        let log = Arc::new(MemoryLogStore::new());
        store.save(&mut script(&registry, 1, &["log"]).with_enabled(false)).unwrap();
        store.save(&mut script(&registry, 2, &["log"])).unwrap();
        let runner = Runner::new(Arc::clone(&registry), store)
            .with_services(Services::new().with_log_entries(log.clone()));

        let report = runner.run(&event(&registry), ShopId(1)).unwrap();
        assert!(report.scripts.is_empty());
        assert!(log.entries().is_empty());
    }

    #[test]
    fn test_fail_loud_propagates() {
        let registry = registry();
        let store = Arc::new(MemoryScriptStore::new());
        store.save(&mut script(&registry, 1, &["fail"])).unwrap();
        let settings = EngineSettings {
            fail_loud: true,
            ..EngineSettings::default()
        };
        let runner = Runner::new(Arc::clone(&registry), store)
            .with_services(Services::new().with_settings(settings));

        let err = runner.run(&event(&registry), ShopId(1)).unwrap_err();
        assert!(matches!(err, NotifyError::Action { .. }));
    }

    #[test]
    fn test_each_script_gets_a_fresh_context() {
        let mut registry = Registry::with_defaults().unwrap();
        registry.register_action(Count(ItemSpec::new("count", "Count"))).unwrap();
        registry
            .register_event(EventSpec::new("ping", "Ping").variable(Variable::new("order", Type::Text)))
            .unwrap();
        let store = Arc::new(MemoryScriptStore::new());
        for _ in 0..2 {
            let mut script = Script::new(ShopId(1), "ping", "count").with_enabled(true);
            let record = StepRecord {
                actions: vec![ItemRecord::new("count")],
                ..StepRecord::default()
            };
            script.set_serialized_steps(&registry, vec![record]).unwrap();
            store.save(&mut script).unwrap();
        }
        let event = Event::new(registry.event("ping").unwrap(), [("order", json!("1"))]).unwrap();
        let runner = Runner::new(Arc::new(registry), store);

        let report = runner.run(&event, ShopId(1)).unwrap();
        assert_eq!(report.succeeded(), 2);
        for outcome in &report.scripts {
            assert_eq!(outcome.messages, ["INFO: count=1"]);
        }
    }
}
