//! Templated email.

use serde_json::{json, Value};
use tracing::{info, Level};

use crate::error::NotifyError;
use crate::notify::context::Context;
use crate::notify::enums::{ConstantUse, TemplateUse};
use crate::notify::item::{item_kind, Action, ActionKind, ItemSpec};
use crate::notify::services::{ContentType, EmailMessage, LogEntryKind};
use crate::notify::template::TemplateField;
use crate::notify::typology::{as_text, split_emails, Type};
use crate::notify::variable::Binding;

/// Send an email rendered from a multilingual template.
///
/// With a `send_identifier`, the email is sent at most once per log target:
/// the log target's entries are checked before sending and an entry is
/// recorded after.
pub struct SendEmail {
    spec: ItemSpec,
}

impl SendEmail {
    /// Create the action kind.
    #[must_use]
    pub fn new() -> Self {
        let address = |name: &str| Binding::new(name, Type::Email).constant_use(ConstantUse::VariableOrConstant);
        Self {
            spec: ItemSpec::new("send_email", "Send Email")
                .description("Send an email")
                .binding(address("recipient").required())
                .binding(address("reply_to_address"))
                .binding(address("cc"))
                .binding(address("bcc"))
                .binding(address("from_email"))
                .binding(Binding::new("language", Type::Language).constant_use(ConstantUse::VariableOrConstant))
                .binding(
                    Binding::new("fallback_language", Type::Language)
                        .constant_use(ConstantUse::ConstantOnly)
                        .default_value("en"),
                )
                .binding(
                    Binding::new("send_identifier", Type::Text)
                        .constant_use(ConstantUse::ConstantOnly)
                        .help_text("Sends the email only once per log target"),
                )
                .template(
                    TemplateUse::Multilingual,
                    vec![
                        TemplateField::new("subject", "Subject"),
                        TemplateField::new("body", "Body"),
                        TemplateField::new("content_type", "Content type")
                            .optional()
                            .initial(ContentType::Plain.as_str()),
                    ],
                ),
        }
    }

    /// Languages to try, most preferred first.
    ///
    /// Languages outside the configured set are dropped. When nothing
    /// remains the default language is used.
    fn languages(item: &Action, context: &Context) -> Vec<String> {
        let settings = context.settings();
        let allowed = |code: &str| {
            settings.languages.is_empty()
                || settings.languages.iter().any(|l| l.eq_ignore_ascii_case(code))
        };

        let mut languages: Vec<String> = Vec::new();
        for binding in ["language", "fallback_language"] {
            let code = as_text(&item.get_value(context, binding)).trim().to_lowercase();
            if !code.is_empty() && allowed(&code) && !languages.contains(&code) {
                languages.push(code);
            }
        }
        if languages.is_empty() {
            languages.push(settings.default_language.to_lowercase());
        }
        languages
    }
}

fn addresses(value: &Value) -> Vec<String> {
    split_emails(&as_text(value))
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn fold_lines(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl ActionKind for SendEmail {
    fn execute(&self, item: &Action, context: &mut Context) -> Result<(), NotifyError> {
        let recipients = addresses(&item.get_value(context, "recipient"));
        if recipients.is_empty() {
            context.log(Level::INFO, "send_email: no recipient, skipping");
            return Ok(());
        }

        let send_identifier = as_text(&item.get_value(context, "send_identifier"));
        let send_identifier = Some(send_identifier.trim()).filter(|id| !id.is_empty());
        if let Some(id) = send_identifier {
            if !context.log_entries(Some(id)).is_empty() {
                context.log(Level::INFO, format!("send_email: `{id}` was already sent, skipping"));
                return Ok(());
            }
        }

        let languages = Self::languages(item, context);
        let rendered = match item.get_template_values(context, &languages) {
            Ok(rendered) => rendered,
            Err(NotifyError::NoLanguageMatches(tried)) => {
                context.log(
                    Level::WARN,
                    format!("send_email: no template for languages {}, skipping", tried.join(", ")),
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        let subject = fold_lines(rendered.get("subject").unwrap_or_default());
        let body = rendered.get("body").unwrap_or_default().to_string();
        if subject.is_empty() || body.trim().is_empty() {
            context.log(
                Level::WARN,
                format!("send_email: subject or body rendered empty ({}), skipping", rendered.language),
            );
            return Ok(());
        }

        let Some(mailer) = context.services().mailer.clone() else {
            return Err(NotifyError::action(self.spec.identifier.as_str(), "no mailer configured"));
        };

        let from = addresses(&item.get_value(context, "from_email"))
            .into_iter()
            .next()
            .or_else(|| context.settings().default_from_email.clone());
        let message = EmailMessage {
            from,
            to: recipients,
            cc: addresses(&item.get_value(context, "cc")),
            bcc: addresses(&item.get_value(context, "bcc")),
            reply_to: addresses(&item.get_value(context, "reply_to_address")),
            subject,
            body,
            content_type: ContentType::parse(rendered.get("content_type").unwrap_or_default()),
        };
        mailer.send(&message)?;

        let to = message.to.join(", ");
        info!(target: "notify", to = %to, language = %rendered.language, "Email sent");

        if let Some(id) = send_identifier {
            context.add_log_entry_on_log_target(
                format!("Email sent to {to}: {}", message.subject),
                Some(id),
                LogEntryKind::Email,
                json!({"to": message.to, "language": rendered.language}),
            );
        }
        Ok(())
    }
}

item_kind!(SendEmail);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::notify::item::ItemRecord;
    use crate::notify::services::{MemoryLogStore, MemoryMailer, MockMailer, Services};
    use crate::notify::template::TemplateData;
    use crate::notify::typology::ModelRef;
    use crate::notify::variable::BindingValue;
    use std::sync::Arc;

    fn template() -> TemplateData {
        serde_json::from_value(json!({
            "fi": {"subject": "Tilaus {{ order.pk }}", "body": "Kiitos!"},
            "en": {
                "subject": "Order {{ order.pk }}\nreceived",
                "body": "<p>Thanks!</p>",
                "content_type": "html"
            }
        }))
        .unwrap()
    }

    fn action(extra: &[(&str, BindingValue)]) -> Action {
        let mut record = ItemRecord::new("send_email")
            .bind("recipient", BindingValue::variable("customer_email"))
            .bind("language", BindingValue::variable("language"))
            .with_template_data(template());
        for (name, value) in extra {
            record = record.bind(*name, value.clone());
        }
        Action::from_record(Arc::new(SendEmail::new()), record).unwrap()
    }

    fn context(services: Services, language: &str) -> Context {
        let order = ModelRef::new("shop.order", "5");
        Context::from_variables([
            ("customer_email", json!("buyer@example.com")),
            ("language", json!(language)),
            ("order", order.to_value()),
        ])
        .with_log_target(order)
        .with_services(services)
    }

    #[test]
    fn test_sends_in_customer_language() {
        let mailer = Arc::new(MemoryMailer::new());
        let mut ctx = context(Services::new().with_mailer(mailer.clone()), "fi");

        action(&[]).execute(&mut ctx).unwrap();

        let sent = mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, ["buyer@example.com"]);
        assert_eq!(sent[0].subject, "Tilaus 5");
        assert_eq!(sent[0].content_type, ContentType::Plain);
    }

    #[test]
    fn test_falls_back_and_folds_subject() {
        let mailer = Arc::new(MemoryMailer::new());
        let mut ctx = context(Services::new().with_mailer(mailer.clone()), "sw");

        action(&[]).execute(&mut ctx).unwrap();

        let sent = mailer.sent();
        assert_eq!(sent[0].subject, "Order 5 received");
        assert_eq!(sent[0].content_type, ContentType::Html);
    }

    #[test]
    fn test_disallowed_language_is_dropped() {
        let mailer = Arc::new(MemoryMailer::new());
        let settings = EngineSettings {
            languages: vec!["en".to_string()],
            ..EngineSettings::default()
        };
        let services = Services::new().with_mailer(mailer.clone()).with_settings(settings);
        let mut ctx = context(services, "fi");

        action(&[]).execute(&mut ctx).unwrap();
        assert_eq!(mailer.sent()[0].subject, "Order 5 received");
    }

    #[test]
    fn test_same_send_identifier_sends_once() {
        let log = Arc::new(MemoryLogStore::new());
        let mut mailer = MockMailer::new();
        mailer.expect_send().times(1).returning(|_| Ok(()));
        let services = Services::new()
            .with_mailer(Arc::new(mailer))
            .with_log_entries(log.clone());
        let mut ctx = context(services, "en");
        let action = action(&[("send_identifier", BindingValue::constant("confirmation"))]);

        action.execute(&mut ctx).unwrap();
        action.execute(&mut ctx).unwrap();

        let entries = log.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].identifier.as_deref(), Some("confirmation"));
        assert_eq!(entries[0].kind, LogEntryKind::Email);
    }

    #[test]
    fn test_no_language_match_does_not_send() {
        let mut mailer = MockMailer::new();
        mailer.expect_send().never();
        let mut ctx = context(Services::new().with_mailer(Arc::new(mailer)), "sw");
        let record = ItemRecord::new("send_email")
            .bind("recipient", BindingValue::constant("a@example.com"))
            .bind("fallback_language", BindingValue::constant("de"))
            .with_template_data(template());
        let action = Action::from_record(Arc::new(SendEmail::new()), record).unwrap();

        action.execute(&mut ctx).unwrap();
        assert!(ctx.log_records()[0].message.contains("no template"));
    }

    #[test]
    fn test_missing_mailer_fails_the_action() {
        let mut ctx = context(Services::new(), "en");
        let err = action(&[]).execute(&mut ctx).unwrap_err();
        assert!(matches!(err, NotifyError::Action { .. }));
    }
}
