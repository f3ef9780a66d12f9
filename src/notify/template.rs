//! Templated text for actions.
//!
//! Templates are rendered with `minijinja`, which has no access to the
//! filesystem or host code. Sources use Jinja2 syntax:
//!
//! - Variable interpolation: `{{ customer_email }}`, `{{ order.reference_number }}`
//! - Conditionals: `{% if order.total %}...{% endif %}`
//! - Filters: `{{ name | upper }}`, `{{ name | default("customer") }}`

use std::collections::BTreeMap;

use minijinja::{Environment, UndefinedBehavior};
use tracing::Level;

use super::context::Context;
use crate::error::NotifyError;

/// Template data: language code to field name to template source.
pub type TemplateData = BTreeMap<String, BTreeMap<String, String>>;

/// Key holding the sources of a unilingual template.
pub const UNILINGUAL_KEY: &str = "_unilingual";

/// Key exposing the chosen language in a rendered template.
pub const LANGUAGE_KEY: &str = "_language";

/// A field an action's template consists of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateField {
    /// Field name, e.g. `subject`
    pub name: String,
    /// Editor label
    pub label: String,
    /// Whether a language is complete only with this field
    pub required: bool,
    /// Source used when a language leaves the field empty
    pub initial: String,
}

impl TemplateField {
    /// Create a required field.
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            required: true,
            initial: String::new(),
        }
    }

    /// Mark the field optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Set the initial source.
    #[must_use]
    pub fn initial(mut self, source: impl Into<String>) -> Self {
        self.initial = source.into();
        self
    }
}

/// Result of rendering a template in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedTemplate {
    /// Language the fields were rendered in
    pub language: String,
    /// Rendered fields; fields that failed or were empty are absent
    pub fields: BTreeMap<String, String>,
}

impl RenderedTemplate {
    /// Get a rendered field; `_language` yields the language.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        if name == LANGUAGE_KEY {
            return Some(&self.language);
        }
        self.fields.get(name).map(String::as_str)
    }
}

/// Render one template source against the context's variables.
///
/// Undefined variables render empty, unless the engine runs with
/// `fail_loud`, where they are errors.
///
/// # Errors
///
/// Returns `NotifyError::Template` on syntax or rendering errors.
pub fn render_in_context(context: &Context, source: &str) -> Result<String, NotifyError> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_undefined_behavior(if context.settings().fail_loud {
        UndefinedBehavior::Strict
    } else {
        UndefinedBehavior::Lenient
    });
    let template = env
        .template_from_str(source)
        .map_err(|e| NotifyError::Template(e.to_string()))?;
    template
        .render(context.variables())
        .map_err(|e| NotifyError::Template(e.to_string()))
}

/// A multilingual template bound to a context.
pub struct Template<'a> {
    context: &'a Context,
    data: &'a TemplateData,
    fields: &'a [TemplateField],
}

impl<'a> Template<'a> {
    /// Bind template data and its field declarations to a context.
    #[must_use]
    pub const fn new(context: &'a Context, data: &'a TemplateData, fields: &'a [TemplateField]) -> Self {
        Self {
            context,
            data,
            fields,
        }
    }

    fn language_data(&self, language: &str) -> Option<&'a BTreeMap<String, String>> {
        self.data.get(language).or_else(|| {
            self.data
                .iter()
                .find(|(code, _)| code.eq_ignore_ascii_case(language))
                .map(|(_, sources)| sources)
        })
    }

    fn field(&self, name: &str) -> Option<&'a TemplateField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether every required field among `fields` has source for `language`.
    #[must_use]
    pub fn has_language(&self, language: &str, fields: &[&str]) -> bool {
        let Some(sources) = self.language_data(language) else {
            return false;
        };
        fields.iter().all(|name| {
            let required = self.field(name).map_or(true, |f| f.required);
            !required || sources.get(*name).is_some_and(|s| !s.trim().is_empty())
        })
    }

    /// Render `fields` in `language`.
    ///
    /// Empty sources fall back to the field's initial source. A field that
    /// fails to render is logged on the context and left out.
    #[must_use]
    pub fn render(&self, language: &str, fields: &[&str]) -> RenderedTemplate {
        let sources = self.language_data(language);
        let mut rendered = BTreeMap::new();

        for name in fields {
            let source = sources
                .and_then(|s| s.get(*name))
                .filter(|s| !s.trim().is_empty())
                .map(String::as_str)
                .or_else(|| self.field(name).map(|f| f.initial.as_str()))
                .unwrap_or_default();
            if source.is_empty() {
                continue;
            }
            match render_in_context(self.context, source) {
                Ok(text) => {
                    rendered.insert((*name).to_string(), text);
                }
                Err(e) => self.context.log(
                    Level::WARN,
                    format!("Template field `{name}` ({language}) failed to render: {e}"),
                ),
            }
        }

        RenderedTemplate {
            language: language.to_string(),
            fields: rendered,
        }
    }

    /// Render in the first preferred language that has all required fields.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::NoLanguageMatches` if no language qualifies.
    pub fn render_first_match<S: AsRef<str>>(
        &self,
        language_preferences: &[S],
        fields: &[&str],
    ) -> Result<RenderedTemplate, NotifyError> {
        for language in language_preferences {
            let language = language.as_ref();
            if self.has_language(language, fields) {
                return Ok(self.render(language, fields));
            }
        }
        Err(NotifyError::NoLanguageMatches(
            language_preferences
                .iter()
                .map(|l| l.as_ref().to_string())
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineSettings;
    use crate::notify::services::Services;
    use serde_json::json;

    fn email_fields() -> Vec<TemplateField> {
        vec![
            TemplateField::new("subject", "Subject"),
            TemplateField::new("body", "Body"),
            TemplateField::new("content_type", "Content type")
                .optional()
                .initial("plain"),
        ]
    }

    fn data(raw: serde_json::Value) -> TemplateData {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn test_render_first_match_skips_incomplete_language() {
        let ctx = Context::from_variables([("name", json!("Hiro"))]);
        let data = data(json!({
            "sw": {"body": "Habari {{ name }}"},
            "ja": {"subject": "こんにちは", "body": "{{ name }} さん"},
            "en": {"subject": "Hello", "body": "Hi {{ name }}"}
        }));
        let fields = email_fields();
        let template = Template::new(&ctx, &data, &fields);

        let rendered = template
            .render_first_match(&["sw", "ja", "en"], &["subject", "body"])
            .unwrap();
        assert_eq!(rendered.get(LANGUAGE_KEY), Some("ja"));
        assert_eq!(rendered.get("body"), Some("Hiro さん"));
    }

    #[test]
    fn test_no_language_matches() {
        let ctx = Context::default();
        let data = data(json!({"fi": {"subject": "Hei"}}));
        let fields = email_fields();
        let template = Template::new(&ctx, &data, &fields);

        let err = template
            .render_first_match(&["fi", "en"], &["subject", "body"])
            .unwrap_err();
        assert!(matches!(err, NotifyError::NoLanguageMatches(tried) if tried == ["fi", "en"]));
    }

    #[test]
    fn test_optional_field_uses_initial() {
        let ctx = Context::default();
        let data = data(json!({"en": {"subject": "S", "body": "B"}}));
        let fields = email_fields();
        let template = Template::new(&ctx, &data, &fields);

        assert!(template.has_language("EN", &["subject", "body", "content_type"]));
        let rendered = template.render("en", &["subject", "body", "content_type"]);
        assert_eq!(rendered.get("content_type"), Some("plain"));
    }

    #[test]
    fn test_failing_field_is_left_out() {
        let ctx = Context::default();
        let data = data(json!({"en": {"subject": "{% if %}", "body": "Body"}}));
        let fields = email_fields();
        let template = Template::new(&ctx, &data, &fields);

        let rendered = template.render("en", &["subject", "body"]);
        assert_eq!(rendered.get("subject"), None);
        assert_eq!(rendered.get("body"), Some("Body"));
        assert_eq!(ctx.log_records().len(), 1);
    }

    #[test]
    fn test_undefined_is_lenient_by_default() {
        let ctx = Context::default();
        assert_eq!(render_in_context(&ctx, "[{{ missing }}]").unwrap(), "[]");
    }

    #[test]
    fn test_undefined_is_strict_when_failing_loud() {
        let settings = EngineSettings {
            fail_loud: true,
            ..EngineSettings::default()
        };
        let ctx = Context::default().with_services(Services::new().with_settings(settings));
        assert!(render_in_context(&ctx, "{{ missing }}").is_err());
    }

    #[test]
    fn test_nested_values_render() {
        let ctx = Context::from_variables([(
            "order",
            json!({"model": "shop.order", "pk": "1", "reference_number": "R-1"}),
        )]);
        assert_eq!(
            render_in_context(&ctx, "Order {{ order.reference_number }}").unwrap(),
            "Order R-1"
        );
    }
}
