//! HTML rendering for form fields, the anti-spam fragment, and the
//! submit button.
//!
//! Markup is assembled through a small ordered attribute builder instead
//! of ad-hoc string interpolation, so each value is escaped exactly once:
//! configured text at render time, submitted values when they enter the
//! result map.

use tracing::warn;

use crate::routes::helpers::html_escape;
use crate::settings::{DEFAULT_FIELD_CSS, DEFAULT_WRAPPER_CSS, FormSettings};

use super::antispam::{AntiSpamConfig, HONEYPOT_FIELD, TIMESTAMP_FIELD, encode_timestamp};
use super::types::{FieldDefinition, SubmissionResults, field_type};

/// An attribute value.
#[derive(Debug, Clone)]
enum AttrValue {
    /// Bare attribute, rendered as the name alone (`required`, `autofocus`).
    Bare,

    /// Text escaped at render time.
    Text(String),

    /// Already-escaped markup inserted verbatim.
    Escaped(String),
}

/// Ordered attribute list for one element.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    items: Vec<(String, AttrValue)>,
}

impl Attributes {
    /// Create an empty attribute list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a text attribute; the value is escaped when rendered.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.items.push((name.into(), AttrValue::Text(value.into())));
    }

    /// Set a bare attribute (no value).
    pub fn set_bare(&mut self, name: impl Into<String>) {
        self.items.push((name.into(), AttrValue::Bare));
    }

    /// Set an attribute whose value is already escaped.
    pub fn set_escaped(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.items
            .push((name.into(), AttrValue::Escaped(value.into())));
    }

    /// Whether an attribute with this name is present.
    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|(n, _)| n == name)
    }

    /// Look up an attribute's rendered value.
    pub fn get(&self, name: &str) -> Option<String> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, v)| match v {
            AttrValue::Bare => String::new(),
            AttrValue::Text(text) => html_escape(text),
            AttrValue::Escaped(markup) => markup.clone(),
        })
    }

    /// Render as a space-joined attribute string.
    pub fn render(&self) -> String {
        let parts: Vec<String> = self
            .items
            .iter()
            .map(|(name, value)| match value {
                AttrValue::Bare => name.clone(),
                AttrValue::Text(text) => format!("{}=\"{}\"", name, html_escape(text)),
                AttrValue::Escaped(markup) => format!("{name}=\"{markup}\""),
            })
            .collect();

        parts.join(" ")
    }
}

/// Renders the form's markup fragments for one request.
///
/// Holds the per-submission result map and the single-autofocus state:
/// when any field has an error, configured autofocus is suppressed and
/// the first errored field in render order claims the one autofocus
/// attribute instead.
#[derive(Debug)]
pub struct FormRenderer<'a> {
    settings: &'a FormSettings,
    results: &'a SubmissionResults,
    has_errors: bool,
    autofocus_claimed: bool,
}

impl<'a> FormRenderer<'a> {
    /// Create a renderer over the given settings and submission results.
    ///
    /// For a clean (unsubmitted) render, pass an empty result map.
    pub fn new(settings: &'a FormSettings, results: &'a SubmissionResults) -> Self {
        let has_errors = results.values().any(super::types::FieldValue::has_error);
        Self {
            settings,
            results,
            has_errors,
            autofocus_claimed: false,
        }
    }

    /// Render every configured field in definition order.
    pub fn render_fields(&mut self) -> String {
        let fields: &'a [FieldDefinition] = &self.settings.form_fields;
        fields
            .iter()
            .map(|field| self.render_field(field))
            .collect()
    }

    /// Render a single field's wrapper, label, help text, and element.
    pub fn render_field(&mut self, field: &FieldDefinition) -> String {
        if field.name.is_empty() && field.field_type.is_empty() {
            return String::new();
        }

        let Some(spec) = field_type(&field.field_type) else {
            warn!(field = %field.name, field_type = %field.field_type, "unknown field type");
            return String::new();
        };

        let result = self.results.get(&field.name);
        let error = result.and_then(|r| r.error.as_deref());
        let value = result.map_or("", |r| r.value.as_str());
        let required = field.is_required();

        let mut wrapper_css = field
            .wrapper_css
            .as_deref()
            .unwrap_or(DEFAULT_WRAPPER_CSS)
            .to_string();
        if error.is_some() {
            wrapper_css.push_str(" has-error");
        }

        let mut out = String::new();
        out.push_str(&format!("<div class=\"{}\">", html_escape(&wrapper_css)));

        if let Some(label) = &field.label {
            let label_css = if required {
                "control-label required"
            } else {
                "control-label"
            };
            out.push_str(&format!(
                "<label class=\"{}\" for=\"{}\">{}</label>",
                label_css,
                html_escape(&field.name),
                html_escape(label)
            ));
        }

        if let Some(error) = error {
            out.push_str(&format!(
                "<small class=\"help-block\">{}</small>",
                html_escape(error)
            ));
        }

        let mut field_css = field
            .field_css
            .as_deref()
            .unwrap_or(DEFAULT_FIELD_CSS)
            .to_string();
        if error.is_some() {
            field_css.push_str(" error");
        }

        let mut attrs = Attributes::new();
        attrs.set("id", &field.name);
        attrs.set("name", &field.name);
        attrs.set("class", &field_css);

        // The submitted value becomes an attribute only for void elements;
        // paired tags carry it as inner content instead.
        if !spec.is_paired() && !value.is_empty() {
            attrs.set_escaped("value", value);
        }

        for (name, default) in spec.attributes {
            match default {
                Some(v) => attrs.set(*name, *v),
                None => attrs.set_bare(*name),
            }
        }

        // Configured autofocus yields to errors: when any field errored,
        // only the first errored field gets the attribute.
        if field.autofocus && !self.has_errors {
            attrs.set_bare("autofocus");
        }
        if error.is_some() && !self.autofocus_claimed {
            attrs.set_bare("autofocus");
            self.autofocus_claimed = true;
        }

        if required {
            attrs.set_bare("required");
        }

        out.push_str(&format!("<{} {}>", spec.html_open, attrs.render()));

        if spec.is_paired() {
            if !value.is_empty() {
                out.push_str(value);
            }
            out.push_str(&format!("</{}>", spec.html_close));
        }

        out.push_str("</div>");

        out
    }

    /// Render the anti-spam fragment: the obfuscated-timestamp hidden
    /// field plus the honeypot input, hidden again by an inline script
    /// for JS-enabled browsers.
    pub fn render_antispam(&mut self, antispam: &AntiSpamConfig, now: i64) -> String {
        if !antispam.enabled {
            return String::new();
        }

        let honeypot = self.results.get(HONEYPOT_FIELD);
        let tripped = honeypot.is_some_and(|r| !r.value.is_empty());

        let mut out = String::new();

        let wrapper_css = if tripped {
            "form-group has-error"
        } else {
            "form-group"
        };
        out.push_str(&format!(
            "<div id=\"{HONEYPOT_FIELD}-wrapper\" class=\"{wrapper_css}\">"
        ));

        out.push_str(&format!(
            "<label class=\"control-label\" for=\"{HONEYPOT_FIELD}\">{}</label>",
            html_escape(self.settings.antispam_label())
        ));

        out.push_str(&format!(
            "<input type=\"hidden\" name=\"{TIMESTAMP_FIELD}\" value=\"{}\">",
            encode_timestamp(now)
        ));

        if honeypot.is_some_and(super::types::FieldValue::has_error) {
            out.push_str(&format!(
                "<small class=\"help-block\">{}</small>",
                html_escape(self.settings.antispam_error_msg())
            ));
        }

        let mut attrs = Attributes::new();
        attrs.set("id", HONEYPOT_FIELD);
        attrs.set("name", HONEYPOT_FIELD);
        let mut css = format!("{HONEYPOT_FIELD} form-control");
        if tripped {
            css.push_str(" error");
        }
        attrs.set("class", &css);
        attrs.set("type", "text");
        // Decoy value; real browsers blank it via the script below.
        attrs.set("value", "http://");

        if tripped && !self.autofocus_claimed {
            attrs.set_bare("autofocus");
            self.autofocus_claimed = true;
        }

        out.push_str(&format!("<input {}>", attrs.render()));
        out.push_str("</div>");

        out.push_str(&format!(
            "<script>document.getElementById('{HONEYPOT_FIELD}').setAttribute('value', '');\
document.getElementById('{HONEYPOT_FIELD}-wrapper').style.display = 'none';</script>"
        ));

        out
    }

    /// Render the submit button, or a notice when no fields are configured.
    pub fn render_submit_button(&self) -> String {
        if self.settings.form_fields.is_empty() {
            return "<p class=\"contact-form-empty\">No form fields are configured.</p>".to_string();
        }

        format!(
            "<div id=\"submit-wrapper\" class=\"form-group\">\
<button type=\"submit\" class=\"{}\">{}</button></div>",
            html_escape(self.settings.send_btn_css()),
            html_escape(self.settings.send_btn_text())
        )
    }

    /// Build the attribute map for the form element itself.
    ///
    /// Always carries class/action/method; the data attributes for
    /// asynchronous submission and the native confirmation prompt are
    /// added only when the corresponding settings allow them.
    pub fn form_attributes(&self, action: &str) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.set("class", self.settings.form_css());
        attrs.set("action", action);
        attrs.set("method", "POST");

        if self.settings.form_allow_ajax {
            attrs.set("data-form-async", "true");
            attrs.set("data-form-update", "#scf-message, #scf-form");
        }

        if self.settings.form_allow_confirm_msg
            && let Some(confirm) = &self.settings.form_send_confirm_msg
        {
            attrs.set("data-form-confirm", confirm);
        }

        attrs
    }
}
