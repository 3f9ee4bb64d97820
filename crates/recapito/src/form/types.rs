//! Field definitions, the field-type catalog, and per-submission results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::routes::helpers::html_escape;

/// A single configured form field.
///
/// Loaded from the form settings file once per process and treated as
/// read-only afterwards. Field names must be unique within a form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Field name, used as the HTML id/name and as the submission key.
    pub name: String,

    /// Visible label. No label element is rendered when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Symbolic field type, a key into the field-type catalog.
    #[serde(rename = "type")]
    pub field_type: String,

    /// CSS class for the wrapper element. Defaulted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapper_css: Option<String>,

    /// CSS class for the field element itself. Defaulted when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_css: Option<String>,

    /// Whether this field requests autofocus on a clean render.
    #[serde(default)]
    pub autofocus: bool,

    /// Ordered validation rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation: Vec<ValidationRule>,
}

impl FieldDefinition {
    /// Create a field with the given name and type.
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            field_type: field_type.into(),
            wrapper_css: None,
            field_css: None,
            autofocus: false,
            validation: Vec::new(),
        }
    }

    /// Set the label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the wrapper CSS class.
    pub fn wrapper_css(mut self, css: impl Into<String>) -> Self {
        self.wrapper_css = Some(css.into());
        self
    }

    /// Set the field CSS class.
    pub fn field_css(mut self, css: impl Into<String>) -> Self {
        self.field_css = Some(css.into());
        self
    }

    /// Request autofocus.
    pub fn autofocus(mut self) -> Self {
        self.autofocus = true;
        self
    }

    /// Append a validation rule.
    pub fn rule(mut self, rule_type: impl Into<String>) -> Self {
        self.validation.push(ValidationRule {
            rule_type: rule_type.into(),
            error_message: None,
        });
        self
    }

    /// Append a validation rule with a custom error message.
    pub fn rule_with_message(
        mut self,
        rule_type: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        self.validation.push(ValidationRule {
            rule_type: rule_type.into(),
            error_message: Some(message.into()),
        });
        self
    }

    /// Whether any of the field's rules is of type `required`.
    pub fn is_required(&self) -> bool {
        self.validation.iter().any(|r| r.rule_type == "required")
    }
}

/// One entry in a field's ordered validation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRule {
    /// Rule type token, e.g. `required`, `email`, `max:255`.
    #[serde(rename = "type")]
    pub rule_type: String,

    /// Custom error message overriding the built-in one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

/// HTML shape of a field type: tag names plus default attributes.
///
/// `html_close` is empty for void elements; for those the submitted value
/// is re-rendered as a `value` attribute, while paired tags get it as
/// inner content instead.
#[derive(Debug, Clone, Copy)]
pub struct FieldTypeSpec {
    /// Opening tag name.
    pub html_open: &'static str,

    /// Closing tag name, or `""` for void elements.
    pub html_close: &'static str,

    /// Default attributes. `None` values render as bare attributes.
    pub attributes: &'static [(&'static str, Option<&'static str>)],
}

impl FieldTypeSpec {
    /// Whether this type renders as a paired (non-void) element.
    pub fn is_paired(&self) -> bool {
        !self.html_close.is_empty()
    }
}

/// Static field-type catalog.
const FIELD_TYPES: &[(&str, FieldTypeSpec)] = &[
    (
        "text",
        FieldTypeSpec {
            html_open: "input",
            html_close: "",
            attributes: &[("type", Some("text"))],
        },
    ),
    (
        "email",
        FieldTypeSpec {
            html_open: "input",
            html_close: "",
            attributes: &[("type", Some("email"))],
        },
    ),
    (
        "tel",
        FieldTypeSpec {
            html_open: "input",
            html_close: "",
            attributes: &[("type", Some("tel"))],
        },
    ),
    (
        "url",
        FieldTypeSpec {
            html_open: "input",
            html_close: "",
            attributes: &[("type", Some("url"))],
        },
    ),
    (
        "number",
        FieldTypeSpec {
            html_open: "input",
            html_close: "",
            attributes: &[("type", Some("number"))],
        },
    ),
    (
        "checkbox",
        FieldTypeSpec {
            html_open: "input",
            html_close: "",
            attributes: &[("type", Some("checkbox"))],
        },
    ),
    (
        "hidden",
        FieldTypeSpec {
            html_open: "input",
            html_close: "",
            attributes: &[("type", Some("hidden"))],
        },
    ),
    (
        "textarea",
        FieldTypeSpec {
            html_open: "textarea",
            html_close: "textarea",
            attributes: &[("rows", Some("5"))],
        },
    ),
    (
        "select",
        FieldTypeSpec {
            html_open: "select",
            html_close: "select",
            attributes: &[],
        },
    ),
];

/// Look up a field type by its symbolic key.
pub fn field_type(key: &str) -> Option<&'static FieldTypeSpec> {
    FIELD_TYPES
        .iter()
        .find(|(name, _)| *name == key)
        .map(|(_, spec)| spec)
}

/// Per-field outcome of one submission: the escaped value plus at most
/// one error message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldValue {
    /// Submitted value, HTML-escaped on entry.
    pub value: String,

    /// First validation error for this field, if any. Raw text; escaped
    /// at render time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FieldValue {
    /// Build a field value from the raw submitted string.
    ///
    /// This is the single point where submitted values are escaped; the
    /// stored `value` is safe for re-rendering and persistence as-is.
    pub fn new(raw: &str, error: Option<String>) -> Self {
        Self {
            value: html_escape(raw),
            error,
        }
    }

    /// Whether this field carries an error.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Per-submission result map, keyed by submitted field name.
///
/// Keys are exactly the union of submitted input keys, including the
/// anti-spam fields.
pub type SubmissionResults = BTreeMap<String, FieldValue>;

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_field_builder() {
        let field = FieldDefinition::new("email", "email")
            .label("Your email")
            .rule("required")
            .rule_with_message("email", "That does not look like an email address.");

        assert_eq!(field.name, "email");
        assert_eq!(field.label, Some("Your email".to_string()));
        assert!(field.is_required());
        assert_eq!(field.validation.len(), 2);
        assert_eq!(field.validation[1].rule_type, "email");
    }

    #[test]
    fn test_is_required_without_rules() {
        let field = FieldDefinition::new("note", "textarea");
        assert!(!field.is_required());
    }

    #[test]
    fn test_field_type_lookup() {
        let text = field_type("text").unwrap();
        assert_eq!(text.html_open, "input");
        assert!(!text.is_paired());

        let textarea = field_type("textarea").unwrap();
        assert_eq!(textarea.html_close, "textarea");
        assert!(textarea.is_paired());

        assert!(field_type("carousel").is_none());
    }

    #[test]
    fn test_field_value_escapes_once() {
        let value = FieldValue::new("<b>&\"", None);
        assert_eq!(value.value, "&lt;b&gt;&amp;&quot;");
        assert!(!value.has_error());
    }

    #[test]
    fn test_field_definition_deserialization() {
        let yaml = r#"
name: message
label: Message
type: textarea
autofocus: true
validation:
  - type: required
    error_message: Please write something.
"#;
        let field: FieldDefinition = serde_yml::from_str(yaml).unwrap();
        assert_eq!(field.name, "message");
        assert_eq!(field.field_type, "textarea");
        assert!(field.autofocus);
        assert_eq!(
            field.validation[0].error_message,
            Some("Please write something.".to_string())
        );
    }
}
