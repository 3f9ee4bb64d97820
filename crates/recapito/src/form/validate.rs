//! Validation rule compilation and the pluggable validation engine.
//!
//! Rules use a pipe-delimited grammar (`required|email`, `numeric|max:42`,
//! `size:0`). The compiler turns the configured field list plus anti-spam
//! settings into a rule set and message set; the engine applies them to
//! the submitted input. The engine sits behind a trait so another
//! validation library can be substituted without touching the compiler or
//! the submission processor.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::antispam::{AntiSpamConfig, HONEYPOT_FIELD, TIMESTAMP_FIELD};
use super::types::FieldDefinition;

/// Loose email shape check: something@something.tld, no whitespace.
///
/// # Panics
///
/// Panics if the hard-coded regex literal is invalid (impossible in practice).
#[allow(clippy::expect_used)]
static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex literal"));

/// Compiled rule and message sets for one validation pass.
#[derive(Debug, Clone, Default)]
pub struct CompiledRules {
    /// Field name → pipe-delimited rule string, order-preserving.
    pub rules: BTreeMap<String, String>,

    /// `"<field>.<rule>"` → custom error message.
    pub messages: BTreeMap<String, String>,
}

/// Compile the configured fields plus anti-spam settings into rules.
///
/// Fields without validation entries get no rule. When anti-spam is
/// enabled, the honeypot must have zero length and the timestamp field
/// must decode to a value no later than `now` (the processor substitutes
/// the decoded-plus-delay value before validation, so `max:now` is the
/// whole delay check). The timestamp rule is always present when
/// anti-spam is on, so a submission that strips the token fails.
pub fn compile(fields: &[FieldDefinition], antispam: &AntiSpamConfig, now: i64) -> CompiledRules {
    let mut compiled = CompiledRules::default();

    for field in fields {
        if field.validation.is_empty() {
            continue;
        }

        let rule_types: Vec<&str> = field
            .validation
            .iter()
            .map(|r| r.rule_type.as_str())
            .collect();
        compiled.rules.insert(field.name.clone(), rule_types.join("|"));

        for rule in &field.validation {
            if let Some(message) = &rule.error_message {
                compiled
                    .messages
                    .insert(format!("{}.{}", field.name, rule.rule_type), message.clone());
            }
        }
    }

    if antispam.enabled {
        compiled
            .rules
            .insert(HONEYPOT_FIELD.to_string(), "size:0".to_string());
        compiled
            .rules
            .insert(TIMESTAMP_FIELD.to_string(), format!("required|numeric|max:{now}"));
    }

    compiled
}

/// A validation engine applies compiled rules to submitted input.
///
/// Returns at most one error message per field: the first failing rule in
/// configured order wins.
pub trait ValidationEngine: Send + Sync {
    /// Validate `input` against `compiled`, returning errors by field name.
    fn validate(
        &self,
        input: &BTreeMap<String, String>,
        compiled: &CompiledRules,
    ) -> BTreeMap<String, String>;
}

/// Built-in rule engine.
///
/// Supports `required`, `email`, `numeric`, `min:N`, `max:N`, and
/// `size:N`. Unknown rule tokens are accepted and skipped, so field
/// definitions may carry rules aimed at a richer engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleEngine;

impl RuleEngine {
    /// Create a new rule engine.
    pub fn new() -> Self {
        Self
    }
}

impl ValidationEngine for RuleEngine {
    fn validate(
        &self,
        input: &BTreeMap<String, String>,
        compiled: &CompiledRules,
    ) -> BTreeMap<String, String> {
        let mut errors = BTreeMap::new();

        for (field, rule_string) in &compiled.rules {
            let value = input.get(field).map(String::as_str);
            let numeric_context = rule_string.split('|').any(|r| r == "numeric");

            for token in rule_string.split('|') {
                let (rule, param) = match token.split_once(':') {
                    Some((rule, param)) => (rule, Some(param)),
                    None => (token, None),
                };

                if check_rule(rule, param, value, numeric_context) {
                    continue;
                }

                let message = compiled
                    .messages
                    .get(&format!("{field}.{rule}"))
                    .cloned()
                    .unwrap_or_else(|| default_message(field, rule, param));
                errors.insert(field.clone(), message);
                break;
            }
        }

        errors
    }
}

/// Apply a single rule. Returns true when the value passes.
///
/// Rules other than `required` and `size` pass on missing or empty
/// values; presence is `required`'s job.
fn check_rule(rule: &str, param: Option<&str>, value: Option<&str>, numeric_context: bool) -> bool {
    match rule {
        "required" => value.is_some_and(|v| !v.trim().is_empty()),
        "size" => {
            let expected: usize = match param.and_then(|p| p.parse().ok()) {
                Some(n) => n,
                None => return true,
            };
            value.unwrap_or("").chars().count() == expected
        }
        "email" => match non_empty(value) {
            Some(v) => EMAIL_RE.is_match(v),
            None => true,
        },
        "numeric" => match non_empty(value) {
            Some(v) => v.parse::<f64>().is_ok(),
            None => true,
        },
        "max" => compare_bound(param, value, numeric_context, |actual, bound| actual <= bound),
        "min" => compare_bound(param, value, numeric_context, |actual, bound| actual >= bound),
        other => {
            debug!(rule = other, "skipping unknown validation rule");
            true
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `min`/`max` semantics: numeric comparison when the field's rule set
/// contains `numeric` and the value parses, character count otherwise.
fn compare_bound(
    param: Option<&str>,
    value: Option<&str>,
    numeric_context: bool,
    cmp: fn(f64, f64) -> bool,
) -> bool {
    let Some(bound) = param.and_then(|p| p.parse::<f64>().ok()) else {
        return true;
    };

    let Some(v) = non_empty(value) else {
        return true;
    };

    if numeric_context {
        match v.parse::<f64>() {
            Ok(actual) => cmp(actual, bound),
            // The numeric rule reports unparseable values.
            Err(_) => true,
        }
    } else {
        cmp(v.chars().count() as f64, bound)
    }
}

/// Built-in error message for a failed rule.
fn default_message(field: &str, rule: &str, param: Option<&str>) -> String {
    match (rule, param) {
        ("required", _) => format!("The {field} field is required."),
        ("email", _) => format!("The {field} field must be a valid email address."),
        ("numeric", _) => format!("The {field} field must be a number."),
        ("max", Some(p)) => format!("The {field} field may not be greater than {p}."),
        ("min", Some(p)) => format!("The {field} field must be at least {p}."),
        ("size", Some(p)) => format!("The {field} field must have a size of {p}."),
        _ => format!("The {field} field is invalid."),
    }
}

#[cfg(test)]
// Tests are allowed to use unwrap/expect freely.
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::form::types::FieldDefinition;

    fn input(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_compile_joins_rules_in_order() {
        let fields = vec![
            FieldDefinition::new("email", "email")
                .rule("required")
                .rule_with_message("email", "Bad address."),
            FieldDefinition::new("note", "textarea"),
        ];

        let compiled = compile(&fields, &AntiSpamConfig::disabled(), 1000);

        assert_eq!(compiled.rules.get("email").unwrap(), "required|email");
        assert!(!compiled.rules.contains_key("note"));
        assert_eq!(compiled.messages.get("email.email").unwrap(), "Bad address.");
    }

    #[test]
    fn test_compile_adds_antispam_rules() {
        let antispam = AntiSpamConfig {
            enabled: true,
            delay_seconds: 5,
        };
        let compiled = compile(&[], &antispam, 1234);

        assert_eq!(compiled.rules.get(HONEYPOT_FIELD).unwrap(), "size:0");
        assert_eq!(
            compiled.rules.get(TIMESTAMP_FIELD).unwrap(),
            "required|numeric|max:1234"
        );
    }

    #[test]
    fn test_first_failing_rule_wins() {
        let fields = vec![
            FieldDefinition::new("email", "email")
                .rule("required")
                .rule("email"),
        ];
        let compiled = compile(&fields, &AntiSpamConfig::disabled(), 0);
        let engine = RuleEngine::new();

        let errors = engine.validate(&input(&[("email", "")]), &compiled);
        assert_eq!(
            errors.get("email").unwrap(),
            "The email field is required."
        );

        let errors = engine.validate(&input(&[("email", "not-an-email")]), &compiled);
        assert_eq!(
            errors.get("email").unwrap(),
            "The email field must be a valid email address."
        );

        let errors = engine.validate(&input(&[("email", "a@b.example")]), &compiled);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_custom_message_used() {
        let fields =
            vec![FieldDefinition::new("name", "text").rule_with_message("required", "Who are you?")];
        let compiled = compile(&fields, &AntiSpamConfig::disabled(), 0);

        let errors = RuleEngine::new().validate(&input(&[]), &compiled);
        assert_eq!(errors.get("name").unwrap(), "Who are you?");
    }

    #[test]
    fn test_honeypot_size_rule() {
        let antispam = AntiSpamConfig {
            enabled: true,
            delay_seconds: 5,
        };
        let compiled = compile(&[], &antispam, i64::MAX);
        let engine = RuleEngine::new();

        // Empty or absent honeypot passes.
        let errors = engine.validate(
            &input(&[(HONEYPOT_FIELD, ""), (TIMESTAMP_FIELD, "100")]),
            &compiled,
        );
        assert!(!errors.contains_key(HONEYPOT_FIELD));

        // Any content fails it.
        let errors = engine.validate(
            &input(&[(HONEYPOT_FIELD, "http://"), (TIMESTAMP_FIELD, "100")]),
            &compiled,
        );
        assert!(errors.contains_key(HONEYPOT_FIELD));
    }

    #[test]
    fn test_timestamp_rule_rejects_future_and_garbage() {
        let antispam = AntiSpamConfig {
            enabled: true,
            delay_seconds: 5,
        };
        let compiled = compile(&[], &antispam, 1000);
        let engine = RuleEngine::new();

        // Decoded + delay in the past: ok.
        let errors = engine.validate(&input(&[(TIMESTAMP_FIELD, "995")]), &compiled);
        assert!(!errors.contains_key(TIMESTAMP_FIELD));

        // Too fast: decoded + delay still ahead of now.
        let errors = engine.validate(&input(&[(TIMESTAMP_FIELD, "1001")]), &compiled);
        assert!(errors.contains_key(TIMESTAMP_FIELD));

        // Undecodable token left as-is fails the numeric rule.
        let errors = engine.validate(&input(&[(TIMESTAMP_FIELD, "zzz")]), &compiled);
        assert!(errors.contains_key(TIMESTAMP_FIELD));

        // Missing token fails the required rule.
        let errors = engine.validate(&input(&[]), &compiled);
        assert!(errors.contains_key(TIMESTAMP_FIELD));
    }

    #[test]
    fn test_unknown_rules_are_skipped() {
        let fields = vec![FieldDefinition::new("phone", "tel").rule("phone_e164")];
        let compiled = compile(&fields, &AntiSpamConfig::disabled(), 0);

        let errors = RuleEngine::new().validate(&input(&[("phone", "whatever")]), &compiled);
        assert!(errors.is_empty());
    }

    #[test]
    fn test_string_max_uses_length() {
        let fields = vec![FieldDefinition::new("name", "text").rule("max:3")];
        let compiled = compile(&fields, &AntiSpamConfig::disabled(), 0);
        let engine = RuleEngine::new();

        assert!(engine.validate(&input(&[("name", "abc")]), &compiled).is_empty());
        assert!(!engine.validate(&input(&[("name", "abcd")]), &compiled).is_empty());
    }
}
