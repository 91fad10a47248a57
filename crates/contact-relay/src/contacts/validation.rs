use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use super::domain::NewContact;

const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$";

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"))
}

/// A single violated rule, reported against the field that broke it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// Every rule a submission violated, in field-declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(transparent)]
#[error("validation failed for {} field(s)", .0.len())]
pub struct FieldErrors(pub Vec<FieldError>);

impl FieldErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.iter().map(|error| error.field)
    }
}

/// Constraint attached to one text field of the contact form.
#[derive(Debug, Clone, Copy)]
enum Rule {
    MinChars(usize),
    Email,
}

struct FieldRule {
    field: &'static str,
    rule: Rule,
    message: &'static str,
}

impl FieldRule {
    fn check(&self, value: &str) -> bool {
        match self.rule {
            Rule::MinChars(min) => value.chars().count() >= min,
            Rule::Email => email_pattern().is_match(value),
        }
    }
}

const CONTACT_RULES: [FieldRule; 4] = [
    FieldRule {
        field: "name",
        rule: Rule::MinChars(2),
        message: "Name must be at least 2 characters",
    },
    FieldRule {
        field: "email",
        rule: Rule::Email,
        message: "Please enter a valid email address",
    },
    FieldRule {
        field: "subject",
        rule: Rule::MinChars(5),
        message: "Subject must be at least 5 characters",
    },
    FieldRule {
        field: "message",
        rule: Rule::MinChars(10),
        message: "Message must be at least 10 characters",
    },
];

/// Validate an untyped contact-form record.
///
/// All four fields are checked independently so the caller sees every problem at once.
/// Fields other than the four known ones are dropped. Non-object input is treated as an
/// empty record.
pub fn validate_submission(input: &Value) -> Result<NewContact, FieldErrors> {
    let empty = Map::new();
    let record = input.as_object().unwrap_or(&empty);

    let mut errors = Vec::new();
    let [name_rule, email_rule, subject_rule, message_rule] = &CONTACT_RULES;
    let name = checked_text(record, name_rule, &mut errors);
    let email = checked_text(record, email_rule, &mut errors);
    let subject = checked_text(record, subject_rule, &mut errors);
    let message = checked_text(record, message_rule, &mut errors);

    match (name, email, subject, message) {
        (Some(name), Some(email), Some(subject), Some(message)) if errors.is_empty() => {
            Ok(NewContact {
                name,
                email,
                subject,
                message,
            })
        }
        _ => Err(FieldErrors(errors)),
    }
}

fn checked_text(
    record: &Map<String, Value>,
    rule: &FieldRule,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let message = match record.get(rule.field) {
        None | Some(Value::Null) => "Required".to_string(),
        Some(Value::String(text)) if rule.check(text) => return Some(text.clone()),
        Some(Value::String(_)) => rule.message.to_string(),
        Some(other) => format!("Expected string, received {}", json_type(other)),
    };

    errors.push(FieldError {
        field: rule.field,
        message,
    });
    None
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
