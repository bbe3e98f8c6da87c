//! Field validators used by form handlers.
//!
//! Validators never fail; an invalid value produces a
//! [`ValidationOutcome`] with `valid == false` and a user-facing message.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Per-field rule stored in a form's `validation` prop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRule {
    /// Minimum length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    /// Maximum length in characters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    /// Regular expression the whole value must match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
}

/// Result of validating one value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Whether the value passed.
    pub valid: bool,
    /// Reason for failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ValidationOutcome {
    /// A passing outcome.
    pub fn ok() -> Self {
        Self {
            valid: true,
            message: None,
        }
    }

    /// A failing outcome with a message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: Some(message.into()),
        }
    }
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
    })
}

fn password_charset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-zA-Z\d@$!%*?&]{8,}$").expect("valid password regex"))
}

/// Built-in validators.
pub struct FieldValidator;

impl FieldValidator {
    /// Pick a validator from the field name (`name`, `email`, `password`).
    /// Fields with no matching validator always pass.
    pub fn validate_field(field_name: &str, value: &str) -> ValidationOutcome {
        let lowered = field_name.to_ascii_lowercase();
        if lowered.contains("email") {
            Self::validate_email(value)
        } else if lowered.contains("password") {
            Self::validate_password(value)
        } else if lowered.contains("name") {
            Self::validate_name(value)
        } else {
            ValidationOutcome::ok()
        }
    }

    /// Names are 2 to 50 characters.
    pub fn validate_name(value: &str) -> ValidationOutcome {
        let len = value.chars().count();
        if len < 2 {
            ValidationOutcome::invalid("Name must be at least 2 characters")
        } else if len > 50 {
            ValidationOutcome::invalid("Name must be at most 50 characters")
        } else {
            ValidationOutcome::ok()
        }
    }

    /// Basic `local@domain.tld` shape.
    pub fn validate_email(value: &str) -> ValidationOutcome {
        if email_regex().is_match(value) {
            ValidationOutcome::ok()
        } else {
            ValidationOutcome::invalid("Please enter a valid email address")
        }
    }

    /// At least 8 characters with lower case, upper case and a digit.
    pub fn validate_password(value: &str) -> ValidationOutcome {
        if value.chars().count() < 8 {
            return ValidationOutcome::invalid("Password must be at least 8 characters");
        }
        let has_lower = value.chars().any(|c| c.is_ascii_lowercase());
        let has_upper = value.chars().any(|c| c.is_ascii_uppercase());
        let has_digit = value.chars().any(|c| c.is_ascii_digit());
        if !(has_lower && has_upper && has_digit) || !password_charset_regex().is_match(value) {
            return ValidationOutcome::invalid(
                "Password must contain upper and lower case letters and digits",
            );
        }
        ValidationOutcome::ok()
    }

    /// Apply a form-supplied rule.
    pub fn validate_with_rule(field_name: &str, value: &str, rule: &FieldRule) -> ValidationOutcome {
        let len = value.chars().count();
        if let Some(min) = rule.min_length {
            if len < min {
                return ValidationOutcome::invalid(format!(
                    "{field_name} must be at least {min} characters"
                ));
            }
        }
        if let Some(max) = rule.max_length {
            if len > max {
                return ValidationOutcome::invalid(format!(
                    "{field_name} must be at most {max} characters"
                ));
            }
        }
        if let Some(pattern) = &rule.pattern {
            match Regex::new(&format!("^(?:{pattern})$")) {
                Ok(re) if re.is_match(value) => {}
                Ok(_) => {
                    return ValidationOutcome::invalid(format!("{field_name} has an invalid format"))
                }
                Err(e) => {
                    log::warn!("ignoring unusable pattern for field {field_name}: {e}");
                }
            }
        }
        ValidationOutcome::ok()
    }
}
