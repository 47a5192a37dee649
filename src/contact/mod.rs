//! Contact form: schema, CAPTCHA verification and outbound mail.

pub mod captcha;
pub mod handlers;
pub mod mail;

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;

use crate::security::sanitize_plain_text;
use crate::validation::{ObjectValidator, StringRule, Validation};

pub use captcha::{CaptchaError, CaptchaVerifier, RecaptchaVerifier};
pub use mail::{ContactEmail, MailError, MailReceipt, Mailer, ResendMailer};

pub const NAME_MAX: usize = 200;
pub const EMAIL_MAX: usize = 200;
pub const MESSAGE_MAX: usize = 5000;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^[a-z0-9_'+\-.]*[a-z0-9_+\-]@([a-z0-9][a-z0-9\-]*\.)+[a-z]{2,}$")
        .expect("valid email regex")
});

/// Address shape check. Rejects a leading dot and consecutive dots.
pub fn is_valid_email(value: &str) -> bool {
    !value.starts_with('.') && !value.contains("..") && EMAIL.is_match(value)
}

/// A validated contact submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
    pub token: String,
}

impl ContactForm {
    /// Strip markup and clamp each field to its maximum length in UTF-16 units.
    pub fn sanitized(self) -> Self {
        Self {
            name: truncate(sanitize_plain_text(&self.name), NAME_MAX),
            email: truncate(sanitize_plain_text(&self.email), EMAIL_MAX),
            message: truncate(sanitize_plain_text(&self.message), MESSAGE_MAX),
            token: self.token,
        }
    }
}

/// Keep whole characters up to `max` UTF-16 code units.
fn truncate(value: String, max: usize) -> String {
    let mut units = 0;
    for (idx, ch) in value.char_indices() {
        units += ch.len_utf16();
        if units > max {
            return value[..idx].to_string();
        }
    }
    value
}

pub fn validate_contact(raw: &Value) -> Validation<ContactForm> {
    let name_rule = StringRule::new()
        .min(1, "String must contain at least 1 character(s)")
        .max(NAME_MAX, "String must contain at most 200 character(s)");
    let email_rule = StringRule::new()
        .min(3, "String must contain at least 3 character(s)")
        .max(EMAIL_MAX, "String must contain at most 200 character(s)")
        .check(is_valid_email, "Invalid email");
    let message_rule = StringRule::new()
        .min(1, "String must contain at least 1 character(s)")
        .max(MESSAGE_MAX, "String must contain at most 5000 character(s)");
    let token_rule = StringRule::new().min(1, "String must contain at least 1 character(s)");

    let mut v = ObjectValidator::new(raw);
    let name = v.string("name", &name_rule);
    let email = v.string("email", &email_rule);
    let message = v.string("message", &message_rule);
    let token = v.string("token", &token_rule);

    if let Err(issues) = v.finish() {
        return Validation::Failure(issues);
    }

    // Every field is present once finish() passes.
    Validation::Success(ContactForm {
        name: name.unwrap_or_default(),
        email: email.unwrap_or_default(),
        message: message.unwrap_or_default(),
        token: token.unwrap_or_default(),
    })
}
