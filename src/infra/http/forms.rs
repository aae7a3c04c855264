//! Visitor-facing form payloads and their validation.
//!
//! Validation failures are reported per field and re-rendered inline; the
//! submission is rejected without touching the store or the mailer.

use serde::Deserialize;

use crate::application::comments::CommentDraft;
use crate::application::share::ShareDraft;
use crate::presentation::views::{CommentFormView, FormField, ShareFormView};

const MAX_NAME_CHARS: usize = 80;
const MAX_EMAIL_CHARS: usize = 254;

const REQUIRED: &str = "This field is required.";
const INVALID_EMAIL: &str = "Enter a valid email address.";
const NAME_TOO_LONG: &str = "Ensure this value has at most 80 characters.";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CommentForm {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) body: String,
}

impl CommentForm {
    /// Validate the submission, returning either a draft ready for
    /// persistence or the form view annotated with field errors.
    pub(crate) fn validate(&self) -> Result<CommentDraft, CommentFormView> {
        let name = self.name.trim();
        let email = self.email.trim();
        let body = self.body.trim();

        let mut view = CommentFormView {
            name: FormField::with_value(name),
            email: FormField::with_value(email),
            body: FormField::with_value(body),
        };

        validate_name(name, &mut view.name);
        validate_email_field(email, &mut view.email);
        if body.is_empty() {
            view.body.error = REQUIRED.to_string();
        }

        if view.has_errors() {
            Err(view)
        } else {
            Ok(CommentDraft {
                name: name.to_string(),
                email: email.to_string(),
                body: body.to_string(),
            })
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ShareForm {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) to: String,
    pub(crate) comments: String,
}

impl ShareForm {
    pub(crate) fn validate(&self) -> Result<ShareDraft, ShareFormView> {
        let name = self.name.trim();
        let email = self.email.trim();
        let to = self.to.trim();
        let comments = self.comments.trim();

        let mut view = ShareFormView {
            name: FormField::with_value(name),
            email: FormField::with_value(email),
            to: FormField::with_value(to),
            comments: FormField::with_value(comments),
        };

        validate_name(name, &mut view.name);
        validate_email_field(email, &mut view.email);
        validate_email_field(to, &mut view.to);

        if view.has_errors() {
            Err(view)
        } else {
            Ok(ShareDraft {
                name: name.to_string(),
                email: email.to_string(),
                to: to.to_string(),
                comments: comments.to_string(),
            })
        }
    }
}

fn validate_name(value: &str, field: &mut FormField) {
    if value.is_empty() {
        field.error = REQUIRED.to_string();
    } else if value.chars().count() > MAX_NAME_CHARS {
        field.error = NAME_TOO_LONG.to_string();
    }
}

fn validate_email_field(value: &str, field: &mut FormField) {
    if value.is_empty() {
        field.error = REQUIRED.to_string();
    } else if !is_valid_email(value) {
        field.error = INVALID_EMAIL.to_string();
    }
}

/// Conservative address check: one `@`, non-empty local part, and a dotted
/// domain with non-empty labels.
pub(crate) fn is_valid_email(value: &str) -> bool {
    if value.len() > MAX_EMAIL_CHARS || value.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return false;
    }

    domain.contains('.') && domain.split('.').all(|label| !label.is_empty())
}
