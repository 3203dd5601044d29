//! Store content outside the catalog: blog posts, page metadata, contact form.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::checkout::validate_email;
use crate::form::FieldErrors;
use crate::types::BlogId;

/// Title used when a store has no metadata.
pub const DEFAULT_TITLE: &str = "Online Store";

/// Description used when a store has no metadata.
pub const DEFAULT_DESCRIPTION: &str = "Shop our latest products.";

/// Accepts a single path or a list of paths.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => vec![s],
        Value::Array(items) => items
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_owned))
            .collect(),
        _ => Vec::new(),
    })
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPost {
    pub blog_id: BlogId,
    #[serde(default)]
    pub blog_name: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub blog_image: Vec<String>,
    /// Merchant-authored HTML.
    #[serde(default)]
    pub blog_description: String,
}

impl BlogPost {
    /// First image path, if any.
    #[must_use]
    pub fn cover_image(&self) -> Option<&str> {
        self.blog_image.first().map(String::as_str)
    }
}

/// Envelope of `/blog/all/?storeId=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogList {
    #[serde(default)]
    pub data: Vec<BlogPost>,
}

/// Envelope of `/blog/?blogId=`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogDetail {
    #[serde(default)]
    pub data: Option<BlogPost>,
}

/// Page title and description for a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreMeta {
    pub title: String,
    pub description: String,
}

impl Default for StoreMeta {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_owned(),
            description: DEFAULT_DESCRIPTION.to_owned(),
        }
    }
}

#[derive(Deserialize)]
struct MetaEntry {
    #[serde(rename = "Title", default)]
    title: Option<String>,
    #[serde(rename = "Description", default)]
    description: Option<String>,
}

#[derive(Deserialize)]
struct MetaEnvelope {
    #[serde(default)]
    data: Vec<MetaEntry>,
}

impl StoreMeta {
    /// Read `/meta/store/?storeId=`, falling back to defaults for missing parts.
    #[must_use]
    pub fn from_response(value: Value) -> Self {
        let entry = serde_json::from_value::<MetaEnvelope>(value)
            .ok()
            .and_then(|env| env.data.into_iter().next());
        let defaults = Self::default();
        let Some(entry) = entry else {
            return defaults;
        };
        Self {
            title: entry.title.filter(|t| !t.is_empty()).unwrap_or(defaults.title),
            description: entry
                .description
                .filter(|d| !d.is_empty())
                .unwrap_or(defaults.description),
        }
    }
}

/// Simple arithmetic challenge on the contact form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Captcha {
    pub left: u8,
    pub right: u8,
}

impl Captcha {
    /// Operands are clamped into `1..=10`.
    #[must_use]
    pub fn new(left: u8, right: u8) -> Self {
        Self {
            left: left.clamp(1, 10),
            right: right.clamp(1, 10),
        }
    }

    /// Expected answer.
    #[must_use]
    pub const fn answer(self) -> u8 {
        self.left + self.right
    }

    /// Whether `input` is the right answer.
    #[must_use]
    pub fn check(self, input: &str) -> bool {
        input.trim().parse::<u8>().is_ok_and(|n| n == self.answer())
    }
}

/// Contact form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ContactForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub subject: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub captcha: String,
}

impl ContactForm {
    /// Field errors, including the captcha check.
    ///
    /// `captcha` is the challenge that was shown; without one the check fails.
    #[must_use]
    pub fn validate(&self, captcha: Option<Captcha>) -> FieldErrors {
        let mut errors = FieldErrors::new();
        errors.require("name", &self.name, "Name is required");
        validate_email(&mut errors, &self.email);
        errors.require("subject", &self.subject, "Subject is required");
        errors.require("message", &self.message, "Message is required");
        if !captcha.is_some_and(|c| c.check(&self.captcha)) {
            errors.add("captcha", "Incorrect captcha. Please try again.");
        }
        errors
    }
}
