//! Field-scoped form validation results.

use std::collections::BTreeMap;

use serde::Serialize;

/// Map of form field name to the message shown under it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    /// No errors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error for `field`, keeping the first one.
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Record `message` when `value` is blank.
    pub fn require(&mut self, field: &'static str, value: &str, message: &str) -> bool {
        let present = !value.trim().is_empty();
        if !present {
            self.add(field, message);
        }
        present
    }

    /// Message for `field`, if any.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// True when validation passed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of failing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// `Ok(())` when empty, otherwise the errors.
    ///
    /// # Errors
    ///
    /// Returns `self` when any field failed.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() { Ok(()) } else { Err(self) }
    }

    /// Iterate over `(field, message)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_and_first_message_wins() {
        let mut errors = FieldErrors::new();
        assert!(!errors.require("name", "  ", "Name is required"));
        errors.add("name", "other");
        assert!(errors.require("city", "Paris", "City is required"));

        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.get("city"), None);
        assert_eq!(errors.len(), 1);
        assert!(errors.into_result().is_err());
    }
}
