//! Customer sign-in state and the login/signup forms.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::checkout::validate_email;
use crate::form::FieldErrors;
use crate::storage::{ClientStorage, StorageError, StorageExt, keys};
use crate::types::CustomerId;

/// Message the backend returns on a successful login.
pub const LOGIN_SUCCESS_MESSAGE: &str = "Authentication Successfully";

/// Signed-in customer profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Token and profile stored under `authInfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthInfo {
    pub token: String,
    pub data: CustomerProfile,
}

impl AuthInfo {
    /// Stored credentials, if present and readable. Corrupt values are removed.
    pub fn load<S: ClientStorage + ?Sized>(storage: &mut S) -> Option<Self> {
        match storage.get_json::<Self>(keys::AUTH_INFO) {
            Ok(info) => info,
            Err(e) => {
                warn!(error = %e, "discarding unreadable auth info");
                storage.remove_item(keys::AUTH_INFO);
                None
            }
        }
    }

    /// Persist these credentials.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] if the value could not be written.
    pub fn save<S: ClientStorage + ?Sized>(&self, storage: &mut S) -> Result<(), StorageError> {
        storage.set_json(keys::AUTH_INFO, self)
    }

    /// Sign out.
    pub fn clear<S: ClientStorage + ?Sized>(storage: &mut S) {
        storage.remove_item(keys::AUTH_INFO);
    }

    /// Bearer header value.
    #[must_use]
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

/// Response of `/customer/auth/login` and `/customer/auth/onboard`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub data: Option<CustomerProfile>,
}

impl AuthResponse {
    /// Credentials, when the response carries both token and profile.
    #[must_use]
    pub fn into_auth_info(self) -> Option<AuthInfo> {
        Some(AuthInfo {
            token: self.token.filter(|t| !t.is_empty())?,
            data: self.data?,
        })
    }
}

/// Login form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl LoginForm {
    /// Field errors for this form.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        validate_email(&mut errors, &self.email);
        if self.password.is_empty() {
            errors.add("password", "Password is required");
        }
        errors
    }
}

/// Signup form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl SignupForm {
    pub const MIN_NAME_LEN: usize = 2;
    pub const MIN_PASSWORD_LEN: usize = 6;

    /// Field errors for this form.
    #[must_use]
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        let name = self.name.trim();
        if name.is_empty() {
            errors.add("name", "Name is required");
        } else if name.chars().count() < Self::MIN_NAME_LEN {
            errors.add("name", "Name must be at least 2 characters");
        }

        validate_email(&mut errors, &self.email);

        if self.password.is_empty() {
            errors.add("password", "Password is required");
        } else if self.password.chars().count() < Self::MIN_PASSWORD_LEN {
            errors.add("password", "Password must be at least 6 characters");
        }

        errors
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::storage::MemoryStorage;

    fn info() -> AuthInfo {
        AuthInfo {
            token: "tok".into(),
            data: CustomerProfile {
                customer_id: CustomerId::new("c9"),
                name: "Ada".into(),
                email: "ada@example.com".into(),
            },
        }
    }

    #[test]
    fn test_save_load_clear() {
        let mut storage = MemoryStorage::new();
        assert!(AuthInfo::load(&mut storage).is_none());

        info().save(&mut storage).unwrap();
        assert_eq!(AuthInfo::load(&mut storage), Some(info()));
        assert_eq!(info().bearer(), "Bearer tok");

        AuthInfo::clear(&mut storage);
        assert!(storage.get_item(keys::AUTH_INFO).is_none());
    }

    #[test]
    fn test_corrupt_auth_info_is_removed() {
        let mut storage = MemoryStorage::new();
        storage.set_item(keys::AUTH_INFO, "{not json".into()).unwrap();
        assert!(AuthInfo::load(&mut storage).is_none());
        assert!(storage.get_item(keys::AUTH_INFO).is_none());
    }

    #[test]
    fn test_auth_response_requires_token_and_profile() {
        let ok: AuthResponse = serde_json::from_value(json!({
            "message": LOGIN_SUCCESS_MESSAGE,
            "token": "t",
            "data": {"customerId": "c1", "name": "A", "email": "a@b.co"}
        }))
        .unwrap();
        assert_eq!(ok.into_auth_info().unwrap().token, "t");

        let missing: AuthResponse = serde_json::from_value(json!({"message": "x", "token": ""})).unwrap();
        assert!(missing.into_auth_info().is_none());
    }

    #[test]
    fn test_login_validation() {
        let errors = LoginForm::default().validate();
        assert_eq!(errors.get("email"), Some("Email is required"));
        assert_eq!(errors.get("password"), Some("Password is required"));

        let form = LoginForm {
            email: "a@b.co".into(),
            password: "x".into(),
        };
        assert!(form.validate().is_empty());
    }

    #[test]
    fn test_signup_validation_lengths() {
        let form = SignupForm {
            name: "A".into(),
            email: "bad".into(),
            password: "12345".into(),
        };
        let errors = form.validate();
        assert_eq!(errors.get("name"), Some("Name must be at least 2 characters"));
        assert_eq!(errors.get("email"), Some("Invalid email format"));
        assert_eq!(errors.get("password"), Some("Password must be at least 6 characters"));

        let good = SignupForm {
            name: "Al".into(),
            email: "al@b.co".into(),
            password: "123456".into(),
        };
        assert!(good.validate().is_empty());
    }
}
