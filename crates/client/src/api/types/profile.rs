//! Vendor profile and account request types.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use validator::Validate;
use vendor_portal_core::{VendorId, VendorStatus};

/// The signed-in vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: VendorId,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    /// Approval status. `None` when the payload did not report one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<VendorStatus>,
    #[serde(default)]
    pub profile_picture: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    /// First and last name joined, skipping empty parts.
    #[must_use]
    pub fn full_name(&self) -> String {
        [self.firstname.trim(), self.lastname.trim()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// =============================================================================
// Account requests
// =============================================================================

/// Email and password for `login`.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "credentials_password", skip_on_field_errors = false))]
pub struct Credentials {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            password: SecretString::from(password.into()),
        }
    }
}

/// New vendor account details for `register`.
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "registration_password", skip_on_field_errors = false))]
pub struct Registration {
    #[validate(length(min = 2, message = "First name must be at least 2 characters"))]
    pub firstname: String,
    #[validate(length(min = 2, message = "Last name must be at least 2 characters"))]
    pub lastname: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub password: SecretString,
}

impl Registration {
    #[must_use]
    pub fn new(
        firstname: impl Into<String>,
        lastname: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            firstname: firstname.into().trim().to_string(),
            lastname: lastname.into().trim().to_string(),
            email: email.into().trim().to_string(),
            password: SecretString::from(password.into()),
        }
    }
}

/// A one-time code sent to the vendor's email.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct OtpVerification {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[validate(length(equal = 4, message = "OTP must be 4 digits"))]
    pub otp: String,
}

impl OtpVerification {
    #[must_use]
    pub fn new(email: impl Into<String>, otp: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
            otp: otp.into().trim().to_string(),
        }
    }
}

/// Email address for the forgot-password request.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct PasswordRecovery {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

impl PasswordRecovery {
    #[must_use]
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into().trim().to_string(),
        }
    }
}

/// Returned by a verified password OTP; authorizes one password reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetGrant {
    #[validate(length(min = 1, message = "Reset link is missing the account id"))]
    pub id: String,
    #[validate(length(min = 1, message = "Reset link is missing the reset token"))]
    pub password_reset_token: String,
}

/// A new password for a [`PasswordResetGrant`].
#[derive(Debug, Clone, Validate)]
#[validate(schema(function = "reset_password", skip_on_field_errors = false))]
pub struct PasswordReset {
    #[validate(nested)]
    pub grant: PasswordResetGrant,
    pub password: SecretString,
}

impl PasswordReset {
    #[must_use]
    pub fn new(grant: PasswordResetGrant, password: impl Into<String>) -> Self {
        Self {
            grant,
            password: SecretString::from(password.into()),
        }
    }
}

/// Editable profile fields. Absent fields are left unchanged server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, message = "Full name must be at least 2 characters"))]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl ProfileUpdate {
    /// Trim every field and drop the blank ones.
    #[must_use]
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            full_name: clean(self.full_name),
            email: clean(self.email),
            phone: clean(self.phone),
            address: clean(self.address),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.full_name.is_none()
            && self.email.is_none()
            && self.phone.is_none()
            && self.address.is_none()
    }
}

// Password rules run at struct level so the secret is never attached to the
// error as a param.
const PASSWORD_ERROR_CODE: &str = "password";

fn password_policy(password: &SecretString) -> Result<(), validator::ValidationError> {
    if password.expose_secret().chars().count() < 6 {
        return Err(validator::ValidationError::new(PASSWORD_ERROR_CODE)
            .with_message("Password must be at least 6 characters".into()));
    }
    Ok(())
}

fn credentials_password(credentials: &Credentials) -> Result<(), validator::ValidationError> {
    password_policy(&credentials.password)
}

fn registration_password(registration: &Registration) -> Result<(), validator::ValidationError> {
    password_policy(&registration.password)
}

fn reset_password(reset: &PasswordReset) -> Result<(), validator::ValidationError> {
    password_policy(&reset.password)
}
