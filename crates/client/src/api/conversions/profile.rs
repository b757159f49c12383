//! Profile and auth payload conversions.

use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;
use vendor_portal_core::{VendorId, VendorStatus};

use super::{first_text, from_wire, malformed, payload, timestamp};
use crate::api::types::{PasswordResetGrant, Profile};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireProfile {
    #[serde(rename = "_id")]
    underscore_id: Option<String>,
    id: Option<String>,
    email: Option<String>,
    #[serde(alias = "firstName")]
    firstname: Option<String>,
    #[serde(alias = "lastName")]
    lastname: Option<String>,
    full_name: Option<String>,
    status: Option<String>,
    #[serde(alias = "avatar")]
    profile_picture: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    created_at: Option<String>,
    updated_at: Option<String>,
}

impl WireProfile {
    fn id(&self) -> Option<String> {
        first_text([self.underscore_id.clone(), self.id.clone()])
    }

    fn into_profile(self, id: VendorId) -> Profile {
        let (mut firstname, mut lastname) = (
            self.firstname.unwrap_or_default().trim().to_string(),
            self.lastname.unwrap_or_default().trim().to_string(),
        );
        // Some responses only carry the combined name
        if firstname.is_empty() && lastname.is_empty() {
            if let Some(full) = self.full_name.as_deref().map(str::trim) {
                let (first, last) = full.split_once(' ').unwrap_or((full, ""));
                firstname = first.to_string();
                lastname = last.trim().to_string();
            }
        }

        Profile {
            id,
            email: self.email.unwrap_or_default().trim().to_string(),
            firstname,
            lastname,
            status: first_text([self.status]).map(VendorStatus::from),
            profile_picture: first_text([self.profile_picture]),
            phone: first_text([self.phone]),
            address: first_text([self.address]),
            created_at: timestamp(self.created_at.as_deref()),
            updated_at: timestamp(self.updated_at.as_deref()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireAuthData {
    token: Option<String>,
    #[serde(flatten)]
    profile: WireProfile,
}

/// Convert a `GET vendor/profile` response.
///
/// # Errors
///
/// Returns `ApiError::Decode` if the payload is not an object with an id.
pub fn convert_profile(body: Value) -> Result<Profile, ApiError> {
    let wire: WireProfile = from_wire("profile", payload(body))?;
    let id = wire
        .id()
        .ok_or_else(|| malformed("profile", "missing _id"))?;
    Ok(wire.into_profile(VendorId::new(id)))
}

/// Convert a login or OTP verification response into `(profile, token)`.
///
/// The profile embedded in auth responses may be partial; it is replaced by
/// the follow-up profile fetch.
///
/// # Errors
///
/// Returns `ApiError::Decode` if no token is present.
pub fn convert_auth_session(body: Value) -> Result<(Profile, SecretString), ApiError> {
    let wire: WireAuthData = from_wire("auth session", payload(body))?;
    let token = first_text([wire.token]).ok_or_else(|| malformed("auth session", "missing token"))?;
    let id = wire.profile.id().unwrap_or_default();
    Ok((
        wire.profile.into_profile(VendorId::new(id)),
        SecretString::from(token),
    ))
}

/// Convert a verified password OTP response.
///
/// # Errors
///
/// Returns `ApiError::Decode` if the id or reset token is missing.
pub fn convert_reset_grant(body: Value) -> Result<PasswordResetGrant, ApiError> {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct WireGrant {
        #[serde(alias = "_id")]
        id: Option<String>,
        #[serde(alias = "resetToken")]
        password_reset_token: Option<String>,
    }

    let wire: WireGrant = from_wire("password reset grant", payload(body))?;
    match (first_text([wire.id]), first_text([wire.password_reset_token])) {
        (Some(id), Some(password_reset_token)) => Ok(PasswordResetGrant {
            id,
            password_reset_token,
        }),
        _ => Err(malformed(
            "password reset grant",
            "missing id or passwordResetToken",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;

    #[test]
    fn test_convert_profile() {
        let profile = convert_profile(json!({
            "status": 200,
            "data": {
                "_id": "65a1",
                "email": "ada@example.com",
                "firstname": "Ada",
                "lastname": "Lovelace",
                "status": "pending",
                "profilePicture": "uploads/ada.png",
                "createdAt": "2024-01-05T09:30:00.000Z",
                "updatedAt": "2024-01-06T09:30:00.000Z",
                "__v": 0
            }
        }))
        .unwrap();

        assert_eq!(profile.id.as_str(), "65a1");
        assert_eq!(profile.status, Some(VendorStatus::Pending));
        assert_eq!(profile.profile_picture.as_deref(), Some("uploads/ada.png"));
        assert!(profile.created_at.is_some());
    }

    #[test]
    fn test_convert_profile_requires_id() {
        let err = convert_profile(json!({"data": {"email": "a@b.co"}})).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_convert_profile_without_status_reports_none() {
        let profile = convert_profile(json!({"data": {"_id": "v1", "email": "a@b.c"}})).unwrap();
        assert_eq!(profile.status, None);

        let profile =
            convert_profile(json!({"data": {"_id": "v1", "email": "a@b.c", "status": "  "}}))
                .unwrap();
        assert_eq!(profile.status, None);
    }

    #[test]
    fn test_convert_profile_splits_full_name() {
        let profile = convert_profile(json!({
            "data": {"id": "v2", "email": "g@example.com", "fullName": "Grace Brewster Hopper"}
        }))
        .unwrap();
        assert_eq!(profile.firstname, "Grace");
        assert_eq!(profile.lastname, "Brewster Hopper");
    }

    #[test]
    fn test_convert_auth_session_splits_token_from_profile() {
        let (profile, token) = convert_auth_session(json!({
            "message": "Login successful",
            "data": {
                "token": "jwt-abc",
                "_id": "65a1",
                "email": "ada@example.com",
                "firstname": "Ada",
                "lastname": "Lovelace",
                "status": "active"
            }
        }))
        .unwrap();

        assert_eq!(token.expose_secret(), "jwt-abc");
        assert_eq!(profile.email, "ada@example.com");
        assert_eq!(profile.status, Some(VendorStatus::Active));
    }

    #[test]
    fn test_convert_auth_session_requires_token() {
        let err = convert_auth_session(json!({"data": {"_id": "65a1"}})).unwrap_err();
        assert!(err.to_string().contains("missing token"));
    }

    #[test]
    fn test_convert_reset_grant() {
        let grant = convert_reset_grant(json!({
            "data": {"id": "65a1", "passwordResetToken": "rst"}
        }))
        .unwrap();
        assert_eq!(grant.password_reset_token, "rst");

        assert!(convert_reset_grant(json!({"data": {"id": "65a1"}})).is_err());
    }
}
