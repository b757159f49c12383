//! Registration, login and password recovery.

use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::VendorClient;
use super::conversions::{convert_auth_session, convert_reset_grant};
use super::types::{
    Credentials, OtpVerification, PasswordRecovery, PasswordReset, PasswordResetGrant, Profile,
    Registration,
};
use crate::cache::{Mutation, MutationKind};
use crate::error::{ApiError, FailureKind};
use crate::gateway::ApiRequest;
use crate::session::Route;

/// Account and session operations.
#[derive(Debug, Clone, Copy)]
pub struct AuthApi<'a> {
    client: &'a VendorClient,
}

impl<'a> AuthApi<'a> {
    pub(super) const fn new(client: &'a VendorClient) -> Self {
        Self { client }
    }

    /// Create a vendor account. The server emails a registration OTP and
    /// the view moves to the OTP screen.
    ///
    /// Returns the server's confirmation message, if any.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for bad input, otherwise the gateway
    /// failure.
    #[instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: &Registration) -> Result<Option<String>, ApiError> {
        registration.validate()?;

        let request = ApiRequest::post("auth/vendor/register").json(&json!({
            "firstname": registration.firstname,
            "lastname": registration.lastname,
            "email": registration.email,
            "password": registration.password.expose_secret(),
        }))?;

        let response = self
            .client
            .cache()
            .write(Mutation::new(MutationKind::Register, request).fallback("Registration failed"))
            .await?;
        self.client.controller().navigate(Route::Otp);
        Ok(response.message())
    }

    /// Sign in with email and password.
    ///
    /// On success the session is set, then the full profile is fetched and
    /// the session refreshed with it before moving to the dashboard.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for bad input, `ApiError::Decode` if
    /// the response carries no token, otherwise the gateway failure.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Profile, ApiError> {
        credentials.validate()?;

        let request = ApiRequest::post("auth/vendor/login").json(&json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        }))?;

        let response = self
            .client
            .cache()
            .write(Mutation::new(MutationKind::Login, request).fallback("Login failed"))
            .await?;

        self.establish(response.body).await
    }

    /// Confirm a registration with the emailed OTP. Signs the vendor in.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for bad input, `ApiError::Decode` if
    /// the response carries no token, otherwise the gateway failure.
    #[instrument(skip(self, verification), fields(email = %verification.email))]
    pub async fn verify_registration_otp(
        &self,
        verification: &OtpVerification,
    ) -> Result<Profile, ApiError> {
        verification.validate()?;

        let request = ApiRequest::post("auth/vendor/verify/registration/otp").json(verification)?;
        let response = self
            .client
            .cache()
            .write(
                Mutation::new(MutationKind::VerifyRegistrationOtp, request)
                    .fallback("OTP verification failed"),
            )
            .await?;

        self.establish(response.body).await
    }

    /// Ask the server to email a password-reset OTP.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for bad input, otherwise the gateway
    /// failure.
    #[instrument(skip(self, recovery), fields(email = %recovery.email))]
    pub async fn forgot_password(
        &self,
        recovery: &PasswordRecovery,
    ) -> Result<Option<String>, ApiError> {
        recovery.validate()?;

        let request = ApiRequest::post("auth/vendor/forgot-password").json(recovery)?;
        let response = self
            .client
            .cache()
            .write(
                Mutation::new(MutationKind::ForgotPassword, request)
                    .fallback("Failed to send reset code"),
            )
            .await?;
        Ok(response.message())
    }

    /// Exchange a password-reset OTP for a reset grant.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for bad input, `ApiError::Decode` if
    /// the grant is incomplete, otherwise the gateway failure.
    #[instrument(skip(self, verification), fields(email = %verification.email))]
    pub async fn verify_password_otp(
        &self,
        verification: &OtpVerification,
    ) -> Result<PasswordResetGrant, ApiError> {
        verification.validate()?;

        let request = ApiRequest::post("auth/vendor/verify/password/otp").json(verification)?;
        let response = self
            .client
            .cache()
            .write(
                Mutation::new(MutationKind::VerifyPasswordOtp, request)
                    .fallback("OTP verification failed"),
            )
            .await?;

        convert_reset_grant(response.body)
    }

    /// Set a new password using a reset grant.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` if the grant is incomplete or the
    /// password too short, otherwise the gateway failure.
    #[instrument(skip(self, reset), fields(vendor_id = %reset.grant.id))]
    pub async fn reset_password(&self, reset: &PasswordReset) -> Result<Option<String>, ApiError> {
        reset.validate()?;

        let request = ApiRequest::post("auth/vendor/reset-password").json(&json!({
            "id": reset.grant.id,
            "passwordResetToken": reset.grant.password_reset_token,
            "password": reset.password.expose_secret(),
        }))?;

        let response = self
            .client
            .cache()
            .write(
                Mutation::new(MutationKind::ResetPassword, request)
                    .fallback("Failed to reset password"),
            )
            .await?;
        Ok(response.message())
    }

    /// Store the session from an auth response, then reconcile the profile.
    async fn establish(&self, body: serde_json::Value) -> Result<Profile, ApiError> {
        let (profile, token) = convert_auth_session(body)?;
        self.client.session().set_session(profile.clone(), token);
        self.client.controller().session_established(&profile);
        info!(vendor_id = %profile.id, "Signed in");

        let profile = match self.client.profile().refresh().await {
            Ok(full) => full,
            // Teardown already ran
            Err(e) if e.kind() == FailureKind::AuthFailure => return Err(e),
            Err(e) => {
                warn!(error = %e, "Profile fetch after sign-in failed");
                profile
            }
        };
        self.client.controller().navigate(Route::Dashboard);
        Ok(profile)
    }
}
