//! Account commands: register, sign in, password recovery, sign out.

use vendor_portal_client::{
    Credentials, OtpVerification, PasswordRecovery, PasswordReset, PasswordResetGrant, Profile,
    Registration, VendorClient,
};

use super::{CliError, Output};

pub async fn register(
    client: &VendorClient,
    out: Output,
    first_name: String,
    last_name: String,
    email: String,
    password: String,
) -> Result<(), CliError> {
    let registration = Registration::new(first_name, last_name, email, password);
    let message = client.auth().register(&registration).await?;
    out.message(message.as_deref().unwrap_or("Registration successful"));
    Ok(())
}

pub async fn verify_registration_otp(
    client: &VendorClient,
    out: Output,
    email: String,
    otp: String,
) -> Result<(), CliError> {
    let profile = client
        .auth()
        .verify_registration_otp(&OtpVerification::new(email, otp))
        .await?;
    signed_in(out, &profile)
}

pub async fn login(
    client: &VendorClient,
    out: Output,
    email: String,
    password: String,
) -> Result<(), CliError> {
    let profile = client.auth().login(&Credentials::new(email, password)).await?;
    signed_in(out, &profile)
}

pub async fn forgot_password(
    client: &VendorClient,
    out: Output,
    email: String,
) -> Result<(), CliError> {
    let message = client
        .auth()
        .forgot_password(&PasswordRecovery::new(email))
        .await?;
    out.message(message.as_deref().unwrap_or("Reset code sent"));
    Ok(())
}

#[allow(clippy::print_stdout)]
pub async fn verify_password_otp(
    client: &VendorClient,
    out: Output,
    email: String,
    otp: String,
) -> Result<(), CliError> {
    let grant = client
        .auth()
        .verify_password_otp(&OtpVerification::new(email, otp))
        .await?;
    out.emit(&grant, |g| {
        println!("Code accepted. Set a new password with:");
        println!(
            "  vendor-cli reset-password --id {} --token {}",
            g.id, g.password_reset_token
        );
    })
}

pub async fn reset_password(
    client: &VendorClient,
    out: Output,
    id: String,
    token: String,
    password: String,
) -> Result<(), CliError> {
    let grant = PasswordResetGrant {
        id,
        password_reset_token: token,
    };
    let message = client
        .auth()
        .reset_password(&PasswordReset::new(grant, password))
        .await?;
    out.message(message.as_deref().unwrap_or("Password reset successful"));
    Ok(())
}

pub fn logout(client: &VendorClient) {
    client.logout();
}

#[allow(clippy::print_stdout)]
fn signed_in(out: Output, profile: &Profile) -> Result<(), CliError> {
    out.emit(profile, |p| {
        println!(
            "Signed in as {} <{}> ({})",
            p.full_name(),
            p.email,
            p.status.as_ref().map_or("unknown", |s| s.as_str())
        );
    })
}
