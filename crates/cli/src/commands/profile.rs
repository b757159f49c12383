//! Profile commands.

use std::path::Path;

use vendor_portal_client::{Profile, ProfileUpdate, VendorClient};

use super::{CliError, Output, read_upload};

/// Show the signed-in vendor.
pub async fn show(client: &VendorClient, out: Output) -> Result<(), CliError> {
    if !client.session().is_authenticated() {
        return Err(CliError::SignedOut);
    }
    let profile = client.profile().get().await?;
    print_profile(out, &profile)
}

pub async fn update(
    client: &VendorClient,
    out: Output,
    update: ProfileUpdate,
) -> Result<(), CliError> {
    if !client.session().is_authenticated() {
        return Err(CliError::SignedOut);
    }
    match client.profile().update(update).await? {
        Some(profile) => print_profile(out, &profile),
        None => {
            out.message("Profile updated");
            Ok(())
        }
    }
}

pub async fn upload_picture(
    client: &VendorClient,
    out: Output,
    path: &Path,
) -> Result<(), CliError> {
    if !client.session().is_authenticated() {
        return Err(CliError::SignedOut);
    }
    let picture = read_upload(path).await?;
    match client.profile().upload_picture(picture).await? {
        Some(profile) => print_profile(out, &profile),
        None => {
            out.message("Profile picture updated");
            Ok(())
        }
    }
}

#[allow(clippy::print_stdout)]
fn print_profile(out: Output, profile: &Profile) -> Result<(), CliError> {
    out.emit(profile, |p| {
        println!("{} <{}>", p.full_name(), p.email);
        println!("  id:      {}", p.id);
        println!("  status:  {}", p.status.as_ref().map_or("unknown", |s| s.as_str()));
        if let Some(phone) = &p.phone {
            println!("  phone:   {phone}");
        }
        if let Some(address) = &p.address {
            println!("  address: {address}");
        }
        if let Some(picture) = &p.profile_picture {
            println!("  picture: {picture}");
        }
    })
}
