//! Canonical domain types returned by the API facades.
//!
//! These are what callers work with; the backend's many wire shapes are
//! normalized into them in [`super::conversions`].

mod dashboard;
mod product;
mod profile;

pub use dashboard::*;
pub use product::*;
pub use profile::*;

#[cfg(test)]
pub(crate) fn test_profile(status: vendor_portal_core::VendorStatus) -> Profile {
    Profile {
        id: vendor_portal_core::VendorId::new("vendor-1"),
        email: "vendor@example.com".to_string(),
        firstname: "Ada".to_string(),
        lastname: "Lovelace".to_string(),
        status: Some(status),
        profile_picture: None,
        phone: None,
        address: None,
        created_at: None,
        updated_at: None,
    }
}
