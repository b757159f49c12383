//! Which cache tags each write invalidates.

use vendor_portal_core::ProductId;

use super::key::{CacheTag, Resource};

/// Every write the client can perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Register,
    Login,
    VerifyRegistrationOtp,
    ForgotPassword,
    VerifyPasswordOtp,
    ResetPassword,
    UpdateProfile,
    UploadProfilePicture,
    CreateProduct,
    UpdateProduct { id: ProductId },
    DeleteProduct { id: ProductId },
}

impl MutationKind {
    /// Resource namespace the write belongs to.
    #[must_use]
    pub const fn resource(&self) -> Resource {
        match self {
            Self::Register
            | Self::Login
            | Self::VerifyRegistrationOtp
            | Self::ForgotPassword
            | Self::VerifyPasswordOtp
            | Self::ResetPassword => Resource::Auth,
            Self::UpdateProfile | Self::UploadProfilePicture => Resource::Profile,
            Self::CreateProduct | Self::UpdateProduct { .. } | Self::DeleteProduct { .. } => {
                Resource::Products
            }
        }
    }
}

/// Tags invalidated by a successful write.
///
/// Auth writes invalidate nothing: the session store, not the cache, holds
/// their result. Product writes also invalidate the dashboard because its
/// aggregate embeds product counts and low-stock rows.
#[must_use]
pub fn invalidated_tags(kind: &MutationKind) -> Vec<CacheTag> {
    match kind {
        MutationKind::Register
        | MutationKind::Login
        | MutationKind::VerifyRegistrationOtp
        | MutationKind::ForgotPassword
        | MutationKind::VerifyPasswordOtp
        | MutationKind::ResetPassword => Vec::new(),
        MutationKind::UpdateProfile | MutationKind::UploadProfilePicture => {
            vec![CacheTag::Profile]
        }
        MutationKind::CreateProduct => vec![CacheTag::Products, CacheTag::Dashboard],
        MutationKind::UpdateProduct { id } | MutationKind::DeleteProduct { id } => vec![
            CacheTag::Products,
            CacheTag::Product(id.clone()),
            CacheTag::Dashboard,
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_mutations_invalidate_nothing() {
        for kind in [
            MutationKind::Register,
            MutationKind::Login,
            MutationKind::VerifyRegistrationOtp,
            MutationKind::ForgotPassword,
            MutationKind::VerifyPasswordOtp,
            MutationKind::ResetPassword,
        ] {
            assert!(invalidated_tags(&kind).is_empty(), "{kind:?}");
            assert_eq!(kind.resource(), Resource::Auth);
        }
    }

    #[test]
    fn test_profile_mutations() {
        assert_eq!(
            invalidated_tags(&MutationKind::UploadProfilePicture),
            vec![CacheTag::Profile]
        );
    }

    #[test]
    fn test_product_mutations_cover_list_detail_and_dashboard() {
        let id = ProductId::new("p1");
        let tags = invalidated_tags(&MutationKind::DeleteProduct { id: id.clone() });
        assert!(tags.contains(&CacheTag::Products));
        assert!(tags.contains(&CacheTag::Product(id)));
        assert!(tags.contains(&CacheTag::Dashboard));

        let tags = invalidated_tags(&MutationKind::CreateProduct);
        assert_eq!(tags, vec![CacheTag::Products, CacheTag::Dashboard]);
    }
}
