//! The signed-in vendor's profile.

use tracing::{instrument, warn};
use validator::Validate;

use super::conversions::convert_profile;
use super::types::{Profile, ProfileUpdate};
use super::{VendorClient, unexpected_value};
use crate::cache::{CacheKey, CacheTag, CacheValue, Endpoint, Mutation, MutationKind, Query};
use crate::error::ApiError;
use crate::gateway::{ApiRequest, FileUpload, MultipartForm};

/// Profile operations.
#[derive(Debug, Clone, Copy)]
pub struct ProfileApi<'a> {
    client: &'a VendorClient,
}

impl<'a> ProfileApi<'a> {
    pub(super) const fn new(client: &'a VendorClient) -> Self {
        Self { client }
    }

    /// Cache key of the profile query.
    #[must_use]
    pub fn key() -> CacheKey {
        CacheKey::unit(Endpoint::Profile)
    }

    fn query() -> Query {
        Query::new(Self::key(), ApiRequest::get("vendor/profile"), |body| {
            convert_profile(body).map(CacheValue::Profile)
        })
        .provides([CacheTag::Profile])
    }

    /// Fetch the profile through the cache.
    ///
    /// While a token is held the session is refreshed with the result and
    /// the lifecycle controller re-evaluates the account status.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure.
    #[instrument(skip(self))]
    pub async fn get(&self) -> Result<Profile, ApiError> {
        let value = self.client.cache().read(Self::query()).await?;
        let CacheValue::Profile(profile) = value else {
            return Err(unexpected_value("profile", &value));
        };

        if self.client.session().refresh_profile(profile.clone()) {
            self.client.controller().observe_profile(&profile);
        }
        Ok(profile)
    }

    /// Fetch the profile from the server, bypassing any cached copy.
    ///
    /// # Errors
    ///
    /// Returns the fetch failure.
    pub async fn refresh(&self) -> Result<Profile, ApiError> {
        self.client.cache().invalidate(&[CacheTag::Profile]);
        self.get().await
    }

    /// Update profile fields, then refetch the profile.
    ///
    /// Returns the refetched profile, or `None` if the update succeeded but
    /// the refetch did not.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` for bad or empty input, otherwise the
    /// gateway failure of the update.
    #[instrument(skip(self, update))]
    pub async fn update(&self, update: ProfileUpdate) -> Result<Option<Profile>, ApiError> {
        let update = update.normalized();
        update.validate()?;
        if update.is_empty() {
            let mut errors = validator::ValidationErrors::new();
            errors.add(
                "fullName",
                validator::ValidationError::new("required")
                    .with_message("Nothing to update".into()),
            );
            return Err(errors.into());
        }

        let request = ApiRequest::put("vendor/profile").json(&update)?;
        self.client
            .cache()
            .write(
                Mutation::new(MutationKind::UpdateProfile, request)
                    .fallback("Failed to update profile"),
            )
            .await?;

        Ok(self.refetch_after_write().await)
    }

    /// Upload a new profile picture (multipart field `avatar`), then refetch
    /// the profile.
    ///
    /// # Errors
    ///
    /// Returns the gateway failure of the upload.
    #[instrument(skip(self, picture), fields(file = %picture.file_name))]
    pub async fn upload_picture(&self, picture: FileUpload) -> Result<Option<Profile>, ApiError> {
        let request =
            ApiRequest::post("vendor/profile/picture").multipart(MultipartForm::new().file("avatar", picture));
        self.client
            .cache()
            .write(
                Mutation::new(MutationKind::UploadProfilePicture, request)
                    .fallback("Failed to upload profile picture"),
            )
            .await?;

        Ok(self.refetch_after_write().await)
    }

    async fn refetch_after_write(&self) -> Option<Profile> {
        match self.get().await {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!(error = %e, "Profile refetch after update failed");
                None
            }
        }
    }
}
