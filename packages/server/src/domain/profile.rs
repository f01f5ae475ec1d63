//! Profile lookup (external collaborator).

use async_trait::async_trait;

use super::{
    error::ProfileError,
    value_object::{AvatarRef, UserId},
};

/// Display metadata owned by the profile service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub avatar: AvatarRef,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileLookup: Send + Sync {
    async fn get_profile(&self, user_id: &UserId) -> Result<Profile, ProfileError>;
}
