//! インメモリのプロフィールディレクトリ
//!
//! 起動時の設定で与えられたアバターを保持します。
//! プロフィール管理そのものは対象外なので、読み取り専用です。

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{AvatarRef, Profile, ProfileError, ProfileLookup, UserId};

#[derive(Debug, Default)]
pub struct InMemoryProfileDirectory {
    profiles: HashMap<UserId, Profile>,
}

impl InMemoryProfileDirectory {
    pub fn new(profiles: impl IntoIterator<Item = (UserId, AvatarRef)>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|(user_id, avatar)| (user_id, Profile { avatar }))
                .collect(),
        }
    }
}

#[async_trait]
impl ProfileLookup for InMemoryProfileDirectory {
    async fn get_profile(&self, user_id: &UserId) -> Result<Profile, ProfileError> {
        self.profiles
            .get(user_id)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(user_id.as_str().to_string()))
    }
}
