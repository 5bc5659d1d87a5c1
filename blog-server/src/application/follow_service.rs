use std::sync::Arc;

use tracing::{debug, instrument};
use uuid::Uuid;

use crate::data::Repositories;
use crate::data::follow_repository::FollowRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::follow::Follow;
use crate::domain::user::User;

#[derive(Clone)]
pub struct FollowService {
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl FollowService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            users: Arc::clone(&repos.users),
            follows: Arc::clone(&repos.follows),
        }
    }

    async fn author(&self, username: &str) -> Result<User, DomainError> {
        self.users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(username.to_string()))
    }

    /// Following yourself or someone already followed is a silent no-op.
    #[instrument(skip(self))]
    pub async fn follow(&self, viewer: Uuid, username: &str) -> Result<(), DomainError> {
        let author = self.author(username).await?;
        if author.id == viewer {
            debug!("ignoring self-follow");
            return Ok(());
        }
        if self.follows.exists(viewer, author.id).await? {
            debug!("already following");
            return Ok(());
        }
        self.follows.create(Follow::new(viewer, author.id)).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unfollow(&self, viewer: Uuid, username: &str) -> Result<(), DomainError> {
        let author = self.author(username).await?;
        if !self.follows.delete(viewer, author.id).await? {
            debug!("no follow edge to remove");
        }
        Ok(())
    }
}
