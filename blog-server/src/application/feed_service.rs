use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::application::pagination::{PAGE_SIZE, Page, Paginator};
use crate::data::Repositories;
use crate::data::follow_repository::FollowRepository;
use crate::data::group_repository::GroupRepository;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::error::DomainError;
use crate::domain::group::Group;
use crate::domain::post::{PostCard, PostFilter};
use crate::domain::user::AuthorSummary;

#[derive(Debug, Serialize)]
pub struct GroupFeed {
    pub group: Group,
    pub page: Page<PostCard>,
}

#[derive(Debug, Serialize)]
pub struct ProfileFeed {
    pub author: AuthorSummary,
    pub page: Page<PostCard>,
    /// Whether the viewer follows this author; always false for anonymous viewers.
    pub following: bool,
}

/// Read side: composes the paginated post listings.
#[derive(Clone)]
pub struct FeedService {
    posts: Arc<dyn PostRepository>,
    groups: Arc<dyn GroupRepository>,
    users: Arc<dyn UserRepository>,
    follows: Arc<dyn FollowRepository>,
}

impl FeedService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            posts: Arc::clone(&repos.posts),
            groups: Arc::clone(&repos.groups),
            users: Arc::clone(&repos.users),
            follows: Arc::clone(&repos.follows),
        }
    }

    #[instrument(skip(self))]
    pub async fn compose(
        &self,
        filter: PostFilter,
        page: Option<&str>,
    ) -> Result<Page<PostCard>, DomainError> {
        let count = self.posts.count(filter).await?;
        let paginator = Paginator::new(count, PAGE_SIZE);
        let number = paginator.page_number(page);
        let items = self
            .posts
            .list(filter, paginator.limit(), paginator.offset(number))
            .await?;

        debug!(count, number, returned = items.len(), "feed composed");
        Ok(paginator.page(number, items))
    }

    pub async fn global_feed(&self, page: Option<&str>) -> Result<Page<PostCard>, DomainError> {
        self.compose(PostFilter::All, page).await
    }

    pub async fn group_feed(&self, slug: &str, page: Option<&str>) -> Result<GroupFeed, DomainError> {
        let group = self
            .groups
            .find_by_slug(slug)
            .await?
            .ok_or_else(|| DomainError::GroupNotFound(slug.to_string()))?;
        let page = self.compose(PostFilter::Group(group.id), page).await?;
        Ok(GroupFeed { group, page })
    }

    pub async fn profile_feed(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        page: Option<&str>,
    ) -> Result<ProfileFeed, DomainError> {
        let author = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::UserNotFound(username.to_string()))?;
        let page = self.compose(PostFilter::Author(author.id), page).await?;
        let following = match viewer {
            Some(viewer) => self.follows.exists(viewer, author.id).await?,
            None => false,
        };
        Ok(ProfileFeed {
            author: author.summary(),
            page,
            following,
        })
    }

    pub async fn following_feed(
        &self,
        viewer: Uuid,
        page: Option<&str>,
    ) -> Result<Page<PostCard>, DomainError> {
        self.compose(PostFilter::FollowedBy(viewer), page).await
    }
}
