use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::data::Repositories;
use crate::data::comment_repository::CommentRepository;
use crate::data::group_repository::GroupRepository;
use crate::data::post_repository::PostRepository;
use crate::domain::comment::{Comment, CommentView};
use crate::domain::error::{DomainError, FieldErrors};
use crate::domain::group::GroupSummary;
use crate::domain::post::{Post, PostCard, PostDraft};
use crate::presentation::dto::{CommentForm, PostForm};

pub const EMPTY_TEXT_MESSAGE: &str = "field must not be empty";
pub const INVALID_GROUP_MESSAGE: &str = "select a valid choice";

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub post: PostCard,
    pub comments: Vec<CommentView>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct PostService {
    posts: Arc<dyn PostRepository>,
    groups: Arc<dyn GroupRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl PostService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            posts: Arc::clone(&repos.posts),
            groups: Arc::clone(&repos.groups),
            comments: Arc::clone(&repos.comments),
        }
    }

    pub async fn get_post(&self, id: Uuid) -> Result<PostCard, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or(DomainError::PostNotFound(id))
    }

    pub async fn post_detail(&self, id: Uuid) -> Result<PostDetail, DomainError> {
        let post = self.get_post(id).await?;
        let comments = self.comments.list_for_post(id).await?;
        Ok(PostDetail { post, comments })
    }

    pub async fn group_choices(&self) -> Result<Vec<GroupSummary>, DomainError> {
        let groups = self.groups.list().await?;
        Ok(groups.iter().map(|g| g.summary()).collect())
    }

    /// Turns submitted form fields into a draft or the per-field errors.
    async fn clean(&self, form: &PostForm) -> Result<PostDraft, DomainError> {
        let mut errors = FieldErrors::new();

        let text = form.text.trim();
        if text.is_empty() {
            errors.add("text", EMPTY_TEXT_MESSAGE);
        }

        let group_id = match non_blank(form.group.as_deref()) {
            None => None,
            Some(raw) => {
                let group = match Uuid::parse_str(raw) {
                    Ok(id) => self.groups.find_by_id(id).await?,
                    Err(_) => None,
                };
                if group.is_none() {
                    errors.add("group", INVALID_GROUP_MESSAGE);
                }
                group.map(|g| g.id)
            }
        };

        errors.into_result()?;
        Ok(PostDraft {
            text: text.to_string(),
            group_id,
            image: non_blank(form.image.as_deref()).map(str::to_string),
        })
    }

    #[instrument(skip(self, form))]
    pub async fn create_post(&self, author_id: Uuid, form: &PostForm) -> Result<Post, DomainError> {
        let draft = self.clean(form).await?;
        let post = self.posts.create(Post::new(author_id, draft)).await?;
        info!(post_id = %post.id, excerpt = %post, "post published");
        Ok(post)
    }

    #[instrument(skip(self, form))]
    pub async fn update_post(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        form: &PostForm,
    ) -> Result<Post, DomainError> {
        let draft = self.clean(form).await?;
        self.posts
            .update(post_id, author_id, draft)
            .await?
            .ok_or(DomainError::PostNotFound(post_id))
    }

    #[instrument(skip(self, form))]
    pub async fn add_comment(
        &self,
        author_id: Uuid,
        post_id: Uuid,
        form: &CommentForm,
    ) -> Result<Comment, DomainError> {
        self.get_post(post_id).await?;

        let text = form.text.trim();
        if text.is_empty() {
            let mut errors = FieldErrors::new();
            errors.add("text", EMPTY_TEXT_MESSAGE);
            return Err(DomainError::Validation(errors));
        }

        self.comments
            .create(Comment::new(post_id, author_id, text.to_string()))
            .await
    }
}
