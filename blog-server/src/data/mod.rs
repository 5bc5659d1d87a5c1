use std::sync::Arc;

use sqlx::PgPool;
use tracing::error;

use crate::domain::error::DomainError;

pub mod comment_repository;
pub mod follow_repository;
pub mod group_repository;
#[cfg(test)]
pub mod memory;
pub mod post_repository;
pub mod user_repository;

use comment_repository::{CommentRepository, PostgresCommentRepository};
use follow_repository::{FollowRepository, PostgresFollowRepository};
use group_repository::{GroupRepository, PostgresGroupRepository};
use post_repository::{PostRepository, PostgresPostRepository};
use user_repository::{PostgresUserRepository, UserRepository};

/// Every repository the services depend on, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub follows: Arc<dyn FollowRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PostgresUserRepository::new(pool.clone())),
            groups: Arc::new(PostgresGroupRepository::new(pool.clone())),
            posts: Arc::new(PostgresPostRepository::new(pool.clone())),
            comments: Arc::new(PostgresCommentRepository::new(pool.clone())),
            follows: Arc::new(PostgresFollowRepository::new(pool)),
        }
    }

    #[cfg(test)]
    pub fn in_memory(store: Arc<memory::InMemoryStore>) -> Self {
        Self {
            users: store.clone(),
            groups: store.clone(),
            posts: store.clone(),
            comments: store.clone(),
            follows: store,
        }
    }
}

pub(crate) fn db_error(operation: &'static str) -> impl FnOnce(sqlx::Error) -> DomainError {
    move |e| {
        error!(operation, error = %e, "database error");
        DomainError::Internal(format!("database error: {e}"))
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error, constraint: &str) -> bool {
    e.as_database_error()
        .and_then(|db| db.constraint())
        .map(|c| c == constraint)
        == Some(true)
}
