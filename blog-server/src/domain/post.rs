use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::group::GroupSummary;
use crate::domain::user::AuthorSummary;

const EXCERPT_CHARS: usize = 15;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub group_id: Option<Uuid>,
    pub text: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(author_id: Uuid, draft: PostDraft) -> Self {
        Self {
            id: Uuid::new_v4(),
            author_id,
            group_id: draft.group_id,
            text: draft.text,
            image: draft.image,
            created_at: Utc::now(),
        }
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let excerpt: String = self.text.chars().take(EXCERPT_CHARS).collect();
        f.write_str(&excerpt)
    }
}

/// Validated, author-editable fields of a post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostDraft {
    pub text: String,
    pub group_id: Option<Uuid>,
    pub image: Option<String>,
}

/// A post joined with its author and group, ready to be listed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCard {
    pub id: Uuid,
    pub text: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub author: AuthorSummary,
    pub group: Option<GroupSummary>,
}

/// Source set a feed is composed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(Uuid),
    Author(Uuid),
    /// Posts whose author is followed by the given user.
    FollowedBy(Uuid),
}
