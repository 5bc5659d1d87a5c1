use crate::data::db_error;
use crate::domain::error::DomainError;
use crate::domain::group::GroupSummary;
use crate::domain::post::{Post, PostCard, PostDraft, PostFilter};
use crate::domain::user::AuthorSummary;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::{debug, info};
use uuid::Uuid;

const CARD_SELECT: &str = r#"
    SELECT p.id, p.text, p.image, p.created_at,
           p.author_id, u.username AS author_username,
           p.group_id, g.title AS group_title, g.slug AS group_slug
    FROM posts p
    JOIN users u ON u.id = p.author_id
    LEFT JOIN groups g ON g.id = p.group_id
"#;

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: Post) -> Result<Post, DomainError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostCard>, DomainError>;
    /// Rewrites the editable fields; `id` and `created_at` never change.
    async fn update(
        &self,
        id: Uuid,
        author_id: Uuid,
        draft: PostDraft,
    ) -> Result<Option<Post>, DomainError>;
    /// Removes the post together with its comments.
    async fn delete(&self, id: Uuid) -> Result<bool, DomainError>;
    /// Newest first.
    async fn list(
        &self,
        filter: PostFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostCard>, DomainError>;
    async fn count(&self, filter: PostFilter) -> Result<u64, DomainError>;
}

#[derive(Debug, sqlx::FromRow)]
struct PostCardRow {
    id: Uuid,
    text: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
    author_id: Uuid,
    author_username: String,
    group_id: Option<Uuid>,
    group_title: Option<String>,
    group_slug: Option<String>,
}

impl From<PostCardRow> for PostCard {
    fn from(row: PostCardRow) -> Self {
        let group = match (row.group_id, row.group_title, row.group_slug) {
            (Some(id), Some(title), Some(slug)) => Some(GroupSummary { id, title, slug }),
            _ => None,
        };
        Self {
            id: row.id,
            text: row.text,
            image: row.image,
            created_at: row.created_at,
            author: AuthorSummary {
                id: row.author_id,
                username: row.author_username,
            },
            group,
        }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: PostFilter) {
    match filter {
        PostFilter::All => {}
        PostFilter::Group(group_id) => {
            builder.push(" WHERE p.group_id = ").push_bind(group_id);
        }
        PostFilter::Author(author_id) => {
            builder.push(" WHERE p.author_id = ").push_bind(author_id);
        }
        PostFilter::FollowedBy(user_id) => {
            builder
                .push(" WHERE p.author_id IN (SELECT f.author_id FROM follows f WHERE f.user_id = ")
                .push_bind(user_id)
                .push(")");
        }
    }
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(Clone)]
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    async fn create(&self, post: Post) -> Result<Post, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO posts (id, author_id, group_id, text, image, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(post.id)
        .bind(post.author_id)
        .bind(post.group_id)
        .bind(&post.text)
        .bind(&post.image)
        .bind(post.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_error("create_post"))?;

        info!(post_id = %post.id, author_id = %post.author_id, "post created");
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostCard>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(CARD_SELECT);
        builder.push(" WHERE p.id = ").push_bind(id);

        let row = builder
            .build_query_as::<PostCardRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error("find_post_by_id"))?;
        Ok(row.map(PostCard::from))
    }

    async fn update(
        &self,
        id: Uuid,
        author_id: Uuid,
        draft: PostDraft,
    ) -> Result<Option<Post>, DomainError> {
        let post = sqlx::query_as::<_, Post>(
            r#"
            UPDATE posts
            SET text = $1, group_id = $2, image = $3
            WHERE id = $4 AND author_id = $5
            RETURNING id, author_id, group_id, text, image, created_at
            "#,
        )
        .bind(draft.text)
        .bind(draft.group_id)
        .bind(draft.image)
        .bind(id)
        .bind(author_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error("update_post"))?;

        if post.is_some() {
            info!(post_id = %id, "post updated");
        }

        Ok(post)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        // comments.post_id is ON DELETE CASCADE
        let deleted = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error("delete_post"))?;

        if deleted.rows_affected() > 0 {
            info!(post_id = %id, "post deleted");
        }
        Ok(deleted.rows_affected() > 0)
    }

    async fn list(
        &self,
        filter: PostFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostCard>, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new(CARD_SELECT);
        push_filter(&mut builder, filter);
        builder
            .push(" ORDER BY p.created_at DESC, p.id DESC LIMIT ")
            .push_bind(to_sql_int(limit))
            .push(" OFFSET ")
            .push_bind(to_sql_int(offset));

        let rows = builder
            .build_query_as::<PostCardRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(db_error("list_posts"))?;

        debug!(?filter, limit, offset, returned = rows.len(), "posts listed");
        Ok(rows.into_iter().map(PostCard::from).collect())
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, DomainError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts p");
        push_filter(&mut builder, filter);

        let (count,): (i64,) = builder
            .build_query_as::<(i64,)>()
            .fetch_one(&self.pool)
            .await
            .map_err(db_error("count_posts"))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
