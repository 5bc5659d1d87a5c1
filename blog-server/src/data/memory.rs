//! In-memory implementation of every repository trait, used by the test suite.
//!
//! All tables live behind one lock so the cascade rules of the SQL schema can
//! be applied explicitly: deleting a user removes their posts, comments and
//! follow edges; deleting a post removes its comments; deleting a group
//! clears the group reference of its posts.

use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::data::comment_repository::CommentRepository;
use crate::data::follow_repository::FollowRepository;
use crate::data::group_repository::GroupRepository;
use crate::data::post_repository::PostRepository;
use crate::data::user_repository::UserRepository;
use crate::domain::comment::{Comment, CommentView};
use crate::domain::error::DomainError;
use crate::domain::follow::Follow;
use crate::domain::group::Group;
use crate::domain::post::{Post, PostCard, PostDraft, PostFilter};
use crate::domain::user::User;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    groups: Vec<Group>,
    posts: Vec<Post>,
    comments: Vec<Comment>,
    follows: Vec<Follow>,
}

impl Tables {
    fn card(&self, post: &Post) -> Option<PostCard> {
        let author = self.users.iter().find(|u| u.id == post.author_id)?;
        let group = post
            .group_id
            .and_then(|id| self.groups.iter().find(|g| g.id == id))
            .map(Group::summary);
        Some(PostCard {
            id: post.id,
            text: post.text.clone(),
            image: post.image.clone(),
            created_at: post.created_at,
            author: author.summary(),
            group,
        })
    }

    fn matches(&self, post: &Post, filter: PostFilter) -> bool {
        match filter {
            PostFilter::All => true,
            PostFilter::Group(group_id) => post.group_id == Some(group_id),
            PostFilter::Author(author_id) => post.author_id == author_id,
            PostFilter::FollowedBy(user_id) => self
                .follows
                .iter()
                .any(|f| f.user_id == user_id && f.author_id == post.author_id),
        }
    }

    /// Newest first; posts sharing a timestamp keep reverse insertion order.
    fn filtered(&self, filter: PostFilter) -> Vec<&Post> {
        let mut posts: Vec<&Post> = self
            .posts
            .iter()
            .rev()
            .filter(|p| self.matches(p, filter))
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Tables> {
        self.tables.read().expect("store lock poisoned")
    }

    fn write(&self) -> RwLockWriteGuard<'_, Tables> {
        self.tables.write().expect("store lock poisoned")
    }

    pub fn post_count(&self) -> usize {
        self.read().posts.len()
    }

    pub fn comment_count(&self) -> usize {
        self.read().comments.len()
    }

    pub fn follow_count(&self) -> usize {
        self.read().follows.len()
    }

    pub fn raw_post(&self, id: Uuid) -> Option<Post> {
        self.read().posts.iter().find(|p| p.id == id).cloned()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: User) -> Result<User, DomainError> {
        let mut tables = self.write();
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(DomainError::UserAlreadyExists(user.username));
        }
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, DomainError> {
        Ok(self
            .read()
            .users
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DomainError> {
        Ok(self.read().users.iter().find(|u| u.id == id).cloned())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.write();
        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }

        let removed_posts: Vec<Uuid> = tables
            .posts
            .iter()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        tables.posts.retain(|p| p.author_id != id);
        tables
            .comments
            .retain(|c| c.author_id != id && !removed_posts.contains(&c.post_id));
        tables
            .follows
            .retain(|f| f.user_id != id && f.author_id != id);
        Ok(true)
    }
}

/// User store whose backend is down: every call fails.
pub struct UnavailableUsers;

impl UnavailableUsers {
    fn down() -> DomainError {
        DomainError::Internal("user store unavailable".into())
    }
}

#[async_trait]
impl UserRepository for UnavailableUsers {
    async fn create(&self, _user: User) -> Result<User, DomainError> {
        Err(Self::down())
    }

    async fn find_by_username(&self, _username: &str) -> Result<Option<User>, DomainError> {
        Err(Self::down())
    }

    async fn find_by_id(&self, _id: Uuid) -> Result<Option<User>, DomainError> {
        Err(Self::down())
    }

    async fn delete(&self, _id: Uuid) -> Result<bool, DomainError> {
        Err(Self::down())
    }
}

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn create(&self, group: Group) -> Result<Group, DomainError> {
        let mut tables = self.write();
        if tables.groups.iter().any(|g| g.slug == group.slug) {
            return Err(DomainError::Internal(format!(
                "group slug already taken: {}",
                group.slug
            )));
        }
        tables.groups.push(group.clone());
        Ok(group)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Group>, DomainError> {
        Ok(self.read().groups.iter().find(|g| g.id == id).cloned())
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<Group>, DomainError> {
        Ok(self.read().groups.iter().find(|g| g.slug == slug).cloned())
    }

    async fn list(&self) -> Result<Vec<Group>, DomainError> {
        let mut groups = self.read().groups.clone();
        groups.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.slug.cmp(&b.slug)));
        Ok(groups)
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.write();
        let before = tables.groups.len();
        tables.groups.retain(|g| g.id != id);
        if tables.groups.len() == before {
            return Ok(false);
        }
        for post in tables.posts.iter_mut().filter(|p| p.group_id == Some(id)) {
            post.group_id = None;
        }
        Ok(true)
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn create(&self, post: Post) -> Result<Post, DomainError> {
        self.write().posts.push(post.clone());
        Ok(post)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<PostCard>, DomainError> {
        let tables = self.read();
        Ok(tables
            .posts
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| tables.card(p)))
    }

    async fn update(
        &self,
        id: Uuid,
        author_id: Uuid,
        draft: PostDraft,
    ) -> Result<Option<Post>, DomainError> {
        let mut tables = self.write();
        let Some(post) = tables
            .posts
            .iter_mut()
            .find(|p| p.id == id && p.author_id == author_id)
        else {
            return Ok(None);
        };
        post.text = draft.text;
        post.group_id = draft.group_id;
        post.image = draft.image;
        Ok(Some(post.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.write();
        let before = tables.posts.len();
        tables.posts.retain(|p| p.id != id);
        if tables.posts.len() == before {
            return Ok(false);
        }
        tables.comments.retain(|c| c.post_id != id);
        Ok(true)
    }

    async fn list(
        &self,
        filter: PostFilter,
        limit: u64,
        offset: u64,
    ) -> Result<Vec<PostCard>, DomainError> {
        let tables = self.read();
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(tables
            .filtered(filter)
            .into_iter()
            .skip(skip)
            .take(take)
            .filter_map(|p| tables.card(p))
            .collect())
    }

    async fn count(&self, filter: PostFilter) -> Result<u64, DomainError> {
        Ok(self.read().filtered(filter).len() as u64)
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn create(&self, comment: Comment) -> Result<Comment, DomainError> {
        self.write().comments.push(comment.clone());
        Ok(comment)
    }

    async fn list_for_post(&self, post_id: Uuid) -> Result<Vec<CommentView>, DomainError> {
        let tables = self.read();
        let mut comments: Vec<CommentView> = tables
            .comments
            .iter()
            .filter(|c| c.post_id == post_id)
            .filter_map(|c| {
                let author = tables.users.iter().find(|u| u.id == c.author_id)?;
                Some(CommentView {
                    id: c.id,
                    post_id: c.post_id,
                    text: c.text.clone(),
                    created_at: c.created_at,
                    author: author.summary(),
                })
            })
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(comments)
    }
}

#[async_trait]
impl FollowRepository for InMemoryStore {
    async fn create(&self, follow: Follow) -> Result<bool, DomainError> {
        let mut tables = self.write();
        if tables
            .follows
            .iter()
            .any(|f| f.user_id == follow.user_id && f.author_id == follow.author_id)
        {
            return Ok(false);
        }
        tables.follows.push(follow);
        Ok(true)
    }

    async fn exists(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        Ok(self
            .read()
            .follows
            .iter()
            .any(|f| f.user_id == user_id && f.author_id == author_id))
    }

    async fn delete(&self, user_id: Uuid, author_id: Uuid) -> Result<bool, DomainError> {
        let mut tables = self.write();
        let before = tables.follows.len();
        tables
            .follows
            .retain(|f| !(f.user_id == user_id && f.author_id == author_id));
        Ok(tables.follows.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str) -> User {
        User::new(name.into(), format!("{name}@example.com"), "hash".into())
    }

    fn draft(text: &str, group_id: Option<Uuid>) -> PostDraft {
        PostDraft {
            text: text.into(),
            group_id,
            image: None,
        }
    }

    #[tokio::test]
    async fn deleting_a_group_keeps_its_posts() {
        let store = InMemoryStore::new();
        let author = UserRepository::create(&store, user("leo")).await.unwrap();
        let group = GroupRepository::create(
            &store,
            Group::new("Cats".into(), "cats".into(), String::new()),
        )
        .await
        .unwrap();
        let post = PostRepository::create(&store, Post::new(author.id, draft("hi", Some(group.id))))
            .await
            .unwrap();

        assert!(GroupRepository::delete(&store, group.id).await.unwrap());

        let stored = store.raw_post(post.id).expect("post survives");
        assert_eq!(stored.group_id, None);
    }

    #[tokio::test]
    async fn deleting_a_post_removes_its_comments() {
        let store = InMemoryStore::new();
        let author = UserRepository::create(&store, user("leo")).await.unwrap();
        let post = PostRepository::create(&store, Post::new(author.id, draft("hi", None)))
            .await
            .unwrap();
        CommentRepository::create(&store, Comment::new(post.id, author.id, "nice".into()))
            .await
            .unwrap();

        assert!(PostRepository::delete(&store, post.id).await.unwrap());
        assert_eq!(store.comment_count(), 0);
    }

    #[tokio::test]
    async fn deleting_a_user_cascades() {
        let store = InMemoryStore::new();
        let leo = UserRepository::create(&store, user("leo")).await.unwrap();
        let mia = UserRepository::create(&store, user("mia")).await.unwrap();
        let post = PostRepository::create(&store, Post::new(leo.id, draft("hi", None)))
            .await
            .unwrap();
        CommentRepository::create(&store, Comment::new(post.id, mia.id, "nice".into()))
            .await
            .unwrap();
        FollowRepository::create(&store, Follow::new(mia.id, leo.id))
            .await
            .unwrap();

        assert!(UserRepository::delete(&store, leo.id).await.unwrap());

        assert_eq!(store.post_count(), 0);
        assert_eq!(store.comment_count(), 0);
        assert_eq!(store.follow_count(), 0);
    }

    #[tokio::test]
    async fn duplicate_usernames_are_rejected() {
        let store = InMemoryStore::new();
        UserRepository::create(&store, user("leo")).await.unwrap();

        let err = UserRepository::create(&store, user("leo"))
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::UserAlreadyExists(name) if name == "leo"));
    }
}
