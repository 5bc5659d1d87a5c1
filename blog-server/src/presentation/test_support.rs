//! Wiring for HTTP tests: the full app over an in-memory store and cache.

use std::sync::Arc;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::ServiceResponse;
use actix_web::http::header;
use actix_web::test;

use crate::data::Repositories;
use crate::data::memory::InMemoryStore;
use crate::domain::follow::Follow;
use crate::domain::group::Group;
use crate::domain::post::{Post, PostDraft};
use crate::domain::user::User;
use crate::infrastructure::cache::{InMemoryPageCache, PageCache};
use crate::infrastructure::security::{JwtKeys, hash_password};
use crate::presentation::routes::AppServices;

pub struct TestContext {
    pub store: Arc<InMemoryStore>,
    pub repos: Repositories,
    pub cache: Arc<InMemoryPageCache>,
    pub services: AppServices,
    pub keys: JwtKeys,
}

impl TestContext {
    pub const PASSWORD: &'static str = "correct-horse";

    pub fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let repos = Repositories::in_memory(Arc::clone(&store));
        let cache = Arc::new(InMemoryPageCache::new());
        let keys = JwtKeys::new("test-secret".into(), chrono::Duration::hours(1));
        let services = AppServices::new(
            &repos,
            keys.clone(),
            cache.clone(),
            Duration::from_secs(1200),
        );
        Self {
            store,
            repos,
            cache,
            services,
            keys,
        }
    }

    pub async fn user(&self, username: &str) -> User {
        let hash = hash_password(Self::PASSWORD).expect("hash");
        self.repos
            .users
            .create(User::new(
                username.to_string(),
                format!("{username}@example.com"),
                hash,
            ))
            .await
            .expect("create user")
    }

    pub async fn group(&self, title: &str, slug: &str) -> Group {
        self.repos
            .groups
            .create(Group::new(title.to_string(), slug.to_string(), String::new()))
            .await
            .expect("create group")
    }

    pub async fn post(&self, author: &User, text: &str, group: Option<&Group>) -> Post {
        let draft = PostDraft {
            text: text.to_string(),
            group_id: group.map(|g| g.id),
            image: None,
        };
        self.repos
            .posts
            .create(Post::new(author.id, draft))
            .await
            .expect("create post")
    }

    pub async fn follow(&self, user: &User, author: &User) {
        self.repos
            .follows
            .create(Follow::new(user.id, author.id))
            .await
            .expect("create follow");
    }

    pub fn auth_header(&self, user: &User) -> (header::HeaderName, String) {
        let token = self.keys.generate_token(user.id).expect("token");
        (header::AUTHORIZATION, format!("Bearer {token}"))
    }

    pub async fn clear_cache(&self) {
        self.cache.clear().await;
    }
}

pub async fn body_json<B: MessageBody>(res: ServiceResponse<B>) -> serde_json::Value {
    test::read_body_json(res).await
}

pub fn location<B>(res: &ServiceResponse<B>) -> String {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
