use actix_web::http::header::ContentType;
use actix_web::{HttpRequest, HttpResponse, get, web};
use bytes::Bytes;
use tracing::{debug, error};

use crate::application::feed_service::FeedService;
use crate::application::pagination::page_key;
use crate::domain::error::DomainError;
use crate::infrastructure::cache::ResponseCache;
use crate::presentation::dto::PageQuery;
use crate::presentation::utils::{AuthenticatedUser, request_id};

/// Global feed. The serialized page is served from the page cache, keyed by
/// the page token alone so unrelated query parameters share an entry.
#[get("/")]
async fn index(
    req: HttpRequest,
    feed: web::Data<FeedService>,
    pages: web::Data<ResponseCache>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let key = format!("index:page={}", page_key(query.page.as_deref()));
    let body = pages
        .get_or_render(&key, || async {
            let page = feed.global_feed(query.page.as_deref()).await?;
            serde_json::to_vec(&page).map(Bytes::from).map_err(|e| {
                error!("failed to serialize feed page: {}", e);
                DomainError::Internal(e.to_string())
            })
        })
        .await?;

    debug!(request_id = %request_id(&req), key = %key, "index served");
    Ok(HttpResponse::Ok()
        .content_type(ContentType::json())
        .body(body))
}

#[get("/group/{slug}/")]
async fn group_posts(
    feed: web::Data<FeedService>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let slug = path.into_inner();
    let group_feed = feed.group_feed(&slug, query.page.as_deref()).await?;
    Ok(HttpResponse::Ok().json(group_feed))
}

#[get("/profile/{username}/")]
async fn profile(
    viewer: Option<AuthenticatedUser>,
    feed: web::Data<FeedService>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let username = path.into_inner();
    let profile = feed
        .profile_feed(&username, viewer.map(|v| v.id), query.page.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(profile))
}

#[get("/follow/")]
async fn follow_index(
    user: AuthenticatedUser,
    feed: web::Data<FeedService>,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse, DomainError> {
    let page = feed.following_feed(user.id, query.page.as_deref()).await?;
    Ok(HttpResponse::Ok().json(page))
}
