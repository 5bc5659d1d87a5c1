use std::sync::Arc;
use std::time::Duration;

use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::middleware::{DefaultHeaders, NormalizePath, TrailingSlash};
use actix_web::{App, Error, HttpRequest, HttpResponse, get, web};
use serde_json::json;
use tracing::debug;

use crate::application::auth_service::AuthService;
use crate::application::feed_service::FeedService;
use crate::application::follow_service::FollowService;
use crate::application::post_service::PostService;
use crate::data::Repositories;
use crate::infrastructure::cache::{PageCache, ResponseCache};
use crate::infrastructure::security::JwtKeys;
use crate::presentation::dto::NotFoundBody;
use crate::presentation::handlers::{auth, feed, follow, post};
use crate::presentation::middleware::{RequestLogMiddleware, ViewerMiddleware};

/// Shared application state, one `web::Data` per service.
#[derive(Clone)]
pub struct AppServices {
    pub auth: web::Data<AuthService>,
    pub feed: web::Data<FeedService>,
    pub posts: web::Data<PostService>,
    pub follows: web::Data<FollowService>,
    pub pages: web::Data<ResponseCache>,
}

impl AppServices {
    pub fn new(
        repos: &Repositories,
        keys: JwtKeys,
        cache: Arc<dyn PageCache>,
        page_ttl: Duration,
    ) -> Self {
        Self {
            auth: web::Data::new(AuthService::new(repos, keys)),
            feed: web::Data::new(FeedService::new(repos)),
            posts: web::Data::new(PostService::new(repos)),
            follows: web::Data::new(FollowService::new(repos)),
            pages: web::Data::new(ResponseCache::new(cache, page_ttl)),
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, services: &AppServices) {
    cfg.app_data(services.auth.clone())
        .app_data(services.feed.clone())
        .app_data(services.posts.clone())
        .app_data(services.follows.clone())
        .app_data(services.pages.clone())
        .service(health)
        .service(auth::scope())
        .service(feed::index)
        .service(feed::group_posts)
        .service(feed::follow_index)
        .service(follow::profile_follow)
        .service(follow::profile_unfollow)
        .service(feed::profile)
        .service(post::create_form)
        .service(post::create_post)
        .service(post::post_detail)
        .service(post::edit_form)
        .service(post::edit_post)
        .service(post::add_comment);
}

/// The application with every route and the middleware stack except CORS,
/// which depends on deployment config.
pub fn build_app(
    services: AppServices,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = Error,
        InitError = (),
    >,
> {
    App::new()
        .wrap(ViewerMiddleware)
        .wrap(RequestLogMiddleware)
        .wrap(NormalizePath::new(TrailingSlash::Always))
        .wrap(
            DefaultHeaders::new()
                .add(("X-Content-Type-Options", "nosniff"))
                .add(("Referrer-Policy", "no-referrer"))
                .add(("Cross-Origin-Opener-Policy", "same-origin")),
        )
        .configure(move |cfg| configure(cfg, &services))
        .default_service(web::to(not_found))
}

#[get("/health/")]
async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "status": "ok" }))
}

async fn not_found(req: HttpRequest) -> HttpResponse {
    debug!(path = %req.path(), "no route matched");
    HttpResponse::NotFound().json(NotFoundBody {
        error: "not found",
        path: req.path(),
    })
}
