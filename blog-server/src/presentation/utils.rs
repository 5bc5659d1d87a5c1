use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpMessage, HttpRequest, HttpResponse};
use futures_util::future::{Ready, ready};
use uuid::Uuid;

use crate::application::auth_service::AuthService;
use crate::domain::error::DomainError;
use crate::presentation::middleware::RequestId;

pub const TOKEN_COOKIE: &str = "auth_token";

/// Viewer resolved by the auth middleware. Extracting it on a route makes the
/// route login-only: anonymous requests are redirected to the login page.
/// Extract `Option<AuthenticatedUser>` where anonymous access is allowed.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
}

impl FromRequest for AuthenticatedUser {
    type Error = DomainError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUser>() {
            Some(user) => ready(Ok(user.clone())),
            None => ready(Err(DomainError::LoginRequired {
                next: full_path(req),
            })),
        }
    }
}

pub fn is_owner(author_id: &Uuid, user_id: &Uuid) -> bool {
    author_id == user_id
}

/// Path plus query string, as the login page should send the user back to it.
pub fn full_path(req: &HttpRequest) -> String {
    match req.query_string() {
        "" => req.path().to_string(),
        query => format!("{}?{}", req.path(), query),
    }
}

pub fn bearer_or_cookie_token(req: &HttpRequest) -> Option<String> {
    let header_token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string());

    header_token.or_else(|| req.cookie(TOKEN_COOKIE).map(|c| c.value().to_string()))
}

pub async fn extract_user_from_token(
    token: &str,
    auth_service: &AuthService,
) -> Result<AuthenticatedUser, DomainError> {
    let claims = auth_service
        .keys()
        .verify_token(token)
        .map_err(|_| DomainError::Unauthorized)?;
    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| DomainError::Unauthorized)?;

    // A deleted account invalidates its tokens; storage failures are not auth failures.
    let user = auth_service.get_user(user_id).await.map_err(|err| match err {
        DomainError::UserNotFound(_) => DomainError::Unauthorized,
        other => other,
    })?;

    Ok(AuthenticatedUser {
        id: user.id,
        username: user.username,
    })
}

pub fn redirect(location: &str) -> HttpResponse {
    HttpResponse::Found()
        .insert_header((header::LOCATION, location))
        .finish()
}

pub fn profile_path(username: &str) -> String {
    format!("/profile/{}/", urlencoding::encode(username))
}

pub fn post_path(id: Uuid) -> String {
    format!("/posts/{id}/")
}

/// Only same-site absolute paths are honoured as post-login targets.
pub fn safe_next(next: Option<&str>) -> Option<&str> {
    next.filter(|n| n.starts_with('/') && !n.starts_with("//") && !n.contains('\\'))
}

pub fn request_id(req: &HttpRequest) -> String {
    req.extensions()
        .get::<RequestId>()
        .map(|rid| rid.0.clone())
        .unwrap_or_else(|| "unknown".into())
}
