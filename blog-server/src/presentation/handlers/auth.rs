use actix_web::cookie::{Cookie, SameSite, time};
use actix_web::http::header;
use actix_web::{HttpResponse, Scope, post, web};
use tracing::info;

use crate::application::auth_service::AuthService;
use crate::domain::error::DomainError;
use crate::presentation::dto::{AuthResponse, LoginQuery, LoginRequest, SignupRequest};
use crate::presentation::utils::{TOKEN_COOKIE, safe_next};

pub fn scope() -> Scope {
    web::scope("/auth")
        .service(signup)
        .service(login)
        .service(logout)
}

fn token_cookie(token: &str, service: &AuthService) -> Cookie<'static> {
    Cookie::build(TOKEN_COOKIE, token.to_owned())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(service.keys().ttl().num_seconds()))
        .finish()
}

fn bearer(service: &AuthService, user: &crate::domain::user::User, token: String) -> AuthResponse {
    AuthResponse {
        user: user.summary(),
        access_token: token,
        expires_in: service.keys().ttl().num_seconds(),
        token_type: "Bearer".to_string(),
    }
}

#[post("/signup/")]
async fn signup(
    service: web::Data<AuthService>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse, DomainError> {
    let user = service
        .register(&payload.username, &payload.email, &payload.password)
        .await?;
    let (user, token) = service.login(&user.username, &payload.password).await?;

    info!(user_id = %user.id, username = %user.username, "user signed up");

    Ok(HttpResponse::Created()
        .cookie(token_cookie(&token, &service))
        .json(bearer(&service, &user, token)))
}

/// With a local `next` target the client is sent back there; otherwise the
/// token is returned in the body.
#[post("/login/")]
async fn login(
    service: web::Data<AuthService>,
    query: web::Query<LoginQuery>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, DomainError> {
    let (user, token) = service.login(&payload.username, &payload.password).await?;
    info!(user_id = %user.id, "user logged in");

    let cookie = token_cookie(&token, &service);
    if let Some(next) = safe_next(query.next.as_deref()) {
        return Ok(HttpResponse::SeeOther()
            .insert_header((header::LOCATION, next))
            .cookie(cookie)
            .finish());
    }

    Ok(HttpResponse::Ok()
        .cookie(cookie)
        .json(bearer(&service, &user, token)))
}

#[post("/logout/")]
async fn logout() -> HttpResponse {
    let mut cookie = Cookie::build(TOKEN_COOKIE, "").path("/").finish();
    cookie.make_removal();
    HttpResponse::NoContent().cookie(cookie).finish()
}
