use actix_web::{HttpResponse, get, web};
use tracing::info;

use crate::application::follow_service::FollowService;
use crate::domain::error::DomainError;
use crate::presentation::utils::{AuthenticatedUser, profile_path, redirect};

#[get("/profile/{username}/follow/")]
async fn profile_follow(
    user: AuthenticatedUser,
    service: web::Data<FollowService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    let author = path.into_inner();
    service.follow(user.id, &author).await?;
    info!(follower = %user.username, author = %author, "follow requested");
    Ok(redirect(&profile_path(&author)))
}

#[get("/profile/{username}/unfollow/")]
async fn profile_unfollow(
    user: AuthenticatedUser,
    service: web::Data<FollowService>,
    path: web::Path<String>,
) -> Result<HttpResponse, DomainError> {
    let author = path.into_inner();
    service.unfollow(user.id, &author).await?;
    info!(follower = %user.username, author = %author, "unfollow requested");
    Ok(redirect(&profile_path(&author)))
}
