use actix_web::{HttpRequest, HttpResponse, get, post, web};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::post_service::PostService;
use crate::domain::error::{DomainError, FieldErrors};
use crate::presentation::dto::{CommentForm, PostDetailPage, PostForm, PostFormPage};
use crate::presentation::utils::{
    AuthenticatedUser, is_owner, post_path, profile_path, redirect, request_id,
};

async fn form_page(
    service: &PostService,
    form: PostForm,
    errors: FieldErrors,
    post_id: Option<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let groups = service.group_choices().await?;
    Ok(HttpResponse::Ok().json(PostFormPage {
        form,
        errors,
        groups,
        is_edit: post_id.is_some(),
        post_id,
    }))
}

#[get("/posts/{id}/")]
async fn post_detail(
    service: web::Data<PostService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let detail = service.post_detail(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(PostDetailPage {
        detail,
        form: CommentForm::default(),
    }))
}

#[get("/create/")]
async fn create_form(
    _user: AuthenticatedUser,
    service: web::Data<PostService>,
) -> Result<HttpResponse, DomainError> {
    form_page(&service, PostForm::default(), FieldErrors::new(), None).await
}

#[post("/create/")]
async fn create_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<PostService>,
    form: web::Form<PostForm>,
) -> Result<HttpResponse, DomainError> {
    let form = form.into_inner();
    match service.create_post(user.id, &form).await {
        Ok(post) => {
            info!(
                request_id = %request_id(&req),
                username = %user.username,
                post_id = %post.id,
                "post created"
            );
            Ok(redirect(&profile_path(&user.username)))
        }
        Err(DomainError::Validation(errors)) => form_page(&service, form, errors, None).await,
        Err(err) => Err(err),
    }
}

#[get("/posts/{id}/edit/")]
async fn edit_form(
    user: AuthenticatedUser,
    service: web::Data<PostService>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let post = service.get_post(post_id).await?;
    if !is_owner(&post.author.id, &user.id) {
        return Ok(redirect(&post_path(post_id)));
    }
    form_page(&service, PostForm::from(&post), FieldErrors::new(), Some(post_id)).await
}

#[post("/posts/{id}/edit/")]
async fn edit_post(
    req: HttpRequest,
    user: AuthenticatedUser,
    service: web::Data<PostService>,
    path: web::Path<Uuid>,
    form: web::Form<PostForm>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    let post = service.get_post(post_id).await?;
    if !is_owner(&post.author.id, &user.id) {
        debug!(post_id = %post_id, username = %user.username, "edit by non-author ignored");
        return Ok(redirect(&post_path(post_id)));
    }

    let form = form.into_inner();
    match service.update_post(user.id, post_id, &form).await {
        Ok(_) => {
            info!(
                request_id = %request_id(&req),
                username = %user.username,
                post_id = %post_id,
                "post updated"
            );
            Ok(redirect(&post_path(post_id)))
        }
        Err(DomainError::Validation(errors)) => {
            form_page(&service, form, errors, Some(post_id)).await
        }
        Err(err) => Err(err),
    }
}

/// Always lands back on the post; an empty comment is dropped silently.
#[post("/posts/{id}/comment/")]
async fn add_comment(
    user: AuthenticatedUser,
    service: web::Data<PostService>,
    path: web::Path<Uuid>,
    form: web::Form<CommentForm>,
) -> Result<HttpResponse, DomainError> {
    let post_id = path.into_inner();
    match service.add_comment(user.id, post_id, &form).await {
        Ok(comment) => debug!(comment_id = %comment.id, "comment added"),
        Err(DomainError::Validation(_)) => debug!(post_id = %post_id, "empty comment dropped"),
        Err(err) => return Err(err),
    }
    Ok(redirect(&post_path(post_id)))
}
