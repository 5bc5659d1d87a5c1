use crate::application::post_service::PostDetail;
use crate::domain::error::FieldErrors;
use crate::domain::group::GroupSummary;
use crate::domain::post::PostCard;
use crate::domain::user::AuthorSummary;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ======================= AUTH =======================

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub next: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: AuthorSummary,
    pub access_token: String,
    pub expires_in: i64,
    #[serde(rename = "token_type")]
    pub token_type: String,
}

// ======================= FEEDS =======================

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

// ======================= POSTS =======================

/// Submitted post form; absent fields deserialize as empty so that they
/// surface as field errors instead of a rejected body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostForm {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl From<&PostCard> for PostForm {
    fn from(post: &PostCard) -> Self {
        Self {
            text: post.text.clone(),
            group: post.group.as_ref().map(|g| g.id.to_string()),
            image: post.image.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    pub text: String,
}

/// Post create/edit form as shown to the author, with any field errors.
#[derive(Debug, Serialize)]
pub struct PostFormPage {
    pub form: PostForm,
    pub errors: FieldErrors,
    pub groups: Vec<GroupSummary>,
    pub is_edit: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct PostDetailPage {
    #[serde(flatten)]
    pub detail: PostDetail,
    pub form: CommentForm,
}

#[derive(Debug, Serialize)]
pub struct NotFoundBody<'a> {
    pub error: &'a str,
    pub path: &'a str,
}
