use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::domain::Member;
use crate::services::export;
use crate::services::{CreateMember, MemberError, UpdateMember};

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct CreateMemberRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UpdateMemberRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    /// Absent keeps the image, `null` clears it.
    #[serde(deserialize_with = "present")]
    pub image: Option<Option<String>>,
}

/// Maps a present key to `Some`, so `null` can be told apart from absence.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

impl From<MemberError> for ApiError {
    fn from(err: MemberError) -> Self {
        match err {
            MemberError::NotFound => Self::NotFound(err.to_string()),
            MemberError::Validation(errors) => Self::ValidationError(errors),
            MemberError::EmailTaken => Self::Conflict(err.to_string()),
            MemberError::Database(msg) => Self::DatabaseError(msg),
            MemberError::Internal(msg) => Self::InternalError(msg),
        }
    }
}

/// GET /members
pub async fn list_members(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Vec<Member>>>, ApiError> {
    let members = state.member_service().list().await?;
    Ok(Json(ApiResponse::success(members)))
}

/// POST /members
pub async fn create_member(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateMemberRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let member = state
        .member_service()
        .create(CreateMember {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            image: payload.image,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(member))))
}

/// GET /members/{id}
pub async fn get_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Member>>, ApiError> {
    let member = state.member_service().get(&id).await?;
    Ok(Json(ApiResponse::success(member)))
}

/// PUT /members/{id}
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateMemberRequest>,
) -> Result<Json<ApiResponse<Member>>, ApiError> {
    let member = state
        .member_service()
        .update(
            &id,
            UpdateMember {
                username: payload.username,
                email: payload.email,
                password: payload.password,
                image: payload.image,
            },
        )
        .await?;

    Ok(Json(ApiResponse::success(member)))
}

/// DELETE /members/{id}
pub async fn delete_member(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.member_service().delete(&id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Member deleted",
    ))))
}

/// GET /members/export/csv
pub async fn export_members(State(state): State<Arc<AppState>>) -> Result<Response, ApiError> {
    let csv = state.member_service().export_csv().await?;
    let filename = export::filename(Utc::now());

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        csv,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_image() {
        let absent: UpdateMemberRequest = serde_json::from_str(r#"{"username":"x"}"#).unwrap();
        assert_eq!(absent.image, None);

        let cleared: UpdateMemberRequest = serde_json::from_str(r#"{"image":null}"#).unwrap();
        assert_eq!(cleared.image, Some(None));

        let set: UpdateMemberRequest =
            serde_json::from_str(r#"{"image":"https://img.example/a.png"}"#).unwrap();
        assert_eq!(set.image, Some(Some("https://img.example/a.png".to_string())));
    }
}
