//! Notification endpoints (staff only)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::notification::{
        CreateNotificationRequest, Notification, NotificationQuery, UpdateNotificationRequest,
    },
};

use super::{ensure_same_id, PaginatedResponse, StaffUser, ValidatedJson};

/// List notifications
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(NotificationQuery),
    responses(
        (status = 200, description = "List of notifications", body = PaginatedResponse<Notification>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_notifications(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<PaginatedResponse<Notification>>> {
    let (notifications, total) = state.services.notifications.search(&query).await?;
    Ok(Json(PaginatedResponse::new(notifications, total, query.page, query.per_page)))
}

#[utoipa::path(
    get,
    path = "/notifications/{id}",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Notification ID")
    ),
    responses(
        (status = 200, description = "Notification", body = Notification),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn get_notification(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Notification>> {
    let notification = state.services.notifications.get_by_id(id).await?;
    Ok(Json(notification))
}

/// Send a notification to a member
#[utoipa::path(
    post,
    path = "/notifications",
    tag = "notifications",
    security(("bearer_auth" = [])),
    request_body = CreateNotificationRequest,
    responses(
        (status = 201, description = "Notification sent", body = Notification),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Member not found")
    )
)]
pub async fn create_notification(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    ValidatedJson(notification): ValidatedJson<CreateNotificationRequest>,
) -> AppResult<(StatusCode, Json<Notification>)> {
    let created = state.services.notifications.create(notification).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/notifications/{id}",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Notification ID")
    ),
    request_body = UpdateNotificationRequest,
    responses(
        (status = 200, description = "Notification updated", body = Notification),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn update_notification(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(id): Path<i32>,
    ValidatedJson((notification_id, notification)): ValidatedJson<UpdateNotificationRequest>,
) -> AppResult<Json<Notification>> {
    ensure_same_id(id, notification_id)?;
    let updated = state.services.notifications.update(id, notification).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    delete,
    path = "/notifications/{id}",
    tag = "notifications",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Notification ID")
    ),
    responses(
        (status = 204, description = "Notification deleted"),
        (status = 404, description = "Notification not found")
    )
)]
pub async fn delete_notification(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.notifications.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
