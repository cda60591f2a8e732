//! Fine endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::fine::{CreateFineRequest, Fine, FineQuery, UpdateFineRequest},
};

use super::{
    ensure_same_id, AdminUser, AuthenticatedUser, PaginatedResponse, StaffUser, ValidatedJson,
};

/// List fines
#[utoipa::path(
    get,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(FineQuery),
    responses(
        (status = 200, description = "List of fines", body = PaginatedResponse<Fine>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_fines(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Query(query): Query<FineQuery>,
) -> AppResult<Json<PaginatedResponse<Fine>>> {
    let (fines, total) = state.services.fines.search(&query).await?;
    Ok(Json(PaginatedResponse::new(fines, total, query.page, query.per_page)))
}

/// Get a fine by ID
#[utoipa::path(
    get,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Fine ID")
    ),
    responses(
        (status = 200, description = "Fine details", body = Fine),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn get_fine(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Fine>> {
    let fine = state.services.fines.get_by_id(id).await?;
    Ok(Json(fine))
}

/// Issue a fine
#[utoipa::path(
    post,
    path = "/fines",
    tag = "fines",
    security(("bearer_auth" = [])),
    request_body = CreateFineRequest,
    responses(
        (status = 201, description = "Fine issued", body = Fine),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Member not found")
    )
)]
pub async fn create_fine(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    ValidatedJson(fine): ValidatedJson<CreateFineRequest>,
) -> AppResult<(StatusCode, Json<Fine>)> {
    let created = state.services.fines.create(fine).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a fine
#[utoipa::path(
    put,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Fine ID")
    ),
    request_body = UpdateFineRequest,
    responses(
        (status = 200, description = "Fine updated", body = Fine),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn update_fine(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(id): Path<i32>,
    ValidatedJson(changes): ValidatedJson<UpdateFineRequest>,
) -> AppResult<Json<Fine>> {
    ensure_same_id(id, changes.fine_id)?;
    let updated = state.services.fines.update(changes).await?;
    Ok(Json(updated))
}

/// Pay a fine. Members may settle their own fines.
#[utoipa::path(
    post,
    path = "/fines/{id}/pay",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Fine ID")
    ),
    responses(
        (status = 200, description = "Fine paid", body = Fine),
        (status = 403, description = "Not your fine"),
        (status = 404, description = "Fine not found"),
        (status = 409, description = "Already paid")
    )
)]
pub async fn pay_fine(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<i32>,
) -> AppResult<Json<Fine>> {
    if !claims.is_staff() {
        let fine = state.services.fines.get_by_id(id).await?;
        claims.require_self_or_staff(fine.member_id)?;
    }

    let paid = state.services.fines.pay(id).await?;
    Ok(Json(paid))
}

/// Delete a fine
#[utoipa::path(
    delete,
    path = "/fines/{id}",
    tag = "fines",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Fine ID")
    ),
    responses(
        (status = 204, description = "Fine deleted"),
        (status = 403, description = "Administrators only"),
        (status = 404, description = "Fine not found")
    )
)]
pub async fn delete_fine(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.fines.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
