//! Member management endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::{AppError, AppResult},
    models::{
        fine::{Fine, FineQuery},
        member::{
            CreateMemberRequest, Member, MemberQuery, Role, UpdateMemberRequest,
            UpdateMemberStatusRequest,
        },
        notification::{Notification, NotificationQuery},
        transaction::{BorrowingTransaction, TransactionQuery},
    },
};

use super::{ensure_same_id, AdminUser, PaginatedResponse, SelfOrStaff, StaffUser, ValidatedJson};

/// List members with search and pagination
#[utoipa::path(
    get,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    params(MemberQuery),
    responses(
        (status = 200, description = "List of members", body = PaginatedResponse<Member>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_members(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Query(query): Query<MemberQuery>,
) -> AppResult<Json<PaginatedResponse<Member>>> {
    let (members, total) = state.services.members.search(&query).await?;
    Ok(Json(PaginatedResponse::new(members, total, query.page, query.per_page)))
}

/// Get member details by ID
#[utoipa::path(
    get,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member details", body = Member),
        (status = 403, description = "Not your record"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(
    State(state): State<crate::AppState>,
    SelfOrStaff { member_id: id, .. }: SelfOrStaff,
) -> AppResult<Json<Member>> {
    let member = state.services.members.get_by_id(id).await?;
    Ok(Json(member))
}

/// Create a member account from the desk
#[utoipa::path(
    post,
    path = "/members",
    tag = "members",
    security(("bearer_auth" = [])),
    request_body = CreateMemberRequest,
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Staff only, staff roles need an administrator"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn create_member(
    State(state): State<crate::AppState>,
    StaffUser(claims): StaffUser,
    ValidatedJson(member): ValidatedJson<CreateMemberRequest>,
) -> AppResult<(StatusCode, Json<Member>)> {
    if member.role != Role::Member {
        claims.require_admin()?;
    }

    let created = state.services.members.create(member).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Update a member's details
#[utoipa::path(
    put,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Not your record, or status change by a member"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn update_member(
    State(state): State<crate::AppState>,
    SelfOrStaff { claims, member_id: id }: SelfOrStaff,
    ValidatedJson(mut changes): ValidatedJson<UpdateMemberRequest>,
) -> AppResult<Json<Member>> {
    ensure_same_id(id, changes.member_id)?;
    if !claims.is_staff() {
        if let Some(requested) = changes.membership_status.take() {
            // Members may echo their current status back, not change it
            let current = state.services.members.get_by_id(id).await?;
            if requested.trim() != current.membership_status {
                return Err(AppError::Authorization(
                    "Only staff may change a membership status".to_string(),
                ));
            }
        }
    }

    let updated = state.services.members.update(changes).await?;
    Ok(Json(updated))
}

/// Change a membership status
#[utoipa::path(
    put,
    path = "/members/{id}/status",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    request_body = UpdateMemberStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = Member),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn update_member_status(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(id): Path<i32>,
    ValidatedJson(status): ValidatedJson<UpdateMemberStatusRequest>,
) -> AppResult<Json<Member>> {
    let updated = state.services.members.update_status(id, &status).await?;
    Ok(Json(updated))
}

/// Delete a member
#[utoipa::path(
    delete,
    path = "/members/{id}",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 204, description = "Member deleted"),
        (status = 403, description = "Administrators only"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn delete_member(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.members.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Borrowing history of a member
#[utoipa::path(
    get,
    path = "/members/{id}/transactions",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("perPage" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Member transactions", body = PaginatedResponse<BorrowingTransaction>),
        (status = 403, description = "Not your record")
    )
)]
pub async fn member_transactions(
    State(state): State<crate::AppState>,
    SelfOrStaff { member_id: id, .. }: SelfOrStaff,
    Query(mut query): Query<TransactionQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowingTransaction>>> {
    query.member_id = Some(id);

    let (transactions, total) = state.services.transactions.search(&query).await?;
    Ok(Json(PaginatedResponse::new(transactions, total, query.page, query.per_page)))
}

/// Fines of a member
#[utoipa::path(
    get,
    path = "/members/{id}/fines",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("perPage" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Member fines", body = PaginatedResponse<Fine>),
        (status = 403, description = "Not your record")
    )
)]
pub async fn member_fines(
    State(state): State<crate::AppState>,
    SelfOrStaff { member_id: id, .. }: SelfOrStaff,
    Query(mut query): Query<FineQuery>,
) -> AppResult<Json<PaginatedResponse<Fine>>> {
    query.member_id = Some(id);

    let (fines, total) = state.services.fines.search(&query).await?;
    Ok(Json(PaginatedResponse::new(fines, total, query.page, query.per_page)))
}

/// Notifications sent to a member
#[utoipa::path(
    get,
    path = "/members/{id}/notifications",
    tag = "members",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Member ID"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("perPage" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Member notifications", body = PaginatedResponse<Notification>),
        (status = 403, description = "Not your record")
    )
)]
pub async fn member_notifications(
    State(state): State<crate::AppState>,
    SelfOrStaff { member_id: id, .. }: SelfOrStaff,
    Query(mut query): Query<NotificationQuery>,
) -> AppResult<Json<PaginatedResponse<Notification>>> {
    query.member_id = Some(id);

    let (notifications, total) = state.services.notifications.search(&query).await?;
    Ok(Json(PaginatedResponse::new(notifications, total, query.page, query.per_page)))
}
