//! Borrowing transaction endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    error::AppResult,
    models::transaction::{
        BorrowingTransaction, CreateTransactionRequest, ReturnTransactionRequest, TransactionQuery,
        UpdateTransactionRequest,
    },
};

use super::{
    ensure_same_id, AdminUser, OptionalValidatedJson, PaginatedResponse, StaffUser, ValidatedJson,
};

/// List borrowing transactions
#[utoipa::path(
    get,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(TransactionQuery),
    responses(
        (status = 200, description = "List of transactions", body = PaginatedResponse<BorrowingTransaction>),
        (status = 403, description = "Staff only")
    )
)]
pub async fn list_transactions(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Query(query): Query<TransactionQuery>,
) -> AppResult<Json<PaginatedResponse<BorrowingTransaction>>> {
    let (transactions, total) = state.services.transactions.search(&query).await?;
    Ok(Json(PaginatedResponse::new(transactions, total, query.page, query.per_page)))
}

/// Get a transaction by ID
#[utoipa::path(
    get,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 200, description = "Transaction details", body = BorrowingTransaction),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn get_transaction(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(id): Path<i32>,
) -> AppResult<Json<BorrowingTransaction>> {
    let transaction = state.services.transactions.get_by_id(id).await?;
    Ok(Json(transaction))
}

/// Borrow a book for a member
#[utoipa::path(
    post,
    path = "/transactions",
    tag = "transactions",
    security(("bearer_auth" = [])),
    request_body = CreateTransactionRequest,
    responses(
        (status = 201, description = "Book borrowed", body = BorrowingTransaction),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Book or member not found"),
        (status = 422, description = "No copy available")
    )
)]
pub async fn create_transaction(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    ValidatedJson(transaction): ValidatedJson<CreateTransactionRequest>,
) -> AppResult<(StatusCode, Json<BorrowingTransaction>)> {
    let created = state.services.transactions.borrow(transaction).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Correct a transaction record
#[utoipa::path(
    put,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    request_body = UpdateTransactionRequest,
    responses(
        (status = 200, description = "Transaction updated", body = BorrowingTransaction),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn update_transaction(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(id): Path<i32>,
    ValidatedJson((transaction_id, transaction)): ValidatedJson<UpdateTransactionRequest>,
) -> AppResult<Json<BorrowingTransaction>> {
    ensure_same_id(id, transaction_id)?;
    let updated = state.services.transactions.update(id, transaction).await?;
    Ok(Json(updated))
}

/// Return a borrowed book. The body is optional; the return date defaults to today.
#[utoipa::path(
    post,
    path = "/transactions/{id}/return",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    request_body(content = ReturnTransactionRequest, description = "Optional return date"),
    responses(
        (status = 200, description = "Book returned", body = BorrowingTransaction),
        (status = 400, description = "Return date before borrow date", body = crate::error::ErrorResponse),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "Already returned")
    )
)]
pub async fn return_transaction(
    State(state): State<crate::AppState>,
    _staff: StaffUser,
    Path(id): Path<i32>,
    OptionalValidatedJson(return_date): OptionalValidatedJson<ReturnTransactionRequest>,
) -> AppResult<Json<BorrowingTransaction>> {
    let return_date = return_date.flatten();
    let returned = state.services.transactions.return_book(id, return_date).await?;
    Ok(Json(returned))
}

/// Delete a transaction record
#[utoipa::path(
    delete,
    path = "/transactions/{id}",
    tag = "transactions",
    security(("bearer_auth" = [])),
    params(
        ("id" = i32, Path, description = "Transaction ID")
    ),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 403, description = "Administrators only"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn delete_transaction(
    State(state): State<crate::AppState>,
    _admin: AdminUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    state.services.transactions.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
