//! API handlers for the library REST endpoints

pub mod auth;
pub mod books;
pub mod fines;
pub mod health;
pub mod members;
pub mod navigation;
pub mod notifications;
pub mod openapi;
pub mod transactions;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::request::Parts,
    routing::{get, post, put},
    Json, RequestPartsExt, Router,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use serde::{de::DeserializeOwned, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use utoipa::ToSchema;

use crate::{
    error::{AppError, AppResult},
    guard::AccessDenied,
    models::member::MemberClaims,
    repository::page_window,
    validation::{validate, Schema},
    AppState,
};

/// Extractor for the authenticated member from the bearer token
pub struct AuthenticatedUser(pub MemberClaims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::from(AccessDenied::AuthenticationRequired))?;

        let claims = MemberClaims::from_token(bearer.token(), &state.config.auth.jwt_secret)
            .map_err(|e| AppError::Authentication(e.to_string()))?;

        Ok(AuthenticatedUser(claims))
    }
}

/// Like [`AuthenticatedUser`], but a missing or invalid token is no session
pub struct OptionalUser(pub Option<MemberClaims>);

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = match AuthenticatedUser::from_request_parts(parts, state).await {
            Ok(AuthenticatedUser(claims)) => Some(claims),
            Err(_) => None,
        };
        Ok(OptionalUser(claims))
    }
}

/// Authenticated member holding a staff role (Admin or Librarian).
/// Rejects before the body is read.
pub struct StaffUser(pub MemberClaims);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        claims.require_staff()?;
        Ok(StaffUser(claims))
    }
}

/// Authenticated administrator
pub struct AdminUser(pub MemberClaims);

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        claims.require_admin()?;
        Ok(AdminUser(claims))
    }
}

/// Caller allowed on the member record named by the `:id` path segment:
/// the member themself, or staff
pub struct SelfOrStaff {
    pub claims: MemberClaims,
    pub member_id: i32,
}

#[async_trait]
impl FromRequestParts<AppState> for SelfOrStaff {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(claims) = AuthenticatedUser::from_request_parts(parts, state).await?;
        let Path(member_id) = parts
            .extract::<Path<i32>>()
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        claims.require_self_or_staff(member_id)?;
        Ok(SelfOrStaff { claims, member_id })
    }
}

/// JSON body checked against its [`Schema`]; the handler receives the validated record
pub struct ValidatedJson<T: Schema>(pub T::Valid);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: Schema + DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(raw) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

        Ok(ValidatedJson(validate(raw)?))
    }
}

/// Like [`ValidatedJson`] for endpoints whose body may be omitted.
///
/// An empty body yields `None`; a body that is present but malformed or
/// invalid is rejected.
pub struct OptionalValidatedJson<T: Schema>(pub Option<T::Valid>);

#[async_trait]
impl<T, S> FromRequest<S> for OptionalValidatedJson<T>
where
    T: Schema + DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(OptionalValidatedJson(None));
        }

        let raw: T = serde_json::from_slice(&bytes).map_err(|e| {
            AppError::BadRequest(format!("Failed to deserialize the JSON body: {}", e))
        })?;
        Ok(OptionalValidatedJson(Some(validate(raw)?)))
    }
}

/// Paginated response wrapper
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    /// Records on this page
    pub items: Vec<T>,
    /// Total number of matching records
    pub total: i64,
    /// Current page number
    pub page: i64,
    /// Records per page
    pub per_page: i64,
}

impl<T> PaginatedResponse<T>
where
    T: for<'a> ToSchema<'a>,
{
    pub fn new(items: Vec<T>, total: i64, page: Option<i64>, per_page: Option<i64>) -> Self {
        let (page, per_page, _) = page_window(page, per_page);
        Self {
            items,
            total,
            page,
            per_page,
        }
    }
}

/// An update body must carry the identifier of the resource it targets
pub(crate) fn ensure_same_id(path_id: i32, body_id: i32) -> AppResult<()> {
    if path_id != body_id {
        return Err(AppError::BadRequest(format!(
            "Path id {} does not match body id {}",
            path_id, body_id
        )));
    }
    Ok(())
}

/// Create the application router with all routes
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Authentication
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        .route("/navigation/authorize", post(navigation::authorize))
        // Members
        .route("/members", get(members::list_members).post(members::create_member))
        .route(
            "/members/:id",
            get(members::get_member)
                .put(members::update_member)
                .delete(members::delete_member),
        )
        .route("/members/:id/status", put(members::update_member_status))
        .route("/members/:id/transactions", get(members::member_transactions))
        .route("/members/:id/fines", get(members::member_fines))
        .route("/members/:id/notifications", get(members::member_notifications))
        // Books
        .route("/books", get(books::list_books).post(books::create_book))
        .route(
            "/books/:id",
            get(books::get_book).put(books::update_book).delete(books::delete_book),
        )
        // Borrowing transactions
        .route(
            "/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/transactions/:id",
            get(transactions::get_transaction)
                .put(transactions::update_transaction)
                .delete(transactions::delete_transaction),
        )
        .route("/transactions/:id/return", post(transactions::return_transaction))
        // Fines
        .route("/fines", get(fines::list_fines).post(fines::create_fine))
        .route(
            "/fines/:id",
            get(fines::get_fine).put(fines::update_fine).delete(fines::delete_fine),
        )
        .route("/fines/:id/pay", post(fines::pay_fine))
        // Notifications
        .route(
            "/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route(
            "/notifications/:id",
            get(notifications::get_notification)
                .put(notifications::update_notification)
                .delete(notifications::delete_notification),
        )
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
}
