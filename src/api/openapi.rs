//! OpenAPI documentation

use axum::Router;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{auth, books, fines, health, members, navigation, notifications, transactions};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Library Management System REST API"
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Auth
        auth::register,
        auth::login,
        auth::me,
        navigation::authorize,
        // Members
        members::list_members,
        members::get_member,
        members::create_member,
        members::update_member,
        members::update_member_status,
        members::delete_member,
        members::member_transactions,
        members::member_fines,
        members::member_notifications,
        // Books
        books::list_books,
        books::get_book,
        books::create_book,
        books::update_book,
        books::delete_book,
        // Transactions
        transactions::list_transactions,
        transactions::get_transaction,
        transactions::create_transaction,
        transactions::update_transaction,
        transactions::return_transaction,
        transactions::delete_transaction,
        // Fines
        fines::list_fines,
        fines::get_fine,
        fines::create_fine,
        fines::update_fine,
        fines::pay_fine,
        fines::delete_fine,
        // Notifications
        notifications::list_notifications,
        notifications::get_notification,
        notifications::create_notification,
        notifications::update_notification,
        notifications::delete_notification,
    ),
    components(
        schemas(
            // Auth
            auth::LoginRequest,
            auth::LoginResponse,
            navigation::NavigationRequest,
            navigation::NavigationResponse,
            // Members
            crate::models::member::Role,
            crate::models::member::Member,
            crate::models::member::CreateMemberRequest,
            crate::models::member::UpdateMemberRequest,
            crate::models::member::UpdateMemberStatusRequest,
            // Books
            crate::models::book::Book,
            crate::models::book::BookDetails,
            crate::models::book::CreateBookRequest,
            crate::models::book::UpdateBookRequest,
            crate::models::availability::Availability,
            crate::models::availability::AvailabilityBadge,
            // Transactions
            crate::models::transaction::TransactionStatus,
            crate::models::transaction::BorrowingTransaction,
            crate::models::transaction::CreateTransactionRequest,
            crate::models::transaction::UpdateTransactionRequest,
            crate::models::transaction::ReturnTransactionRequest,
            // Fines
            crate::models::fine::FineStatus,
            crate::models::fine::Fine,
            crate::models::fine::CreateFineRequest,
            crate::models::fine::UpdateFineRequest,
            // Notifications
            crate::models::notification::Notification,
            crate::models::notification::CreateNotificationRequest,
            crate::models::notification::UpdateNotificationRequest,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
            crate::validation::FieldError,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "auth", description = "Authentication and navigation checks"),
        (name = "members", description = "Member management"),
        (name = "books", description = "Book catalog"),
        (name = "transactions", description = "Borrowing and returns"),
        (name = "fines", description = "Fines"),
        (name = "notifications", description = "Member notifications")
    )
)]
pub struct ApiDoc;

/// Registers the `bearer_auth` scheme referenced by protected paths
struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
