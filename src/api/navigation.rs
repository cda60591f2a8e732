//! Client navigation check
//!
//! The browser asks before entering a protected view and applies the verdict.

use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::guard::{GuardVerdict, NavigationGuard, TracingNotifier};

use super::OptionalUser;

#[derive(Deserialize, ToSchema)]
pub struct NavigationRequest {
    /// Requested client URL, query string included
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NavigationResponse {
    pub allowed: bool,
    /// Where to send the browser when not allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
    /// Transient notice to display
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl From<GuardVerdict> for NavigationResponse {
    fn from(verdict: GuardVerdict) -> Self {
        match verdict {
            GuardVerdict::Proceed => Self {
                allowed: true,
                redirect_to: None,
                notice: None,
            },
            GuardVerdict::Redirect { location, notice } => Self {
                allowed: false,
                redirect_to: Some(location),
                notice,
            },
        }
    }
}

/// Evaluate the access guard for a client URL
#[utoipa::path(
    post,
    path = "/navigation/authorize",
    tag = "auth",
    request_body = NavigationRequest,
    responses(
        (status = 200, description = "Guard verdict", body = NavigationResponse)
    )
)]
pub async fn authorize(
    OptionalUser(claims): OptionalUser,
    Json(request): Json<NavigationRequest>,
) -> Json<NavigationResponse> {
    let identity = claims.as_ref().map(|c| c.identity());
    let verdict = NavigationGuard::new(TracingNotifier).check_url(identity.as_ref(), &request.url);
    Json(verdict.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verdict_shapes() {
        let proceed = serde_json::to_value(NavigationResponse::from(GuardVerdict::Proceed)).unwrap();
        assert_eq!(proceed, serde_json::json!({ "allowed": true }));

        let redirect = NavigationResponse::from(GuardVerdict::Redirect {
            location: "/login?returnUrl=%2Fbooks".to_string(),
            notice: None,
        });
        assert!(!redirect.allowed);
        assert_eq!(redirect.redirect_to.as_deref(), Some("/login?returnUrl=%2Fbooks"));
    }
}
