//! Access guard for protected views and endpoints
//!
//! [`check_access`] is the pure decision. [`NavigationGuard`] turns a
//! decision into what the browser should do (proceed, or redirect with an
//! optional notice). API handlers use the same decision through
//! [`crate::models::member::MemberClaims::require_roles`].

use serde::{Deserialize, Serialize};

use crate::{error::AppError, models::member::Role};

/// Current session identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i32,
    pub roles: Vec<Role>,
}

/// Why access was refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDenied {
    /// No session
    AuthenticationRequired,
    /// Session holds none of the required roles
    AuthorizationDenied { required: Vec<Role> },
}

impl From<AccessDenied> for AppError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::AuthenticationRequired => {
                AppError::Authentication("Authentication required".to_string())
            }
            AccessDenied::AuthorizationDenied { required } => {
                let names: Vec<&str> = required.iter().map(Role::as_str).collect();
                AppError::Authorization(format!("Requires one of the roles: {}", names.join(", ")))
            }
        }
    }
}

/// Decide whether `identity` may enter a target requiring `required` roles.
///
/// `None` (or an empty list) means any authenticated identity is accepted.
pub fn check_access(identity: Option<&Identity>, required: Option<&[Role]>) -> Result<(), AccessDenied> {
    let identity = identity.ok_or(AccessDenied::AuthenticationRequired)?;

    match required {
        Some(roles) if !roles.is_empty() => {
            if identity.roles.iter().any(|r| roles.contains(r)) {
                Ok(())
            } else {
                Err(AccessDenied::AuthorizationDenied {
                    required: roles.to_vec(),
                })
            }
        }
        _ => Ok(()),
    }
}

/// Client route metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtectedRoute {
    pub path: &'static str,
    /// `None`: authenticated only, any role
    pub roles: Option<&'static [Role]>,
}

const STAFF: &[Role] = &[Role::Admin, Role::Librarian];

/// Protected views of the browser client
pub const PROTECTED_ROUTES: &[ProtectedRoute] = &[
    ProtectedRoute { path: "/books", roles: None },
    ProtectedRoute { path: "/profile", roles: None },
    ProtectedRoute { path: "/notifications", roles: None },
    ProtectedRoute { path: "/members", roles: Some(STAFF) },
    ProtectedRoute { path: "/transactions", roles: Some(STAFF) },
    ProtectedRoute { path: "/fines", roles: Some(STAFF) },
    ProtectedRoute { path: "/admin", roles: Some(&[Role::Admin]) },
];

/// Find the route guarding `url`, matching on whole path segments
pub fn route_for(url: &str) -> Option<&'static ProtectedRoute> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    PROTECTED_ROUTES
        .iter()
        .filter(|route| {
            path == route.path
                || path
                    .strip_prefix(route.path)
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by_key(|route| route.path.len())
}

/// Transient user-facing notice surface (toast/snackbar)
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Notifier that only records notices in the log
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        tracing::info!(notice = message, "Access notice");
    }
}

/// What the client should do with a navigation attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardVerdict {
    Proceed,
    Redirect {
        location: String,
        notice: Option<String>,
    },
}

pub const ACCESS_DENIED_NOTICE: &str = "You do not have permission to access this page";

pub struct NavigationGuard<N> {
    notifier: N,
    login_path: String,
    home_path: String,
}

impl<N: Notifier> NavigationGuard<N> {
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            login_path: "/login".to_string(),
            home_path: "/".to_string(),
        }
    }

    pub fn with_paths(mut self, login_path: impl Into<String>, home_path: impl Into<String>) -> Self {
        self.login_path = login_path.into();
        self.home_path = home_path.into();
        self
    }

    /// Evaluate one navigation to `requested_url` guarded by `required` roles
    pub fn can_activate(
        &self,
        identity: Option<&Identity>,
        required: Option<&[Role]>,
        requested_url: &str,
    ) -> GuardVerdict {
        match check_access(identity, required) {
            Ok(()) => GuardVerdict::Proceed,
            Err(AccessDenied::AuthenticationRequired) => GuardVerdict::Redirect {
                location: format!(
                    "{}?returnUrl={}",
                    self.login_path,
                    urlencoding::encode(requested_url)
                ),
                notice: None,
            },
            Err(AccessDenied::AuthorizationDenied { .. }) => {
                self.notifier.notify(ACCESS_DENIED_NOTICE);
                GuardVerdict::Redirect {
                    location: self.home_path.clone(),
                    notice: Some(ACCESS_DENIED_NOTICE.to_string()),
                }
            }
        }
    }

    /// Evaluate a navigation using the client route table. Unlisted paths are public.
    pub fn check_url(&self, identity: Option<&Identity>, url: &str) -> GuardVerdict {
        match route_for(url) {
            Some(route) => self.can_activate(identity, route.roles, url),
            None => GuardVerdict::Proceed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct RecordingNotifier(Arc<Mutex<Vec<String>>>);

    impl Notifier for RecordingNotifier {
        fn notify(&self, message: &str) {
            self.0.lock().unwrap().push(message.to_string());
        }
    }

    fn member() -> Identity {
        Identity { id: 3, roles: vec![Role::Member] }
    }

    #[test]
    fn test_no_session_requires_authentication() {
        assert_eq!(check_access(None, None), Err(AccessDenied::AuthenticationRequired));
        assert_eq!(
            check_access(None, Some(&[Role::Admin])),
            Err(AccessDenied::AuthenticationRequired)
        );
    }

    #[test]
    fn test_role_intersection() {
        let librarian = Identity { id: 1, roles: vec![Role::Member, Role::Librarian] };
        assert!(check_access(Some(&librarian), Some(STAFF)).is_ok());
        assert!(check_access(Some(&member()), None).is_ok());
        assert!(check_access(Some(&member()), Some(&[])).is_ok());
        assert_eq!(
            check_access(Some(&member()), Some(&[Role::Admin])),
            Err(AccessDenied::AuthorizationDenied { required: vec![Role::Admin] })
        );
    }

    #[test]
    fn test_unauthenticated_redirects_to_login_with_return_url() {
        let notifier = RecordingNotifier::default();
        let guard = NavigationGuard::new(notifier.clone());

        let verdict = guard.can_activate(None, None, "/members/4?tab=fines");
        assert_eq!(
            verdict,
            GuardVerdict::Redirect {
                location: "/login?returnUrl=%2Fmembers%2F4%3Ftab%3Dfines".to_string(),
                notice: None,
            }
        );
        assert!(notifier.0.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_role_redirects_home_with_notice() {
        let notifier = RecordingNotifier::default();
        let guard = NavigationGuard::new(notifier.clone());

        let verdict = guard.can_activate(Some(&member()), Some(&[Role::Admin]), "/admin");
        assert_eq!(
            verdict,
            GuardVerdict::Redirect {
                location: "/".to_string(),
                notice: Some(ACCESS_DENIED_NOTICE.to_string()),
            }
        );
        assert_eq!(notifier.0.lock().unwrap().as_slice(), [ACCESS_DENIED_NOTICE]);
    }

    #[test]
    fn test_matching_role_proceeds() {
        let guard = NavigationGuard::new(TracingNotifier);
        let admin = Identity { id: 1, roles: vec![Role::Admin] };
        assert_eq!(guard.can_activate(Some(&admin), Some(&[Role::Admin]), "/admin"), GuardVerdict::Proceed);
    }

    #[test]
    fn test_route_table_lookup() {
        assert_eq!(route_for("/members").unwrap().path, "/members");
        assert_eq!(route_for("/members/12/edit").unwrap().roles, Some(STAFF));
        assert_eq!(route_for("/books?page=2").unwrap().roles, None);
        assert!(route_for("/membership-info").is_none());
        assert!(route_for("/login").is_none());
    }

    #[test]
    fn test_check_url_uses_route_table() {
        let guard = NavigationGuard::new(TracingNotifier).with_paths("/auth/login", "/home");
        assert_eq!(guard.check_url(None, "/about"), GuardVerdict::Proceed);
        assert!(matches!(
            guard.check_url(Some(&member()), "/fines"),
            GuardVerdict::Redirect { ref location, .. } if location == "/home"
        ));
        assert!(matches!(
            guard.check_url(None, "/books"),
            GuardVerdict::Redirect { ref location, .. } if location.starts_with("/auth/login?returnUrl=")
        ));
    }

    #[test]
    fn test_denial_maps_to_http_errors() {
        assert!(matches!(
            AppError::from(AccessDenied::AuthenticationRequired),
            AppError::Authentication(_)
        ));
        match AppError::from(AccessDenied::AuthorizationDenied { required: STAFF.to_vec() }) {
            AppError::Authorization(msg) => assert_eq!(msg, "Requires one of the roles: Admin, Librarian"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
