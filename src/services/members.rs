//! Authentication and member management service

use std::sync::Arc;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::AuthConfig,
    error::{AppError, AppResult},
    mediator::{EventKind, EventMediator},
    models::member::{Member, MemberChanges, MemberClaims, MemberQuery, MemberStatusChanged, NewMember},
    repository::MemberRepository,
};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
    Ok(hash.to_string())
}

pub fn verify_password(hash: &str, password: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[derive(Clone)]
pub struct MembersService {
    members: Arc<dyn MemberRepository>,
    config: AuthConfig,
    mediator: EventMediator,
}

impl MembersService {
    pub fn new(members: Arc<dyn MemberRepository>, config: AuthConfig, mediator: EventMediator) -> Self {
        Self {
            members,
            config,
            mediator,
        }
    }

    /// Authenticate by email and return a JWT token with the member
    pub async fn authenticate(&self, email: &str, password: &str) -> AppResult<(String, Member)> {
        let member = self
            .members
            .get_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::Authentication(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&member.password, password)? {
            return Err(AppError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let token = self.issue_token(&member)?;
        tracing::info!(member_id = member.member_id, "Member logged in");
        Ok((token, member))
    }

    /// Create a JWT token for a member
    pub fn issue_token(&self, member: &Member) -> AppResult<String> {
        let now = Utc::now().timestamp();
        let exp = now + (self.config.jwt_expiration_hours as i64 * 3600);

        let claims = MemberClaims {
            sub: member.email.clone(),
            member_id: member.member_id,
            name: member.name.clone(),
            roles: vec![member.role],
            exp,
            iat: now,
        };

        claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
    }

    /// Register a new member. The plain password is replaced by its hash.
    pub async fn create(&self, mut member: NewMember) -> AppResult<Member> {
        member.password = hash_password(&member.password)?;
        let created = self.members.create(&member).await?;
        tracing::info!(member_id = created.member_id, role = %created.role, "Member registered");
        Ok(created)
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Member> {
        self.members.get_by_id(id).await
    }

    pub async fn search(&self, query: &MemberQuery) -> AppResult<(Vec<Member>, i64)> {
        self.members.search(query).await
    }

    /// Update member details. Publishes `member:updated`, plus
    /// `member:status-changed` when the membership status moved.
    pub async fn update(&self, changes: MemberChanges) -> AppResult<Member> {
        let current = self.members.get_by_id(changes.member_id).await?;
        let updated = self.members.update(&changes).await?;

        self.mediator.publish(EventKind::MemberUpdated, &updated);
        self.publish_status_change(&current, &updated);
        Ok(updated)
    }

    /// Change the membership status only
    pub async fn update_status(&self, id: i32, status: &str) -> AppResult<Member> {
        let current = self.members.get_by_id(id).await?;
        let updated = self.members.update_status(id, status).await?;

        self.publish_status_change(&current, &updated);
        Ok(updated)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.members.delete(id).await?;
        tracing::info!(member_id = id, "Member deleted");
        Ok(())
    }

    fn publish_status_change(&self, before: &Member, after: &Member) {
        if before.membership_status == after.membership_status {
            return;
        }
        self.mediator.publish(
            EventKind::MemberStatusChanged,
            &MemberStatusChanged {
                member_id: after.member_id,
                previous_status: before.membership_status.clone(),
                membership_status: after.membership_status.clone(),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::member::Role, repository::members::MockMemberRepository};

    fn member(id: i32, status: &str) -> Member {
        Member {
            member_id: id,
            name: "Grace Hopper".to_string(),
            email: "grace@example.org".to_string(),
            password: String::new(),
            phone: None,
            address: None,
            membership_status: status.to_string(),
            role: Role::Member,
            created_at: Utc::now(),
        }
    }

    fn auth_config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            jwt_expiration_hours: 1,
        }
    }

    fn changes(status: Option<&str>) -> MemberChanges {
        MemberChanges {
            member_id: 5,
            name: "Grace Hopper".to_string(),
            email: "grace@example.org".to_string(),
            phone: None,
            address: None,
            membership_status: status.map(str::to_string),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("cobol-1959").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password(&hash, "cobol-1959").unwrap());
        assert!(!verify_password(&hash, "fortran").unwrap());
    }

    #[tokio::test]
    async fn test_authenticate_issues_token_for_valid_password() {
        let mut stored = member(5, "Active");
        stored.password = hash_password("cobol-1959").unwrap();

        let mut repo = MockMemberRepository::new();
        repo.expect_get_by_email()
            .withf(|email: &str| email == "grace@example.org")
            .returning(move |_| Ok(Some(stored.clone())));

        let service = MembersService::new(Arc::new(repo), auth_config(), EventMediator::new(8));
        let (token, member) = service.authenticate(" grace@example.org ", "cobol-1959").await.unwrap();

        assert_eq!(member.member_id, 5);
        let claims = MemberClaims::from_token(&token, "test-secret").unwrap();
        assert_eq!(claims.member_id, 5);
        assert_eq!(claims.roles, vec![Role::Member]);

        let err = service.authenticate("grace@example.org", "wrong-password").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(_)));
    }

    #[tokio::test]
    async fn test_unknown_email_is_authentication_error() {
        let mut repo = MockMemberRepository::new();
        repo.expect_get_by_email().returning(|_| Ok(None));

        let service = MembersService::new(Arc::new(repo), auth_config(), EventMediator::new(8));
        let err = service.authenticate("nobody@example.org", "whatever1").await.unwrap_err();
        assert!(matches!(err, AppError::Authentication(msg) if msg == INVALID_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_status_change_publishes_both_events() {
        let mut repo = MockMemberRepository::new();
        repo.expect_get_by_id().returning(|id| Ok(member(id, "Active")));
        repo.expect_update()
            .returning(|c| Ok(member(c.member_id, c.membership_status.as_deref().unwrap_or("Active"))));

        let mediator = EventMediator::new(8);
        let mut updated = mediator.subscribe(EventKind::MemberUpdated);
        let mut status = mediator.subscribe(EventKind::MemberStatusChanged);
        let service = MembersService::new(Arc::new(repo), auth_config(), mediator);

        service.update(changes(Some("Suspended"))).await.unwrap();

        assert_eq!(updated.recv().await.unwrap().payload["memberID"], 5);
        let payload: MemberStatusChanged = status.recv().await.unwrap().payload_as().unwrap();
        assert_eq!(payload.previous_status, "Active");
        assert_eq!(payload.membership_status, "Suspended");
    }

    #[tokio::test]
    async fn test_unchanged_status_publishes_update_only() {
        let mut repo = MockMemberRepository::new();
        repo.expect_get_by_id().returning(|id| Ok(member(id, "Active")));
        repo.expect_update().returning(|c| Ok(member(c.member_id, "Active")));

        let mediator = EventMediator::new(8);
        let mut updated = mediator.subscribe(EventKind::MemberUpdated);
        let mut status = mediator.subscribe(EventKind::MemberStatusChanged);
        let service = MembersService::new(Arc::new(repo), auth_config(), mediator.clone());

        service.update(changes(None)).await.unwrap();
        mediator.publish(EventKind::MemberStatusChanged, &serde_json::json!({ "marker": true }));

        assert!(updated.recv().await.is_some());
        // The first status event seen is the marker, so the update published none
        assert_eq!(status.recv().await.unwrap().payload["marker"], true);
    }

    #[tokio::test]
    async fn test_update_missing_member_is_not_found() {
        let mut repo = MockMemberRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Err(AppError::NotFound(format!("Member with id {} not found", id))));
        repo.expect_update().never();

        let service = MembersService::new(Arc::new(repo), auth_config(), EventMediator::new(8));
        assert!(matches!(service.update(changes(None)).await, Err(AppError::NotFound(_))));
    }
}
