//! Member model, roles and session claims

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Decode, Encode, FromRow, Postgres};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppError,
    guard::{check_access, Identity},
    validation::{not_blank, required, Schema},
};

pub const DEFAULT_MEMBERSHIP_STATUS: &str = "Active";

/// Role attached to a session identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Role {
    Admin,
    Librarian,
    Member,
}

/// Roles allowed to run the circulation desk
pub const STAFF_ROLES: &[Role] = &[Role::Admin, Role::Librarian];

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Librarian => "Librarian",
            Role::Member => "Member",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "librarian" => Ok(Role::Librarian),
            "member" => Ok(Role::Member),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

// SQLx conversion for Role (stored as VARCHAR)
impl sqlx::Type<Postgres> for Role {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <String as sqlx::Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for Role {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s: String = Decode::<Postgres>::decode(value)?;
        s.parse().map_err(|e: String| e.into())
    }
}

impl Encode<'_, Postgres> for Role {
    fn encode_by_ref(&self, buf: &mut sqlx::postgres::PgArgumentBuffer) -> sqlx::encode::IsNull {
        <&str as Encode<Postgres>>::encode(self.as_str(), buf)
    }
}

/// Member record
#[derive(Debug, Clone, Serialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(rename = "memberID")]
    pub member_id: i32,
    pub name: String,
    pub email: String,
    /// Argon2 hash
    #[serde(skip_serializing)]
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub membership_status: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Member list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MemberQuery {
    /// Matches name or email
    pub search: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Member registration request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    #[validate(
        required(message = "Name is required"),
        custom(function = "not_blank"),
        length(max = 100, message = "Name cannot exceed 100 characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Email is required"),
        custom(function = "not_blank"),
        email(message = "Invalid email address"),
        length(max = 255, message = "Email cannot exceed 255 characters")
    )]
    pub email: Option<String>,
    #[validate(
        required(message = "Password is required"),
        length(min = 8, message = "Password must be at least 8 characters")
    )]
    pub password: Option<String>,
    #[validate(length(max = 10, message = "Phone number cannot exceed 10 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 255, message = "Address cannot exceed 255 characters"))]
    pub address: Option<String>,
    /// Only honoured for administrators; self-registration is always `Member`
    pub role: Option<Role>,
}

/// Validated registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub email: String,
    /// Plain text until hashed by the members service
    pub password: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub role: Role,
}

impl Schema for CreateMemberRequest {
    type Valid = NewMember;

    fn into_valid(self) -> Result<NewMember, AppError> {
        Ok(NewMember {
            name: required(self.name, "name")?.trim().to_string(),
            email: required(self.email, "email")?.trim().to_lowercase(),
            password: required(self.password, "password")?,
            phone: self.phone,
            address: self.address,
            role: self.role.unwrap_or(Role::Member),
        })
    }
}

/// Update member request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberRequest {
    #[serde(rename = "memberID")]
    #[validate(required(message = "Member ID is required"))]
    pub member_id: Option<i32>,
    #[validate(
        required(message = "Name is required"),
        custom(function = "not_blank"),
        length(max = 100, message = "Name cannot exceed 100 characters")
    )]
    pub name: Option<String>,
    #[validate(
        required(message = "Email is required"),
        custom(function = "not_blank"),
        email(message = "Invalid email address"),
        length(max = 255, message = "Email cannot exceed 255 characters")
    )]
    pub email: Option<String>,
    #[validate(length(max = 20, message = "Phone number cannot exceed 20 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 255, message = "Address cannot exceed 255 characters"))]
    pub address: Option<String>,
    #[validate(length(max = 20, message = "Membership status cannot exceed 20 characters"))]
    pub membership_status: Option<String>,
}

/// Validated member changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberChanges {
    pub member_id: i32,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// `None` keeps the current status
    pub membership_status: Option<String>,
}

impl Schema for UpdateMemberRequest {
    type Valid = MemberChanges;

    fn into_valid(self) -> Result<MemberChanges, AppError> {
        Ok(MemberChanges {
            member_id: required(self.member_id, "member_id")?,
            name: required(self.name, "name")?.trim().to_string(),
            email: required(self.email, "email")?.trim().to_lowercase(),
            phone: self.phone,
            address: self.address,
            membership_status: self.membership_status,
        })
    }
}

/// Membership status change (staff only)
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMemberStatusRequest {
    #[validate(
        required(message = "Membership status is required"),
        custom(function = "not_blank"),
        length(max = 20, message = "Membership status cannot exceed 20 characters")
    )]
    pub membership_status: Option<String>,
}

impl Schema for UpdateMemberStatusRequest {
    type Valid = String;

    fn into_valid(self) -> Result<String, AppError> {
        Ok(required(self.membership_status, "membership_status")?.trim().to_string())
    }
}

/// Payload of `member:status-changed`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberStatusChanged {
    #[serde(rename = "memberID")]
    pub member_id: i32,
    pub previous_status: String,
    pub membership_status: String,
}

/// JWT claims for authenticated members
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberClaims {
    pub sub: String,
    pub member_id: i32,
    pub name: String,
    pub roles: Vec<Role>,
    pub exp: i64,
    pub iat: i64,
}

impl MemberClaims {
    /// Create a new JWT token
    pub fn create_token(&self, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{encode, EncodingKey, Header};
        encode(
            &Header::default(),
            self,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
    }

    /// Parse JWT token
    pub fn from_token(token: &str, secret: &str) -> Result<Self, jsonwebtoken::errors::Error> {
        use jsonwebtoken::{decode, DecodingKey, Validation};
        let token_data = decode::<Self>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::default(),
        )?;
        Ok(token_data.claims)
    }

    pub fn identity(&self) -> Identity {
        Identity {
            id: self.member_id,
            roles: self.roles.clone(),
        }
    }

    /// Require at least one of `roles`
    pub fn require_roles(&self, roles: &[Role]) -> Result<(), AppError> {
        check_access(Some(&self.identity()), Some(roles)).map_err(AppError::from)
    }

    pub fn is_staff(&self) -> bool {
        self.roles.iter().any(|r| STAFF_ROLES.contains(r))
    }

    pub fn require_staff(&self) -> Result<(), AppError> {
        self.require_roles(STAFF_ROLES)
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        self.require_roles(&[Role::Admin])
    }

    /// Members may read their own records; staff may read anyone's
    pub fn require_self_or_staff(&self, member_id: i32) -> Result<(), AppError> {
        if self.member_id == member_id {
            return Ok(());
        }
        self.require_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validate;

    fn registration() -> CreateMemberRequest {
        CreateMemberRequest {
            name: Some("Ada Lovelace".to_string()),
            email: Some("Ada@Example.org".to_string()),
            password: Some("analytical".to_string()),
            phone: Some("0123456789".to_string()),
            address: None,
            role: None,
        }
    }

    fn rejected<S: Schema + std::fmt::Debug>(raw: S) -> crate::validation::FieldErrors
    where
        S::Valid: std::fmt::Debug,
    {
        match validate(raw) {
            Err(AppError::Validation(errors)) => errors,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_registration() {
        let member = validate(registration()).unwrap();
        assert_eq!(member.email, "ada@example.org");
        assert_eq!(member.role, Role::Member);
    }

    #[test]
    fn test_password_length_boundary() {
        let mut request = registration();
        request.password = Some("1234567".to_string());
        assert!(rejected(request).has("password", "length"));

        let mut request = registration();
        request.password = Some("12345678".to_string());
        assert!(validate(request).is_ok());
    }

    #[test]
    fn test_email_shape() {
        let mut request = registration();
        request.email = Some("not-an-address".to_string());
        assert!(rejected(request).has("email", "email"));
    }

    #[test]
    fn test_missing_fields_are_required_not_invalid() {
        let errors = rejected(CreateMemberRequest::default());
        assert!(errors.has("name", "required"));
        assert!(errors.has("email", "required"));
        assert!(errors.has("password", "required"));
        assert!(!errors.has("email", "email"));
    }

    #[test]
    fn test_phone_limits_differ_between_forms() {
        let mut request = registration();
        request.phone = Some("+33 6 12 34 56".to_string());
        assert!(rejected(request).has("phone", "length"));

        let update = UpdateMemberRequest {
            member_id: Some(1),
            name: Some("Ada".to_string()),
            email: Some("ada@example.org".to_string()),
            phone: Some("+33 6 12 34 56".to_string()),
            ..Default::default()
        };
        assert!(validate(update).is_ok());
    }

    #[test]
    fn test_update_requires_member_id() {
        let update = UpdateMemberRequest {
            name: Some("Ada".to_string()),
            email: Some("ada@example.org".to_string()),
            ..Default::default()
        };
        assert!(rejected(update).has("memberID", "required"));
    }

    #[test]
    fn test_json_names_and_password_hidden() {
        let member = Member {
            member_id: 4,
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
            password: "$argon2id$...".to_string(),
            phone: None,
            address: None,
            membership_status: "Active".to_string(),
            role: Role::Librarian,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["memberID"], 4);
        assert_eq!(json["membershipStatus"], "Active");
        assert_eq!(json["role"], "Librarian");
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_claims_role_checks() {
        let claims = MemberClaims {
            sub: "ada@example.org".to_string(),
            member_id: 4,
            name: "Ada".to_string(),
            roles: vec![Role::Member],
            exp: 0,
            iat: 0,
        };
        assert!(!claims.is_staff());
        assert!(claims.require_self_or_staff(4).is_ok());
        assert!(matches!(claims.require_self_or_staff(5), Err(AppError::Authorization(_))));
        assert!(matches!(claims.require_admin(), Err(AppError::Authorization(_))));
    }

    #[test]
    fn test_token_round_trip() {
        let claims = MemberClaims {
            sub: "ada@example.org".to_string(),
            member_id: 4,
            name: "Ada".to_string(),
            roles: vec![Role::Admin],
            exp: Utc::now().timestamp() + 3600,
            iat: Utc::now().timestamp(),
        };
        let token = claims.create_token("secret").unwrap();
        let decoded = MemberClaims::from_token(&token, "secret").unwrap();
        assert_eq!(decoded.member_id, 4);
        assert_eq!(decoded.roles, vec![Role::Admin]);
        assert!(MemberClaims::from_token(&token, "other").is_err());
    }
}
