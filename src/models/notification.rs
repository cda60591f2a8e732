//! Member notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    validation::{not_blank, required, Schema},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "notificationID")]
    pub notification_id: i32,
    #[serde(rename = "memberID")]
    pub member_id: i32,
    pub message: String,
    pub date_sent: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct NotificationQuery {
    #[serde(rename = "memberID")]
    pub member_id: Option<i32>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    #[serde(rename = "memberID")]
    #[validate(required(message = "Member ID is required"))]
    pub member_id: Option<i32>,
    #[validate(
        required(message = "Message is required"),
        custom(function = "not_blank"),
        length(max = 500, message = "Message cannot exceed 500 characters")
    )]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNotification {
    pub member_id: i32,
    pub message: String,
}

impl Schema for CreateNotificationRequest {
    type Valid = NewNotification;

    fn into_valid(self) -> AppResult<NewNotification> {
        Ok(NewNotification {
            member_id: required(self.member_id, "member_id")?,
            message: required(self.message, "message")?.trim().to_string(),
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateNotificationRequest {
    #[serde(rename = "notificationID")]
    #[validate(required(message = "Notification ID is required"))]
    pub notification_id: Option<i32>,
    #[serde(rename = "memberID")]
    #[validate(required(message = "Member ID is required"))]
    pub member_id: Option<i32>,
    #[validate(
        required(message = "Message is required"),
        custom(function = "not_blank"),
        length(max = 500, message = "Message cannot exceed 500 characters")
    )]
    pub message: Option<String>,
}

impl Schema for UpdateNotificationRequest {
    /// (notification ID, new field values)
    type Valid = (i32, NewNotification);

    fn into_valid(self) -> AppResult<(i32, NewNotification)> {
        let notification_id = required(self.notification_id, "notification_id")?;
        let notification = NewNotification {
            member_id: required(self.member_id, "member_id")?,
            message: required(self.message, "message")?.trim().to_string(),
        };
        Ok((notification_id, notification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, validation::validate};

    #[test]
    fn test_message_length_limit() {
        let ok = CreateNotificationRequest {
            member_id: Some(1),
            message: Some("x".repeat(500)),
        };
        assert!(validate(ok).is_ok());

        let too_long = CreateNotificationRequest {
            member_id: Some(1),
            message: Some("x".repeat(501)),
        };
        match validate(too_long) {
            Err(AppError::Validation(errors)) => assert!(errors.has("message", "length")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_blank_message_is_required() {
        let raw = UpdateNotificationRequest {
            notification_id: Some(3),
            member_id: Some(1),
            message: Some("   ".to_string()),
        };
        match validate(raw) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.has("message", "required"));
                assert_eq!(errors.len(), 1);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
