//! Fine model and related types

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::{
    error::AppResult,
    validation::{calendar_date, checked_date, fine_amount, not_blank, required, Schema},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum FineStatus {
    Unpaid,
    Paid,
}

impl FineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FineStatus::Unpaid => "Unpaid",
            FineStatus::Paid => "Paid",
        }
    }
}

/// Fine record from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Fine {
    #[serde(rename = "fineID")]
    pub fine_id: i32,
    #[serde(rename = "memberID")]
    pub member_id: i32,
    /// Decimal amount, serialized as a string ("12.50")
    #[schema(value_type = String, example = "12.50")]
    pub amount: Decimal,
    pub status: String,
    pub transaction_date: NaiveDate,
}

impl Fine {
    pub fn is_paid(&self) -> bool {
        self.status == FineStatus::Paid.as_str()
    }
}

#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct FineQuery {
    #[serde(rename = "memberID")]
    pub member_id: Option<i32>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create fine request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFineRequest {
    #[serde(rename = "memberID")]
    #[validate(required(message = "Member ID is required"))]
    pub member_id: Option<i32>,
    /// Between 0 and 300 inclusive
    #[validate(required(message = "Amount is required"), custom(function = "fine_amount"))]
    #[schema(value_type = Option<String>, example = "12.50")]
    pub amount: Option<Decimal>,
    /// Defaults to `Unpaid`
    #[validate(length(max = 20, message = "Status cannot exceed 20 characters"))]
    pub status: Option<String>,
    /// YYYY-MM-DD, defaults to today
    #[validate(custom(function = "calendar_date"))]
    pub transaction_date: Option<String>,
}

/// Validated fine fields. A missing transaction date is filled in by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFine {
    pub member_id: i32,
    pub amount: Decimal,
    pub status: String,
    pub transaction_date: Option<NaiveDate>,
}

impl Schema for CreateFineRequest {
    type Valid = NewFine;

    fn into_valid(self) -> AppResult<NewFine> {
        let transaction_date = match self.transaction_date {
            Some(date) => Some(checked_date(&date, "transaction_date")?),
            None => None,
        };
        let status = self
            .status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| FineStatus::Unpaid.as_str().to_string());

        Ok(NewFine {
            member_id: required(self.member_id, "member_id")?,
            amount: required(self.amount, "amount")?,
            status,
            transaction_date,
        })
    }
}

/// Update fine request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateFineRequest {
    #[serde(rename = "fineID")]
    #[validate(required(message = "Fine ID is required"))]
    pub fine_id: Option<i32>,
    #[serde(rename = "memberID")]
    #[validate(required(message = "Member ID is required"))]
    pub member_id: Option<i32>,
    #[validate(required(message = "Amount is required"), custom(function = "fine_amount"))]
    #[schema(value_type = Option<String>, example = "12.50")]
    pub amount: Option<Decimal>,
    #[validate(
        required(message = "Status is required"),
        custom(function = "not_blank"),
        length(max = 20, message = "Status cannot exceed 20 characters")
    )]
    pub status: Option<String>,
    #[validate(required(message = "Transaction date is required"), custom(function = "calendar_date"))]
    pub transaction_date: Option<String>,
}

/// Validated fine update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineChanges {
    pub fine_id: i32,
    pub member_id: i32,
    pub amount: Decimal,
    pub status: String,
    pub transaction_date: NaiveDate,
}

impl Schema for UpdateFineRequest {
    type Valid = FineChanges;

    fn into_valid(self) -> AppResult<FineChanges> {
        Ok(FineChanges {
            fine_id: required(self.fine_id, "fine_id")?,
            member_id: required(self.member_id, "member_id")?,
            amount: required(self.amount, "amount")?,
            status: required(self.status, "status")?.trim().to_string(),
            transaction_date: checked_date(
                &required(self.transaction_date, "transaction_date")?,
                "transaction_date",
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, validation::validate};

    fn fine(amount: Decimal) -> CreateFineRequest {
        CreateFineRequest {
            member_id: Some(7),
            amount: Some(amount),
            status: None,
            transaction_date: Some("2024-06-01".to_string()),
        }
    }

    #[test]
    fn test_amount_bounds_are_inclusive() {
        assert!(validate(fine(Decimal::ZERO)).is_ok());
        assert!(validate(fine(Decimal::from(300))).is_ok());
        assert!(validate(fine(Decimal::new(1250, 2))).is_ok());
    }

    #[test]
    fn test_amount_out_of_range() {
        for amount in [Decimal::new(-1, 0), Decimal::new(30001, 2)] {
            match validate(fine(amount)) {
                Err(AppError::Validation(errors)) => {
                    assert!(errors.has("amount", "range"));
                    let message = &errors.iter().next().unwrap().message;
                    assert_eq!(message, "Amount must be between 0 and 300");
                }
                other => panic!("unexpected {:?}", other),
            }
        }
    }

    #[test]
    fn test_defaults() {
        let mut raw = fine(Decimal::new(5, 0));
        raw.transaction_date = None;
        let valid = validate(raw).unwrap();
        assert_eq!(valid.status, "Unpaid");
        assert_eq!(valid.transaction_date, None);
    }

    #[test]
    fn test_amount_from_json_number_or_string() {
        let raw: CreateFineRequest =
            serde_json::from_str(r#"{"memberID": 1, "amount": 12.5}"#).unwrap();
        assert_eq!(validate(raw).unwrap().amount, Decimal::new(125, 1));

        let raw: CreateFineRequest =
            serde_json::from_str(r#"{"memberID": 1, "amount": "300.00"}"#).unwrap();
        assert!(validate(raw).is_ok());
    }

    #[test]
    fn test_update_requires_all_fields() {
        match validate(UpdateFineRequest::default()) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.has("fineID", "required"));
                assert!(errors.has("amount", "required"));
                assert!(errors.has("transactionDate", "required"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
