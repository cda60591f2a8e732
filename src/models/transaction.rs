//! Borrowing transaction model and related types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

use crate::{
    error::AppResult,
    validation::{calendar_date, check_date_order, checked_date, not_blank, required, Schema},
};

const DATE_ORDER_MESSAGE: &str = "Return date cannot be before borrow date";

/// Transaction status values set by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum TransactionStatus {
    Borrowed,
    Returned,
    Overdue,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Borrowed => "Borrowed",
            TransactionStatus::Returned => "Returned",
            TransactionStatus::Overdue => "Overdue",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Borrowing transaction from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BorrowingTransaction {
    #[serde(rename = "transactionID")]
    pub transaction_id: i32,
    #[serde(rename = "bookID")]
    pub book_id: i32,
    #[serde(rename = "memberID")]
    pub member_id: i32,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: String,
}

impl BorrowingTransaction {
    pub fn is_returned(&self) -> bool {
        self.status == TransactionStatus::Returned.as_str()
    }
}

/// Transaction list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    #[serde(rename = "memberID")]
    pub member_id: Option<i32>,
    #[serde(rename = "bookID")]
    pub book_id: Option<i32>,
    pub status: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create transaction (borrow) request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    #[serde(rename = "bookID")]
    #[validate(required(message = "Book ID is required"))]
    pub book_id: Option<i32>,
    #[serde(rename = "memberID")]
    #[validate(required(message = "Member ID is required"))]
    pub member_id: Option<i32>,
    /// YYYY-MM-DD
    #[validate(required(message = "Borrow date is required"), custom(function = "calendar_date"))]
    pub borrow_date: Option<String>,
    /// YYYY-MM-DD, expected return date
    #[validate(custom(function = "calendar_date"))]
    pub return_date: Option<String>,
    /// Defaults to `Borrowed`
    #[validate(length(max = 20, message = "Status cannot exceed 20 characters"))]
    pub status: Option<String>,
}

/// Validated transaction fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub book_id: i32,
    pub member_id: i32,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: String,
}

impl Schema for CreateTransactionRequest {
    type Valid = NewTransaction;

    fn check_cross_field(&self, errors: &mut ValidationErrors) {
        check_date_order(
            errors,
            "return_date",
            self.borrow_date.as_deref(),
            self.return_date.as_deref(),
            DATE_ORDER_MESSAGE,
        );
    }

    fn into_valid(self) -> AppResult<NewTransaction> {
        let borrow_date = checked_date(&required(self.borrow_date, "borrow_date")?, "borrow_date")?;
        let return_date = match self.return_date {
            Some(date) => Some(checked_date(&date, "return_date")?),
            None => None,
        };
        let status = self
            .status
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| TransactionStatus::Borrowed.as_str().to_string());

        Ok(NewTransaction {
            book_id: required(self.book_id, "book_id")?,
            member_id: required(self.member_id, "member_id")?,
            borrow_date,
            return_date,
            status,
        })
    }
}

/// Update transaction request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionRequest {
    #[serde(rename = "transactionID")]
    #[validate(required(message = "Transaction ID is required"))]
    pub transaction_id: Option<i32>,
    #[serde(rename = "bookID")]
    #[validate(required(message = "Book ID is required"))]
    pub book_id: Option<i32>,
    #[serde(rename = "memberID")]
    #[validate(required(message = "Member ID is required"))]
    pub member_id: Option<i32>,
    #[validate(required(message = "Borrow date is required"), custom(function = "calendar_date"))]
    pub borrow_date: Option<String>,
    #[validate(custom(function = "calendar_date"))]
    pub return_date: Option<String>,
    #[validate(
        required(message = "Status is required"),
        custom(function = "not_blank"),
        length(max = 20, message = "Status cannot exceed 20 characters")
    )]
    pub status: Option<String>,
}

impl Schema for UpdateTransactionRequest {
    /// (transaction ID, new field values)
    type Valid = (i32, NewTransaction);

    fn check_cross_field(&self, errors: &mut ValidationErrors) {
        check_date_order(
            errors,
            "return_date",
            self.borrow_date.as_deref(),
            self.return_date.as_deref(),
            DATE_ORDER_MESSAGE,
        );
    }

    fn into_valid(self) -> AppResult<(i32, NewTransaction)> {
        let transaction_id = required(self.transaction_id, "transaction_id")?;
        let return_date = match self.return_date {
            Some(date) => Some(checked_date(&date, "return_date")?),
            None => None,
        };
        let transaction = NewTransaction {
            book_id: required(self.book_id, "book_id")?,
            member_id: required(self.member_id, "member_id")?,
            borrow_date: checked_date(&required(self.borrow_date, "borrow_date")?, "borrow_date")?,
            return_date,
            status: required(self.status, "status")?.trim().to_string(),
        };
        Ok((transaction_id, transaction))
    }
}

/// Optional body of the return endpoint
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReturnTransactionRequest {
    /// YYYY-MM-DD, defaults to today
    #[validate(custom(function = "calendar_date"))]
    pub return_date: Option<String>,
}

impl Schema for ReturnTransactionRequest {
    type Valid = Option<NaiveDate>;

    fn into_valid(self) -> AppResult<Option<NaiveDate>> {
        match self.return_date {
            Some(date) => Ok(Some(checked_date(&date, "return_date")?)),
            None => Ok(None),
        }
    }
}

/// Payload of `book:borrowed` and `book:returned`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CirculationEvent {
    #[serde(rename = "transactionID")]
    pub transaction_id: i32,
    #[serde(rename = "bookID")]
    pub book_id: i32,
    #[serde(rename = "memberID")]
    pub member_id: i32,
    pub title: String,
    /// Shelf stock after the movement
    pub copies_available: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, validation::validate};

    fn borrow(borrow_date: &str, return_date: Option<&str>) -> CreateTransactionRequest {
        CreateTransactionRequest {
            book_id: Some(2),
            member_id: Some(9),
            borrow_date: Some(borrow_date.to_string()),
            return_date: return_date.map(str::to_string),
            status: None,
        }
    }

    #[test]
    fn test_defaults_status_to_borrowed() {
        let tx = validate(borrow("2024-05-01", Some("2024-05-15"))).unwrap();
        assert_eq!(tx.status, "Borrowed");
        assert_eq!(tx.return_date, NaiveDate::from_ymd_opt(2024, 5, 15));
    }

    #[test]
    fn test_return_before_borrow_rejected() {
        match validate(borrow("2024-05-10", Some("2024-05-01"))) {
            Err(AppError::Validation(errors)) => assert!(errors.has("returnDate", "date_order")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_same_day_return_accepted() {
        assert!(validate(borrow("2024-05-10", Some("2024-05-10"))).is_ok());
    }

    #[test]
    fn test_malformed_date_and_long_status() {
        let mut raw = borrow("10/05/2024", None);
        raw.status = Some("Borrowed-but-very-late".to_string());
        match validate(raw) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.has("borrowDate", "date"));
                assert!(errors.has("status", "length"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_update_requires_status_and_id() {
        let raw = UpdateTransactionRequest {
            book_id: Some(2),
            member_id: Some(9),
            borrow_date: Some("2024-05-01".to_string()),
            ..Default::default()
        };
        match validate(raw) {
            Err(AppError::Validation(errors)) => {
                assert!(errors.has("transactionID", "required"));
                assert!(errors.has("status", "required"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_json_shape() {
        let tx = BorrowingTransaction {
            transaction_id: 1,
            book_id: 2,
            member_id: 3,
            borrow_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            return_date: None,
            status: "Borrowed".to_string(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["transactionID"], 1);
        assert_eq!(json["borrowDate"], "2024-05-01");
        assert!(json["returnDate"].is_null());
    }
}
