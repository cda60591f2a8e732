//! Request validation contract
//!
//! Request DTOs declare their field rules with `validator` attributes. The
//! [`Schema`] trait adds cross-field rules and the conversion into a
//! validated record, so that [`validate`] is a single pure step from raw
//! input to either a usable record or a structured list of field errors.

use std::{borrow::Cow, fmt};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::{AppError, AppResult};

/// Wire format of calendar dates
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub const FINE_AMOUNT_MIN: i64 = 0;
pub const FINE_AMOUNT_MAX: i64 = 300;

/// One violated rule on one field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    /// JSON name of the offending field
    pub field: String,
    /// Rule identifier (`required`, `length`, `range`, `email`, `date`, ...)
    pub rule: String,
    pub message: String,
}

/// Ordered list of field errors for one rejected request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn single(field: &str, rule: &str, message: impl Into<String>) -> Self {
        Self(vec![FieldError {
            field: json_field_name(field),
            rule: rule.to_string(),
            message: message.into(),
        }])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Whether `field` (JSON name) was rejected for `rule`
    pub fn has(&self, field: &str, rule: &str) -> bool {
        self.0.iter().any(|e| e.field == field && e.rule == rule)
    }

    pub fn into_inner(self) -> Vec<FieldError> {
        self.0
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fields: Vec<&str> = self.0.iter().map(|e| e.field.as_str()).collect();
        write!(f, "Invalid request: {}", fields.join(", "))
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut list = Vec::new();
        for (field, violations) in errors.field_errors() {
            let name = json_field_name(&field);
            for violation in violations.iter() {
                list.push(FieldError {
                    field: name.clone(),
                    rule: violation.code.to_string(),
                    message: violation
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("{} is invalid", name)),
                });
            }
        }
        // HashMap iteration order is not stable
        list.sort_by(|a, b| a.field.cmp(&b.field).then_with(|| a.rule.cmp(&b.rule)));
        Self(list)
    }
}

/// A request shape that can be checked and turned into a validated record
pub trait Schema: Validate {
    type Valid;

    /// Rules spanning several fields, run after the per-field rules
    fn check_cross_field(&self, _errors: &mut ValidationErrors) {}

    /// Convert into the validated record. Only called once every rule passed.
    fn into_valid(self) -> AppResult<Self::Valid>;
}

/// Check `raw` against its schema, rejecting it as a whole on any violation
pub fn validate<S: Schema>(raw: S) -> AppResult<S::Valid> {
    let mut errors = match raw.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => errors,
    };
    raw.check_cross_field(&mut errors);

    if !errors.is_empty() {
        return Err(AppError::Validation(errors.into()));
    }
    raw.into_valid()
}

/// Convert a Rust field name to the name the client sends (`member_id` -> `memberID`)
pub fn json_field_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    for (i, part) in field.split('_').enumerate() {
        if i == 0 {
            out.push_str(part);
        } else if part == "id" {
            out.push_str("ID");
        } else {
            let mut chars = part.chars();
            if let Some(first) = chars.next() {
                out.extend(first.to_uppercase());
                out.push_str(chars.as_str());
            }
        }
    }
    out
}

/// Unwrap a field the schema already declared as required
pub fn required<T>(value: Option<T>, field: &str) -> AppResult<T> {
    value.ok_or_else(|| {
        let name = json_field_name(field);
        AppError::Validation(FieldErrors::single(field, "required", format!("{} is required", name)))
    })
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).ok()
}

/// Parse a date the schema already checked with [`calendar_date`]
pub fn checked_date(value: &str, field: &str) -> AppResult<NaiveDate> {
    parse_date(value).ok_or_else(|| {
        AppError::Validation(FieldErrors::single(field, "date", "must be a calendar date (YYYY-MM-DD)"))
    })
}

pub(crate) fn rule(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(message.into());
    error
}

/// Present but empty strings count as missing
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(rule("required", "must not be blank"));
    }
    Ok(())
}

pub fn calendar_date(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(rule("date", "must be a calendar date (YYYY-MM-DD)")),
    }
}

pub fn fine_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::from(FINE_AMOUNT_MIN) || *value > Decimal::from(FINE_AMOUNT_MAX) {
        return Err(rule(
            "range",
            format!("Amount must be between {} and {}", FINE_AMOUNT_MIN, FINE_AMOUNT_MAX),
        ));
    }
    Ok(())
}

/// Record a `date_order` violation when `end` falls before `start`.
/// Unparseable dates are left to the per-field `date` rule.
pub fn check_date_order(
    errors: &mut ValidationErrors,
    field: &'static str,
    start: Option<&str>,
    end: Option<&str>,
    message: &'static str,
) {
    let (Some(start), Some(end)) = (start.and_then(parse_date), end.and_then(parse_date)) else {
        return;
    };
    if end < start {
        errors.add(field, rule("date_order", message));
    }
}
