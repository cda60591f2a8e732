//! Book (catalog entry) model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationErrors};

use super::availability::AvailabilityBadge;
use crate::{
    error::AppResult,
    validation::{not_blank, required, rule, Schema},
};

/// Book record from database
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Book {
    #[serde(rename = "bookID")]
    pub book_id: i32,
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub copies_available: i32,
    pub total_copies: i32,
}

/// Book with its derived availability badge
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BookDetails {
    #[serde(flatten)]
    pub book: Book,
    pub availability: AvailabilityBadge,
}

impl From<Book> for BookDetails {
    fn from(book: Book) -> Self {
        let availability = AvailabilityBadge::new(book.copies_available, Some(book.total_copies));
        Self { book, availability }
    }
}

/// Book list query parameters
#[derive(Debug, Default, Deserialize, IntoParams, ToSchema)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct BookQuery {
    /// Matches title, author or ISBN
    pub search: Option<String>,
    pub genre: Option<String>,
    /// Only books with at least one copy on the shelf
    pub available: Option<bool>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Create book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    #[validate(
        required(message = "Title is required"),
        custom(function = "not_blank"),
        length(max = 200, message = "Title cannot exceed 200 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Author is required"),
        custom(function = "not_blank"),
        length(max = 100, message = "Author cannot exceed 100 characters")
    )]
    pub author: Option<String>,
    #[validate(length(max = 20, message = "ISBN cannot exceed 20 characters"))]
    pub isbn: Option<String>,
    #[validate(length(max = 100, message = "Publisher cannot exceed 100 characters"))]
    pub publisher: Option<String>,
    #[validate(range(min = 1000, max = 2100, message = "Publication year must be between 1000 and 2100"))]
    pub publication_year: Option<i32>,
    #[validate(length(max = 50, message = "Genre cannot exceed 50 characters"))]
    pub genre: Option<String>,
    #[validate(
        required(message = "Copies available is required"),
        range(min = 0, message = "Copies available cannot be negative")
    )]
    pub copies_available: Option<i32>,
    #[validate(
        required(message = "Total copies is required"),
        range(min = 0, message = "Total copies cannot be negative")
    )]
    pub total_copies: Option<i32>,
}

/// Validated book fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub isbn: Option<String>,
    pub publisher: Option<String>,
    pub publication_year: Option<i32>,
    pub genre: Option<String>,
    pub copies_available: i32,
    pub total_copies: i32,
}

fn check_copies(errors: &mut ValidationErrors, copies: Option<i32>, total: Option<i32>) {
    if let (Some(copies), Some(total)) = (copies, total) {
        if copies > total {
            errors.add(
                "copies_available",
                rule("copies", "Copies available cannot exceed total copies"),
            );
        }
    }
}

impl Schema for CreateBookRequest {
    type Valid = NewBook;

    fn check_cross_field(&self, errors: &mut ValidationErrors) {
        check_copies(errors, self.copies_available, self.total_copies);
    }

    fn into_valid(self) -> AppResult<NewBook> {
        Ok(NewBook {
            title: required(self.title, "title")?.trim().to_string(),
            author: required(self.author, "author")?.trim().to_string(),
            isbn: self.isbn,
            publisher: self.publisher,
            publication_year: self.publication_year,
            genre: self.genre,
            copies_available: required(self.copies_available, "copies_available")?,
            total_copies: required(self.total_copies, "total_copies")?,
        })
    }
}

/// Update book request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[serde(rename = "bookID")]
    #[validate(required(message = "Book ID is required"))]
    pub book_id: Option<i32>,
    #[validate(
        required(message = "Title is required"),
        custom(function = "not_blank"),
        length(max = 200, message = "Title cannot exceed 200 characters")
    )]
    pub title: Option<String>,
    #[validate(
        required(message = "Author is required"),
        custom(function = "not_blank"),
        length(max = 100, message = "Author cannot exceed 100 characters")
    )]
    pub author: Option<String>,
    #[validate(length(max = 20, message = "ISBN cannot exceed 20 characters"))]
    pub isbn: Option<String>,
    #[validate(length(max = 100, message = "Publisher cannot exceed 100 characters"))]
    pub publisher: Option<String>,
    #[validate(range(min = 1000, max = 2100, message = "Publication year must be between 1000 and 2100"))]
    pub publication_year: Option<i32>,
    #[validate(length(max = 50, message = "Genre cannot exceed 50 characters"))]
    pub genre: Option<String>,
    #[validate(
        required(message = "Copies available is required"),
        range(min = 0, message = "Copies available cannot be negative")
    )]
    pub copies_available: Option<i32>,
    #[validate(
        required(message = "Total copies is required"),
        range(min = 0, message = "Total copies cannot be negative")
    )]
    pub total_copies: Option<i32>,
}

impl Schema for UpdateBookRequest {
    /// (book ID, new field values)
    type Valid = (i32, NewBook);

    fn check_cross_field(&self, errors: &mut ValidationErrors) {
        check_copies(errors, self.copies_available, self.total_copies);
    }

    fn into_valid(self) -> AppResult<(i32, NewBook)> {
        let book_id = required(self.book_id, "book_id")?;
        let book = NewBook {
            title: required(self.title, "title")?.trim().to_string(),
            author: required(self.author, "author")?.trim().to_string(),
            isbn: self.isbn,
            publisher: self.publisher,
            publication_year: self.publication_year,
            genre: self.genre,
            copies_available: required(self.copies_available, "copies_available")?,
            total_copies: required(self.total_copies, "total_copies")?,
        };
        Ok((book_id, book))
    }
}
