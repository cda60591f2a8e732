//! Catalog service

use std::sync::Arc;

use crate::{
    error::AppResult,
    models::book::{BookDetails, BookQuery, NewBook},
    repository::BookRepository,
};

#[derive(Clone)]
pub struct BooksService {
    books: Arc<dyn BookRepository>,
}

impl BooksService {
    pub fn new(books: Arc<dyn BookRepository>) -> Self {
        Self { books }
    }

    pub async fn search(&self, query: &BookQuery) -> AppResult<(Vec<BookDetails>, i64)> {
        let (books, total) = self.books.search(query).await?;
        Ok((books.into_iter().map(BookDetails::from).collect(), total))
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<BookDetails> {
        self.books.get_by_id(id).await.map(BookDetails::from)
    }

    pub async fn create(&self, book: NewBook) -> AppResult<BookDetails> {
        let created = self.books.create(&book).await?;
        tracing::info!(book_id = created.book_id, title = %created.title, "Book added to catalog");
        Ok(created.into())
    }

    pub async fn update(&self, id: i32, book: NewBook) -> AppResult<BookDetails> {
        self.books.update(id, &book).await.map(BookDetails::from)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.books.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{availability::Availability, book::Book},
        repository::books::MockBookRepository,
    };

    fn book(id: i32, copies: i32, total: i32) -> Book {
        Book {
            book_id: id,
            title: "The Left Hand of Darkness".to_string(),
            author: "Ursula K. Le Guin".to_string(),
            isbn: None,
            publisher: None,
            publication_year: Some(1969),
            genre: Some("Science fiction".to_string()),
            copies_available: copies,
            total_copies: total,
        }
    }

    #[tokio::test]
    async fn test_search_attaches_badges() {
        let mut repo = MockBookRepository::new();
        repo.expect_search()
            .returning(|_| Ok((vec![book(1, 0, 3), book(2, 1, 10), book(3, 4, 4)], 3)));

        let service = BooksService::new(Arc::new(repo));
        let (books, total) = service.search(&BookQuery::default()).await.unwrap();

        assert_eq!(total, 3);
        let states: Vec<Availability> = books.iter().map(|b| b.availability.state).collect();
        assert_eq!(
            states,
            vec![Availability::Unavailable, Availability::Limited, Availability::Available]
        );
    }

    #[tokio::test]
    async fn test_get_missing_book() {
        let mut repo = MockBookRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Err(AppError::NotFound(format!("Book with id {} not found", id))));

        let service = BooksService::new(Arc::new(repo));
        assert!(matches!(service.get_by_id(9).await, Err(AppError::NotFound(_))));
    }
}
