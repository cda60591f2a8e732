//! Circulation service: borrowing and returning books

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use crate::{
    error::{AppError, AppResult},
    mediator::{EventKind, EventMediator},
    models::{
        book::Book,
        transaction::{
            BorrowingTransaction, CirculationEvent, NewTransaction, TransactionQuery, TransactionStatus,
        },
    },
    repository::{BookRepository, MemberRepository, TransactionRepository},
    validation::FieldErrors,
};

#[derive(Clone)]
pub struct TransactionsService {
    transactions: Arc<dyn TransactionRepository>,
    books: Arc<dyn BookRepository>,
    members: Arc<dyn MemberRepository>,
    mediator: EventMediator,
}

impl TransactionsService {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        books: Arc<dyn BookRepository>,
        members: Arc<dyn MemberRepository>,
        mediator: EventMediator,
    ) -> Self {
        Self {
            transactions,
            books,
            members,
            mediator,
        }
    }

    pub async fn search(&self, query: &TransactionQuery) -> AppResult<(Vec<BorrowingTransaction>, i64)> {
        self.transactions.search(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<BorrowingTransaction> {
        self.transactions.get_by_id(id).await
    }

    /// Borrow a book: take a copy off the shelf and record the transaction.
    /// Publishes `book:borrowed`.
    pub async fn borrow(&self, transaction: NewTransaction) -> AppResult<BorrowingTransaction> {
        if transaction.status != TransactionStatus::Borrowed.as_str() {
            return Err(AppError::BusinessRule(format!(
                "A new transaction must be {}",
                TransactionStatus::Borrowed
            )));
        }

        // Both lookups fail with NotFound
        self.members.get_by_id(transaction.member_id).await?;
        self.books.get_by_id(transaction.book_id).await?;

        let book = self
            .books
            .take_copy(transaction.book_id)
            .await?
            .ok_or_else(|| AppError::BusinessRule("Book is not available".to_string()))?;

        let created = match self.transactions.create(&transaction).await {
            Ok(created) => created,
            Err(e) => {
                // Put the copy back so stock stays consistent
                if let Err(restore) = self.books.return_copy(book.book_id).await {
                    tracing::error!(book_id = book.book_id, "Failed to restore copy: {}", restore);
                }
                return Err(e);
            }
        };

        tracing::info!(
            transaction_id = created.transaction_id,
            book_id = book.book_id,
            member_id = created.member_id,
            "Book borrowed"
        );
        self.mediator
            .publish(EventKind::BookBorrowed, &circulation_event(&created, &book));
        Ok(created)
    }

    /// Return a borrowed book. `return_date` defaults to today.
    /// Publishes `book:returned`.
    pub async fn return_book(&self, id: i32, return_date: Option<NaiveDate>) -> AppResult<BorrowingTransaction> {
        let current = self.transactions.get_by_id(id).await?;
        if current.is_returned() {
            return Err(AppError::Conflict("Transaction already returned".to_string()));
        }

        let return_date = return_date.unwrap_or_else(|| Utc::now().date_naive());
        if return_date < current.borrow_date {
            return Err(AppError::Validation(FieldErrors::single(
                "return_date",
                "date_order",
                "Return date cannot be before borrow date",
            )));
        }

        let returned = self
            .transactions
            .mark_returned(id, return_date)
            .await?
            .ok_or_else(|| AppError::Conflict("Transaction already returned".to_string()))?;
        let book = self.books.return_copy(returned.book_id).await?;

        tracing::info!(transaction_id = id, book_id = book.book_id, "Book returned");
        self.mediator
            .publish(EventKind::BookReturned, &circulation_event(&returned, &book));
        Ok(returned)
    }

    /// Correct a record. Stock moves only through borrow and return, so the
    /// book and the returned state cannot change here.
    pub async fn update(&self, id: i32, transaction: NewTransaction) -> AppResult<BorrowingTransaction> {
        let current = self.transactions.get_by_id(id).await?;
        if transaction.book_id != current.book_id {
            return Err(AppError::BusinessRule(
                "The book of a transaction cannot be changed".to_string(),
            ));
        }
        let returned = transaction.status == TransactionStatus::Returned.as_str();
        if returned != current.is_returned() {
            return Err(AppError::BusinessRule(
                "Returned status is set by the return operation only".to_string(),
            ));
        }

        self.transactions.update(id, &transaction).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.transactions.delete(id).await
    }
}

fn circulation_event(transaction: &BorrowingTransaction, book: &Book) -> CirculationEvent {
    CirculationEvent {
        transaction_id: transaction.transaction_id,
        book_id: book.book_id,
        member_id: transaction.member_id,
        title: book.title.clone(),
        copies_available: book.copies_available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{member::{Member, Role}, transaction::TransactionStatus},
        repository::{
            books::MockBookRepository, members::MockMemberRepository,
            transactions::MockTransactionRepository,
        },
    };
    use std::time::Duration;
    use tokio::time::timeout;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, day).unwrap()
    }

    fn book(copies: i32) -> Book {
        Book {
            book_id: 2,
            title: "Middlemarch".to_string(),
            author: "George Eliot".to_string(),
            isbn: None,
            publisher: None,
            publication_year: Some(1871),
            genre: None,
            copies_available: copies,
            total_copies: 3,
        }
    }

    fn members() -> MockMemberRepository {
        let mut repo = MockMemberRepository::new();
        repo.expect_get_by_id().returning(|id| {
            Ok(Member {
                member_id: id,
                name: "Reader".to_string(),
                email: "reader@example.org".to_string(),
                password: String::new(),
                phone: None,
                address: None,
                membership_status: "Active".to_string(),
                role: Role::Member,
                created_at: Utc::now(),
            })
        });
        repo
    }

    fn new_transaction() -> NewTransaction {
        NewTransaction {
            book_id: 2,
            member_id: 9,
            borrow_date: date(1),
            return_date: None,
            status: TransactionStatus::Borrowed.as_str().to_string(),
        }
    }

    fn stored(status: TransactionStatus, return_date: Option<NaiveDate>) -> BorrowingTransaction {
        BorrowingTransaction {
            transaction_id: 11,
            book_id: 2,
            member_id: 9,
            borrow_date: date(1),
            return_date,
            status: status.as_str().to_string(),
        }
    }

    fn service(
        transactions: MockTransactionRepository,
        books: MockBookRepository,
        mediator: EventMediator,
    ) -> TransactionsService {
        TransactionsService::new(Arc::new(transactions), Arc::new(books), Arc::new(members()), mediator)
    }

    #[tokio::test]
    async fn test_borrow_takes_copy_and_publishes() {
        let mut books = MockBookRepository::new();
        books.expect_get_by_id().returning(|_| Ok(book(2)));
        books.expect_take_copy().times(1).returning(|_| Ok(Some(book(1))));
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_create()
            .returning(|_| Ok(stored(TransactionStatus::Borrowed, None)));

        let mediator = EventMediator::new(8);
        let mut borrowed = mediator.subscribe(EventKind::BookBorrowed);
        let service = service(transactions, books, mediator);

        let created = service.borrow(new_transaction()).await.unwrap();
        assert_eq!(created.transaction_id, 11);

        let event: CirculationEvent = borrowed.recv().await.unwrap().payload_as().unwrap();
        assert_eq!(event.copies_available, 1);
        assert_eq!(event.title, "Middlemarch");
    }

    #[tokio::test]
    async fn test_borrow_without_copies_is_rejected_silently() {
        let mut books = MockBookRepository::new();
        books.expect_get_by_id().returning(|_| Ok(book(0)));
        books.expect_take_copy().returning(|_| Ok(None));
        let mut transactions = MockTransactionRepository::new();
        transactions.expect_create().never();

        let mediator = EventMediator::new(8);
        let mut borrowed = mediator.subscribe(EventKind::BookBorrowed);
        let service = service(transactions, books, mediator);

        let err = service.borrow(new_transaction()).await.unwrap_err();
        assert!(matches!(err, AppError::BusinessRule(_)));
        assert!(timeout(Duration::from_millis(50), borrowed.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_failed_insert_restores_copy() {
        let mut books = MockBookRepository::new();
        books.expect_get_by_id().returning(|_| Ok(book(1)));
        books.expect_take_copy().returning(|_| Ok(Some(book(0))));
        books.expect_return_copy().times(1).returning(|_| Ok(book(1)));
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_create()
            .returning(|_| Err(AppError::NotFound("Referenced book or member not found".to_string())));

        let service = service(transactions, books, EventMediator::new(8));
        assert!(matches!(service.borrow(new_transaction()).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_borrow_requires_borrowed_status() {
        let mut books = MockBookRepository::new();
        books.expect_take_copy().never();
        let mut transactions = MockTransactionRepository::new();
        transactions.expect_create().never();

        let service = service(transactions, books, EventMediator::new(8));
        let mut returned = new_transaction();
        returned.status = TransactionStatus::Returned.as_str().to_string();

        assert!(matches!(service.borrow(returned).await, Err(AppError::BusinessRule(_))));
    }

    #[tokio::test]
    async fn test_update_keeps_stock_owned_fields() {
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_get_by_id()
            .returning(|_| Ok(stored(TransactionStatus::Borrowed, None)));
        transactions
            .expect_update()
            .times(1)
            .withf(|id, t: &NewTransaction| *id == 11 && t.status == "Overdue")
            .returning(|_, _| Ok(stored(TransactionStatus::Overdue, None)));
        let service = service(transactions, MockBookRepository::new(), EventMediator::new(8));

        let mut other_book = new_transaction();
        other_book.book_id = 3;
        assert!(matches!(service.update(11, other_book).await, Err(AppError::BusinessRule(_))));

        let mut returned = new_transaction();
        returned.status = TransactionStatus::Returned.as_str().to_string();
        returned.return_date = Some(date(4));
        assert!(matches!(service.update(11, returned).await, Err(AppError::BusinessRule(_))));

        let mut overdue = new_transaction();
        overdue.status = TransactionStatus::Overdue.as_str().to_string();
        assert_eq!(service.update(11, overdue).await.unwrap().status, "Overdue");
    }

    #[tokio::test]
    async fn test_return_restocks_and_publishes() {
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_get_by_id()
            .returning(|_| Ok(stored(TransactionStatus::Borrowed, None)));
        transactions
            .expect_mark_returned()
            .withf(|id, day| *id == 11 && *day == date(5))
            .returning(|_, day| Ok(Some(stored(TransactionStatus::Returned, Some(day)))));
        let mut books = MockBookRepository::new();
        books.expect_return_copy().times(1).returning(|_| Ok(book(3)));

        let mediator = EventMediator::new(8);
        let mut returned = mediator.subscribe(EventKind::BookReturned);
        let service = service(transactions, books, mediator);

        let tx = service.return_book(11, Some(date(5))).await.unwrap();
        assert!(tx.is_returned());
        assert_eq!(tx.return_date, Some(date(5)));

        let event: CirculationEvent = returned.recv().await.unwrap().payload_as().unwrap();
        assert_eq!(event.transaction_id, 11);
        assert_eq!(event.copies_available, 3);
    }

    #[tokio::test]
    async fn test_second_return_is_conflict() {
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_get_by_id()
            .returning(|_| Ok(stored(TransactionStatus::Returned, Some(date(3)))));
        transactions.expect_mark_returned().never();
        let mut books = MockBookRepository::new();
        books.expect_return_copy().never();

        let service = service(transactions, books, EventMediator::new(8));
        assert!(matches!(service.return_book(11, None).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_return_before_borrow_date_rejected() {
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_get_by_id()
            .returning(|_| Ok(stored(TransactionStatus::Borrowed, None)));
        transactions.expect_mark_returned().never();

        let service = service(transactions, MockBookRepository::new(), EventMediator::new(8));
        let before = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        match service.return_book(11, Some(before)).await {
            Err(AppError::Validation(errors)) => assert!(errors.has("returnDate", "date_order")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
