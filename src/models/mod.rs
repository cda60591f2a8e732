//! Data models for the library server

pub mod availability;
pub mod book;
pub mod fine;
pub mod member;
pub mod notification;
pub mod transaction;

// Re-export commonly used types
pub use availability::{Availability, AvailabilityBadge};
pub use book::{Book, BookDetails};
pub use fine::{Fine, FineStatus};
pub use member::{Member, MemberClaims, Role};
pub use notification::Notification;
pub use transaction::{BorrowingTransaction, TransactionStatus};
