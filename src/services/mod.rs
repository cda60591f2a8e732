//! Business logic services

pub mod books;
pub mod fines;
pub mod members;
pub mod notifications;
pub mod transactions;

use std::sync::Arc;

use crate::{
    config::AuthConfig,
    error::AppResult,
    mediator::EventMediator,
    repository::{HealthRepository, Repository},
};

/// Container for all services
#[derive(Clone)]
pub struct Services {
    pub members: members::MembersService,
    pub books: books::BooksService,
    pub transactions: transactions::TransactionsService,
    pub fines: fines::FinesService,
    pub notifications: notifications::NotificationsService,
    pub mediator: EventMediator,
    health: Arc<dyn HealthRepository>,
}

impl Services {
    /// Create all services over one repository and one mediator
    pub fn new(repository: Repository, auth_config: AuthConfig, mediator: EventMediator) -> Self {
        Self {
            members: members::MembersService::new(repository.members.clone(), auth_config, mediator.clone()),
            books: books::BooksService::new(repository.books.clone()),
            transactions: transactions::TransactionsService::new(
                repository.transactions,
                repository.books,
                repository.members,
                mediator.clone(),
            ),
            fines: fines::FinesService::new(repository.fines, mediator.clone()),
            notifications: notifications::NotificationsService::new(repository.notifications),
            mediator,
            health: repository.health,
        }
    }

    /// Check database connectivity
    pub async fn ping(&self) -> AppResult<()> {
        self.health.ping().await
    }
}
