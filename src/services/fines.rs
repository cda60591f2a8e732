//! Fines service

use std::sync::Arc;

use crate::{
    error::{AppError, AppResult},
    mediator::{EventKind, EventMediator},
    models::fine::{Fine, FineChanges, FineQuery, NewFine},
    repository::FineRepository,
};

#[derive(Clone)]
pub struct FinesService {
    fines: Arc<dyn FineRepository>,
    mediator: EventMediator,
}

impl FinesService {
    pub fn new(fines: Arc<dyn FineRepository>, mediator: EventMediator) -> Self {
        Self { fines, mediator }
    }

    pub async fn search(&self, query: &FineQuery) -> AppResult<(Vec<Fine>, i64)> {
        self.fines.search(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Fine> {
        self.fines.get_by_id(id).await
    }

    /// Issue a fine. Publishes `fine:created`.
    pub async fn create(&self, fine: NewFine) -> AppResult<Fine> {
        let created = self.fines.create(&fine).await?;
        tracing::info!(fine_id = created.fine_id, member_id = created.member_id, amount = %created.amount, "Fine issued");
        self.mediator.publish(EventKind::FineCreated, &created);
        Ok(created)
    }

    /// Publishes `fine:updated`.
    pub async fn update(&self, changes: FineChanges) -> AppResult<Fine> {
        let updated = self.fines.update(&changes).await?;
        self.mediator.publish(EventKind::FineUpdated, &updated);
        Ok(updated)
    }

    /// Settle a fine. Publishes `fine:paid` with the settled fine.
    pub async fn pay(&self, id: i32) -> AppResult<Fine> {
        let current = self.fines.get_by_id(id).await?;
        if current.is_paid() {
            return Err(AppError::Conflict("Fine already paid".to_string()));
        }

        let paid = self
            .fines
            .mark_paid(id)
            .await?
            .ok_or_else(|| AppError::Conflict("Fine already paid".to_string()))?;

        tracing::info!(fine_id = id, member_id = paid.member_id, "Fine paid");
        self.mediator.publish(EventKind::FinePaid, &paid);
        Ok(paid)
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.fines.delete(id).await
    }
}
