//! Member notifications and the reactor that derives them from domain events

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_stream::{StreamExt, StreamMap};

use crate::{
    error::AppResult,
    mediator::{EventEnvelope, EventKind, EventMediator},
    models::{
        fine::Fine,
        member::MemberStatusChanged,
        notification::{NewNotification, Notification, NotificationQuery},
        transaction::CirculationEvent,
    },
    repository::NotificationRepository,
};

#[derive(Clone)]
pub struct NotificationsService {
    notifications: Arc<dyn NotificationRepository>,
}

impl NotificationsService {
    pub fn new(notifications: Arc<dyn NotificationRepository>) -> Self {
        Self { notifications }
    }

    pub async fn search(&self, query: &NotificationQuery) -> AppResult<(Vec<Notification>, i64)> {
        self.notifications.search(query).await
    }

    pub async fn get_by_id(&self, id: i32) -> AppResult<Notification> {
        self.notifications.get_by_id(id).await
    }

    pub async fn create(&self, notification: NewNotification) -> AppResult<Notification> {
        self.notifications.create(&notification).await
    }

    pub async fn update(&self, id: i32, notification: NewNotification) -> AppResult<Notification> {
        self.notifications.update(id, &notification).await
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.notifications.delete(id).await
    }
}

/// Event kinds that produce a member notification
pub const REACTOR_KINDS: [EventKind; 5] = [
    EventKind::FineCreated,
    EventKind::FinePaid,
    EventKind::BookBorrowed,
    EventKind::BookReturned,
    EventKind::MemberStatusChanged,
];

/// Message for the member concerned by `event`, if any
pub fn notification_for(event: &EventEnvelope) -> Result<Option<NewNotification>, serde_json::Error> {
    let notification = match event.kind {
        EventKind::FineCreated => {
            let fine: Fine = event.payload_as()?;
            NewNotification {
                member_id: fine.member_id,
                message: format!("A fine of {} has been issued to your account.", fine.amount),
            }
        }
        EventKind::FinePaid => {
            let fine: Fine = event.payload_as()?;
            NewNotification {
                member_id: fine.member_id,
                message: format!("Your fine #{} of {} has been paid. Thank you.", fine.fine_id, fine.amount),
            }
        }
        EventKind::BookBorrowed => {
            let loan: CirculationEvent = event.payload_as()?;
            NewNotification {
                member_id: loan.member_id,
                message: format!("You borrowed \"{}\".", loan.title),
            }
        }
        EventKind::BookReturned => {
            let loan: CirculationEvent = event.payload_as()?;
            NewNotification {
                member_id: loan.member_id,
                message: format!("Thank you for returning \"{}\".", loan.title),
            }
        }
        EventKind::MemberStatusChanged => {
            let change: MemberStatusChanged = event.payload_as()?;
            NewNotification {
                member_id: change.member_id,
                message: format!(
                    "Your membership status changed from {} to {}.",
                    change.previous_status, change.membership_status
                ),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(notification))
}

/// Subscribe to the notifying event kinds and store one notification per event.
///
/// Subscriptions are registered before this returns, so events published
/// afterwards are never missed. Failures are logged per event and do not
/// stop the reactor. It ends when the mediator is dropped or the task aborted.
pub fn spawn_reactor(service: NotificationsService, mediator: &EventMediator) -> JoinHandle<()> {
    let mut streams = StreamMap::new();
    for kind in REACTOR_KINDS {
        streams.insert(kind.clone(), mediator.subscribe(kind));
    }

    tokio::spawn(async move {
        while let Some((kind, event)) = streams.next().await {
            let notification = match notification_for(&event) {
                Ok(Some(notification)) => notification,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(event = %kind, id = %event.id, "Undecodable event payload: {}", e);
                    continue;
                }
            };

            match service.create(notification).await {
                Ok(stored) => tracing::debug!(
                    event = %kind,
                    notification_id = stored.notification_id,
                    member_id = stored.member_id,
                    "Notification stored"
                ),
                Err(e) => tracing::error!(event = %kind, "Failed to store notification: {}", e),
            }
        }
        tracing::info!("Notification reactor stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::AppError, models::fine::FineStatus, repository::notifications::MockNotificationRepository};
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn fine() -> Fine {
        Fine {
            fine_id: 3,
            member_id: 8,
            amount: Decimal::new(500, 2),
            status: FineStatus::Unpaid.as_str().to_string(),
            transaction_date: NaiveDate::from_ymd_opt(2024, 6, 2).unwrap(),
        }
    }

    fn stored(notification: &NewNotification) -> Notification {
        Notification {
            notification_id: 1,
            member_id: notification.member_id,
            message: notification.message.clone(),
            date_sent: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_messages_per_kind() {
        let mediator = EventMediator::new(4);
        let mut sub = mediator.subscribe(EventKind::FineCreated);
        mediator.publish(EventKind::FineCreated, &fine());
        let event = sub.recv().await.unwrap();

        let notification = notification_for(&event).unwrap().unwrap();
        assert_eq!(notification.member_id, 8);
        assert_eq!(notification.message, "A fine of 5.00 has been issued to your account.");
    }

    #[tokio::test]
    async fn test_unrelated_kinds_are_ignored() {
        let mediator = EventMediator::new(4);
        let mut sub = mediator.subscribe(EventKind::MemberUpdated);
        mediator.publish(EventKind::MemberUpdated, &serde_json::json!({ "memberID": 1 }));
        let event = sub.recv().await.unwrap();
        assert!(notification_for(&event).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_reactor_stores_notifications() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut repo = MockNotificationRepository::new();
        repo.expect_create().returning(move |n| {
            let _ = tx.send(n.clone());
            Ok(stored(n))
        });

        let mediator = EventMediator::new(16);
        let handle = spawn_reactor(NotificationsService::new(Arc::new(repo)), &mediator);

        mediator.publish(EventKind::FinePaid, &fine());
        mediator.publish(
            EventKind::BookReturned,
            &CirculationEvent {
                transaction_id: 5,
                book_id: 2,
                member_id: 8,
                title: "Beloved".to_string(),
                copies_available: 1,
            },
        );

        let first = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        let second = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap().unwrap();
        let mut messages = vec![first.message, second.message];
        messages.sort();
        assert_eq!(
            messages,
            vec![
                "Thank you for returning \"Beloved\".".to_string(),
                "Your fine #3 of 5.00 has been paid. Thank you.".to_string(),
            ]
        );
        handle.abort();
    }

    #[tokio::test]
    async fn test_reactor_survives_storage_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut repo = MockNotificationRepository::new();
        let mut calls = 0;
        repo.expect_create().returning(move |n| {
            calls += 1;
            let _ = tx.send(n.member_id);
            if calls == 1 {
                Err(AppError::NotFound("Member not found".to_string()))
            } else {
                Ok(stored(n))
            }
        });

        let mediator = EventMediator::new(16);
        let handle = spawn_reactor(NotificationsService::new(Arc::new(repo)), &mediator);

        mediator.publish(EventKind::FineCreated, &fine());
        mediator.publish(EventKind::FineCreated, &fine());

        for _ in 0..2 {
            let member = tokio::time::timeout(Duration::from_secs(1), rx.recv()).await.unwrap();
            assert_eq!(member, Some(8));
        }
        handle.abort();
    }
}
