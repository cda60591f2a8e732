//! In-process event mediator
//!
//! Features publish domain events here instead of calling each other, so the
//! members, fines, circulation and notification services never hold
//! references to one another.
//!
//! Delivery is broadcast fan-out over one bounded `tokio::sync::broadcast`
//! channel per event kind:
//!
//! - every subscriber of a kind receives every event of that kind;
//! - events published while nobody listens are dropped, nothing is replayed;
//! - events from one publisher arrive in publish order;
//! - a subscriber that falls more than `capacity` events of its kind behind
//!   loses its oldest events and keeps going, without slowing anyone else
//!   down. Traffic of other kinds never counts against it.

use std::{
    collections::HashMap,
    fmt,
    pin::Pin,
    sync::{Arc, RwLock},
    task::{ready, Context, Poll},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    Stream, StreamExt,
};
use uuid::Uuid;

/// Kind of domain event. The set is open through [`EventKind::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    FineCreated,
    FineUpdated,
    FinePaid,
    MemberUpdated,
    MemberStatusChanged,
    BookBorrowed,
    BookReturned,
    Custom(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            EventKind::FineCreated => "fine:created",
            EventKind::FineUpdated => "fine:updated",
            EventKind::FinePaid => "fine:paid",
            EventKind::MemberUpdated => "member:updated",
            EventKind::MemberStatusChanged => "member:status-changed",
            EventKind::BookBorrowed => "book:borrowed",
            EventKind::BookReturned => "book:returned",
            EventKind::Custom(s) => s.as_str(),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for EventKind {
    fn from(s: &str) -> Self {
        match s {
            "fine:created" => EventKind::FineCreated,
            "fine:updated" => EventKind::FineUpdated,
            "fine:paid" => EventKind::FinePaid,
            "member:updated" => EventKind::MemberUpdated,
            "member:status-changed" => EventKind::MemberStatusChanged,
            "book:borrowed" => EventKind::BookBorrowed,
            "book:returned" => EventKind::BookReturned,
            other => EventKind::Custom(other.to_string()),
        }
    }
}

impl Serialize for EventKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for EventKind {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(EventKind::from(s.as_str()))
    }
}

/// A published event as seen by subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub id: Uuid,
    pub kind: EventKind,
    pub payload: Value,
    pub occurred_at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Decode the payload into the type the publisher sent
    pub fn payload_as<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

/// Process-wide publish/subscribe bus
#[derive(Clone)]
pub struct EventMediator {
    capacity: usize,
    channels: Arc<RwLock<HashMap<EventKind, broadcast::Sender<EventEnvelope>>>>,
}

impl EventMediator {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            channels: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Broadcast an event to every current subscriber of its kind.
    ///
    /// Returns how many subscriptions of that kind were reached.
    /// Never waits for subscribers to react.
    pub fn publish<P: Serialize>(&self, kind: EventKind, payload: &P) -> usize {
        let sender = {
            let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
            channels.get(&kind).cloned()
        };
        let Some(sender) = sender else {
            tracing::debug!(event = %kind, "No subscriber, event dropped");
            return 0;
        };

        let payload = match serde_json::to_value(payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::error!(event = %kind, "Failed to encode event payload: {}", e);
                return 0;
            }
        };

        let envelope = EventEnvelope {
            id: Uuid::new_v4(),
            kind,
            payload,
            occurred_at: Utc::now(),
        };

        tracing::debug!(event = %envelope.kind, id = %envelope.id, "Publishing event");

        // An error only means every subscriber of this kind has gone
        sender.send(envelope).unwrap_or(0)
    }

    /// Receive every event of `kind` published from now on
    pub fn subscribe(&self, kind: impl Into<EventKind>) -> Subscription {
        let kind = kind.into();
        let receiver = {
            let mut channels = self.channels.write().unwrap_or_else(|e| e.into_inner());
            channels
                .entry(kind.clone())
                .or_insert_with(|| broadcast::channel(self.capacity).0)
                .subscribe()
        };

        Subscription {
            kind,
            inner: Some(BroadcastStream::new(receiver)),
        }
    }

    /// Live subscriptions across all kinds
    pub fn subscriber_count(&self) -> usize {
        let channels = self.channels.read().unwrap_or_else(|e| e.into_inner());
        channels.values().map(broadcast::Sender::receiver_count).sum()
    }
}

/// Cancellable stream of events of one kind
pub struct Subscription {
    kind: EventKind,
    inner: Option<BroadcastStream<EventEnvelope>>,
}

impl Subscription {
    pub fn kind(&self) -> &EventKind {
        &self.kind
    }

    /// Wait for the next matching event. `None` once cancelled or closed.
    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        self.next().await
    }

    /// Release the registration. Nothing is delivered afterwards.
    pub fn cancel(&mut self) {
        self.inner = None;
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_none()
    }
}

impl Stream for Subscription {
    type Item = EventEnvelope;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let Some(stream) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };
            match ready!(Pin::new(stream).poll_next(cx)) {
                Some(Ok(envelope)) => return Poll::Ready(Some(envelope)),
                Some(Err(BroadcastStreamRecvError::Lagged(skipped))) => {
                    tracing::warn!(event = %this.kind, skipped, "Subscriber lagged, events dropped");
                    continue;
                }
                None => {
                    this.inner = None;
                    return Poll::Ready(None);
                }
            }
        }
    }
}
