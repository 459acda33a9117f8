//! Notification records and stores
//!
//! A notification is the per-recipient trace of a domain event: created by
//! fan-out, flipped to read by its owner, never deleted by this crate
//! (cascade delete belongs to the owning aggregate).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use chorus_events::Event;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{NotifyError, NotifyResult};

/// Kinds of notifications delivered to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Reply in a watched thread
    Reply,
    /// User was @-mentioned
    Mention,
    /// Reaction on the user's message
    Reaction,
    /// Task assigned to the user
    TaskAssigned,
    /// Watched task changed
    TaskUpdated,
    /// Invited to a channel
    ChannelInvite,
    /// Call started in a joined channel
    CallStarted,
}

impl NotificationKind {
    /// Stable string tag for storage and API responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Reply => "reply",
            NotificationKind::Mention => "mention",
            NotificationKind::Reaction => "reaction",
            NotificationKind::TaskAssigned => "task_assigned",
            NotificationKind::TaskUpdated => "task_updated",
            NotificationKind::ChannelInvite => "channel_invite",
            NotificationKind::CallStarted => "call_started",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A per-user notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Unique notification ID
    pub id: Uuid,

    /// Owning user (the recipient)
    pub user_id: Uuid,

    /// Notification kind
    pub kind: NotificationKind,

    /// The event that produced this notification
    pub event_id: Uuid,

    /// Payload copied from the event
    pub payload: serde_json::Value,

    /// Whether the owner has read this notification
    pub is_read: bool,

    /// When the notification was created
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Create a new unread notification.
    pub fn new(
        user_id: Uuid,
        kind: NotificationKind,
        event_id: Uuid,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            kind,
            event_id,
            payload,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    /// Create the notification a fan-out writes for one recipient.
    pub fn for_recipient(user_id: Uuid, kind: NotificationKind, event: &Event) -> Self {
        Self::new(user_id, kind, event.id, event.payload.clone())
    }
}

/// Persistence interface for notification records.
///
/// Implemented by the application's relational store; the in-memory
/// implementation below serves tests and single-process deployments.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a notification record.
    async fn insert(&self, notification: Notification) -> NotifyResult<()>;

    /// Mark a notification as read.
    ///
    /// Fails with [`NotifyError::Forbidden`] if `user_id` does not own the
    /// notification, and [`NotifyError::NotFound`] if it does not exist.
    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> NotifyResult<()>;

    /// Count unread notifications for a user.
    async fn unread_count(&self, user_id: Uuid) -> NotifyResult<usize>;

    /// List a user's notifications, newest first.
    async fn list_for_user(&self, user_id: Uuid, limit: usize) -> NotifyResult<Vec<Notification>>;
}

/// In-memory notification store.
#[derive(Default)]
pub struct MemoryNotificationStore {
    rows: Arc<RwLock<Vec<Notification>>>,
}

impl MemoryNotificationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl NotificationStore for MemoryNotificationStore {
    async fn insert(&self, notification: Notification) -> NotifyResult<()> {
        let mut rows = self.rows.write().await;
        rows.push(notification);
        Ok(())
    }

    async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> NotifyResult<()> {
        let mut rows = self.rows.write().await;

        let row = rows
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or_else(|| NotifyError::NotFound(notification_id.to_string()))?;

        if row.user_id != user_id {
            return Err(NotifyError::Forbidden(
                "notification belongs to another user".to_string(),
            ));
        }

        row.is_read = true;
        Ok(())
    }

    async fn unread_count(&self, user_id: Uuid) -> NotifyResult<usize> {
        let rows = self.rows.read().await;
        Ok(rows.iter().filter(|n| n.user_id == user_id && !n.is_read).count())
    }

    async fn list_for_user(&self, user_id: Uuid, limit: usize) -> NotifyResult<Vec<Notification>> {
        let rows = self.rows.read().await;
        let mut mine: Vec<Notification> = rows
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        mine.truncate(limit);
        Ok(mine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(user_id: Uuid) -> Notification {
        Notification::new(
            user_id,
            NotificationKind::Reply,
            Uuid::now_v7(),
            serde_json::json!({"preview": "hello"}),
        )
    }

    #[tokio::test]
    async fn test_insert_and_count() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::now_v7();

        store.insert(sample(user)).await.unwrap();
        store.insert(sample(user)).await.unwrap();
        store.insert(sample(Uuid::now_v7())).await.unwrap();

        assert_eq!(store.unread_count(user).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_by_owner() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::now_v7();
        let notification = sample(user);
        let id = notification.id;

        store.insert(notification).await.unwrap();
        store.mark_read(id, user).await.unwrap();

        assert_eq!(store.unread_count(user).await.unwrap(), 0);
        let listed = store.list_for_user(user, 10).await.unwrap();
        assert!(listed[0].is_read);
    }

    #[tokio::test]
    async fn test_mark_read_by_non_owner_is_forbidden() {
        let store = MemoryNotificationStore::new();
        let owner = Uuid::now_v7();
        let intruder = Uuid::now_v7();
        let notification = sample(owner);
        let id = notification.id;

        store.insert(notification).await.unwrap();
        let err = store.mark_read(id, intruder).await.unwrap_err();

        assert!(matches!(err, NotifyError::Forbidden(_)));
        assert_eq!(err.status_code(), 403);
        // Nothing flipped
        assert_eq!(store.unread_count(owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_read_missing_is_not_found() {
        let store = MemoryNotificationStore::new();
        let err = store
            .mark_read(Uuid::now_v7(), Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, NotifyError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_newest_first_with_limit() {
        let store = MemoryNotificationStore::new();
        let user = Uuid::now_v7();

        for _ in 0..5 {
            store.insert(sample(user)).await.unwrap();
        }

        let listed = store.list_for_user(user, 3).await.unwrap();
        assert_eq!(listed.len(), 3);
        assert!(listed[0].created_at >= listed[1].created_at);
        assert!(listed[1].created_at >= listed[2].created_at);
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(NotificationKind::Reply.as_str(), "reply");
        assert_eq!(NotificationKind::TaskAssigned.as_str(), "task_assigned");
        assert_eq!(
            serde_json::to_string(&NotificationKind::Mention).unwrap(),
            "\"mention\""
        );
    }
}
