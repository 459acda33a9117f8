//! Notification fan-out
//!
//! Turns one domain event into zero or more per-user notification records,
//! then attempts push delivery for each. The engine never fails the
//! triggering request: audience failures yield an empty fan-out, a failed
//! write for one recipient does not abort the others, and push failures
//! never roll back the record they follow.

use std::sync::Arc;

use chorus_events::Event;
use tracing::{debug, warn};

use crate::audience::AudienceResolver;
use crate::notification::{Notification, NotificationKind, NotificationStore};
use crate::push::{PushDelivery, PushMessage};

/// Outcome counters for one fan-out invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    /// Unique recipients after actor exclusion
    pub recipients: usize,
    /// Notification records written
    pub written: usize,
    /// Recipients whose record write failed
    pub write_failures: usize,
    /// Recipients for whom push delivery was accepted
    pub pushed: usize,
    /// Recipients for whom push delivery failed
    pub push_failures: usize,
}

/// Fan-out engine: notification writes plus best-effort push.
#[derive(Clone)]
pub struct FanOut {
    store: Arc<dyn NotificationStore>,
    push: Arc<dyn PushDelivery>,
}

impl FanOut {
    /// Create a fan-out engine.
    pub fn new(store: Arc<dyn NotificationStore>, push: Arc<dyn PushDelivery>) -> Self {
        Self { store, push }
    }

    /// Create a fan-out engine with push delivery disabled.
    pub fn without_push(store: Arc<dyn NotificationStore>) -> Self {
        Self {
            store,
            push: Arc::new(crate::push::NoopPush),
        }
    }

    /// Fan an event out to its audience.
    ///
    /// The audience is resolved by the injected strategy, deduplicated by
    /// set semantics, and never includes the event's actor. One record is
    /// written per recipient; there is no idempotency key, so re-invoking
    /// with the same event writes a second record per recipient.
    pub async fn fan_out(
        &self,
        event: &Event,
        kind: NotificationKind,
        audience: &dyn AudienceResolver,
    ) -> FanOutReport {
        let mut report = FanOutReport::default();

        let resolved = match audience.resolve(event).await {
            Ok(set) => set,
            Err(e) => {
                warn!(
                    event_id = %event.id,
                    topic = %event.topic,
                    error = %e,
                    "Audience resolution failed, skipping fan-out"
                );
                return report;
            }
        };

        for user_id in resolved {
            // No self-notification
            if event.actor_id == Some(user_id) {
                continue;
            }
            report.recipients += 1;

            let notification = Notification::for_recipient(user_id, kind, event);

            match self.store.insert(notification.clone()).await {
                Ok(()) => report.written += 1,
                Err(e) => {
                    warn!(
                        event_id = %event.id,
                        user_id = %user_id,
                        error = %e,
                        "Notification write failed, continuing with remaining recipients"
                    );
                    report.write_failures += 1;
                    continue;
                }
            }

            // Push follows the record write and fails independently.
            let message = PushMessage::for_notification(&notification);
            match self.push.deliver(&message).await {
                Ok(outcomes) => {
                    debug!(
                        user_id = %user_id,
                        devices = outcomes.len(),
                        "Push delivery accepted"
                    );
                    report.pushed += 1;
                }
                Err(e) => {
                    warn!(user_id = %user_id, error = %e, "Push delivery failed");
                    report.push_failures += 1;
                }
            }
        }

        debug!(
            event_id = %event.id,
            recipients = report.recipients,
            written = report.written,
            "Fan-out complete"
        );

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audience::MentionAudience;
    use crate::error::{NotifyError, NotifyResult};
    use crate::notification::MemoryNotificationStore;
    use crate::push::{MemoryPush, PushError, PushOutcome};
    use async_trait::async_trait;
    use chorus_events::MessageEvent;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn reply(sender: Uuid, mentions: Vec<Uuid>) -> Event {
        MessageEvent::Sent {
            message_id: Uuid::now_v7(),
            thread_id: Uuid::now_v7(),
            sender_id: sender,
            preview: "hello".to_string(),
            mentions,
        }
        .to_event()
    }

    struct FixedAudience(HashSet<Uuid>);

    #[async_trait]
    impl AudienceResolver for FixedAudience {
        async fn resolve(&self, _event: &Event) -> NotifyResult<HashSet<Uuid>> {
            Ok(self.0.clone())
        }
    }

    struct FailingAudience;

    #[async_trait]
    impl AudienceResolver for FailingAudience {
        async fn resolve(&self, _event: &Event) -> NotifyResult<HashSet<Uuid>> {
            Err(NotifyError::Audience("directory unavailable".to_string()))
        }
    }

    /// Store that rejects writes for one specific user.
    struct RejectingStore {
        inner: MemoryNotificationStore,
        reject_user: Uuid,
    }

    #[async_trait]
    impl NotificationStore for RejectingStore {
        async fn insert(&self, notification: Notification) -> NotifyResult<()> {
            if notification.user_id == self.reject_user {
                return Err(NotifyError::Store("constraint violation".to_string()));
            }
            self.inner.insert(notification).await
        }

        async fn mark_read(&self, notification_id: Uuid, user_id: Uuid) -> NotifyResult<()> {
            self.inner.mark_read(notification_id, user_id).await
        }

        async fn unread_count(&self, user_id: Uuid) -> NotifyResult<usize> {
            self.inner.unread_count(user_id).await
        }

        async fn list_for_user(
            &self,
            user_id: Uuid,
            limit: usize,
        ) -> NotifyResult<Vec<Notification>> {
            self.inner.list_for_user(user_id, limit).await
        }
    }

    struct FailingPush;

    #[async_trait]
    impl PushDelivery for FailingPush {
        async fn deliver(&self, _message: &PushMessage) -> Result<Vec<PushOutcome>, PushError> {
            Err(PushError::ApiError {
                status: 503,
                message: "provider down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn test_actor_never_notified() {
        let sender = Uuid::now_v7();
        let other = Uuid::now_v7();
        let store = Arc::new(MemoryNotificationStore::new());
        let fan_out = FanOut::without_push(store.clone());

        let event = reply(sender, vec![]);
        let report = fan_out
            .fan_out(
                &event,
                NotificationKind::Reply,
                &FixedAudience(HashSet::from([sender, other])),
            )
            .await;

        assert_eq!(report.recipients, 1);
        assert_eq!(report.written, 1);
        assert_eq!(store.unread_count(sender).await.unwrap(), 0);
        assert_eq!(store.unread_count(other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_mentions_write_once() {
        let sender = Uuid::now_v7();
        let mentioned = Uuid::now_v7();
        let store = Arc::new(MemoryNotificationStore::new());
        let fan_out = FanOut::without_push(store.clone());

        // Same user mentioned twice in one message
        let event = reply(sender, vec![mentioned, mentioned]);
        let report = fan_out
            .fan_out(&event, NotificationKind::Mention, &MentionAudience::new())
            .await;

        assert_eq!(report.recipients, 1);
        assert_eq!(store.unread_count(mentioned).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_repeated_fan_out_writes_duplicate_rows() {
        // No idempotency key: the same event fanned out twice writes two
        // rows per recipient. Pins current behavior.
        let sender = Uuid::now_v7();
        let recipient = Uuid::now_v7();
        let store = Arc::new(MemoryNotificationStore::new());
        let fan_out = FanOut::without_push(store.clone());

        let event = reply(sender, vec![recipient]);
        let audience = MentionAudience::new();

        fan_out
            .fan_out(&event, NotificationKind::Mention, &audience)
            .await;
        fan_out
            .fan_out(&event, NotificationKind::Mention, &audience)
            .await;

        assert_eq!(store.unread_count(recipient).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_one_failed_write_does_not_abort_the_rest() {
        let sender = Uuid::now_v7();
        let unlucky = Uuid::now_v7();
        let lucky_a = Uuid::now_v7();
        let lucky_b = Uuid::now_v7();

        let store = Arc::new(RejectingStore {
            inner: MemoryNotificationStore::new(),
            reject_user: unlucky,
        });
        let fan_out = FanOut::without_push(store.clone());

        let event = reply(sender, vec![]);
        let report = fan_out
            .fan_out(
                &event,
                NotificationKind::Reply,
                &FixedAudience(HashSet::from([unlucky, lucky_a, lucky_b])),
            )
            .await;

        assert_eq!(report.recipients, 3);
        assert_eq!(report.written, 2);
        assert_eq!(report.write_failures, 1);
        assert_eq!(store.unread_count(lucky_a).await.unwrap(), 1);
        assert_eq!(store.unread_count(lucky_b).await.unwrap(), 1);
        assert_eq!(store.unread_count(unlucky).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_push_failure_keeps_the_record() {
        let sender = Uuid::now_v7();
        let recipient = Uuid::now_v7();
        let store = Arc::new(MemoryNotificationStore::new());
        let fan_out = FanOut::new(store.clone(), Arc::new(FailingPush));

        let event = reply(sender, vec![recipient]);
        let report = fan_out
            .fan_out(&event, NotificationKind::Mention, &MentionAudience::new())
            .await;

        assert_eq!(report.written, 1);
        assert_eq!(report.pushed, 0);
        assert_eq!(report.push_failures, 1);
        // The record survived the push failure
        assert_eq!(store.unread_count(recipient).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_audience_failure_is_an_empty_fan_out() {
        let store = Arc::new(MemoryNotificationStore::new());
        let fan_out = FanOut::without_push(store);

        let event = reply(Uuid::now_v7(), vec![]);
        let report = fan_out
            .fan_out(&event, NotificationKind::Reply, &FailingAudience)
            .await;

        assert_eq!(report, FanOutReport::default());
    }

    #[tokio::test]
    async fn test_push_carries_notification_context() {
        let sender = Uuid::now_v7();
        let recipient = Uuid::now_v7();
        let store = Arc::new(MemoryNotificationStore::new());
        let push = Arc::new(MemoryPush::new());
        let fan_out = FanOut::new(store, push.clone());

        let event = reply(sender, vec![recipient]);
        fan_out
            .fan_out(&event, NotificationKind::Mention, &MentionAudience::new())
            .await;

        let sent = push.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].user_id, recipient);
        assert_eq!(sent[0].data["event_id"], serde_json::json!(event.id));
    }
}
