//! Event types for realtime broadcast
//!
//! This module defines the event envelope published on the bus and the
//! strongly-typed domain events that produce it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::topic::Topic;

/// Realtime event envelope.
///
/// All events are wrapped in this envelope, which carries the broadcast
/// group (topic), routing metadata, and an opaque JSON payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    /// Event name (e.g., "message:sent", "task:assigned")
    pub name: String,

    /// Broadcast group this event is delivered to
    pub topic: Topic,

    /// User who caused the event, if any
    pub actor_id: Option<Uuid>,

    /// Workspace context
    pub workspace_id: Option<Uuid>,

    /// Timestamp when the event was created
    pub occurred_at: DateTime<Utc>,

    /// Correlation ID for tracing
    pub correlation_id: Option<String>,

    /// Event version for schema evolution
    pub version: u32,

    /// Event payload
    pub payload: serde_json::Value,

    /// Additional metadata
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Event {
    /// Create a new event.
    ///
    /// # Arguments
    ///
    /// * `topic` - The broadcast group to deliver to
    /// * `name` - The event name
    /// * `payload` - The event payload
    pub fn new(topic: Topic, name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            topic,
            actor_id: None,
            workspace_id: None,
            occurred_at: Utc::now(),
            correlation_id: None,
            version: 1,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Set the acting user.
    pub fn with_actor(mut self, actor_id: Uuid) -> Self {
        self.actor_id = Some(actor_id);
        self
    }

    /// Set workspace context.
    pub fn with_workspace(mut self, workspace_id: Uuid) -> Self {
        self.workspace_id = Some(workspace_id);
        self
    }

    /// Set correlation ID.
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Add metadata.
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Parse the payload into a specific type.
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.payload.clone())
    }
}

// ============================================================================
// Message Events
// ============================================================================

/// Message lifecycle events, broadcast to the owning thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageEvent {
    /// Message was posted
    Sent {
        message_id: Uuid,
        thread_id: Uuid,
        sender_id: Uuid,
        preview: String,
        #[serde(default)]
        mentions: Vec<Uuid>,
    },
    /// Message body was edited
    Updated {
        message_id: Uuid,
        thread_id: Uuid,
        editor_id: Uuid,
        preview: String,
    },
    /// Message was deleted
    Deleted {
        message_id: Uuid,
        thread_id: Uuid,
        deleted_by: Uuid,
    },
    /// Reaction was added to a message
    ReactionAdded {
        message_id: Uuid,
        thread_id: Uuid,
        user_id: Uuid,
        emoji: String,
    },
    /// Reaction was removed from a message
    ReactionRemoved {
        message_id: Uuid,
        thread_id: Uuid,
        user_id: Uuid,
        emoji: String,
    },
}

impl MessageEvent {
    /// Convert to an envelope on the owning thread's topic.
    pub fn to_event(&self) -> Event {
        let (name, thread_id, actor_id) = match self {
            MessageEvent::Sent {
                thread_id, sender_id, ..
            } => ("message:sent", *thread_id, *sender_id),
            MessageEvent::Updated {
                thread_id, editor_id, ..
            } => ("message:updated", *thread_id, *editor_id),
            MessageEvent::Deleted {
                thread_id, deleted_by, ..
            } => ("message:deleted", *thread_id, *deleted_by),
            MessageEvent::ReactionAdded {
                thread_id, user_id, ..
            } => ("reaction:added", *thread_id, *user_id),
            MessageEvent::ReactionRemoved {
                thread_id, user_id, ..
            } => ("reaction:removed", *thread_id, *user_id),
        };
        Event::new(
            Topic::thread(thread_id),
            name,
            serde_json::to_value(self).unwrap(),
        )
        .with_actor(actor_id)
    }
}

// ============================================================================
// Task Events
// ============================================================================

/// Task lifecycle events, broadcast to the task's watchers group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskEvent {
    /// Task was created
    Created {
        task_id: Uuid,
        creator_id: Uuid,
        title: String,
    },
    /// Task was assigned to a user
    Assigned {
        task_id: Uuid,
        assignee_id: Uuid,
        assigned_by: Uuid,
    },
    /// Task status changed
    StatusChanged {
        task_id: Uuid,
        changed_by: Uuid,
        status: String,
    },
    /// Comment was added to a task
    Commented {
        task_id: Uuid,
        author_id: Uuid,
        preview: String,
    },
}

impl TaskEvent {
    /// Convert to an envelope on the task's topic.
    pub fn to_event(&self) -> Event {
        let (name, task_id, actor_id) = match self {
            TaskEvent::Created {
                task_id, creator_id, ..
            } => ("task:created", *task_id, *creator_id),
            TaskEvent::Assigned {
                task_id, assigned_by, ..
            } => ("task:assigned", *task_id, *assigned_by),
            TaskEvent::StatusChanged {
                task_id, changed_by, ..
            } => ("task:status_changed", *task_id, *changed_by),
            TaskEvent::Commented {
                task_id, author_id, ..
            } => ("task:commented", *task_id, *author_id),
        };
        Event::new(
            Topic::task(task_id),
            name,
            serde_json::to_value(self).unwrap(),
        )
        .with_actor(actor_id)
    }
}

// ============================================================================
// Call Events
// ============================================================================

/// Call room events, broadcast to the call's topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallEvent {
    /// Call was started in a channel
    Started {
        call_id: Uuid,
        channel_id: Uuid,
        started_by: Uuid,
    },
    /// A participant joined the call
    ParticipantJoined { call_id: Uuid, user_id: Uuid },
    /// Call ended
    Ended {
        call_id: Uuid,
        duration_seconds: u64,
    },
}

impl CallEvent {
    /// Convert to an envelope on the call's topic.
    pub fn to_event(&self) -> Event {
        let (name, call_id, actor_id) = match self {
            CallEvent::Started {
                call_id, started_by, ..
            } => ("call:started", *call_id, Some(*started_by)),
            CallEvent::ParticipantJoined { call_id, user_id } => {
                ("call:participant_joined", *call_id, Some(*user_id))
            }
            CallEvent::Ended { call_id, .. } => ("call:ended", *call_id, None),
        };
        let event = Event::new(
            Topic::call(call_id),
            name,
            serde_json::to_value(self).unwrap(),
        );
        match actor_id {
            Some(actor_id) => event.with_actor(actor_id),
            None => event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topic::EntityKind;

    #[test]
    fn test_event_creation() {
        let thread_id = Uuid::now_v7();
        let actor = Uuid::now_v7();
        let event = Event::new(
            Topic::thread(thread_id),
            "message:sent",
            serde_json::json!({"key": "value"}),
        )
        .with_actor(actor)
        .with_workspace(Uuid::now_v7());

        assert_eq!(event.name, "message:sent");
        assert_eq!(event.topic, Topic::thread(thread_id));
        assert_eq!(event.actor_id, Some(actor));
        assert!(event.workspace_id.is_some());
        assert_eq!(event.version, 1);
    }

    #[test]
    fn test_message_event_topic_and_actor() {
        let thread_id = Uuid::now_v7();
        let sender = Uuid::now_v7();
        let event = MessageEvent::Sent {
            message_id: Uuid::now_v7(),
            thread_id,
            sender_id: sender,
            preview: "hello".to_string(),
            mentions: vec![],
        }
        .to_event();

        assert_eq!(event.name, "message:sent");
        assert_eq!(event.topic.kind(), EntityKind::Thread);
        assert_eq!(event.topic.entity_id(), thread_id);
        assert_eq!(event.actor_id, Some(sender));
    }

    #[test]
    fn test_mentions_ride_in_payload() {
        let mentioned = Uuid::now_v7();
        let event = MessageEvent::Sent {
            message_id: Uuid::now_v7(),
            thread_id: Uuid::now_v7(),
            sender_id: Uuid::now_v7(),
            preview: "ping".to_string(),
            mentions: vec![mentioned],
        }
        .to_event();

        let mentions = event.payload.get("mentions").unwrap();
        assert_eq!(mentions, &serde_json::json!([mentioned]));
    }

    #[test]
    fn test_task_event() {
        let task_id = Uuid::now_v7();
        let assigner = Uuid::now_v7();
        let event = TaskEvent::Assigned {
            task_id,
            assignee_id: Uuid::now_v7(),
            assigned_by: assigner,
        }
        .to_event();

        assert_eq!(event.name, "task:assigned");
        assert_eq!(event.topic, Topic::task(task_id));
        assert_eq!(event.actor_id, Some(assigner));
    }

    #[test]
    fn test_call_ended_has_no_actor() {
        let event = CallEvent::Ended {
            call_id: Uuid::now_v7(),
            duration_seconds: 1800,
        }
        .to_event();

        assert_eq!(event.name, "call:ended");
        assert_eq!(event.actor_id, None);
    }

    #[test]
    fn test_payload_round_trip() {
        let original = MessageEvent::ReactionAdded {
            message_id: Uuid::now_v7(),
            thread_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            emoji: "🎉".to_string(),
        };
        let event = original.to_event();
        let parsed: MessageEvent = event.parse_payload().unwrap();

        match parsed {
            MessageEvent::ReactionAdded { emoji, .. } => assert_eq!(emoji, "🎉"),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
