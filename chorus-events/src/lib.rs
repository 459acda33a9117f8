//! # Chorus Events
//!
//! This crate provides the realtime event bus for the Chorus platform:
//! when a message is posted, a reaction added, or a task reassigned,
//! connected clients watching the owning thread, channel, or task receive
//! the change without polling.
//!
//! ## Overview
//!
//! The chorus-events crate handles:
//! - **Topics**: Stable broadcast-group keys derived from entity kind + id
//! - **Event Envelope**: Routing metadata around an opaque JSON payload
//! - **Typed Events**: Message, task, and call events with `to_event()`
//! - **Event Bus**: Fire-and-forget publish/subscribe messaging
//!
//! ## Delivery contract
//!
//! Publishing is best effort by design: at most one delivery attempt, no
//! durable queue, no replay, no per-subscriber confirmation. Within one
//! topic, delivery order follows publish call order; there is no ordering
//! across topics. Callers that must never fail a request because of a
//! broadcast problem log the error and continue.
//!
//! ## Features
//!
//! - `memory` (default): In-memory event bus for single-process apps
//! - `redis`: Redis-backed event bus for multi-instance deployments
//!
//! ## Usage
//!
//! ### Publishing Events
//!
//! ```rust,no_run
//! use chorus_events::{EventBus, MemoryEventBus, MessageEvent};
//! use uuid::Uuid;
//!
//! async fn publish_example() {
//!     let bus = MemoryEventBus::new();
//!
//!     let reply = MessageEvent::Sent {
//!         message_id: Uuid::now_v7(),
//!         thread_id: Uuid::now_v7(),
//!         sender_id: Uuid::now_v7(),
//!         preview: "Sounds good, shipping it".to_string(),
//!         mentions: vec![],
//!     };
//!
//!     // Fire-and-forget
//!     bus.publish(reply.to_event()).await.unwrap();
//! }
//! ```
//!
//! ### Subscribing to Events
//!
//! ```rust,no_run
//! use chorus_events::{EventBus, MemoryEventBus, Topic};
//! use uuid::Uuid;
//!
//! async fn subscribe_example() {
//!     let bus = MemoryEventBus::new();
//!     let thread_id = Uuid::now_v7();
//!
//!     // Watch one thread
//!     let mut sub = bus
//!         .subscribe(&Topic::thread(thread_id).to_string())
//!         .await
//!         .unwrap();
//!
//!     // Or every thread
//!     let mut all_threads = bus.subscribe("thread:*").await.unwrap();
//!
//!     while let Ok(event) = sub.recv().await {
//!         println!("Received: {}", event.name);
//!     }
//! }
//! ```
//!
//! ## Topic keys
//!
//! Topics are structured as `{kind}:{entity_id}`:
//! - `thread:{id}` - One message thread
//! - `channel:{id}` - One channel
//! - `user:{id}` - One user's private feed
//!
//! Subscription patterns support wildcards:
//! - `*` matches exactly one segment
//! - `#` matches zero or more segments

pub mod bus;
pub mod topic;
pub mod types;

#[cfg(feature = "redis")]
pub mod redis;

// Re-export main types
pub use bus::{
    EventBus, EventBusError, EventBusResult, EventBusStats, EventHandler, MemoryEventBus,
    Subscription,
};
pub use topic::{pattern_matches, EntityKind, Topic, TopicParseError};
pub use types::{CallEvent, Event, MessageEvent, TaskEvent};

#[cfg(feature = "redis")]
pub use redis::{RedisEventBus, RedisEventBusConfig};
