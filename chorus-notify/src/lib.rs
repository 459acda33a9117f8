//! # Chorus Notify
//!
//! This crate turns domain events into per-user notifications for the
//! Chorus platform: who should hear about a reply, a mention, or a task
//! change, the record written for each of them, and the best-effort push
//! that follows.
//!
//! ## Overview
//!
//! The chorus-notify crate handles:
//! - **Audience Resolution**: Watchers, members, and mentions as injected
//!   strategies
//! - **Notification Records**: Per-recipient rows with an owner-checked
//!   read flip
//! - **Fan-out**: One event → N records, failures isolated per recipient
//! - **Push Delivery**: HTTP client for the push provider
//! - **Side-effect Pipeline**: Broadcast-then-notify after a mutation
//!   commits
//!
//! ## Failure contract
//!
//! Everything in this crate runs after the triggering mutation has been
//! persisted. Nothing here may fail that request: broadcast errors,
//! audience-resolution errors, per-recipient write errors, and push errors
//! are all caught, logged, and counted — never re-thrown into the request
//! path.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chorus_events::{MemoryEventBus, MessageEvent};
//! use chorus_notify::{
//!     FanOut, MemoryNotificationStore, MentionAudience, NotificationKind, SideEffects,
//! };
//! use uuid::Uuid;
//!
//! async fn example() {
//!     let store = Arc::new(MemoryNotificationStore::new());
//!     let pipeline = SideEffects::new(
//!         Arc::new(MemoryEventBus::new()),
//!         FanOut::without_push(store),
//!     );
//!
//!     // After the message row is committed:
//!     let event = MessageEvent::Sent {
//!         message_id: Uuid::now_v7(),
//!         thread_id: Uuid::now_v7(),
//!         sender_id: Uuid::now_v7(),
//!         preview: "Let's ship it".to_string(),
//!         mentions: vec![Uuid::now_v7()],
//!     }
//!     .to_event();
//!
//!     // Fire-and-forget; the request handler does not wait.
//!     let _ = pipeline.spawn(event, NotificationKind::Mention, Arc::new(MentionAudience::new()));
//! }
//! ```

pub mod audience;
pub mod error;
pub mod fanout;
pub mod notification;
pub mod pipeline;
pub mod push;

// Re-export main types
pub use audience::{
    AudienceResolver, MemberAudience, MemberDirectory, MemoryMemberDirectory,
    MemoryWatcherDirectory, MentionAudience, UnionAudience, WatcherAudience, WatcherDirectory,
};
pub use error::{NotifyError, NotifyResult};
pub use fanout::{FanOut, FanOutReport};
pub use notification::{
    MemoryNotificationStore, Notification, NotificationKind, NotificationStore,
};
pub use pipeline::{PipelineReport, SideEffects};
pub use push::{
    HttpPushClient, MemoryPush, NoopPush, PushConfig, PushDelivery, PushError, PushMessage,
    PushOutcome,
};
