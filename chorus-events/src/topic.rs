//! Broadcast topics
//!
//! A topic is the string key of one logical broadcast group: the set of
//! connected clients watching a single thread, channel, call, or user inbox.
//! Topics are a pure function of the owning entity's kind and id, so a
//! publisher and a late subscriber always compute the same key.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Kinds of entities that own a broadcast group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A channel and its member list
    Channel,
    /// A message thread within a channel
    Thread,
    /// A task and its watchers
    Task,
    /// A project workspace
    Project,
    /// A single user's private feed (notifications, DM previews)
    User,
    /// A direct-message conversation
    Dm,
    /// A voice/video call room
    Call,
}

impl EntityKind {
    /// Stable string tag used in topic keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Channel => "channel",
            EntityKind::Thread => "thread",
            EntityKind::Task => "task",
            EntityKind::Project => "project",
            EntityKind::User => "user",
            EntityKind::Dm => "dm",
            EntityKind::Call => "call",
        }
    }

    /// Parse a kind from its topic tag.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "channel" => Some(EntityKind::Channel),
            "thread" => Some(EntityKind::Thread),
            "task" => Some(EntityKind::Task),
            "project" => Some(EntityKind::Project),
            "user" => Some(EntityKind::User),
            "dm" => Some(EntityKind::Dm),
            "call" => Some(EntityKind::Call),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing a topic from its string form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicParseError {
    /// Missing the `kind:id` separator
    #[error("Topic is missing the ':' separator: {0}")]
    MissingSeparator(String),

    /// Unknown entity kind tag
    #[error("Unknown entity kind: {0}")]
    UnknownKind(String),

    /// Entity id is not a UUID
    #[error("Invalid entity id: {0}")]
    InvalidId(String),
}

/// A broadcast group key, rendered as `{kind}:{id}`.
///
/// The mapping from entity to topic is stable for the lifetime of the
/// entity, e.g. `thread:0192f3a4-...` for a given thread id.
///
/// # Examples
///
/// ```
/// use chorus_events::{EntityKind, Topic};
/// use uuid::Uuid;
///
/// let id = Uuid::now_v7();
/// let topic = Topic::new(EntityKind::Thread, id);
/// assert_eq!(topic.to_string(), format!("thread:{id}"));
/// assert_eq!(topic.to_string().parse::<Topic>(), Ok(topic));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Topic {
    kind: EntityKind,
    entity_id: Uuid,
}

impl Topic {
    /// Create the topic for an entity.
    pub fn new(kind: EntityKind, entity_id: Uuid) -> Self {
        Self { kind, entity_id }
    }

    /// Topic for a channel.
    pub fn channel(id: Uuid) -> Self {
        Self::new(EntityKind::Channel, id)
    }

    /// Topic for a message thread.
    pub fn thread(id: Uuid) -> Self {
        Self::new(EntityKind::Thread, id)
    }

    /// Topic for a task.
    pub fn task(id: Uuid) -> Self {
        Self::new(EntityKind::Task, id)
    }

    /// Topic for a project.
    pub fn project(id: Uuid) -> Self {
        Self::new(EntityKind::Project, id)
    }

    /// Topic for a user's private feed.
    pub fn user(id: Uuid) -> Self {
        Self::new(EntityKind::User, id)
    }

    /// Topic for a direct-message conversation.
    pub fn dm(id: Uuid) -> Self {
        Self::new(EntityKind::Dm, id)
    }

    /// Topic for a call room.
    pub fn call(id: Uuid) -> Self {
        Self::new(EntityKind::Call, id)
    }

    /// The kind of entity that owns this broadcast group.
    pub fn kind(&self) -> EntityKind {
        self.kind
    }

    /// The id of the entity that owns this broadcast group.
    pub fn entity_id(&self) -> Uuid {
        self.entity_id
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.entity_id)
    }
}

impl FromStr for Topic {
    type Err = TopicParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (tag, id) = s
            .split_once(':')
            .ok_or_else(|| TopicParseError::MissingSeparator(s.to_string()))?;

        let kind =
            EntityKind::parse(tag).ok_or_else(|| TopicParseError::UnknownKind(tag.to_string()))?;

        let entity_id = Uuid::parse_str(id)
            .map_err(|_| TopicParseError::InvalidId(id.to_string()))?;

        Ok(Self { kind, entity_id })
    }
}

impl Serialize for Topic {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Topic {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Check if a topic string matches a subscription pattern.
///
/// Patterns are `:`-separated:
/// - `*` matches exactly one segment
/// - `#` matches zero or more segments
///
/// Examples:
/// - `thread:*` matches every thread topic
/// - `#` matches every topic
pub fn pattern_matches(pattern: &str, topic: &str) -> bool {
    let pattern_parts: Vec<&str> = pattern.split(':').collect();
    let topic_parts: Vec<&str> = topic.split(':').collect();

    let mut p_idx = 0;
    let mut t_idx = 0;

    while p_idx < pattern_parts.len() && t_idx < topic_parts.len() {
        match pattern_parts[p_idx] {
            "*" => {
                p_idx += 1;
                t_idx += 1;
            }
            "#" => {
                if p_idx == pattern_parts.len() - 1 {
                    // # at end matches everything remaining
                    return true;
                }
                for i in t_idx..=topic_parts.len() {
                    if pattern_matches(
                        &pattern_parts[p_idx + 1..].join(":"),
                        &topic_parts[i..].join(":"),
                    ) {
                        return true;
                    }
                }
                return false;
            }
            segment => {
                if segment != topic_parts[t_idx] {
                    return false;
                }
                p_idx += 1;
                t_idx += 1;
            }
        }
    }

    // Handle trailing # in pattern
    if p_idx < pattern_parts.len() && pattern_parts[p_idx] == "#" {
        p_idx += 1;
    }

    p_idx == pattern_parts.len() && t_idx == topic_parts.len()
}
