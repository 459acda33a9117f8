//! Audience resolution
//!
//! Different entities define "interested parties" differently: a task
//! notifies its watchers, a message notifies the users it mentions, a
//! channel event notifies its members. Each strategy is an injected
//! [`AudienceResolver`] so the fan-out loop never branches on entity kind.

use async_trait::async_trait;
use chorus_events::{EntityKind, Event};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::NotifyResult;

/// Resolves the set of users interested in an event.
///
/// Implementations return recipient user ids only; deduplication and
/// actor exclusion are enforced centrally by the fan-out engine.
#[async_trait]
pub trait AudienceResolver: Send + Sync {
    /// Resolve the audience for an event.
    async fn resolve(&self, event: &Event) -> NotifyResult<HashSet<Uuid>>;
}

/// Read access to watcher relations (user ↔ watchable entity).
///
/// Backed by the application's relational store. The relation carries no
/// ordering or weighting; it exists only to compute audiences.
#[async_trait]
pub trait WatcherDirectory: Send + Sync {
    /// Users watching the given entity.
    async fn watchers_of(&self, kind: EntityKind, entity_id: Uuid) -> NotifyResult<Vec<Uuid>>;
}

/// Read access to channel/project membership.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    /// Users that are members of the given entity.
    async fn members_of(&self, entity_id: Uuid) -> NotifyResult<Vec<Uuid>>;
}

/// Audience: the watchers of the event's topic entity.
pub struct WatcherAudience {
    directory: Arc<dyn WatcherDirectory>,
}

impl WatcherAudience {
    /// Create a watcher-based resolver.
    pub fn new(directory: Arc<dyn WatcherDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AudienceResolver for WatcherAudience {
    async fn resolve(&self, event: &Event) -> NotifyResult<HashSet<Uuid>> {
        let watchers = self
            .directory
            .watchers_of(event.topic.kind(), event.topic.entity_id())
            .await?;
        Ok(watchers.into_iter().collect())
    }
}

/// Audience: the members of the event's topic entity.
pub struct MemberAudience {
    directory: Arc<dyn MemberDirectory>,
}

impl MemberAudience {
    /// Create a membership-based resolver.
    pub fn new(directory: Arc<dyn MemberDirectory>) -> Self {
        Self { directory }
    }
}

#[async_trait]
impl AudienceResolver for MemberAudience {
    async fn resolve(&self, event: &Event) -> NotifyResult<HashSet<Uuid>> {
        let members = self.directory.members_of(event.topic.entity_id()).await?;
        Ok(members.into_iter().collect())
    }
}

/// Audience: user ids listed in the event payload's `mentions` array.
///
/// Events without mentions resolve to an empty audience.
#[derive(Default)]
pub struct MentionAudience;

impl MentionAudience {
    /// Create a mention-based resolver.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudienceResolver for MentionAudience {
    async fn resolve(&self, event: &Event) -> NotifyResult<HashSet<Uuid>> {
        let mentions = event
            .payload
            .get("mentions")
            .and_then(|v| serde_json::from_value::<Vec<Uuid>>(v.clone()).ok())
            .unwrap_or_default();
        Ok(mentions.into_iter().collect())
    }
}

/// Audience: the union of several resolvers.
///
/// Useful when one event interests more than one group, e.g. a reply
/// notifies thread watchers and mentioned users alike.
pub struct UnionAudience {
    resolvers: Vec<Arc<dyn AudienceResolver>>,
}

impl UnionAudience {
    /// Create a union of resolvers.
    pub fn new(resolvers: Vec<Arc<dyn AudienceResolver>>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl AudienceResolver for UnionAudience {
    async fn resolve(&self, event: &Event) -> NotifyResult<HashSet<Uuid>> {
        let mut audience = HashSet::new();
        for resolver in &self.resolvers {
            audience.extend(resolver.resolve(event).await?);
        }
        Ok(audience)
    }
}

/// In-memory watcher directory.
#[derive(Default)]
pub struct MemoryWatcherDirectory {
    watchers: Arc<RwLock<HashMap<(EntityKind, Uuid), HashSet<Uuid>>>>,
}

impl MemoryWatcherDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a watcher to an entity.
    pub async fn add_watcher(&self, kind: EntityKind, entity_id: Uuid, user_id: Uuid) {
        let mut watchers = self.watchers.write().await;
        watchers.entry((kind, entity_id)).or_default().insert(user_id);
    }

    /// Remove a watcher from an entity.
    pub async fn remove_watcher(&self, kind: EntityKind, entity_id: Uuid, user_id: Uuid) {
        let mut watchers = self.watchers.write().await;
        if let Some(set) = watchers.get_mut(&(kind, entity_id)) {
            set.remove(&user_id);
        }
    }
}

#[async_trait]
impl WatcherDirectory for MemoryWatcherDirectory {
    async fn watchers_of(&self, kind: EntityKind, entity_id: Uuid) -> NotifyResult<Vec<Uuid>> {
        let watchers = self.watchers.read().await;
        Ok(watchers
            .get(&(kind, entity_id))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }
}

/// In-memory member directory.
#[derive(Default)]
pub struct MemoryMemberDirectory {
    members: Arc<RwLock<HashMap<Uuid, HashSet<Uuid>>>>,
}

impl MemoryMemberDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member to an entity.
    pub async fn add_member(&self, entity_id: Uuid, user_id: Uuid) {
        let mut members = self.members.write().await;
        members.entry(entity_id).or_default().insert(user_id);
    }
}

#[async_trait]
impl MemberDirectory for MemoryMemberDirectory {
    async fn members_of(&self, entity_id: Uuid) -> NotifyResult<Vec<Uuid>> {
        let members = self.members.read().await;
        Ok(members
            .get(&entity_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }
}
