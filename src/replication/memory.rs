//! In-memory state store
//!
//! Reference [`StateApplier`] and [`LocalReader`]. Each apply that changes
//! something commits at the next local index; re-applying an equivalent
//! record changes nothing and does not bump the index. A batch is all or
//! nothing.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use super::errors::{ReplicationError, ReplicationResult};
use super::interfaces::{LocalReader, StateApplier};
use crate::structs::{Entity, OpTag, RaftIndex, ReplicatedType};

type Key = (ReplicatedType, String);

#[derive(Debug, Default)]
struct StoreInner {
    index: u64,
    entities: BTreeMap<Key, Entity>,
    rejected: BTreeSet<String>,
    batches: Vec<(OpTag, usize)>,
}

#[derive(Debug, Default)]
pub struct MemoryStateStore {
    inner: Mutex<StoreInner>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Latest committed local index.
    pub fn current_index(&self) -> u64 {
        self.lock().index
    }

    pub fn get(&self, ty: ReplicatedType, id: &str) -> Option<Entity> {
        self.lock().entities.get(&(ty, id.to_string())).cloned()
    }

    pub fn len(&self) -> usize {
        self.lock().entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Refuse every batch containing `id`, as destination validation would.
    pub fn reject_id(&self, id: impl Into<String>) {
        self.lock().rejected.insert(id.into());
    }

    pub fn accept_id(&self, id: &str) {
        self.lock().rejected.remove(id);
    }

    /// Op and size of every apply call received, accepted or not.
    pub fn batches(&self) -> Vec<(OpTag, usize)> {
        self.lock().batches.clone()
    }

    fn apply_locked(inner: &mut StoreInner, entities: Vec<Entity>, op: OpTag) -> ReplicationResult<u64> {
        inner.batches.push((op, entities.len()));

        if let Some(bad) = entities.iter().find(|e| inner.rejected.contains(&e.id())) {
            return Err(ReplicationError::apply(format!(
                "{} {:?} rejected by local validation",
                bad.replicated_type(),
                bad.id()
            )));
        }

        let next = inner.index + 1;
        let mut changed = false;

        match op.normalize() {
            OpTag::Delete => {
                for entity in &entities {
                    let key = (entity.replicated_type(), entity.id());
                    changed |= inner.entities.remove(&key).is_some();
                }
            }
            _ => {
                for mut entity in entities {
                    let key = (entity.replicated_type(), entity.id());
                    let create_index = match inner.entities.get(&key) {
                        Some(existing) if existing.is_same(&entity) => continue,
                        Some(existing) => existing.raft_index().create_index,
                        None => next,
                    };
                    *entity.raft_index_mut() = RaftIndex::new(create_index, next);
                    inner.entities.insert(key, entity);
                    changed = true;
                }
            }
        }

        if changed {
            inner.index = next;
        }
        Ok(inner.index)
    }
}

impl StateApplier for MemoryStateStore {
    async fn apply(&self, entities: Vec<Entity>, op: OpTag) -> ReplicationResult<u64> {
        let mut inner = self.lock();
        Self::apply_locked(&mut inner, entities, op)
    }
}

impl LocalReader for MemoryStateStore {
    async fn lookup(&self, ty: ReplicatedType, id: &str) -> ReplicationResult<Option<Entity>> {
        Ok(self.get(ty, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::AclPolicy;

    fn policy(id: &str, rules: &str, modify_index: u64) -> Entity {
        let mut p = AclPolicy::new(id, format!("policy-{}", id), rules);
        p.raft_index = RaftIndex::new(1, modify_index);
        Entity::Policy(p)
    }

    #[tokio::test]
    async fn test_apply_assigns_local_indices() {
        let store = MemoryStateStore::new();
        let index = store
            .apply(vec![policy("a", "r1", 90), policy("b", "r1", 91)], OpTag::Set)
            .await
            .unwrap();
        assert_eq!(index, 1);
        assert_eq!(store.len(), 2);

        let stored = store.get(ReplicatedType::Policies, "a").unwrap();
        assert_eq!(*stored.raft_index(), RaftIndex::new(1, 1));
    }

    #[tokio::test]
    async fn test_reapply_is_idempotent() {
        let store = MemoryStateStore::new();
        store.apply(vec![policy("a", "r1", 5)], OpTag::Set).await.unwrap();
        let again = store.apply(vec![policy("a", "r1", 7)], OpTag::Set).await.unwrap();
        assert_eq!(again, 1);
        assert_eq!(store.current_index(), 1);
    }

    #[tokio::test]
    async fn test_update_keeps_create_index() {
        let store = MemoryStateStore::new();
        store.apply(vec![policy("a", "r1", 5)], OpTag::Set).await.unwrap();
        store.apply(vec![policy("b", "r1", 5)], OpTag::Set).await.unwrap();
        store.apply(vec![policy("a", "r2", 6)], OpTag::ForceSet).await.unwrap();

        let stored = store.get(ReplicatedType::Policies, "a").unwrap();
        assert_eq!(*stored.raft_index(), RaftIndex::new(1, 3));
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStateStore::new();
        store.apply(vec![policy("a", "r1", 5)], OpTag::Set).await.unwrap();
        let index = store.apply(vec![policy("a", "r1", 5)], OpTag::Delete).await.unwrap();
        assert_eq!(index, 2);
        assert!(store.is_empty());

        let unchanged = store.apply(vec![policy("a", "r1", 5)], OpTag::Delete).await.unwrap();
        assert_eq!(unchanged, 2);
    }

    #[tokio::test]
    async fn test_rejected_batch_applies_nothing() {
        let store = MemoryStateStore::new();
        store.reject_id("bad");
        let err = store
            .apply(vec![policy("ok", "r", 1), policy("bad", "r", 2)], OpTag::Set)
            .await
            .unwrap_err();
        assert!(err.message.contains("bad"));
        assert!(store.is_empty());
        assert_eq!(store.batches(), vec![(OpTag::Set, 2)]);

        store.accept_id("bad");
        store.apply(vec![policy("bad", "r", 2)], OpTag::Set).await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_lookup() {
        let store = MemoryStateStore::new();
        store.apply(vec![policy("a", "r1", 5)], OpTag::Set).await.unwrap();
        assert!(store.lookup(ReplicatedType::Policies, "a").await.unwrap().is_some());
        assert!(store.lookup(ReplicatedType::Roles, "a").await.unwrap().is_none());
    }
}
