//! Identity registry: external weak keys to node ids.
//!
//! The registry is the only owner of the identity mapping for one graph. It
//! never inspects a key beyond `Hash`/`Eq`; "weak" is a property of the
//! modeled program, not of how the registry holds the key.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;

use crate::types::{GraphError, GraphResult, NodeId, NodeKind};

/// An opaque external identity (object, symbol or private name handle).
///
/// Compared only by identity. Implemented for every `Eq + Hash + Clone + Debug`
/// type, so producers usually pass their own handle type directly.
pub trait WeakKey: Eq + Hash + Clone + fmt::Debug {}

impl<T: Eq + Hash + Clone + fmt::Debug> WeakKey for T {}

/// Independent monotonic counters, one per id prefix.
#[derive(Debug, Clone, Default)]
pub struct SequenceCounters {
    next: HashMap<&'static str, u64>,
}

impl SequenceCounters {
    /// Take the next sequence number for `prefix`.
    pub fn next(&mut self, prefix: &'static str) -> u64 {
        let slot = self.next.entry(prefix).or_insert(0);
        let sequence = *slot;
        *slot += 1;
        sequence
    }

    /// How many ids were handed out under `prefix`.
    pub fn issued(&self, prefix: &str) -> u64 {
        self.next.get(prefix).copied().unwrap_or(0)
    }
}

/// Bidirectional mapping between weak keys and node ids.
#[derive(Debug, Clone)]
pub struct IdentityRegistry<K> {
    ids: HashMap<K, NodeId>,
    keys: HashMap<NodeId, K>,
    counters: SequenceCounters,
    pair: Option<(NodeId, NodeId)>,
}

impl<K: WeakKey> Default for IdentityRegistry<K> {
    fn default() -> Self {
        Self {
            ids: HashMap::new(),
            keys: HashMap::new(),
            counters: SequenceCounters::default(),
            pair: None,
        }
    }
}

impl<K: WeakKey> IdentityRegistry<K> {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mint the target and held-values ids together.
    ///
    /// May succeed only once per registry.
    pub fn mint_target_and_held_values(
        &mut self,
        target: K,
        held_values: K,
    ) -> GraphResult<(NodeId, NodeId)> {
        if self.pair.is_some() {
            return Err(GraphError::DuplicateDefinition(
                "target and held values are already defined".to_string(),
            ));
        }
        if target == held_values {
            return Err(GraphError::DuplicateDefinition(format!(
                "target and held values are the same identity: {target:?}"
            )));
        }
        let target_id = self.mint(target, NodeKind::Target.prefix())?;
        let held_id = self.mint(held_values, NodeKind::HeldValues.prefix())?;
        self.pair = Some((target_id.clone(), held_id.clone()));
        Ok((target_id, held_id))
    }

    /// Register `key` under the next id for `prefix`.
    pub fn mint(&mut self, key: K, prefix: &'static str) -> GraphResult<NodeId> {
        if self.ids.contains_key(&key) {
            return Err(GraphError::DuplicateDefinition(format!(
                "weak key already registered: {key:?}"
            )));
        }
        let id = NodeId::new(prefix, self.counters.next(prefix));
        self.ids.insert(key.clone(), id.clone());
        self.keys.insert(id.clone(), key);
        Ok(id)
    }

    /// Allocate an id that has no external identity behind it (tuple nodes).
    pub fn mint_anonymous(&mut self, prefix: &'static str) -> NodeId {
        NodeId::new(prefix, self.counters.next(prefix))
    }

    /// Look up the id of a registered key.
    pub fn id_for(&self, key: &K) -> GraphResult<&NodeId> {
        self.ids
            .get(key)
            .ok_or_else(|| GraphError::NotFound(format!("weak key not registered: {key:?}")))
    }

    /// Look up the key behind an id, if the id belongs to an identity.
    pub fn key_for(&self, id: &NodeId) -> Option<&K> {
        self.keys.get(id)
    }

    /// Whether `key` is registered.
    pub fn contains(&self, key: &K) -> bool {
        self.ids.contains_key(key)
    }

    /// The `(target, held_values)` ids, once minted.
    pub fn target_and_held_values(&self) -> Option<&(NodeId, NodeId)> {
        self.pair.as_ref()
    }

    /// Number of registered identities.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no identity is registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
