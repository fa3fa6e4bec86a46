//! Definition API: how producers populate a [`GraphStore`].
//!
//! Every operation here is valid only while the store accepts definitions.
//! Identities must be registered before they appear on either end of an edge.
//! Multi-party relationships (map entries, finalization registrations,
//! private fields) go through a tuple node so each edge has at most two joint
//! owners.

use super::{GraphState, GraphStore};
use crate::registry::WeakKey;
use crate::types::{
    EdgeDescriptor, EdgeId, EdgeType, FinalizationEntry, GraphEdge, GraphError, GraphNode,
    GraphResult, JointOwners, KeyValueEntry, NodeId, NodeKind, PrivateFieldEntry, TupleIds,
    ValueRef,
};

/// Render the primitive parts of a tuple, e.g. `key=42`.
fn describe_primitives(parts: &[(&str, Option<&str>)]) -> Option<String> {
    let rendered: Vec<String> = parts
        .iter()
        .filter_map(|(name, value)| value.map(|v| format!("{name}={v}")))
        .collect();
    if rendered.is_empty() {
        None
    } else {
        Some(rendered.join(", "))
    }
}

impl<K: WeakKey, M> GraphStore<K, M> {
    // ── identities ──────────────────────────────────────────────────────────

    /// Define the target and held-values nodes.
    ///
    /// Must be the first call on a store, and may happen only once.
    pub fn define_target_and_held_values(
        &mut self,
        target: K,
        target_metadata: M,
        held_values: K,
        held_values_metadata: M,
    ) -> GraphResult<(NodeId, NodeId)> {
        let result = self.define_target_and_held_values_inner(
            target,
            target_metadata,
            held_values,
            held_values_metadata,
        );
        self.guarded(result)
    }

    fn define_target_and_held_values_inner(
        &mut self,
        target: K,
        target_metadata: M,
        held_values: K,
        held_values_metadata: M,
    ) -> GraphResult<(NodeId, NodeId)> {
        const OP: &str = "define_target_and_held_values";
        self.require(OP, |_| true)?;
        if self.registry.target_and_held_values().is_some() {
            return Err(GraphError::DuplicateDefinition(
                "target and held values are already defined".to_string(),
            ));
        }
        self.require(OP, |s| s == GraphState::AwaitingTargetAndHeldValues)?;
        self.ensure_budget(2, 0)?;

        let (target_id, held_id) = self.registry.mint_target_and_held_values(target, held_values)?;
        self.insert_node(GraphNode::new(target_id.clone(), NodeKind::Target, target_metadata))?;
        self.insert_node(GraphNode::new(
            held_id.clone(),
            NodeKind::HeldValues,
            held_values_metadata,
        ))?;
        self.state.set(GraphState::AcceptingDefinitions);
        Ok((target_id, held_id))
    }

    /// Define a plain object identity.
    pub fn define_object(&mut self, key: K, metadata: M) -> GraphResult<NodeId> {
        let result = self.define_identity("define_object", key, NodeKind::Object, metadata);
        self.guarded(result)
    }

    /// Define a symbol identity.
    pub fn define_symbol(&mut self, key: K, metadata: M) -> GraphResult<NodeId> {
        let result = self.define_identity("define_symbol", key, NodeKind::Symbol, metadata);
        self.guarded(result)
    }

    /// Define a private-name identity.
    pub fn define_private_name(&mut self, key: K, metadata: M) -> GraphResult<NodeId> {
        let result =
            self.define_identity("define_private_name", key, NodeKind::PrivateName, metadata);
        self.guarded(result)
    }

    fn define_identity(
        &mut self,
        operation: &'static str,
        key: K,
        kind: NodeKind,
        metadata: M,
    ) -> GraphResult<NodeId> {
        self.require_accepting(operation)?;
        self.ensure_budget(1, 0)?;
        let id = self.registry.mint(key, kind.prefix())?;
        self.insert_node(GraphNode::new(id.clone(), kind, metadata))?;
        Ok(id)
    }

    // ── two-party edges ─────────────────────────────────────────────────────

    /// `parent` holds `child` in a data property.
    pub fn define_property_value(
        &mut self,
        parent: &K,
        child: &K,
        descriptor: EdgeDescriptor<M>,
    ) -> GraphResult<EdgeId> {
        let result = self.define_simple_edge(
            "define_property_value",
            EdgeType::PropertyValue,
            parent,
            child,
            None,
            descriptor,
        );
        self.guarded(result)
    }

    /// `parent` has an accessor property whose getter is `getter`.
    pub fn define_property_getter(
        &mut self,
        parent: &K,
        getter: &K,
        descriptor: EdgeDescriptor<M>,
    ) -> GraphResult<EdgeId> {
        let result = self.define_simple_edge(
            "define_property_getter",
            EdgeType::PropertyGetter,
            parent,
            getter,
            None,
            descriptor,
        );
        self.guarded(result)
    }

    /// `parent` uses the symbol `symbol` as a property key.
    pub fn define_symbol_key(
        &mut self,
        parent: &K,
        symbol: &K,
        descriptor: EdgeDescriptor<M>,
    ) -> GraphResult<EdgeId> {
        let result = self.define_simple_edge(
            "define_symbol_key",
            EdgeType::SymbolKey,
            parent,
            symbol,
            Some(NodeKind::Symbol),
            descriptor,
        );
        self.guarded(result)
    }

    /// `instance` refers to its constructor `constructor`.
    pub fn define_constructor_of(
        &mut self,
        instance: &K,
        constructor: &K,
        descriptor: EdgeDescriptor<M>,
    ) -> GraphResult<EdgeId> {
        let result = self.define_simple_edge(
            "define_constructor_of",
            EdgeType::ConstructorOf,
            instance,
            constructor,
            None,
            descriptor,
        );
        self.guarded(result)
    }

    /// Closure `function` captures `value` from an enclosing scope.
    pub fn define_scope_value(
        &mut self,
        function: &K,
        value: &K,
        descriptor: EdgeDescriptor<M>,
    ) -> GraphResult<EdgeId> {
        let result = self.define_simple_edge(
            "define_scope_value",
            EdgeType::ScopeValue,
            function,
            value,
            None,
            descriptor,
        );
        self.guarded(result)
    }

    /// `parent` refers to `child` through an internal slot.
    ///
    /// A weak-reference target slot is the usual weak case.
    pub fn define_internal_slot(
        &mut self,
        parent: &K,
        child: &K,
        descriptor: EdgeDescriptor<M>,
    ) -> GraphResult<EdgeId> {
        let result = self.define_simple_edge(
            "define_internal_slot",
            EdgeType::InternalSlot,
            parent,
            child,
            None,
            descriptor,
        );
        self.guarded(result)
    }

    /// `set` contains `element`; weak for weak-set semantics.
    pub fn define_set_element(
        &mut self,
        set: &K,
        element: &K,
        descriptor: EdgeDescriptor<M>,
    ) -> GraphResult<EdgeId> {
        let result = self.define_simple_edge(
            "define_set_element",
            EdgeType::SetElement,
            set,
            element,
            None,
            descriptor,
        );
        self.guarded(result)
    }

    fn define_simple_edge(
        &mut self,
        operation: &'static str,
        edge_type: EdgeType,
        parent: &K,
        child: &K,
        child_kind: Option<NodeKind>,
        descriptor: EdgeDescriptor<M>,
    ) -> GraphResult<EdgeId> {
        self.require_accepting(operation)?;
        let parent_id = self.registry.id_for(parent)?.clone();
        let child_id = self.registry.id_for(child)?.clone();
        if let Some(expected) = child_kind {
            self.expect_kind(&child_id, expected, edge_type)?;
        }
        self.ensure_budget(0, 1)?;
        self.insert_edge(edge_type, parent_id, child_id, None, descriptor)
    }

    // ── tuples ──────────────────────────────────────────────────────────────

    /// `map` holds one key-value entry.
    ///
    /// Decomposes into map → tuple, tuple → key (strong only when
    /// `is_strong_reference_to_key`) and tuple → value owned jointly by the
    /// tuple and the key. A primitive key must be strongly referenced, and at
    /// least one side must be an identity.
    pub fn define_map_key_value_tuple(
        &mut self,
        map: &K,
        entry: KeyValueEntry<K, M>,
    ) -> GraphResult<TupleIds>
    where
        M: Clone,
    {
        let result = self.define_map_key_value_tuple_inner(map, entry);
        self.guarded(result)
    }

    fn define_map_key_value_tuple_inner(
        &mut self,
        map: &K,
        entry: KeyValueEntry<K, M>,
    ) -> GraphResult<TupleIds>
    where
        M: Clone,
    {
        self.require_accepting("define_map_key_value_tuple")?;
        let map_id = self.registry.id_for(map)?.clone();
        let key_id = self.optional_id(&entry.key)?;
        let value_id = self.optional_id(&entry.value)?;

        if key_id.is_none() && value_id.is_none() {
            return Err(GraphError::Invariant(format!(
                "map entry on {map_id} has neither an identity key nor an identity value"
            )));
        }
        if let ValueRef::Primitive(description) = &entry.key {
            if !entry.is_strong_reference_to_key {
                return Err(GraphError::Invariant(format!(
                    "primitive map key {description} on {map_id} must be strongly referenced"
                )));
            }
        }
        let key_metadata = Self::side_metadata(&key_id, entry.key_metadata, "map key")?;
        let value_metadata = Self::side_metadata(&value_id, entry.value_metadata, "map value")?;

        let description = describe_primitives(&[
            ("key", entry.key.as_primitive()),
            ("value", entry.value.as_primitive()),
        ]);
        let part_count = usize::from(key_id.is_some()) + usize::from(value_id.is_some());
        self.ensure_budget(1, 1 + part_count)?;
        let (tuple, container_edge) = self.insert_tuple(
            NodeKind::KeyValueTuple,
            EdgeType::MapToTuple,
            map_id,
            "entry",
            description,
            entry.tuple_metadata,
        )?;

        let mut part_edges = Vec::new();
        if let (Some(key_id), Some(metadata)) = (&key_id, key_metadata) {
            let descriptor = EdgeDescriptor {
                label: "key".to_string(),
                value_description: None,
                metadata,
                is_strong_reference: entry.is_strong_reference_to_key,
            };
            let id = self.insert_edge(EdgeType::MapKey, tuple.clone(), key_id.clone(), None, descriptor)?;
            part_edges.push((EdgeType::MapKey, id));
        }
        if let (Some(value_id), Some(metadata)) = (value_id, value_metadata) {
            let id = self.insert_edge(
                EdgeType::MapValue,
                tuple.clone(),
                value_id,
                key_id,
                EdgeDescriptor::strong("value", metadata),
            )?;
            part_edges.push((EdgeType::MapValue, id));
        }

        Ok(TupleIds {
            tuple,
            container_edge,
            part_edges,
        })
    }

    /// `registry` holds one finalization registration.
    ///
    /// Decomposes into registry → tuple, a weak tuple → target, a strong
    /// tuple → held value and a weak tuple → unregister token.
    pub fn define_finalization_tuple(
        &mut self,
        registry: &K,
        entry: FinalizationEntry<K, M>,
    ) -> GraphResult<TupleIds>
    where
        M: Clone,
    {
        let result = self.define_finalization_tuple_inner(registry, entry);
        self.guarded(result)
    }

    fn define_finalization_tuple_inner(
        &mut self,
        registry: &K,
        entry: FinalizationEntry<K, M>,
    ) -> GraphResult<TupleIds>
    where
        M: Clone,
    {
        self.require_accepting("define_finalization_tuple")?;
        let registry_id = self.registry.id_for(registry)?.clone();
        let target_id = self.registry.id_for(&entry.target)?.clone();
        let held_id = self.optional_id(&entry.held_value)?;
        let token_id = match &entry.unregister_token {
            Some(token) => Some(self.registry.id_for(token)?.clone()),
            None => None,
        };
        let held_metadata =
            Self::side_metadata(&held_id, entry.held_value_metadata, "finalization held value")?;
        let token_metadata = Self::side_metadata(
            &token_id,
            entry.unregister_token_metadata,
            "finalization unregister token",
        )?;

        let description = describe_primitives(&[("heldValue", entry.held_value.as_primitive())]);
        let part_count = 1 + usize::from(held_id.is_some()) + usize::from(token_id.is_some());
        self.ensure_budget(1, 1 + part_count)?;
        let (tuple, container_edge) = self.insert_tuple(
            NodeKind::FinalizationTuple,
            EdgeType::FinalizationRegistryToTuple,
            registry_id,
            "registration",
            description,
            entry.tuple_metadata,
        )?;

        let mut part_edges = Vec::new();
        let id = self.insert_edge(
            EdgeType::FinalizationToTarget,
            tuple.clone(),
            target_id,
            None,
            EdgeDescriptor::weak("target", entry.target_metadata),
        )?;
        part_edges.push((EdgeType::FinalizationToTarget, id));

        if let (Some(held_id), Some(metadata)) = (held_id, held_metadata) {
            let id = self.insert_edge(
                EdgeType::FinalizationToHeldValue,
                tuple.clone(),
                held_id,
                None,
                EdgeDescriptor::strong("heldValue", metadata),
            )?;
            part_edges.push((EdgeType::FinalizationToHeldValue, id));
        }
        if let (Some(token_id), Some(metadata)) = (token_id, token_metadata) {
            let id = self.insert_edge(
                EdgeType::FinalizationToUnregisterToken,
                tuple.clone(),
                token_id,
                None,
                EdgeDescriptor::weak("unregisterToken", metadata),
            )?;
            part_edges.push((EdgeType::FinalizationToUnregisterToken, id));
        }

        Ok(TupleIds {
            tuple,
            container_edge,
            part_edges,
        })
    }

    /// `object` carries a private field (or private getter).
    ///
    /// Decomposes into object → tuple, tuple → private name, and tuple →
    /// value owned jointly by the tuple and the private name.
    pub fn define_private_field_tuple(
        &mut self,
        object: &K,
        entry: PrivateFieldEntry<K, M>,
    ) -> GraphResult<TupleIds>
    where
        M: Clone,
    {
        let result = self.define_private_field_tuple_inner(object, entry);
        self.guarded(result)
    }

    fn define_private_field_tuple_inner(
        &mut self,
        object: &K,
        entry: PrivateFieldEntry<K, M>,
    ) -> GraphResult<TupleIds>
    where
        M: Clone,
    {
        self.require_accepting("define_private_field_tuple")?;
        let object_id = self.registry.id_for(object)?.clone();
        let name_id = self.registry.id_for(&entry.private_name)?.clone();
        self.expect_kind(&name_id, NodeKind::PrivateName, EdgeType::PrivateKey)?;
        let value_id = self.optional_id(&entry.value)?;
        if entry.is_getter && value_id.is_none() {
            return Err(GraphError::Invariant(format!(
                "private getter on {object_id} must be a function identity"
            )));
        }
        let value_metadata =
            Self::side_metadata(&value_id, entry.value_metadata, "private field value")?;

        let description = describe_primitives(&[("value", entry.value.as_primitive())]);
        self.ensure_budget(1, 2 + usize::from(value_id.is_some()))?;
        let (tuple, container_edge) = self.insert_tuple(
            NodeKind::PrivateFieldTuple,
            EdgeType::ObjectToPrivateTuple,
            object_id,
            "privateField",
            description,
            entry.tuple_metadata,
        )?;

        let mut part_edges = Vec::new();
        let id = self.insert_edge(
            EdgeType::PrivateKey,
            tuple.clone(),
            name_id.clone(),
            None,
            EdgeDescriptor::strong("privateName", entry.key_metadata),
        )?;
        part_edges.push((EdgeType::PrivateKey, id));

        if let (Some(value_id), Some(metadata)) = (value_id, value_metadata) {
            let (edge_type, label) = if entry.is_getter {
                (EdgeType::PrivateGetter, "get")
            } else {
                (EdgeType::PrivateValue, "value")
            };
            let id = self.insert_edge(
                edge_type,
                tuple.clone(),
                value_id,
                Some(name_id),
                EdgeDescriptor::strong(label, metadata),
            )?;
            part_edges.push((edge_type, id));
        }

        Ok(TupleIds {
            tuple,
            container_edge,
            part_edges,
        })
    }

    // ── plumbing ────────────────────────────────────────────────────────────

    fn optional_id(&self, value: &ValueRef<K>) -> GraphResult<Option<NodeId>> {
        match value {
            ValueRef::Identity(key) => Ok(Some(self.registry.id_for(key)?.clone())),
            ValueRef::Primitive(_) => Ok(None),
        }
    }

    /// An identity side needs its own metadata; a primitive side has no edge.
    fn side_metadata(id: &Option<NodeId>, metadata: Option<M>, side: &str) -> GraphResult<Option<M>> {
        match (id, metadata) {
            (Some(id), None) => Err(GraphError::Invariant(format!(
                "missing {side} metadata for {id}"
            ))),
            (Some(_), metadata) => Ok(metadata),
            (None, _) => Ok(None),
        }
    }

    fn expect_kind(&self, id: &NodeId, expected: NodeKind, edge_type: EdgeType) -> GraphResult<()> {
        let actual = self
            .graph
            .node(id)
            .map(|node| node.kind)
            .ok_or_else(|| GraphError::NotFound(format!("node {id}")))?;
        if actual != expected {
            return Err(GraphError::Invariant(format!(
                "{edge_type} edge requires a {expected} node, got {id}"
            )));
        }
        Ok(())
    }

    fn ensure_budget(&self, nodes: usize, edges: usize) -> GraphResult<()> {
        if self.graph.node_count().saturating_add(nodes) > self.config.max_nodes {
            return Err(GraphError::Invariant(format!(
                "node budget of {} exceeded",
                self.config.max_nodes
            )));
        }
        if self.graph.edge_count().saturating_add(edges) > self.config.max_edges {
            return Err(GraphError::Invariant(format!(
                "edge budget of {} exceeded",
                self.config.max_edges
            )));
        }
        Ok(())
    }

    fn insert_tuple(
        &mut self,
        kind: NodeKind,
        container_edge_type: EdgeType,
        container: NodeId,
        label: &str,
        value_description: Option<String>,
        metadata: M,
    ) -> GraphResult<(NodeId, EdgeId)>
    where
        M: Clone,
    {
        let tuple = self.registry.mint_anonymous(kind.prefix());
        self.insert_node(GraphNode::new(tuple.clone(), kind, metadata.clone()))?;
        let descriptor = EdgeDescriptor {
            label: label.to_string(),
            value_description,
            metadata,
            is_strong_reference: true,
        };
        let edge = self.insert_edge(container_edge_type, container, tuple.clone(), None, descriptor)?;
        Ok((tuple, edge))
    }

    fn insert_node(&mut self, node: GraphNode<M>) -> GraphResult<()> {
        let id = node.id.clone();
        self.graph.add_node(node)?;
        if let Some(node) = self.graph.node(&id) {
            tracing::debug!(id = %node.id, kind = %node.kind, "Defined node");
            self.hooks.node_defined(node);
        }
        Ok(())
    }

    fn insert_edge(
        &mut self,
        edge_type: EdgeType,
        from: NodeId,
        to: NodeId,
        second_owner: Option<NodeId>,
        descriptor: EdgeDescriptor<M>,
    ) -> GraphResult<EdgeId> {
        let prefix = edge_type.prefix();
        let id = EdgeId::new(prefix, self.edge_counters.next(prefix));
        let joint_owners = JointOwners::with_second(from.clone(), second_owner);

        self.tracker
            .define_edge(
                to.clone(),
                joint_owners.iter().cloned(),
                id.clone(),
                descriptor.is_strong_reference,
            )
            .map_err(|err| self.ownership_error("define_edge", err))?;

        let edge = GraphEdge {
            id: id.clone(),
            edge_type,
            from,
            to,
            label: descriptor.label,
            value_description: descriptor.value_description,
            metadata: descriptor.metadata,
            is_strong_reference: descriptor.is_strong_reference,
            joint_owners,
        };
        self.graph.add_edge(edge)?;
        if let Some(edge) = self.graph.edge(&id) {
            tracing::debug!(
                id = %edge.id,
                from = %edge.from,
                to = %edge.to,
                strong = edge.is_strong_reference,
                owners = edge.joint_owners.len(),
                "Defined edge"
            );
            self.hooks.edge_defined(edge);
        }
        Ok(id)
    }
}
