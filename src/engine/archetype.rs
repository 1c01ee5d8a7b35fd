//! Archetype Nodes and Cached Transition Edges
//!
//! ## Purpose
//!
//! An [`Archetype`] is a node in the structural transition graph: one node
//! per distinct *set* of component types. Entities holding the same
//! component set share a node, and a node records which registered queries
//! its entities belong to, so adding or removing one component resolves to a
//! precomputed query-membership delta instead of a scan.
//!
//! ## Identity
//!
//! Archetype identity is canonical over the component *set*: the id list is
//! kept sorted and hashed with FNV-1a, so any permutation of the same types
//! produces the same [`hash`](Archetype::hash) and resolves to the same
//! node. Component data never lives here; pools are world-global and indexed
//! by entity slot, so a transition between nodes moves no data.
//!
//! ## Edges
//!
//! Each node memoizes its structural neighbors in [`Edge`] records keyed by
//! the component being added or removed. An edge stores the target node and
//! the exact query ids to join and to leave, computed once on the first
//! transition and replayed on every later one. Edges are invalidated when a
//! query registers after the fact, since cached deltas predating the query
//! would omit it.
//!
//! Archetype nodes are never garbage collected; an empty node costs a
//! signature and an edge map, and keeping it preserves its warmed edges.

use std::collections::HashMap;

use crate::engine::bitmask::Bitmask;
use crate::engine::types::{ArchetypeId, ComponentId, QueryId};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;


/// FNV-1a over a sorted component-id list.
///
/// Callers must sort first; the canonical property (permutations of one set
/// hash identically) comes from hashing the sorted order.
pub fn archetype_hash(sorted_ids: &[ComponentId]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &id in sorted_ids {
        for byte in id.to_le_bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Signed edge key: positive for add, negative for remove, offset by one so
/// component id 0 is representable on both sides.
#[inline]
pub fn edge_key(component_id: ComponentId, add: bool) -> i32 {
    let k = component_id as i32 + 1;
    if add { k } else { -k }
}

/// A memoized structural transition to a neighboring archetype.
#[derive(Clone, Debug)]
pub struct Edge {
    /// Node an entity lands in after the transition.
    pub target: ArchetypeId,
    /// Queries the entity joins.
    pub queries_to_add: Vec<QueryId>,
    /// Queries the entity leaves.
    pub queries_to_remove: Vec<QueryId>,
}

/// One node of the structural transition graph.
pub struct Archetype {
    /// Dense id of this node within its world.
    pub id: ArchetypeId,
    /// Canonical FNV-1a hash of the sorted component-id list.
    pub hash: u64,
    /// Bitmask over component ids, used for query matching.
    pub signature: Bitmask,
    /// Sorted component-id list, the hashed identity.
    pub component_ids: Vec<ComponentId>,
    /// Queries whose filters this node satisfies.
    pub matched_queries: Vec<QueryId>,
    /// Cached structural transitions keyed by [`edge_key`].
    pub edges: HashMap<i32, Edge>,
}

impl Archetype {
    /// Builds a node from a sorted id list.
    ///
    /// `signature_bits` is the registry's component count, the width every
    /// signature in the world shares.
    pub fn new(id: ArchetypeId, sorted_ids: Vec<ComponentId>, signature_bits: usize) -> Self {
        debug_assert!(sorted_ids.windows(2).all(|w| w[0] < w[1]));
        let mut signature = Bitmask::new(signature_bits);
        for &cid in &sorted_ids {
            // ids come from the registry, always below its len
            let _ = signature.add(cid as usize);
        }
        Self {
            id,
            hash: archetype_hash(&sorted_ids),
            signature,
            component_ids: sorted_ids,
            matched_queries: Vec::new(),
            edges: HashMap::new(),
        }
    }

    /// Returns `true` when the node's set contains `component_id`.
    #[inline]
    pub fn contains(&self, component_id: ComponentId) -> bool {
        self.component_ids.binary_search(&component_id).is_ok()
    }

    /// Sorted id list with `component_id` inserted.
    pub fn ids_with(&self, component_id: ComponentId) -> Vec<ComponentId> {
        let mut ids = self.component_ids.clone();
        if let Err(at) = ids.binary_search(&component_id) {
            ids.insert(at, component_id);
        }
        ids
    }

    /// Sorted id list with `component_id` removed.
    pub fn ids_without(&self, component_id: ComponentId) -> Vec<ComponentId> {
        let mut ids = self.component_ids.clone();
        if let Ok(at) = ids.binary_search(&component_id) {
            ids.remove(at);
        }
        ids
    }

    /// Drops every cached edge.
    ///
    /// Called when a query registers late: existing deltas would omit it.
    pub fn invalidate_edges(&mut self) {
        self.edges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_canonical_over_permutations() {
        let mut a = vec![4u16, 1, 9];
        let mut b = vec![9u16, 4, 1];
        a.sort_unstable();
        b.sort_unstable();
        assert_eq!(archetype_hash(&a), archetype_hash(&b));
        assert_ne!(archetype_hash(&a), archetype_hash(&[1, 4]));
        assert_ne!(archetype_hash(&[]), archetype_hash(&[0]));
    }

    #[test]
    fn edge_keys_distinguish_add_and_remove_for_id_zero() {
        assert_eq!(edge_key(0, true), 1);
        assert_eq!(edge_key(0, false), -1);
        assert_ne!(edge_key(0, true), edge_key(0, false));
        assert_eq!(edge_key(5, true), 6);
        assert_eq!(edge_key(5, false), -6);
    }

    #[test]
    fn id_list_edits_stay_sorted() {
        let node = Archetype::new(0, vec![1, 4, 9], 16);
        assert_eq!(node.ids_with(5), vec![1, 4, 5, 9]);
        assert_eq!(node.ids_with(4), vec![1, 4, 9]);
        assert_eq!(node.ids_without(4), vec![1, 9]);
        assert_eq!(node.ids_without(7), vec![1, 4, 9]);
        assert!(node.contains(9));
        assert!(!node.contains(2));
    }

    #[test]
    fn signature_mirrors_id_list() {
        let node = Archetype::new(0, vec![0, 3], 8);
        assert!(node.signature.has(0).unwrap());
        assert!(node.signature.has(3).unwrap());
        assert!(!node.signature.has(1).unwrap());
        assert_eq!(node.signature.count(), 2);
    }
}
