// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-airquality project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Node registry
//!
//! Thread-safe registry of polled devices. Each node is reference counted:
//! every consumer that needs the device registers it once, and the node is
//! removed (and polling for it stops) when the last reference is released.
//! The address and offsets recorded at first registration are authoritative
//! for the node's lifetime; changing them requires unregister + re-register.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Connection and registration state for one polled device
#[derive(Debug, Clone)]
pub struct RegisteredNode {
    /// Stable sensor identifier
    pub id: String,
    /// Network address of the device's local HTTP endpoint
    pub address: String,
    /// Signed temperature offset in °F (vendor default −8)
    pub temp_offset: i64,
    /// Signed humidity offset in percent (vendor default +4)
    pub humidity_offset: i64,
    /// Number of consumers currently holding this node
    pub reference_count: u32,
    /// Whether the most recent poll of this node succeeded
    pub last_success: bool,
}

/// Registry of all currently polled devices
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, RegisteredNode>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    /// Register a consumer for a node.
    ///
    /// An unknown id creates the node with `reference_count = 1`; a known
    /// id only increments the count and keeps the existing address and
    /// offsets, which are authoritative.
    pub fn register(&mut self, id: &str, address: &str, temp_offset: i64, humidity_offset: i64) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.reference_count += 1;
            return;
        }

        self.nodes.insert(
            id.to_string(),
            RegisteredNode {
                id: id.to_string(),
                address: address.to_string(),
                temp_offset,
                humidity_offset,
                reference_count: 1,
                last_success: false,
            },
        );
    }

    /// Release one consumer's reference to a node.
    ///
    /// Returns `true` when this was the last reference and the node was
    /// removed; the caller is then responsible for dropping any cached
    /// reading. Unregistering an unknown id is a no-op.
    pub fn unregister(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.get_mut(id) else {
            return false;
        };

        node.reference_count = node.reference_count.saturating_sub(1);
        if node.reference_count == 0 {
            self.nodes.remove(id);
            return true;
        }
        false
    }

    /// True iff the node is present with at least one live reference
    pub fn is_registered(&self, id: &str) -> bool {
        self.nodes
            .get(id)
            .map(|node| node.reference_count > 0)
            .unwrap_or(false)
    }

    /// Record the outcome of the most recent poll for a node.
    ///
    /// A node that disappeared since the poll started is ignored.
    pub fn mark_result(&mut self, id: &str, success: bool) {
        if let Some(node) = self.nodes.get_mut(id) {
            node.last_success = success;
        }
    }

    /// Whether the most recent poll of a node succeeded
    pub fn last_success(&self, id: &str) -> Option<bool> {
        self.nodes.get(id).map(|node| node.last_success)
    }

    /// Clone the current set of registered nodes for one poll tick
    pub fn snapshot(&self) -> Vec<RegisteredNode> {
        self.nodes.values().cloned().collect()
    }

    /// Number of registered nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when no nodes are registered
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Type alias for the registry wrapped in Arc<RwLock<>>
pub type SharedNodeRegistry = Arc<RwLock<NodeRegistry>>;

/// Create a new shared node registry instance
pub fn create_shared_node_registry() -> SharedNodeRegistry {
    Arc::new(RwLock::new(NodeRegistry::new()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_creates_node_with_single_reference() {
        let mut registry = NodeRegistry::new();
        registry.register("12345", "192.168.1.100", -8, 4);

        assert!(registry.is_registered("12345"));
        assert_eq!(registry.len(), 1);

        let node = &registry.snapshot()[0];
        assert_eq!(node.address, "192.168.1.100");
        assert_eq!(node.temp_offset, -8);
        assert_eq!(node.humidity_offset, 4);
        assert_eq!(node.reference_count, 1);
        assert!(!node.last_success);
    }

    #[test]
    fn test_reregistration_increments_and_keeps_original_values() {
        let mut registry = NodeRegistry::new();
        registry.register("12345", "192.168.1.100", -8, 4);
        registry.register("12345", "10.0.0.1", 0, 0);

        let node = &registry.snapshot()[0];
        assert_eq!(node.reference_count, 2);
        // First registration stays authoritative
        assert_eq!(node.address, "192.168.1.100");
        assert_eq!(node.temp_offset, -8);
    }

    #[test]
    fn test_unregister_removes_only_at_zero_references() {
        let mut registry = NodeRegistry::new();
        registry.register("12345", "192.168.1.100", -8, 4);
        registry.register("12345", "192.168.1.100", -8, 4);

        assert!(!registry.unregister("12345"));
        assert!(registry.is_registered("12345"));

        assert!(registry.unregister("12345"));
        assert!(!registry.is_registered("12345"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_id_is_noop() {
        let mut registry = NodeRegistry::new();
        assert!(!registry.unregister("nope"));
    }

    #[test]
    fn test_mark_result_tracks_last_success() {
        let mut registry = NodeRegistry::new();
        registry.register("12345", "192.168.1.100", -8, 4);

        registry.mark_result("12345", true);
        assert_eq!(registry.last_success("12345"), Some(true));

        registry.mark_result("12345", false);
        assert_eq!(registry.last_success("12345"), Some(false));

        // Marking a node that vanished mid-poll is ignored
        registry.mark_result("ghost", true);
        assert_eq!(registry.last_success("ghost"), None);
    }
}
