use crate::octree::NodeId;
use crate::octree::aabb::Aabb;
use bytes::Bytes;
use futures::channel::oneshot;
use std::fmt;

use crate::point_cloud::{FetchedNode, LoadNodeError};

/// Whether the children of a node are known yet.
///
/// An undiscovered node may still have children; they are described by a
/// hierarchy chunk that has not been fetched yet. A discovered node without
/// children is a leaf.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HierarchyState {
    #[default]
    Undiscovered,
    Discovered,
}

/// Raw point payload of one node, as stored in its node file.
#[derive(Clone, Debug, PartialEq)]
pub struct NodePayload {
    pub url: String,
    pub bytes: Bytes,
}

#[derive(Default)]
pub enum PayloadState {
    #[default]
    Unloaded,
    Loading(oneshot::Receiver<Result<FetchedNode, LoadNodeError>>),
    Loaded(NodePayload),
    Failed(LoadNodeError),
}

impl fmt::Debug for PayloadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadState::Unloaded => f.write_str("Unloaded"),
            PayloadState::Loading(_) => f.write_str("Loading"),
            PayloadState::Loaded(payload) => f
                .debug_struct("Loaded")
                .field("url", &payload.url)
                .field("bytes", &payload.bytes.len())
                .finish(),
            PayloadState::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
        }
    }
}

#[derive(Debug, Default)]
pub struct OctreeNode {
    pub name: String,
    pub bounding_box: Aabb,
    pub spacing: f64,
    pub level: u32,
    /// `None` while the point count is not known up front.
    pub num_points: Option<u64>,
    pub has_children: bool,
    pub hierarchy: HierarchyState,
    pub parent: Option<NodeId>,
    pub children: [Option<NodeId>; 8],
    pub payload: PayloadState,
}

impl OctreeNode {
    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied().flatten()
    }

    /// Children in octant order.
    pub fn children(&self) -> impl Iterator<Item = (usize, NodeId)> + '_ {
        self.children
            .iter()
            .enumerate()
            .filter_map(|(index, child)| child.map(|id| (index, id)))
    }

    /// True only once the node is known to have no children.
    pub fn is_leaf(&self) -> bool {
        self.hierarchy == HierarchyState::Discovered && !self.has_children
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.payload, PayloadState::Loading(_))
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self.payload, PayloadState::Loaded(_))
    }

    pub fn payload(&self) -> Option<&NodePayload> {
        match &self.payload {
            PayloadState::Loaded(payload) => Some(payload),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undiscovered_is_not_a_leaf() {
        let mut node = OctreeNode::default();
        assert!(!node.is_leaf());

        node.hierarchy = HierarchyState::Discovered;
        assert!(node.is_leaf());

        node.has_children = true;
        assert!(!node.is_leaf());
    }

    #[test]
    fn children_in_octant_order() {
        let mut node = OctreeNode::default();
        node.children[5] = Some(NodeId(3));
        node.children[1] = Some(NodeId(7));

        assert_eq!(
            node.children().collect::<Vec<_>>(),
            vec![(1, NodeId(7)), (5, NodeId(3))]
        );
        assert_eq!(node.child(5), Some(NodeId(3)));
        assert_eq!(node.child(0), None);
        assert_eq!(node.child(9), None);
    }
}
