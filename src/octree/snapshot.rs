use crate::octree::aabb::Aabb;
use crate::octree::node::{HierarchyState, OctreeNode};
use crate::octree::{FlatOctree, NodeId};
use serde::Serialize;

/// Owned, plain value view of a discovered (sub-)hierarchy.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OctreeNodeSnapshot {
    pub name: String,
    pub bounding_box: Aabb,
    pub spacing: f64,
    pub level: u32,
    pub num_points: Option<u64>,
    pub has_children: bool,
    pub discovered: bool,
    pub loaded: bool,
    pub children: Vec<OctreeNodeSnapshot>,
}

pub struct SnapshotIter<'a> {
    stack: Vec<&'a OctreeNodeSnapshot>,
}

impl<'a> Iterator for SnapshotIter<'a> {
    type Item = &'a OctreeNodeSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        for child in node.children.iter().rev() {
            self.stack.push(child);
        }
        Some(node)
    }
}

impl OctreeNodeSnapshot {
    /// Depth first, children in octant order.
    pub fn iter(&self) -> SnapshotIter<'_> {
        SnapshotIter { stack: vec![self] }
    }

    pub fn find(&self, name: &str) -> Option<&OctreeNodeSnapshot> {
        self.iter().find(|node| node.name == name)
    }
}

impl From<&OctreeNode> for OctreeNodeSnapshot {
    fn from(node: &OctreeNode) -> Self {
        Self {
            name: node.name.clone(),
            bounding_box: node.bounding_box,
            spacing: node.spacing,
            level: node.level,
            num_points: node.num_points,
            has_children: node.has_children,
            discovered: node.hierarchy == HierarchyState::Discovered,
            loaded: node.is_loaded(),
            children: Vec::new(),
        }
    }
}

pub(crate) fn snapshot_from_node(octree: &FlatOctree<OctreeNode>, node_id: NodeId) -> Option<OctreeNodeSnapshot> {
    let node = octree.node(node_id)?;
    let mut snapshot = OctreeNodeSnapshot::from(node);

    snapshot.children = node
        .children()
        .filter_map(|(_, child)| snapshot_from_node(octree, child))
        .collect();

    Some(snapshot)
}
