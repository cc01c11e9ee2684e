pub mod aabb;
pub mod node;
pub mod point_attributes;
pub mod snapshot;

use slab::Slab;

#[derive(Clone, Debug, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// Arena owning every node of one octree; nodes refer to each other by [`NodeId`].
#[derive(Debug)]
pub struct FlatOctree<T> {
    storage: Slab<T>,
    root_id: NodeId,
}

impl<T> FlatOctree<T> {
    pub fn with_root(root: T) -> Self {
        let mut storage = Slab::new();
        let root_id = NodeId(storage.insert(root));

        Self { storage, root_id }
    }

    pub fn root(&self) -> &T {
        self.storage
            .get(self.root_id.0)
            .expect("root node not found - invariant broken")
    }

    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    pub fn node(&self, node_id: NodeId) -> Option<&T> {
        self.storage.get(node_id.0)
    }

    pub(crate) fn node_mut(&mut self, node_id: NodeId) -> Option<&mut T> {
        self.storage.get_mut(node_id.0)
    }

    pub(crate) fn reserve(&mut self, additional: usize) {
        self.storage.reserve(additional);
    }

    pub(crate) fn insert(&mut self, node: T) -> NodeId {
        NodeId(self.storage.insert(node))
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &T)> {
        self.storage.iter().map(|(id, node)| (NodeId(id), node))
    }
}
