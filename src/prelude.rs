pub use crate::config::LoaderOptions;
pub use crate::counter::LoadCounter;
pub use crate::decoder::{AttributeSchema, NodePayloadDecoder, PayloadDecoder};
pub use crate::octree::aabb::{Aabb, BoundingSphere, create_child_aabb};
pub use crate::octree::node::{HierarchyState, NodePayload, OctreeNode, PayloadState};
pub use crate::octree::snapshot::OctreeNodeSnapshot;
pub use crate::octree::NodeId;
pub use crate::point_cloud::{PotreeOctree, load};
pub use crate::resource::{ResourceClient, ResourceError};
pub use crate::version::Version;

// Error types
pub use crate::metadata::MalformedDocumentError;
pub use crate::point_cloud::LoadNodeError;
pub use crate::point_cloud::LoadOctreeError;
