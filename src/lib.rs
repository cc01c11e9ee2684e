//! Loader for streamed Potree 1.x point clouds.
//!
//! Parses the `cloud.js` metadata document of a dataset, normalizes its
//! bounds, builds the octree index (eagerly for documents listing the whole
//! hierarchy, lazily through `.hrc` hierarchy chunks for newer ones) and picks
//! the decoder that node payloads are materialized with.

pub mod config;
pub mod counter;
pub mod decoder;
pub mod hierarchy;
pub mod metadata;
pub mod octree;
pub mod point_cloud;
pub mod prelude;
pub mod resource;
pub mod version;

pub use octree::aabb::create_child_aabb;
pub use point_cloud::{PotreeOctree, load};
