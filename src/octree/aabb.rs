use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Axis aligned bounding box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: DVec3,
    pub max: DVec3,
}

/// Minimal sphere enclosing an [`Aabb`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingSphere {
    pub center: DVec3,
    pub radius: f64,
}

impl Aabb {
    pub fn new(min: DVec3, max: DVec3) -> Self {
        Self { min, max }
    }

    pub fn size(&self) -> DVec3 {
        self.max - self.min
    }

    pub fn center(&self) -> DVec3 {
        (self.min + self.max) * 0.5
    }

    pub fn translated(&self, translation: DVec3) -> Self {
        Self::new(self.min + translation, self.max + translation)
    }

    pub fn contains_aabb(&self, other: &Aabb) -> bool {
        self.min.cmple(other.min).all() && self.max.cmpge(other.max).all()
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere {
            center: self.center(),
            radius: self.size().length() * 0.5,
        }
    }
}

/// Computes the box of the child octant `index` (0..8) of `aabb`.
///
/// Bit 0 selects the upper half along z, bit 1 along y and bit 2 along x,
/// which is the digit appended to a node name for that octant.
pub fn create_child_aabb(aabb: &Aabb, index: usize) -> Aabb {
    debug_assert!(index < 8, "child index out of range: {index}");

    let mut min = aabb.min;
    let mut max = aabb.max;
    let mid = aabb.center();

    if (index & 0b0001) > 0 {
        min.z = mid.z;
    } else {
        max.z = mid.z;
    }
    if (index & 0b0010) > 0 {
        min.y = mid.y;
    } else {
        max.y = mid.y;
    }
    if (index & 0b0100) > 0 {
        min.x = mid.x;
    } else {
        max.x = mid.x;
    }

    Aabb::new(min, max)
}

/// Bounding volumes re-expressed relative to the dataset's minimum corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizedBounds {
    pub bounding_box: Aabb,
    pub tight_bounding_box: Aabb,
    /// World space minimum corner; add it back to recover world coordinates.
    pub offset: DVec3,
}

/// Moves `bounding_box` (and `tight_bounding_box`, defaulting to the full box)
/// so that the minimum corner of `bounding_box` lands on the origin.
pub fn normalize_bounds(bounding_box: Aabb, tight_bounding_box: Option<Aabb>) -> NormalizedBounds {
    let offset = bounding_box.min;
    let tight_bounding_box = tight_bounding_box.unwrap_or(bounding_box);

    NormalizedBounds {
        bounding_box: bounding_box.translated(-offset),
        tight_bounding_box: tight_bounding_box.translated(-offset),
        offset,
    }
}
