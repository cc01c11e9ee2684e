use crate::octree::aabb::Aabb;
use glam::DVec3;
use serde::Deserialize;
use thiserror::Error;

/// Parses a `cloud.js` metadata document.
pub fn parse_metadata(buf: &[u8]) -> Result<Metadata, MalformedDocumentError> {
    Ok(serde_json::from_slice(buf)?)
}

#[derive(Error, Debug)]
pub enum MalformedDocumentError {
    #[error("Invalid metadata document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid version: {0:?}")]
    InvalidVersion(String),

    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Hierarchy is empty")]
    EmptyHierarchy,

    #[error("Invalid node name: {0:?}")]
    InvalidNodeName(String),

    #[error("Parent {parent:?} of node {name:?} is not indexed")]
    MissingParent { name: String, parent: String },

    #[error("Duplicate node: {0:?}")]
    DuplicateNode(String),

    #[error("Unknown point attribute: {0:?}")]
    UnknownAttribute(String),

    #[error("Invalid point attribute {0:?}: {1}")]
    InvalidAttribute(String, &'static str),
}

#[derive(Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub version: String,
    pub octree_dir: String,
    #[serde(default)]
    pub points: Option<u64>,
    #[serde(default)]
    pub projection: Option<String>,
    pub bounding_box: BoundingBox,
    #[serde(default)]
    pub tight_bounding_box: Option<BoundingBox>,
    pub point_attributes: PointAttributesMetadata,
    pub spacing: f64,
    #[serde(default)]
    pub scale: Option<f64>,
    #[serde(default)]
    pub hierarchy_step_size: Option<u32>,
    #[serde(default)]
    pub hierarchy: Vec<HierarchyEntry>,
}

/// `[name, numPoints]` pair of the flat hierarchy list.
#[derive(Deserialize, Clone, Debug, PartialEq)]
pub struct HierarchyEntry(pub String, pub u64);

#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub lx: f64,
    pub ly: f64,
    pub lz: f64,
    pub ux: f64,
    pub uy: f64,
    pub uz: f64,
}

impl From<BoundingBox> for Aabb {
    fn from(b: BoundingBox) -> Self {
        Aabb::new(DVec3::new(b.lx, b.ly, b.lz), DVec3::new(b.ux, b.uy, b.uz))
    }
}

/// Either a format tag such as `"LAZ"`, or the list of interleaved attributes.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum PointAttributesMetadata {
    Format(String),
    Attributes(Vec<AttributeMetadata>),
}

/// Older documents list attributes by name only.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum AttributeMetadata {
    Named(String),
    Described(AttributeDescription),
}

impl AttributeMetadata {
    pub fn name(&self) -> &str {
        match self {
            AttributeMetadata::Named(name) => name,
            AttributeMetadata::Described(description) => &description.name,
        }
    }
}

#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDescription {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub r#type: Option<AttributeType>,
    #[serde(default, alias = "numElements")]
    pub elements: Option<u16>,
    #[serde(default)]
    pub element_size: Option<u16>,
    #[serde(default)]
    pub size: Option<u16>,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeType {
    #[serde(rename = "int8")]
    Int8,
    #[serde(rename = "int16")]
    Int16,
    #[serde(rename = "int32")]
    Int32,
    #[serde(rename = "int64")]
    Int64,
    #[serde(rename = "uint8")]
    UInt8,
    #[serde(rename = "uint16")]
    UInt16,
    #[serde(rename = "uint32")]
    UInt32,
    #[serde(rename = "uint64")]
    UInt64,
    #[serde(rename = "float")]
    Float,
    #[serde(rename = "double")]
    Double,
}
