use crate::metadata::{MalformedDocumentError, PointAttributesMetadata};
use crate::octree::aabb::Aabb;
use crate::octree::point_attributes::PointAttributes;
use crate::version::Version;

/// Point payloads at or above this version carry a `.bin` extension.
const BINARY_EXTENSION_MIN_VERSION: Version = Version::new(1, 4);

/// Binary payloads newer than this version store positions quantized by `scale`.
const UNSCALED_MAX_VERSION: Version = Version::new(1, 3);

/// How the points of a dataset are laid out, as declared by its metadata.
#[derive(Clone, Debug, PartialEq)]
pub enum AttributeSchema {
    /// A point cloud exchange format tag; the payload decoder owns the field layout.
    Format(String),
    Layout(PointAttributes),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LasFormat {
    Las,
    Laz,
}

impl LasFormat {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "LAS" => Some(LasFormat::Las),
            "LAZ" => Some(LasFormat::Laz),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            LasFormat::Las => "las",
            LasFormat::Laz => "laz",
        }
    }
}

/// Something that can materialize the points of a node from its node file.
pub trait NodePayloadDecoder {
    fn version(&self) -> Version;

    /// Location of the payload of the node whose files live at `node_url`
    /// (the node file path without extension).
    fn payload_url(&self, node_url: &str) -> String;
}

/// Interleaved binary points inside `bounding_box`, quantized with `scale`
/// when the version has one.
#[derive(Clone, Debug, PartialEq)]
pub struct BinaryDecoder {
    pub version: Version,
    pub bounding_box: Aabb,
    pub scale: Option<f64>,
}

impl NodePayloadDecoder for BinaryDecoder {
    fn version(&self) -> Version {
        self.version
    }

    fn payload_url(&self, node_url: &str) -> String {
        if self.version.equal_or_higher(BINARY_EXTENSION_MIN_VERSION) {
            format!("{}.bin", node_url)
        } else {
            node_url.to_string()
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LasLazDecoder {
    pub version: Version,
    pub format: LasFormat,
}

impl NodePayloadDecoder for LasLazDecoder {
    fn version(&self) -> Version {
        self.version
    }

    fn payload_url(&self, node_url: &str) -> String {
        format!("{}.{}", node_url, self.format.extension())
    }
}

/// The decoder shared by every node of one dataset.
#[derive(Clone, Debug, PartialEq)]
pub enum PayloadDecoder {
    Binary(BinaryDecoder),
    LasLaz(LasLazDecoder),
}

impl NodePayloadDecoder for PayloadDecoder {
    fn version(&self) -> Version {
        match self {
            PayloadDecoder::Binary(decoder) => decoder.version(),
            PayloadDecoder::LasLaz(decoder) => decoder.version(),
        }
    }

    fn payload_url(&self, node_url: &str) -> String {
        match self {
            PayloadDecoder::Binary(decoder) => decoder.payload_url(node_url),
            PayloadDecoder::LasLaz(decoder) => decoder.payload_url(node_url),
        }
    }
}

/// Picks the payload decoder for a dataset from its declared point attributes.
///
/// LAS/LAZ tags keep the raw tag as schema. Attribute lists select the
/// generic binary decoder, which needs the expanded layout and, for versions
/// newer than 1.3, a `scale`.
pub fn select_decoder(
    point_attributes: &PointAttributesMetadata,
    version: Version,
    bounding_box: Aabb,
    scale: Option<f64>,
) -> Result<(PayloadDecoder, AttributeSchema), MalformedDocumentError> {
    match point_attributes {
        PointAttributesMetadata::Format(tag) => {
            let format = LasFormat::from_tag(tag)
                .ok_or_else(|| MalformedDocumentError::UnknownAttribute(tag.clone()))?;

            Ok((
                PayloadDecoder::LasLaz(LasLazDecoder { version, format }),
                AttributeSchema::Format(tag.clone()),
            ))
        }
        PointAttributesMetadata::Attributes(attributes) => {
            let layout = PointAttributes::from_metadata(attributes)?;
            if scale.is_none() && version.newer_than(UNSCALED_MAX_VERSION) {
                return Err(MalformedDocumentError::MissingField("scale"));
            }

            Ok((
                PayloadDecoder::Binary(BinaryDecoder {
                    version,
                    bounding_box,
                    scale,
                }),
                AttributeSchema::Layout(layout),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec3;
    use serde_json::from_str;

    fn unit_box() -> Aabb {
        Aabb::new(DVec3::ZERO, DVec3::ONE)
    }

    #[test]
    fn laz_tag_selects_las_laz_decoder() {
        let attributes: PointAttributesMetadata = from_str(r#""LAZ""#).unwrap();
        let (decoder, schema) = select_decoder(&attributes, Version::new(1, 7), unit_box(), None).unwrap();

        assert_eq!(
            decoder,
            PayloadDecoder::LasLaz(LasLazDecoder {
                version: Version::new(1, 7),
                format: LasFormat::Laz,
            })
        );
        assert_eq!(schema, AttributeSchema::Format("LAZ".to_string()));
        assert_eq!(decoder.payload_url("http://host/data/r/r0"), "http://host/data/r/r0.laz");
    }

    #[test]
    fn las_tag() {
        let attributes = PointAttributesMetadata::Format("LAS".to_string());
        let (decoder, _) = select_decoder(&attributes, Version::new(1, 5), unit_box(), None).unwrap();

        assert_eq!(decoder.payload_url("data/r"), "data/r.las");
    }

    #[test]
    fn attribute_list_selects_binary_decoder() {
        let attributes: PointAttributesMetadata = from_str(
            r#"[{"name": "POSITION_CARTESIAN", "type": "int32", "elements": 3, "size": 12}, "COLOR_PACKED"]"#,
        )
        .unwrap();
        let (decoder, schema) =
            select_decoder(&attributes, Version::new(1, 8), unit_box(), Some(0.001)).unwrap();

        assert_eq!(
            decoder,
            PayloadDecoder::Binary(BinaryDecoder {
                version: Version::new(1, 8),
                bounding_box: unit_box(),
                scale: Some(0.001),
            })
        );
        let AttributeSchema::Layout(layout) = schema else {
            panic!("expected an expanded layout");
        };
        assert_eq!(layout.attributes.len(), 2);
        assert_eq!(layout.byte_size, 16);
    }

    #[test]
    fn binary_extension_depends_on_version() {
        let binary = |version| BinaryDecoder {
            version,
            bounding_box: unit_box(),
            scale: Some(0.01),
        };

        assert_eq!(binary(Version::new(1, 3)).payload_url("data/r0"), "data/r0");
        assert_eq!(binary(Version::new(1, 4)).payload_url("data/r0"), "data/r0.bin");
    }

    #[test]
    fn binary_decoder_requires_scale() {
        let attributes: PointAttributesMetadata = from_str(r#"["POSITION_CARTESIAN"]"#).unwrap();

        assert!(matches!(
            select_decoder(&attributes, Version::new(1, 7), unit_box(), None),
            Err(MalformedDocumentError::MissingField("scale"))
        ));
    }

    #[test]
    fn unscaled_binary_versions_need_no_scale() {
        let attributes: PointAttributesMetadata = from_str(r#"["POSITION_CARTESIAN"]"#).unwrap();

        for version in [Version::new(1, 2), Version::new(1, 3)] {
            let (decoder, _) = select_decoder(&attributes, version, unit_box(), None).unwrap();
            assert!(matches!(decoder, PayloadDecoder::Binary(BinaryDecoder { scale: None, .. })));
        }
    }

    #[test]
    fn unknown_format_tag() {
        let attributes = PointAttributesMetadata::Format("E57".to_string());

        assert!(matches!(
            select_decoder(&attributes, Version::new(1, 7), unit_box(), None),
            Err(MalformedDocumentError::UnknownAttribute(tag)) if tag == "E57"
        ));
    }
}
