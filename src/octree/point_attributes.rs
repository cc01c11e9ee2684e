use crate::metadata::{AttributeDescription, AttributeMetadata, AttributeType, MalformedDocumentError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointAttributeType {
    pub ordinal: usize,
    pub name: &'static str,
    pub size: u16,
}

macro_rules! create_data_type {
    ($const_name:ident, $ord:expr, $name:expr, $size:expr) => {
        pub static $const_name: PointAttributeType = PointAttributeType {
            ordinal: $ord,
            name: $name,
            size: $size,
        };
    };
}

create_data_type!(DATA_TYPE_DOUBLE, 0, "double", 8);
create_data_type!(DATA_TYPE_FLOAT, 1, "float", 4);
create_data_type!(DATA_TYPE_INT8, 2, "int8", 1);
create_data_type!(DATA_TYPE_UINT8, 3, "uint8", 1);
create_data_type!(DATA_TYPE_INT16, 4, "int16", 2);
create_data_type!(DATA_TYPE_UINT16, 5, "uint16", 2);
create_data_type!(DATA_TYPE_INT32, 6, "int32", 4);
create_data_type!(DATA_TYPE_UINT32, 7, "uint32", 4);
create_data_type!(DATA_TYPE_INT64, 8, "int64", 8);
create_data_type!(DATA_TYPE_UINT64, 9, "uint64", 8);

impl From<AttributeType> for &'static PointAttributeType {
    fn from(t: AttributeType) -> Self {
        match t {
            AttributeType::Double => &DATA_TYPE_DOUBLE,
            AttributeType::Float => &DATA_TYPE_FLOAT,
            AttributeType::Int8 => &DATA_TYPE_INT8,
            AttributeType::UInt8 => &DATA_TYPE_UINT8,
            AttributeType::Int16 => &DATA_TYPE_INT16,
            AttributeType::UInt16 => &DATA_TYPE_UINT16,
            AttributeType::Int32 => &DATA_TYPE_INT32,
            AttributeType::UInt32 => &DATA_TYPE_UINT32,
            AttributeType::Int64 => &DATA_TYPE_INT64,
            AttributeType::UInt64 => &DATA_TYPE_UINT64,
        }
    }
}

/// Attributes of the generic binary format that documents may reference by name.
static KNOWN_ATTRIBUTES: &[(&str, &PointAttributeType, u16)] = &[
    ("POSITION_CARTESIAN", &DATA_TYPE_FLOAT, 3),
    ("COLOR_PACKED", &DATA_TYPE_UINT8, 4),
    ("RGBA_PACKED", &DATA_TYPE_UINT8, 4),
    ("NORMAL_FLOATS", &DATA_TYPE_FLOAT, 3),
    ("NORMAL_SPHEREMAPPED", &DATA_TYPE_UINT8, 2),
    ("NORMAL_OCT16", &DATA_TYPE_UINT8, 2),
    ("NORMAL", &DATA_TYPE_FLOAT, 3),
    ("INTENSITY", &DATA_TYPE_UINT16, 1),
    ("CLASSIFICATION", &DATA_TYPE_UINT8, 1),
    ("RETURN_NUMBER", &DATA_TYPE_UINT8, 1),
    ("NUMBER_OF_RETURNS", &DATA_TYPE_UINT8, 1),
    ("SOURCE_ID", &DATA_TYPE_UINT16, 1),
    ("GPS_TIME", &DATA_TYPE_DOUBLE, 1),
    ("INDICES", &DATA_TYPE_UINT32, 1),
    ("SPACING", &DATA_TYPE_FLOAT, 1),
];

#[derive(Debug, Clone, PartialEq)]
pub struct PointAttribute {
    pub name: String,
    pub r#type: &'static PointAttributeType,
    pub num_elements: u16,
    pub byte_size: u16,
    pub description: String,
}

impl PointAttribute {
    pub fn new(name: &str, r#type: &'static PointAttributeType, num_elements: u16) -> Self {
        Self {
            name: name.to_string(),
            r#type,
            num_elements,
            byte_size: r#type.size * num_elements,
            description: String::new(),
        }
    }

    /// Looks up an attribute of the generic binary format by name.
    pub fn named(name: &str) -> Option<Self> {
        KNOWN_ATTRIBUTES
            .iter()
            .find(|(known, _, _)| *known == name)
            .map(|(known, r#type, num_elements)| Self::new(known, r#type, *num_elements))
    }

    fn from_description(description: &AttributeDescription) -> Result<Self, MalformedDocumentError> {
        let known = Self::named(&description.name);

        let r#type: &'static PointAttributeType = match (description.r#type, &known) {
            (Some(t), _) => t.into(),
            (None, Some(known)) => known.r#type,
            (None, None) => {
                return Err(MalformedDocumentError::InvalidAttribute(
                    description.name.clone(),
                    "missing type",
                ));
            }
        };

        let num_elements = description
            .elements
            .or(known.as_ref().map(|k| k.num_elements))
            .unwrap_or(1);

        let element_size = description.element_size.unwrap_or(r#type.size);
        let byte_size = description.size.unwrap_or(element_size * num_elements);
        if byte_size == 0 {
            return Err(MalformedDocumentError::InvalidAttribute(
                description.name.clone(),
                "zero byte size",
            ));
        }

        Ok(Self {
            name: description.name.clone(),
            r#type,
            num_elements,
            byte_size,
            description: description.description.clone().unwrap_or_default(),
        })
    }
}

/// Ordered layout of the interleaved attributes of one point.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointAttributes {
    pub attributes: Vec<PointAttribute>,
    pub byte_size: u16,
}

impl PointAttributes {
    pub fn new(attributes: Vec<PointAttribute>) -> Self {
        let byte_size = attributes.iter().map(|a| a.byte_size).sum();
        Self { attributes, byte_size }
    }

    pub fn from_metadata(metadata: &[AttributeMetadata]) -> Result<Self, MalformedDocumentError> {
        let attributes = metadata
            .iter()
            .map(|attribute| match attribute {
                AttributeMetadata::Named(name) => PointAttribute::named(name)
                    .ok_or_else(|| MalformedDocumentError::UnknownAttribute(name.clone())),
                AttributeMetadata::Described(description) => {
                    PointAttribute::from_description(description)
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(attributes))
    }

    pub fn get(&self, name: &str) -> Option<&PointAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    /// Byte offset of `name` inside one interleaved point record.
    pub fn offset_of(&self, name: &str) -> Option<usize> {
        let mut offset = 0;
        for attribute in &self.attributes {
            if attribute.name == name {
                return Some(offset);
            }
            offset += attribute.byte_size as usize;
        }
        None
    }
}
