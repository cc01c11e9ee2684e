use binrw::{BinReaderExt, binrw};
use std::collections::VecDeque;
use std::io::Cursor;
use thiserror::Error;

/// One record of a `.hrc` hierarchy chunk.
#[binrw]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[brw(little)]
pub struct HierarchyChunkEntry {
    pub child_mask: u8,
    pub num_points: u32,
}

pub const BYTES_PER_ENTRY: usize = 5;

#[derive(Error, Debug)]
pub enum ParseHierarchyError {
    #[error("Invalid binary data: {0}")]
    InvalidBinaryData(#[from] binrw::Error),

    #[error("Hierarchy chunk is empty")]
    Empty,

    #[error("{0} trailing bytes after the last hierarchy entry")]
    TrailingBytes(usize),
}

/// A node decoded from a hierarchy chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkNode {
    pub name: String,
    pub child_mask: u8,
    pub num_points: u32,
    /// Whether the children listed in `child_mask` are part of this chunk.
    pub expanded: bool,
}

/// Directory of the chunk a node belongs to, relative to the octree directory.
///
/// `r0123456789` with a step size of 5 lives in `r/01234/56789`.
pub fn hierarchy_path(name: &str, root_name: &str, step_size: u32) -> String {
    let indices = name.strip_prefix(root_name).unwrap_or(name);
    let step_size = step_size.max(1) as usize;

    let mut path = root_name.to_string();
    for part in indices.as_bytes().chunks_exact(step_size) {
        path.push('/');
        path.push_str(&String::from_utf8_lossy(part));
    }
    path
}

/// Decodes the breadth first records of a chunk whose first record describes `name`.
///
/// The first returned node is `name` itself. Decoding stops at the end of the
/// buffer; nodes whose children were not reached keep `expanded == false`.
pub fn parse_hierarchy_chunk(name: &str, buf: &[u8]) -> Result<Vec<ChunkNode>, ParseHierarchyError> {
    if buf.len() < BYTES_PER_ENTRY {
        return Err(ParseHierarchyError::Empty);
    }

    let mut cursor = Cursor::new(buf);
    let end = buf.len() as u64;

    let entry: HierarchyChunkEntry = cursor.read_le()?;
    let mut nodes = Vec::with_capacity(buf.len() / BYTES_PER_ENTRY);
    nodes.push(ChunkNode {
        name: name.to_string(),
        child_mask: entry.child_mask,
        num_points: entry.num_points,
        expanded: false,
    });

    // indices into `nodes` whose children are still to be read
    let mut queue = VecDeque::from([0_usize]);

    while let Some(current) = queue.pop_front() {
        if cursor.position() == end {
            break;
        }

        let child_mask = nodes[current].child_mask;
        for child_index in 0..8 {
            if (child_mask & (1 << child_index)) == 0 {
                continue;
            }

            let entry: HierarchyChunkEntry = cursor.read_le()?;
            let child_name = format!("{}{}", nodes[current].name, child_index);

            queue.push_back(nodes.len());
            nodes.push(ChunkNode {
                name: child_name,
                child_mask: entry.child_mask,
                num_points: entry.num_points,
                expanded: false,
            });
        }
        nodes[current].expanded = true;
    }

    let remaining = end - cursor.position();
    if remaining > 0 {
        return Err(ParseHierarchyError::TrailingBytes(remaining as usize));
    }

    Ok(nodes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::BinWrite;

    fn chunk(entries: &[(u8, u32)]) -> Vec<u8> {
        let mut cursor = Cursor::new(Vec::new());
        for &(child_mask, num_points) in entries {
            HierarchyChunkEntry {
                child_mask,
                num_points,
            }
            .write_le(&mut cursor)
            .unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn paths() {
        assert_eq!(hierarchy_path("r", "r", 5), "r");
        assert_eq!(hierarchy_path("r0123", "r", 5), "r");
        assert_eq!(hierarchy_path("r01234", "r", 5), "r/01234");
        assert_eq!(hierarchy_path("r0123456789", "r", 5), "r/01234/56789");
        assert_eq!(hierarchy_path("r012", "r", 1), "r/0/1/2");
    }

    #[test]
    fn entry_layout() {
        let bytes = chunk(&[(0b1000_0001, 0x0102_0304)]);
        assert_eq!(bytes, vec![0b1000_0001, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn breadth_first_names() {
        // r has children 0 and 7, r0 has child 3, r7 and r03 are leaves
        let buf = chunk(&[(0b1000_0001, 100), (0b0000_1000, 20), (0, 30), (0, 4)]);
        let nodes = parse_hierarchy_chunk("r", &buf).unwrap();

        let names: Vec<&str> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["r", "r0", "r7", "r03"]);
        assert_eq!(nodes[1].num_points, 20);
        assert_eq!(nodes[3].num_points, 4);
        assert!(nodes[0].expanded);
        assert!(nodes[1].expanded);
    }

    #[test]
    fn chunk_ends_before_deeper_levels() {
        // r0 and r1 have children that live in the next chunk
        let buf = chunk(&[(0b0000_0011, 50), (0b0000_0001, 20), (0b0000_0100, 10)]);
        let nodes = parse_hierarchy_chunk("r", &buf).unwrap();

        assert_eq!(nodes.len(), 3);
        assert!(nodes[0].expanded);
        assert!(!nodes[1].expanded);
        assert!(!nodes[2].expanded);
    }

    #[test]
    fn sub_chunk_names_extend_the_node_name() {
        let buf = chunk(&[(0b0010_0000, 7), (0, 7)]);
        let nodes = parse_hierarchy_chunk("r01234", &buf).unwrap();

        assert_eq!(nodes[1].name, "r012345");
    }

    #[test]
    fn truncated_chunk() {
        let mut buf = chunk(&[(0b0000_0011, 50), (0, 20), (0, 10)]);
        buf.truncate(buf.len() - 2);

        assert!(matches!(
            parse_hierarchy_chunk("r", &buf),
            Err(ParseHierarchyError::InvalidBinaryData(_))
        ));
    }

    #[test]
    fn trailing_bytes() {
        let mut buf = chunk(&[(0b0000_0001, 50), (0, 20)]);
        buf.extend_from_slice(&[1, 2, 3]);

        assert!(matches!(
            parse_hierarchy_chunk("r", &buf),
            Err(ParseHierarchyError::TrailingBytes(3))
        ));
    }

    #[test]
    fn empty_chunk() {
        assert!(matches!(
            parse_hierarchy_chunk("r", &[]),
            Err(ParseHierarchyError::Empty)
        ));
    }
}
