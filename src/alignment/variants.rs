//! Sequence variants extracted from the edit operations of a subpath.

use crate::mpmap::{EditKind, Subpath};
use crate::{Pangenome, Result};
use crate::utils;

use std::fmt::Display;

//-----------------------------------------------------------------------------

/// Position of a variant on a node.
///
/// Offsets are in forward orientation of the node and may fall outside the node after a deletion at its boundary.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariantPosition {
    /// A substituted or deleted base at this offset.
    Offset(i64),
    /// An inserted base between offsets `left` and `right`, at position `offset` within the insertion.
    Insertion { left: i64, right: i64, offset: usize },
}

impl VariantPosition {
    /// Returns `true` if the position is inside an insertion.
    #[inline]
    pub fn is_insertion(&self) -> bool {
        matches!(self, VariantPosition::Insertion { .. })
    }
}

impl Display for VariantPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            VariantPosition::Offset(offset) => write!(f, "{}", offset),
            VariantPosition::Insertion { left, right, offset } => write!(f, "{}-{}_{}", left, right, offset),
        }
    }
}

/// A single-base difference between the read and a node.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Variant {
    /// Node identifier.
    pub node: String,
    /// Position on the node.
    pub position: VariantPosition,
    /// Read base in forward orientation of the node, or [`Variant::GAP`] for a deleted base.
    pub base: u8,
}

impl Variant {
    /// Marker for a deleted base.
    pub const GAP: u8 = b'-';

    fn new(node: &str, position: VariantPosition, base: u8) -> Self {
        Variant { node: node.to_string(), position, base }
    }

    /// Returns `true` if this is an inserted base.
    #[inline]
    pub fn is_insertion(&self) -> bool {
        self.position.is_insertion()
    }
}

//-----------------------------------------------------------------------------

/// Replays the edit operations of a subpath and returns the variants in read order.
///
/// The cursor on each node starts at the mapping offset, converted to forward coordinates for reverse mappings.
/// Matches move the cursor and emit nothing.
/// Substitutions and deletions emit one variant per base.
/// Insertions do not consume node bases; each inserted base gets a key anchored between the previous and the current offset.
/// Bases on reverse mappings are complemented.
///
/// Returns an error if a mapping refers to an undefined node.
pub fn extract_variants(subpath: &Subpath, graph: &Pangenome) -> Result<Vec<Variant>> {
    let mut result = Vec::new();
    for mapping in subpath.path.mapping.iter() {
        let node_id = mapping.position.node_id.as_str();
        let node = graph.get_node(node_id)?;
        let reverse = mapping.position.is_reverse;
        let step: i64 = if reverse { -1 } else { 1 };
        let orient = |base: u8| if reverse { utils::complement(base) } else { base };

        let mut pos = if reverse {
            node.len() as i64 - 1 - mapping.position.offset
        } else {
            mapping.position.offset
        };
        for edit in mapping.edit.iter() {
            match edit.kind() {
                EditKind::Match => {
                    pos += step * edit.from_len() as i64;
                },
                EditKind::Substitution => {
                    for &base in edit.bases() {
                        result.push(Variant::new(node_id, VariantPosition::Offset(pos), orient(base)));
                        pos += step;
                    }
                },
                EditKind::Deletion => {
                    for _ in 0..edit.from_len() {
                        result.push(Variant::new(node_id, VariantPosition::Offset(pos), Variant::GAP));
                        pos += step;
                    }
                },
                EditKind::Insertion => {
                    let bases = edit.bases();
                    for (i, &base) in bases.iter().enumerate() {
                        let offset = if reverse { bases.len() - 1 - i } else { i };
                        let position = VariantPosition::Insertion { left: pos - 1, right: pos, offset };
                        result.push(Variant::new(node_id, position, orient(base)));
                    }
                },
            }
        }
    }
    Ok(result)
}

//-----------------------------------------------------------------------------
