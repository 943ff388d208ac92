//! Multipath alignment records in JSON format.
//!
//! Each record describes one read aligned to the graph as a DAG of subpaths.
//! The structures mirror the JSON produced by `vg mpmap`, with absent optional fields
//! replaced by zero or empty values.
//! Integer fields encoded as strings (as protobuf JSON does for 64-bit values) are accepted as well.

use serde::de::{self, Deserializer};
use serde::Deserialize;

use std::ops::Range;

//-----------------------------------------------------------------------------

/// One read aligned to the graph as a DAG of subpaths.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MultipathRecord {
    /// Name of the read.
    pub name: String,
    /// Full sequence of the read (or of this mate).
    #[serde(default)]
    pub sequence: String,
    /// Subpaths, or [`None`] if the read did not map.
    #[serde(default)]
    pub subpath: Option<Vec<Subpath>>,
    /// Start subpath indices listed by the aligner; may contain invalid values.
    #[serde(default, deserialize_with = "de_optional_indices")]
    pub start: Option<Vec<i64>>,
}

impl MultipathRecord {
    /// Returns `true` if the read has at least one subpath.
    pub fn is_mapped(&self) -> bool {
        self.subpath.as_ref().is_some_and(|x| !x.is_empty())
    }

    /// Returns the subpaths, which may be empty.
    pub fn subpaths(&self) -> &[Subpath] {
        self.subpath.as_deref().unwrap_or_default()
    }

    /// Returns the length of the read sequence.
    #[inline]
    pub fn read_len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns the root subpath indices.
    ///
    /// Every subpath is a root, whether or not the record lists start indices.
    pub fn roots(&self) -> Range<usize> {
        0..self.subpaths().len()
    }

    /// Returns the listed start indices that do not refer to a subpath.
    pub fn invalid_starts(&self) -> impl Iterator<Item = i64> + '_ {
        let len = self.subpaths().len();
        self.start.iter().flatten().copied().filter(move |&index| usize::try_from(index).map_or(true, |x| x >= len))
    }
}

/// A partial alignment: a path through the graph with its own score and successors.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Subpath {
    /// Path through the graph.
    #[serde(default)]
    pub path: SubpathPath,
    /// Indices of the successor subpaths.
    #[serde(default, deserialize_with = "de_indices")]
    pub next: Vec<i64>,
    /// Alignment score of this subpath.
    #[serde(default, deserialize_with = "de_integer")]
    pub score: i64,
}

/// The path of a subpath as a list of node mappings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct SubpathPath {
    #[serde(default)]
    pub mapping: Vec<Mapping>,
}

/// Alignment of a part of the read to a single node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Mapping {
    /// Starting position on the node.
    pub position: Position,
    /// Edit operations in read order.
    #[serde(default)]
    pub edit: Vec<Edit>,
}

/// A position on an oriented node.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Position {
    #[serde(deserialize_with = "de_string")]
    pub node_id: String,
    /// Offset from the start of the node in the given orientation.
    #[serde(default, deserialize_with = "de_integer")]
    pub offset: i64,
    #[serde(default)]
    pub is_reverse: bool,
}

/// An edit operation consuming bases from the node (`from_length`) and from the read (`to_length`).
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct Edit {
    #[serde(default, deserialize_with = "de_integer")]
    pub from_length: i64,
    #[serde(default, deserialize_with = "de_integer")]
    pub to_length: i64,
    /// Read bases replacing or inserted into the node sequence.
    #[serde(default)]
    pub sequence: Option<String>,
}

//-----------------------------------------------------------------------------

/// Types of edit operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EditKind {
    /// Equal lengths without a sequence.
    Match,
    /// Equal lengths with a sequence.
    Substitution,
    /// Unequal lengths without a sequence.
    Deletion,
    /// Unequal lengths with a sequence.
    Insertion,
}

impl Edit {
    /// Classifies the edit by its lengths and the presence of a sequence.
    pub fn kind(&self) -> EditKind {
        match (self.from_length == self.to_length, self.sequence.is_some()) {
            (true, false) => EditKind::Match,
            (true, true) => EditKind::Substitution,
            (false, false) => EditKind::Deletion,
            (false, true) => EditKind::Insertion,
        }
    }

    /// Returns the number of node bases consumed by the edit.
    #[inline]
    pub fn from_len(&self) -> usize {
        self.from_length.max(0) as usize
    }

    /// Returns the number of read bases consumed by the edit.
    #[inline]
    pub fn to_len(&self) -> usize {
        self.to_length.max(0) as usize
    }

    /// Returns the inserted or substituted bases, or an empty slice.
    #[inline]
    pub fn bases(&self) -> &[u8] {
        self.sequence.as_ref().map(|x| x.as_bytes()).unwrap_or_default()
    }
}

//-----------------------------------------------------------------------------

/// Length and score contribution of a subpath.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Contribution {
    /// Read bases consumed.
    pub read_len: usize,
    /// Read bases in true matches.
    pub matches: usize,
    /// Sum of `min(from_length, to_length)` over the edits.
    pub aligned: usize,
    /// Score of the subpath.
    pub score: i64,
}

impl Subpath {
    /// Computes the contribution of this subpath to an alignment path.
    pub fn contribution(&self) -> Contribution {
        let mut result = Contribution { score: self.score, ..Contribution::default() };
        for edit in self.path.mapping.iter().flat_map(|mapping| mapping.edit.iter()) {
            result.read_len += edit.to_len();
            if edit.kind() == EditKind::Match {
                result.matches += edit.to_len();
            }
            result.aligned += edit.from_len().min(edit.to_len());
        }
        result
    }
}

//-----------------------------------------------------------------------------

// Deserialization helpers for integers that may be encoded as strings.

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleInteger {
    Number(i64),
    Text(String),
}

impl FlexibleInteger {
    fn into_i64<E: de::Error>(self) -> Result<i64, E> {
        match self {
            FlexibleInteger::Number(value) => Ok(value),
            FlexibleInteger::Text(value) => value.parse().map_err(|_| {
                E::custom(format!("invalid integer: {}", value))
            }),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlexibleString {
    Number(i64),
    Text(String),
}

fn de_integer<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
    FlexibleInteger::deserialize(deserializer)?.into_i64()
}

fn de_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match FlexibleString::deserialize(deserializer)? {
        FlexibleString::Number(value) => Ok(value.to_string()),
        FlexibleString::Text(value) => Ok(value),
    }
}

fn de_indices<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
    let values = Vec::<FlexibleInteger>::deserialize(deserializer)?;
    values.into_iter().map(FlexibleInteger::into_i64).collect()
}

fn de_optional_indices<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Vec<i64>>, D::Error> {
    de_indices(deserializer).map(Some)
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn parse(value: serde_json::Value) -> MultipathRecord {
        let record = serde_json::from_value::<MultipathRecord>(value);
        assert!(record.is_ok(), "Failed to parse the record: {}", record.unwrap_err());
        record.unwrap()
    }

    #[test]
    fn unmapped_read() {
        let record = parse(json!({ "name": "read1", "sequence": "GATTACA" }));
        assert!(!record.is_mapped(), "Read without subpaths is mapped");
        assert_eq!(record.read_len(), 7, "Wrong read length");
        assert!(record.roots().is_empty(), "Unmapped read has roots");
        assert_eq!(record.invalid_starts().count(), 0, "Unmapped read without start has invalid starts");
    }

    #[test]
    fn defaults_and_string_integers() {
        let record = parse(json!({
            "name": "read1",
            "sequence": "ACGTACGT",
            "subpath": [
                {
                    "path": { "mapping": [
                        { "position": { "node_id": "12", "offset": "3", "is_reverse": true },
                          "edit": [ { "from_length": 4, "to_length": 4 } ] }
                    ] },
                    "next": [1],
                    "score": 9
                },
                {
                    "path": { "mapping": [
                        { "position": { "node_id": 13 }, "edit": [ { "to_length": 4, "sequence": "ACGT" } ] }
                    ] }
                }
            ]
        }));
        assert!(record.is_mapped(), "Read with subpaths is not mapped");
        assert_eq!(record.roots(), 0..2, "Without start, every subpath should be a root");

        let first = &record.subpaths()[0];
        assert_eq!(first.path.mapping[0].position.node_id, "12", "Wrong node id");
        assert_eq!(first.path.mapping[0].position.offset, 3, "Wrong offset from a string");
        assert!(first.path.mapping[0].position.is_reverse, "Wrong orientation");
        assert_eq!(first.next, vec![1], "Wrong successors");
        assert_eq!(first.score, 9, "Wrong score");

        let second = &record.subpaths()[1];
        assert_eq!(second.path.mapping[0].position.node_id, "13", "Wrong node id from a number");
        assert_eq!(second.path.mapping[0].position.offset, 0, "Missing offset should be 0");
        assert!(!second.path.mapping[0].position.is_reverse, "Missing orientation should be forward");
        assert!(second.next.is_empty(), "Missing successors should be empty");
        assert_eq!(second.score, 0, "Missing score should be 0");
        assert_eq!(second.path.mapping[0].edit[0].from_length, 0, "Missing from_length should be 0");
    }

    #[test]
    fn explicit_starts() {
        let record = parse(json!({
            "name": "read1",
            "sequence": "A",
            "subpath": [ { "path": { "mapping": [] } }, { "path": { "mapping": [] } } ],
            "start": [0, "5", -1]
        }));
        assert_eq!(record.start, Some(vec![0, 5, -1]), "Start indices should be kept as given");
        assert_eq!(record.roots(), 0..2, "Every subpath should be a root even with start indices");
        assert_eq!(record.invalid_starts().collect::<Vec<_>>(), vec![5, -1], "Wrong invalid start indices");
    }

    #[test]
    fn edit_kinds() {
        let edit = |from: i64, to: i64, seq: Option<&str>| Edit {
            from_length: from, to_length: to, sequence: seq.map(String::from),
        };
        assert_eq!(edit(5, 5, None).kind(), EditKind::Match, "Wrong kind for a match");
        assert_eq!(edit(1, 1, Some("A")).kind(), EditKind::Substitution, "Wrong kind for a substitution");
        assert_eq!(edit(3, 0, None).kind(), EditKind::Deletion, "Wrong kind for a deletion");
        assert_eq!(edit(0, 2, Some("GA")).kind(), EditKind::Insertion, "Wrong kind for an insertion");
        assert_eq!(edit(0, 2, Some("GA")).bases(), b"GA", "Wrong inserted bases");
        assert!(edit(3, 0, None).bases().is_empty(), "Deletion should have no bases");
    }

    #[test]
    fn subpath_contribution() {
        let subpath = Subpath {
            path: SubpathPath { mapping: vec![
                Mapping {
                    position: Position { node_id: String::from("1"), offset: 0, is_reverse: false },
                    edit: vec![
                        Edit { from_length: 10, to_length: 10, sequence: None },
                        Edit { from_length: 1, to_length: 1, sequence: Some(String::from("C")) },
                        Edit { from_length: 2, to_length: 0, sequence: None },
                    ],
                },
                Mapping {
                    position: Position { node_id: String::from("2"), offset: 0, is_reverse: false },
                    edit: vec![
                        Edit { from_length: 0, to_length: 3, sequence: Some(String::from("GGG")) },
                        Edit { from_length: 4, to_length: 4, sequence: None },
                    ],
                },
            ] },
            next: Vec::new(),
            score: 12,
        };
        let truth = Contribution { read_len: 18, matches: 14, aligned: 15, score: 12 };
        assert_eq!(subpath.contribution(), truth, "Wrong subpath contribution");
    }
}

//-----------------------------------------------------------------------------
