//! In-memory pangenome graph: nodes, annotated paths, and adjacency.
//!
//! The graph is built once from [`GraphRecord`]s and treated as immutable afterwards.
//! Nodes and paths are stored in insertion order and accessed by their string identifiers.

use crate::{Error, GraphRecord, Result};
use crate::utils;

use std::collections::{BTreeMap, HashMap, HashSet};

use gbwt::Orientation;


//-----------------------------------------------------------------------------

/// An occurrence of a node on a path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Occurrence {
    /// Position of the node in the node list of the path.
    pub index: usize,
    /// Orientation of the node on the path.
    pub orientation: Orientation,
}

/// A node in the pangenome graph.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    id: String,
    sequence: Vec<u8>,
    previous: Vec<String>,
    next: Vec<String>,
    // Occurrences on each path crossing the node, ordered by path identifier.
    paths_crossed: BTreeMap<String, Vec<Occurrence>>,
}

impl Node {
    fn new(id: String, sequence: Vec<u8>) -> Self {
        Node {
            id, sequence,
            previous: Vec::new(),
            next: Vec::new(),
            paths_crossed: BTreeMap::new(),
        }
    }

    /// Returns the identifier of the node.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the sequence of the node in forward orientation.
    #[inline]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// Returns the length of the sequence.
    #[inline]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    /// Returns `true` if the sequence is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Returns the identifiers of the predecessor nodes.
    #[inline]
    pub fn previous(&self) -> &[String] {
        &self.previous
    }

    /// Returns the identifiers of the successor nodes.
    #[inline]
    pub fn next(&self) -> &[String] {
        &self.next
    }

    /// Returns the paths crossing the node and the occurrences of the node on each of them.
    ///
    /// The paths are ordered by their identifiers.
    #[inline]
    pub fn paths_crossed(&self) -> &BTreeMap<String, Vec<Occurrence>> {
        &self.paths_crossed
    }
}

//-----------------------------------------------------------------------------

/// An annotated path in the pangenome graph.
///
/// The identifier carries strain, gene, and copy metadata as `|`-separated fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    id: String,
    nodes: Vec<String>,
    sequence: Vec<u8>,
}

impl Path {
    /// Returns the identifier of the path.
    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the node identifiers on the path in path order.
    #[inline]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Returns the sequence of the path, with reverse-oriented nodes reverse-complemented.
    #[inline]
    pub fn sequence(&self) -> &[u8] {
        &self.sequence
    }

    /// Returns the number of nodes on the path.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if the path has no nodes.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

//-----------------------------------------------------------------------------

/// A pangenome graph storing nodes and paths.
///
/// The graph owns its nodes and paths.
/// They can only be added through [`Pangenome::add_node`], [`Pangenome::add_path`], and [`Pangenome::add_link`], or all at once with [`Pangenome::from_records`].
///
/// # Examples
///
/// ```
/// use pangenome_abundance::{GraphRecord, Pangenome};
/// use gbwt::Orientation;
///
/// let records = vec![
///     GraphRecord::Segment { id: String::from("1"), sequence: b"GAT".to_vec() },
///     GraphRecord::Segment { id: String::from("2"), sequence: b"TACA".to_vec() },
///     GraphRecord::Link { from: String::from("1"), to: String::from("2") },
///     GraphRecord::Path {
///         id: String::from("p"),
///         steps: vec![(String::from("1"), Orientation::Forward), (String::from("2"), Orientation::Reverse)],
///     },
/// ];
/// let graph = Pangenome::from_records(records).unwrap();
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.path("p").unwrap().sequence(), b"GATTGTA");
/// assert_eq!(graph.edges(), vec![(String::from("1"), String::from("2"))]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Pangenome {
    nodes: Vec<Node>,
    node_index: HashMap<String, usize>,
    paths: Vec<Path>,
    path_index: HashMap<String, usize>,
}

/// Construction.
impl Pangenome {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from tokenized records, processed in order.
    ///
    /// Returns an error if a path or a link references a node that has not been defined yet.
    pub fn from_records<I: IntoIterator<Item = GraphRecord>>(records: I) -> Result<Self> {
        let mut graph = Pangenome::new();
        for record in records {
            match record {
                GraphRecord::Segment { id, sequence } => graph.add_node(id, sequence)?,
                GraphRecord::Path { id, steps } => graph.add_path(id, &steps)?,
                GraphRecord::Link { from, to } => graph.add_link(&from, &to)?,
            }
        }
        log::info!("Graph has {} nodes and {} paths", graph.node_count(), graph.path_count());
        Ok(graph)
    }

    /// Adds a node with the given sequence.
    pub fn add_node(&mut self, id: String, sequence: Vec<u8>) -> Result<()> {
        if self.node_index.contains_key(&id) {
            return Err(Error::DuplicateNode(id));
        }
        self.node_index.insert(id.clone(), self.nodes.len());
        self.nodes.push(Node::new(id, sequence));
        Ok(())
    }

    /// Adds a path visiting the given oriented nodes.
    ///
    /// Registers each occurrence with the node and derives the path sequence.
    pub fn add_path(&mut self, id: String, steps: &[(String, Orientation)]) -> Result<()> {
        if self.path_index.contains_key(&id) {
            return Err(Error::DuplicatePath(id));
        }

        let mut nodes = Vec::with_capacity(steps.len());
        let mut sequence = Vec::new();
        for (index, (node_id, orientation)) in steps.iter().enumerate() {
            let offset = self.node_offset(node_id)?;
            let node = &mut self.nodes[offset];
            match orientation {
                Orientation::Forward => sequence.extend_from_slice(&node.sequence),
                Orientation::Reverse => sequence.extend(utils::reverse_complement(&node.sequence)),
            }
            node.paths_crossed.entry(id.clone()).or_default().push(Occurrence {
                index, orientation: *orientation,
            });
            nodes.push(node.id.clone());
        }

        self.path_index.insert(id.clone(), self.paths.len());
        self.paths.push(Path { id, nodes, sequence });
        Ok(())
    }

    /// Adds an edge from `from` to `to`, ignoring duplicates.
    pub fn add_link(&mut self, from: &str, to: &str) -> Result<()> {
        let from_offset = self.node_offset(from)?;
        let to_offset = self.node_offset(to)?;
        if !self.nodes[from_offset].next.iter().any(|x| x == to) {
            self.nodes[from_offset].next.push(to.to_string());
        }
        if !self.nodes[to_offset].previous.iter().any(|x| x == from) {
            self.nodes[to_offset].previous.push(from.to_string());
        }
        Ok(())
    }

    fn node_offset(&self, id: &str) -> Result<usize> {
        self.node_index.get(id).copied().ok_or_else(|| Error::UndefinedNode(id.to_string()))
    }
}

//-----------------------------------------------------------------------------

/// Accessing the graph.
impl Pangenome {
    /// Returns the number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the number of paths.
    #[inline]
    pub fn path_count(&self) -> usize {
        self.paths.len()
    }

    /// Returns the node with the given identifier, or [`None`] if there is no such node.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&offset| &self.nodes[offset])
    }

    /// Returns the node with the given identifier.
    ///
    /// Returns [`Error::UndefinedNode`] if there is no such node.
    pub fn get_node(&self, id: &str) -> Result<&Node> {
        self.node(id).ok_or_else(|| Error::UndefinedNode(id.to_string()))
    }

    /// Returns the path with the given identifier, or [`None`] if there is no such path.
    pub fn path(&self, id: &str) -> Option<&Path> {
        self.path_index.get(id).map(|&offset| &self.paths[offset])
    }

    /// Returns the path with the given identifier.
    ///
    /// Returns [`Error::UndefinedPath`] if there is no such path.
    pub fn get_path(&self, id: &str) -> Result<&Path> {
        self.path(id).ok_or_else(|| Error::UndefinedPath(id.to_string()))
    }

    /// Returns an iterator over the nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Returns an iterator over the paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter()
    }

    /// Returns the undirected edges of the graph.
    ///
    /// Each edge is reported once, in the order it is first seen when scanning the adjacency lists of the nodes.
    /// A self-loop is reported as `(id, id)`.
    pub fn edges(&self) -> Vec<(String, String)> {
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut result = Vec::new();
        for node in self.nodes.iter() {
            for neighbor in node.previous.iter().chain(node.next.iter()) {
                let key = if node.id.as_str() <= neighbor.as_str() {
                    (node.id.as_str(), neighbor.as_str())
                } else {
                    (neighbor.as_str(), node.id.as_str())
                };
                if seen.insert(key) {
                    result.push((key.0.to_string(), key.1.to_string()));
                }
            }
        }
        result
    }
}

//-----------------------------------------------------------------------------
