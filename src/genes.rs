//! Genes as classes of annotated paths, and their cluster memberships.
//!
//! Paths with the same node sequence, or with reverse node sequences, are copies of the same gene.
//! A gene is identified by its signature: the node identifiers of the first path seen, joined with `-`.
//! Clusters group paths into gene families; they come from an external table.

use crate::{Error, Pangenome, Result};

use std::collections::{BTreeMap, HashMap};
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

//-----------------------------------------------------------------------------

/// Separator between the fields of a path identifier.
pub const PATH_FIELD_SEPARATOR: char = '|';

/// Index of the strain field in a path identifier.
pub const STRAIN_FIELD: usize = 3;

/// Returns the strain encoded in the path identifier, or [`None`] if the identifier has too few fields.
///
/// # Examples
///
/// ```
/// use pangenome_abundance::genes::strain_of;
///
/// assert_eq!(strain_of("c1|geneX|1|K12|1"), Some("K12"));
/// assert_eq!(strain_of("P1"), None);
/// ```
pub fn strain_of(path_id: &str) -> Option<&str> {
    path_id.split(PATH_FIELD_SEPARATOR).nth(STRAIN_FIELD)
}

/// Returns the gene signature for a list of node identifiers.
pub fn signature<S: AsRef<str>>(nodes: &[S]) -> String {
    nodes.iter().map(|x| x.as_ref()).collect::<Vec<_>>().join("-")
}

//-----------------------------------------------------------------------------

/// Cluster memberships: cluster identifier to member path identifiers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterTable {
    clusters: BTreeMap<String, Vec<String>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ClusterEntry {
    Members { genes_list: Vec<String> },
    List(Vec<String>),
}

impl ClusterTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object mapping cluster identifiers to member path identifiers.
    ///
    /// Each value is either a list of path identifiers or an object with the list in field `genes_list`.
    pub fn from_json<R: Read>(reader: R) -> Result<Self> {
        let entries: BTreeMap<String, ClusterEntry> = serde_json::from_reader(reader).map_err(Error::ClusterTable)?;
        let clusters = entries.into_iter().map(|(cluster, entry)| {
            let members = match entry {
                ClusterEntry::Members { genes_list } => genes_list,
                ClusterEntry::List(list) => list,
            };
            (cluster, members)
        }).collect();
        Ok(ClusterTable { clusters })
    }

    /// Loads the table from a JSON file, which may be gzip-compressed.
    pub fn load<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let reader = crate::utils::open_file(filename)?;
        Self::from_json(reader)
    }

    /// Adds a cluster with the given members.
    pub fn insert(&mut self, cluster: String, members: Vec<String>) {
        self.clusters.insert(cluster, members);
    }

    /// Returns the number of clusters.
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Returns `true` if the table is empty.
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Returns an iterator over clusters and their members, ordered by cluster identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.clusters.iter()
    }
}

//-----------------------------------------------------------------------------

/// A gene: annotated paths with identical node sequences up to reversal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Gene {
    signature: String,
    nodes: Vec<String>,
    paths: Vec<String>,
}

impl Gene {
    /// Returns the signature of the gene.
    #[inline]
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns the node identifiers in signature order.
    #[inline]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    /// Returns the identifiers of the member paths.
    #[inline]
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Returns the distinct strains of the member paths, in sorted order.
    pub fn strains(&self) -> Vec<&str> {
        let mut result: Vec<&str> = self.paths.iter().filter_map(|x| strain_of(x)).collect();
        result.sort_unstable();
        result.dedup();
        result
    }

    /// Returns the number of member paths belonging to the given strain.
    pub fn copies(&self, strain: &str) -> usize {
        self.paths.iter().filter(|x| strain_of(x) == Some(strain)).count()
    }
}

/// Gene and cluster of a path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    /// Offset of the gene in the index.
    gene: usize,
    /// Cluster identifier, if the path is in the cluster table.
    pub cluster: Option<String>,
}

/// Groups the paths of a graph into genes and maps each path to its gene and cluster.
///
/// # Examples
///
/// ```
/// use pangenome_abundance::{gfa, ClusterTable, GeneIndex, Pangenome};
///
/// let text = "S\t1\tA\nS\t2\tC\nP\tx\t1+,2+\t*\nP\ty\t2-,1-\t*\n";
/// let graph = Pangenome::from_records(gfa::read_records(text.as_bytes()).unwrap()).unwrap();
/// let mut clusters = ClusterTable::new();
/// clusters.insert(String::from("c"), vec![String::from("x")]);
///
/// let index = GeneIndex::new(&graph, &clusters);
/// assert_eq!(index.len(), 1);
/// assert_eq!(index.gene_of("y"), Some("1-2"));
/// assert_eq!(index.cluster_of("x"), Some("c"));
/// assert_eq!(index.cluster_of("y"), None);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GeneIndex {
    genes: Vec<Gene>,
    by_signature: HashMap<String, usize>,
    identities: HashMap<String, Identity>,
}

impl GeneIndex {
    /// Builds the index for the paths of the graph and the given cluster table.
    ///
    /// Paths are processed in graph order.
    /// Cluster members that are not paths in the graph are ignored with a warning.
    /// If a path is listed in multiple clusters, the first cluster in identifier order is used.
    pub fn new(graph: &Pangenome, clusters: &ClusterTable) -> Self {
        let mut genes: Vec<Gene> = Vec::new();
        let mut by_signature: HashMap<String, usize> = HashMap::new();
        let mut identities: HashMap<String, Identity> = HashMap::new();

        for path in graph.paths() {
            let forward = signature(path.nodes());
            let offset = match by_signature.get(&forward) {
                Some(&offset) => offset,
                None => {
                    let reversed: Vec<&String> = path.nodes().iter().rev().collect();
                    match by_signature.get(&signature(&reversed)) {
                        Some(&offset) => offset,
                        None => {
                            by_signature.insert(forward.clone(), genes.len());
                            genes.push(Gene { signature: forward, nodes: path.nodes().to_vec(), paths: Vec::new() });
                            genes.len() - 1
                        },
                    }
                },
            };
            genes[offset].paths.push(path.id().to_string());
            identities.insert(path.id().to_string(), Identity { gene: offset, cluster: None });
        }

        for (cluster, members) in clusters.iter() {
            for member in members.iter() {
                match identities.get_mut(member) {
                    Some(identity) if identity.cluster.is_none() => identity.cluster = Some(cluster.clone()),
                    Some(identity) => {
                        log::warn!(
                            "Path {} is in clusters {} and {}; using {}",
                            member, identity.cluster.as_deref().unwrap_or_default(), cluster,
                            identity.cluster.as_deref().unwrap_or_default()
                        );
                    },
                    None => log::warn!("Cluster {} lists unknown path {}", cluster, member),
                }
            }
        }

        log::info!("Number of unique genes: {}", genes.len());
        GeneIndex { genes, by_signature, identities }
    }

    /// Returns the number of genes.
    pub fn len(&self) -> usize {
        self.genes.len()
    }

    /// Returns `true` if there are no genes.
    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    /// Returns an iterator over the genes in the order they were created.
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.iter()
    }

    /// Returns the gene with the given signature.
    pub fn gene(&self, signature: &str) -> Option<&Gene> {
        self.by_signature.get(signature).map(|&offset| &self.genes[offset])
    }

    /// Returns the gene and cluster of the path.
    pub fn identity(&self, path_id: &str) -> Option<&Identity> {
        self.identities.get(path_id)
    }

    /// Returns the gene the path belongs to.
    pub fn gene_by_path(&self, path_id: &str) -> Option<&Gene> {
        self.identities.get(path_id).map(|x| &self.genes[x.gene])
    }

    /// Returns the signature of the gene the path belongs to.
    pub fn gene_of(&self, path_id: &str) -> Option<&str> {
        self.gene_by_path(path_id).map(|x| x.signature())
    }

    /// Returns the cluster of the path, if the path is in the cluster table.
    pub fn cluster_of(&self, path_id: &str) -> Option<&str> {
        self.identities.get(path_id).and_then(|x| x.cluster.as_deref())
    }
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
