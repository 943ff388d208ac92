use crate::gfa;
use crate::mpmap::MultipathRecord;
use crate::{GeneIndex, Pangenome, ClusterTable};

use serde_json::{json, Value};

//-----------------------------------------------------------------------------

// Graph fixtures.

pub(crate) fn graph_from_gfa(gfa: &str) -> Pangenome {
    let records = gfa::read_records(gfa.as_bytes());
    assert!(records.is_ok(), "Failed to tokenize the graph: {}", records.unwrap_err());
    let graph = Pangenome::from_records(records.unwrap());
    assert!(graph.is_ok(), "Failed to build the graph: {}", graph.unwrap_err());
    graph.unwrap()
}

// Three 10 bp nodes in a chain, with a single path over them.
pub(crate) fn linear_graph() -> Pangenome {
    graph_from_gfa(concat!(
        "S\tN1\tACGTACGTAC\n",
        "S\tN2\tGGGGCCCCAA\n",
        "S\tN3\tTTTTAAAACC\n",
        "L\tN1\t+\tN2\t+\t0M\n",
        "L\tN2\t+\tN3\t+\t0M\n",
        "P\tP1\tN1+,N2+,N3+\t*\n",
    ))
}

// A bubble: N1 -> (N2 | N3) -> N4, with one gene through each branch.
// Two strains share the gene through N2, strain B carries two copies of it.
pub(crate) fn bubble_graph() -> Pangenome {
    graph_from_gfa(concat!(
        "S\tN1\tACGTACGTAC\n",
        "S\tN2\tGGGGCCCCAA\n",
        "S\tN3\tGGGGCCCCTT\n",
        "S\tN4\tTTTTAAAACC\n",
        "L\tN1\t+\tN2\t+\t0M\n",
        "L\tN1\t+\tN3\t+\t0M\n",
        "L\tN2\t+\tN4\t+\t0M\n",
        "L\tN3\t+\tN4\t+\t0M\n",
        "P\tc1|geneX|1|A|1\tN1+,N2+,N4+\t*\n",
        "P\tc1|geneX|1|B|1\tN1+,N2+,N4+\t*\n",
        "P\tc1|geneX|2|B|2\tN4-,N2-,N1-\t*\n",
        "P\tc1|geneY|1|C|1\tN1+,N3+,N4+\t*\n",
    ))
}

pub(crate) fn bubble_clusters() -> ClusterTable {
    let table = ClusterTable::from_json(r#"{
        "c1": { "genes_list": ["c1|geneX|1|A|1", "c1|geneX|1|B|1", "c1|geneX|2|B|2", "c1|geneY|1|C|1"] }
    }"#.as_bytes());
    assert!(table.is_ok(), "Failed to parse the cluster table: {}", table.unwrap_err());
    table.unwrap()
}

pub(crate) fn gene_index(graph: &Pangenome, clusters: &ClusterTable) -> GeneIndex {
    GeneIndex::new(graph, clusters)
}

//-----------------------------------------------------------------------------

// Alignment record fixtures.

// A mapping to a node with the given edits as (from_length, to_length, sequence).
pub(crate) fn mapping(node: &str, offset: usize, reverse: bool, edits: &[(usize, usize, Option<&str>)]) -> Value {
    let edits: Vec<Value> = edits.iter().map(|(from, to, seq)| {
        match seq {
            Some(seq) => json!({ "from_length": from, "to_length": to, "sequence": seq }),
            None => json!({ "from_length": from, "to_length": to }),
        }
    }).collect();
    let mut position = json!({ "node_id": node, "offset": offset.to_string() });
    if reverse {
        position["is_reverse"] = json!(true);
    }
    json!({ "position": position, "edit": edits })
}

// A full-length match to a node.
pub(crate) fn full_match(node: &str, len: usize) -> Value {
    mapping(node, 0, false, &[(len, len, None)])
}

pub(crate) fn subpath(mappings: Vec<Value>, next: &[usize], score: i64) -> Value {
    let mut result = json!({ "path": { "mapping": mappings } });
    if !next.is_empty() {
        result["next"] = json!(next);
    }
    if score != 0 {
        result["score"] = json!(score);
    }
    result
}

pub(crate) fn record(name: &str, sequence: &str, subpaths: Vec<Value>, start: Option<&[i64]>) -> MultipathRecord {
    let mut value = json!({ "name": name, "sequence": sequence, "subpath": subpaths });
    if let Some(start) = start {
        value["start"] = json!(start);
    }
    let result = serde_json::from_value(value);
    assert!(result.is_ok(), "Failed to build the record: {}", result.unwrap_err());
    result.unwrap()
}

// A read of the given length consisting of a repeated base.
pub(crate) fn read_sequence(len: usize) -> String {
    "A".repeat(len)
}

//-----------------------------------------------------------------------------
