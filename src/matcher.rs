//! Finding annotated paths that contain the node sequence of an alignment.

use crate::{Pangenome, Result};

//-----------------------------------------------------------------------------

/// Returns the identifiers of the paths containing the node sequence in either orientation.
///
/// The candidates are the occurrences of the first node on the paths crossing it.
/// A path matches in forward orientation if its node list continues from the occurrence with the given nodes.
/// It matches in reverse orientation if its node list ends at the occurrence with the given nodes in reverse order.
/// Each matching path is reported once, in the order of path identifiers.
/// Returns an empty vector if the node sequence is empty or not found.
///
/// # Errors
///
/// Returns a lookup error if the first node or a crossing path is not in the graph.
///
/// # Examples
///
/// ```
/// use pangenome_abundance::{gfa, matcher, Pangenome};
///
/// let text = "S\t1\tA\nS\t2\tC\nS\t3\tG\nP\tp\t1+,2+,3+\t*\n";
/// let graph = Pangenome::from_records(gfa::read_records(text.as_bytes()).unwrap()).unwrap();
/// assert_eq!(matcher::matching_paths(&graph, &["2", "3"]).unwrap(), vec!["p"]);
/// assert_eq!(matcher::matching_paths(&graph, &["3", "2"]).unwrap(), vec!["p"]);
/// assert!(matcher::matching_paths(&graph, &["1", "3"]).unwrap().is_empty());
/// ```
pub fn matching_paths<'a>(graph: &'a Pangenome, nodes: &[&str]) -> Result<Vec<&'a str>> {
    let Some(first) = nodes.first() else {
        return Ok(Vec::new());
    };
    let reversed: Vec<&str> = nodes.iter().rev().copied().collect();

    let mut result = Vec::new();
    for (path_id, occurrences) in graph.get_node(first)?.paths_crossed().iter() {
        let path = graph.get_path(path_id)?;
        let matches = occurrences.iter().any(|occurrence| {
            forward_match(path.nodes(), occurrence.index, nodes) || reverse_match(path.nodes(), occurrence.index, &reversed)
        });
        if matches {
            result.push(path.id());
        }
    }
    Ok(result)
}

// The slice starting at `start` equals the nodes.
fn forward_match(path: &[String], start: usize, nodes: &[&str]) -> bool {
    path.get(start..start + nodes.len()).is_some_and(|slice| slice == nodes)
}

// The slice ending at `end` (inclusive) equals the reversed nodes.
fn reverse_match(path: &[String], end: usize, reversed: &[&str]) -> bool {
    if end + 1 < reversed.len() {
        return false;
    }
    path.get(end + 1 - reversed.len()..end + 1).is_some_and(|slice| slice == reversed)
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
