//! Resolving the best-scoring alignment paths through a subpath DAG.
//!
//! A [`MultipathRecord`] describes all the ways a read could align to the graph as a DAG of subpaths.
//! [`resolve_best_paths`] relaxes the DAG level by level from its roots, keeping for each subpath only the best-scoring path prefixes ending there.
//! Ties are kept, so the result surfaces ambiguity instead of breaking it arbitrarily.
//! The surviving prefixes at the sinks become [`Alignment`] objects with node abundances, identity, and [`Variant`]s.

use crate::mpmap::{Contribution, MultipathRecord};
use crate::{Pangenome, Result};

use std::collections::{BTreeMap, VecDeque};

pub mod variants;

pub use variants::{extract_variants, Variant, VariantPosition};


//-----------------------------------------------------------------------------

/// A resolved path through the subpath DAG of a read.
#[derive(Clone, Debug, PartialEq)]
pub struct Alignment {
    /// Subpath indices on the path.
    pub subpaths: Vec<usize>,
    /// Graph nodes in the order they are first visited, with the aligned fraction of each node.
    ///
    /// The fraction is the number of aligned bases divided by the node length, summed over visits.
    pub nodes: Vec<(String, f64)>,
    /// Read bases covered by the path.
    pub read_len: usize,
    /// Total score.
    pub score: i64,
    /// Read bases in true matches.
    pub matches: usize,
    /// Aligned bases.
    pub aligned: usize,
    /// Variants in read order.
    pub variants: Vec<Variant>,
}

impl Alignment {
    /// Returns the fraction of aligned bases that are matches, or `0.0` if nothing is aligned.
    pub fn identity(&self) -> f64 {
        if self.aligned == 0 {
            0.0
        } else {
            self.matches as f64 / self.aligned as f64
        }
    }

    /// Returns the score divided by the length of the read.
    pub fn normalized_score(&self, read_len: usize) -> f64 {
        if read_len == 0 {
            0.0
        } else {
            self.score as f64 / read_len as f64
        }
    }

    /// Returns the node identifiers on the path.
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().map(|(id, _)| id.as_str()).collect()
    }

    /// Returns the number of variants that are not insertions.
    pub fn substitutions(&self) -> usize {
        self.variants.iter().filter(|x| !x.is_insertion()).count()
    }

    // Materializes the alignment for a path prefix ending at a sink.
    fn from_prefix(record: &MultipathRecord, prefix: Prefix, graph: &Pangenome) -> Result<Self> {
        let mut nodes: Vec<(String, f64)> = Vec::new();
        let mut variants = Vec::new();
        for &index in prefix.subpaths.iter() {
            let subpath = &record.subpaths()[index];
            for mapping in subpath.path.mapping.iter() {
                let node = graph.get_node(&mapping.position.node_id)?;
                let aligned: usize = mapping.edit.iter().map(|edit| edit.from_len().min(edit.to_len())).sum();
                let fraction = if node.is_empty() { 0.0 } else { aligned as f64 / node.len() as f64 };
                match nodes.iter_mut().find(|(id, _)| id == node.id()) {
                    Some((_, total)) => *total += fraction,
                    None => nodes.push((node.id().to_string(), fraction)),
                }
            }
            variants.extend(extract_variants(subpath, graph)?);
        }

        Ok(Alignment {
            subpaths: prefix.subpaths,
            nodes,
            read_len: prefix.read_len,
            score: prefix.score,
            matches: prefix.matches,
            aligned: prefix.aligned,
            variants,
        })
    }
}

//-----------------------------------------------------------------------------

// A path prefix from a root to some subpath.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Prefix {
    subpaths: Vec<usize>,
    read_len: usize,
    score: i64,
    matches: usize,
    aligned: usize,
}

impl Prefix {
    fn root(index: usize, contribution: Contribution) -> Self {
        Prefix {
            subpaths: vec![index],
            read_len: contribution.read_len,
            score: contribution.score,
            matches: contribution.matches,
            aligned: contribution.aligned,
        }
    }

    fn extend(&self, index: usize, contribution: Contribution) -> Self {
        let mut subpaths = self.subpaths.clone();
        subpaths.push(index);
        Prefix {
            subpaths,
            read_len: self.read_len + contribution.read_len,
            score: self.score + contribution.score,
            matches: self.matches + contribution.matches,
            aligned: self.aligned + contribution.aligned,
        }
    }
}

// Best-scoring prefixes ending at each subpath, keyed by subpath index.
// All prefixes in an entry have the same score.
#[derive(Debug, Default)]
struct Frontier {
    entries: BTreeMap<usize, Vec<Prefix>>,
}

impl Frontier {
    // A strictly better prefix replaces the entry, an equal one joins it, and a worse one is discarded.
    fn offer(&mut self, index: usize, prefix: Prefix) {
        let entry = self.entries.entry(index).or_default();
        match entry.first().map(|x| x.score) {
            Some(best) if prefix.score < best => {},
            Some(best) if prefix.score > best => {
                entry.clear();
                entry.push(prefix);
            },
            _ => entry.push(prefix),
        }
    }

    fn get(&self, index: usize) -> Option<&Vec<Prefix>> {
        self.entries.get(&index)
    }

    fn remove(&mut self, index: usize) -> Vec<Prefix> {
        self.entries.remove(&index).unwrap_or_default()
    }
}

// Converts a subpath reference into an index, if it is valid.
fn checked_index(value: i64, len: usize) -> Option<usize> {
    usize::try_from(value).ok().filter(|&index| index < len)
}

//-----------------------------------------------------------------------------

/// Returns all best-scoring alignments of the read through its subpath DAG.
///
/// Every subpath is seeded as a singleton prefix, and the DAG is processed in FIFO order.
/// A subpath is terminal if it has no valid successors or if every prefix ending there already covers the full read.
/// Otherwise each prefix ending at the subpath is extended to each successor, and the entry of the subpath is removed.
/// The prefixes remaining at the end reach sinks; those with the maximal score become alignments.
///
/// Invalid start or successor indices are skipped with a warning.
/// Returns an empty vector if the read has no subpaths.
///
/// # Errors
///
/// Returns an error if a mapping refers to a node that is not in the graph.
pub fn resolve_best_paths(record: &MultipathRecord, graph: &Pangenome) -> Result<Vec<Alignment>> {
    let subpaths = record.subpaths();
    let read_len = record.read_len();

    for start in record.invalid_starts() {
        log::warn!("Read {}: skipping invalid start subpath {}", record.name, start);
    }
    let mut frontier = Frontier::default();
    let mut queue: VecDeque<usize> = record.roots().collect();
    let mut queued = vec![true; subpaths.len()];
    for index in record.roots() {
        frontier.offer(index, Prefix::root(index, subpaths[index].contribution()));
    }

    while let Some(current) = queue.pop_front() {
        queued[current] = false;
        let subpath = &subpaths[current];
        let Some(prefixes) = frontier.get(current) else {
            continue;
        };
        let children: Vec<usize> = subpath.next.iter().filter_map(|&next| {
            let child = checked_index(next, subpaths.len());
            if child.is_none() {
                log::warn!("Read {}: skipping invalid successor {} of subpath {}", record.name, next, current);
            }
            child
        }).collect();
        if children.is_empty() || prefixes.iter().all(|x| x.read_len == read_len) {
            continue;
        }

        let prefixes = frontier.remove(current);
        for child in children {
            if !queued[child] {
                queue.push_back(child);
                queued[child] = true;
            }
            let contribution = subpaths[child].contribution();
            for prefix in prefixes.iter() {
                frontier.offer(child, prefix.extend(child, contribution));
            }
        }
    }

    let best = frontier.entries.values().flatten().map(|x| x.score).max();
    let mut result = Vec::new();
    for prefix in frontier.entries.into_values().flatten() {
        if Some(prefix.score) == best {
            result.push(Alignment::from_prefix(record, prefix, graph)?);
        }
    }
    Ok(result)
}

//-----------------------------------------------------------------------------
