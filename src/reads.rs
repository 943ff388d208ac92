//! Streaming alignment records into per-read alignment sets and a variant table.
//!
//! Records for the same read must be contiguous in the input.
//! Each read may have several mates, identified by their sequences.
//! For each (read, mate) slot, the collector keeps the best-scoring alignments that pass the score threshold.
//! When all records of a read have been seen, the variants of the read are added to the [`VariantTable`],
//! but only if every mate of the read has exactly one alignment.

use crate::mpmap::MultipathRecord;
use crate::{resolve_best_paths, Alignment, Error, Pangenome, Result, Variant, VariantPosition};

use std::collections::BTreeMap;
use std::io::BufRead;

//-----------------------------------------------------------------------------

/// Variants observed in uniquely aligned reads: node to position to base to read names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VariantTable {
    nodes: BTreeMap<String, BTreeMap<VariantPosition, BTreeMap<u8, Vec<String>>>>,
}

impl VariantTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that the read supports the variant.
    pub fn add(&mut self, variant: &Variant, read: &str) {
        self.nodes.entry(variant.node.clone()).or_default()
            .entry(variant.position.clone()).or_default()
            .entry(variant.base).or_default()
            .push(read.to_string());
    }

    /// Returns the number of nodes with variants.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` if there are no variants.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns the variants on the node by position and base.
    pub fn get(&self, node: &str) -> Option<&BTreeMap<VariantPosition, BTreeMap<u8, Vec<String>>>> {
        self.nodes.get(node)
    }

    /// Returns the names of the reads supporting the variant.
    pub fn reads(&self, node: &str, position: &VariantPosition, base: u8) -> &[String] {
        self.nodes.get(node)
            .and_then(|positions| positions.get(position))
            .and_then(|bases| bases.get(&base))
            .map(|x| x.as_slice())
            .unwrap_or_default()
    }

    /// Returns the number of distinct positions on the node with substitutions or deletions.
    pub fn substitution_sites(&self, node: &str) -> usize {
        self.nodes.get(node).map(|positions| {
            positions.keys().filter(|x| !x.is_insertion()).count()
        }).unwrap_or(0)
    }

    /// Returns an iterator over nodes and their variants, ordered by node identifier.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<VariantPosition, BTreeMap<u8, Vec<String>>>)> {
        self.nodes.iter()
    }
}

//-----------------------------------------------------------------------------

/// Best alignments for each read and mate: read name to mate sequence to alignments.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadSet {
    reads: BTreeMap<String, BTreeMap<String, Vec<Alignment>>>,
}

impl ReadSet {
    /// Creates an empty read set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers alignments with equal scores for the given read and mate.
    ///
    /// Alignments with a strictly better score replace the existing ones, and alignments with an equal score are added to them.
    /// Worse alignments are ignored.
    pub fn insert(&mut self, name: &str, sequence: &str, alignments: Vec<Alignment>) {
        let Some(score) = alignments.first().map(|x| x.score) else {
            return;
        };
        let mates = self.reads.entry(name.to_string()).or_default();
        match mates.get_mut(sequence) {
            Some(existing) => {
                let best = existing.first().map(|x| x.score);
                if best.is_none() || Some(score) > best {
                    *existing = alignments;
                } else if Some(score) == best {
                    existing.extend(alignments);
                }
            },
            None => {
                mates.insert(sequence.to_string(), alignments);
            },
        }
    }

    /// Returns the number of reads.
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    /// Returns `true` if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Returns the total number of mates over all reads.
    pub fn mates(&self) -> usize {
        self.reads.values().map(|x| x.len()).sum()
    }

    /// Returns the mates of the read with their alignments.
    pub fn get(&self, name: &str) -> Option<&BTreeMap<String, Vec<Alignment>>> {
        self.reads.get(name)
    }

    /// Returns `true` if every mate of the read has exactly one alignment.
    pub fn is_resolved(&self, name: &str) -> bool {
        self.reads.get(name).is_some_and(|mates| mates.values().all(|x| x.len() == 1))
    }

    /// Returns an iterator over reads and their mates, ordered by read name.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &BTreeMap<String, Vec<Alignment>>)> {
        self.reads.iter()
    }
}

//-----------------------------------------------------------------------------

/// Statistics on the processed records.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Records processed.
    pub records: usize,
    /// Records without subpaths.
    pub unmapped: usize,
    /// Mapped records without a resolved alignment.
    pub unresolved: usize,
    /// Records with a normalized score below the threshold.
    pub below_threshold: usize,
    /// Records with alignments kept.
    pub kept: usize,
    /// Reads whose variants were added to the variant table.
    pub flushed: usize,
}

/// Collects the best alignments for each read from a stream of alignment records.
///
/// Records for the same read must be contiguous in the stream.
/// The variants of a read are flushed when the read name changes, so a read that reappears later may be flushed again with its variants added twice.
///
/// # Examples
///
/// ```
/// use pangenome_abundance::{gfa, MultipathRecord, Pangenome, ReadCollector};
///
/// let text = "S\t1\tGATTACA\n";
/// let graph = Pangenome::from_records(gfa::read_records(text.as_bytes()).unwrap()).unwrap();
/// let json = r#"{"name": "r", "sequence": "GATTACA", "subpath": [
///     {"path": {"mapping": [{"position": {"node_id": "1"}, "edit": [{"from_length": 7, "to_length": 7}]}]}, "score": 7}
/// ]}"#;
/// let record: MultipathRecord = serde_json::from_str(json).unwrap();
///
/// let mut collector = ReadCollector::new(&graph, 0.9).unwrap();
/// collector.process(&record).unwrap();
/// let (reads, variants) = collector.finish();
/// assert!(reads.is_resolved("r"));
/// assert!(variants.is_empty());
/// ```
#[derive(Debug)]
pub struct ReadCollector<'a> {
    graph: &'a Pangenome,
    threshold: f64,
    reads: ReadSet,
    variants: VariantTable,
    current: Option<String>,
    stats: CollectorStats,
}

impl<'a> ReadCollector<'a> {
    /// Creates a new collector with the given threshold for the normalized alignment score.
    ///
    /// Returns an error if the threshold is not in the interval `[0, 1]`.
    pub fn new(graph: &'a Pangenome, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(Error::InvalidParameter(format!("Score threshold must be in [0, 1], got {}", threshold)));
        }
        Ok(ReadCollector {
            graph, threshold,
            reads: ReadSet::new(),
            variants: VariantTable::new(),
            current: None,
            stats: CollectorStats::default(),
        })
    }

    /// Returns the score threshold.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns statistics on the records processed so far.
    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }

    /// Processes the next alignment record.
    ///
    /// If the record starts a new read, the variants of the previous read are added to the variant table.
    /// Unmapped records and records below the threshold are counted and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the record refers to a node that is not in the graph.
    pub fn process(&mut self, record: &MultipathRecord) -> Result<()> {
        self.stats.records += 1;
        if self.current.as_deref() != Some(record.name.as_str()) {
            self.flush();
            self.current = Some(record.name.clone());
        }
        if !record.is_mapped() {
            self.stats.unmapped += 1;
            return Ok(());
        }

        let alignments = resolve_best_paths(record, self.graph)?;
        let Some(best) = alignments.first() else {
            log::debug!("Read {}: no alignment could be resolved", record.name);
            self.stats.unresolved += 1;
            return Ok(());
        };
        if best.normalized_score(record.read_len()) < self.threshold {
            self.stats.below_threshold += 1;
            return Ok(());
        }

        self.stats.kept += 1;
        self.reads.insert(&record.name, &record.sequence, alignments);
        Ok(())
    }

    /// Finishes the stream and returns the read set and the variant table.
    pub fn finish(mut self) -> (ReadSet, VariantTable) {
        self.flush();
        let stats = self.stats;
        log::info!(
            "Processed {} records: {} unmapped, {} unresolved, {} below threshold {}, {} kept",
            stats.records, stats.unmapped, stats.unresolved, stats.below_threshold, self.threshold, stats.kept
        );
        log::info!("Kept {} reads with {} mates; variants from {} reads", self.reads.len(), self.reads.mates(), stats.flushed);
        (self.reads, self.variants)
    }

    // Adds the variants of the current read to the table.
    fn flush(&mut self) {
        let Some(name) = self.current.take() else {
            return;
        };
        if !self.reads.is_resolved(&name) {
            return;
        }
        if let Some(mates) = self.reads.get(&name) {
            for alignments in mates.values() {
                for variant in alignments[0].variants.iter() {
                    self.variants.add(variant, &name);
                }
            }
            self.stats.flushed += 1;
        }
    }
}

/// Reads alignment records in JSON Lines format and collects the best alignments for each read.
///
/// Empty lines are skipped.
///
/// # Errors
///
/// Returns [`Error::Record`] with the line number if a line cannot be parsed.
/// Passes through errors from reading the input and from processing the records.
pub fn collect_reads<R: BufRead>(reader: R, graph: &Pangenome, threshold: f64) -> Result<(ReadSet, VariantTable)> {
    let mut collector = ReadCollector::new(graph, threshold)?;
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: MultipathRecord = serde_json::from_str(&line).map_err(|source| {
            Error::Record { line: line_num + 1, source }
        })?;
        collector.process(&record)?;
    }
    Ok(collector.finish())
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
