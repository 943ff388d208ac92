//! Gene and strain abundances from the collected reads.
//!
//! Each (read, mate) slot is classified:
//!
//! * multi-mapped: more than one best alignment;
//! * novel: the alignment does not occur on any annotated path;
//! * ambiguous: the alignment occurs on paths of more than one gene;
//! * unique: the alignment occurs on paths of exactly one gene.
//!
//! Only unique mates contribute to gene abundances.
//! Gene statistics are then rolled up into strain statistics for each coverage threshold in `0%, 5%, ..., 100%`.

use crate::genes::{self, Gene};
use crate::reads::{ReadSet, VariantTable};
use crate::{matcher, utils};
use crate::{Alignment, GeneIndex, Pangenome, Result};

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

#[cfg(test)]
mod tests;

//-----------------------------------------------------------------------------

/// Step between coverage thresholds, in percent.
pub const THRESHOLD_STEP: usize = 5;

/// Returns the coverage thresholds in percent.
pub fn coverage_thresholds() -> impl Iterator<Item = usize> {
    (0..=100).step_by(THRESHOLD_STEP)
}

/// Returns the coverage threshold as a fraction.
#[inline]
pub fn threshold_fraction(percent: usize) -> f64 {
    percent as f64 / 100.0
}

//-----------------------------------------------------------------------------

/// A read and one of its mates, identified by the mate sequence.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MateRef {
    pub read: String,
    pub sequence: String,
}

impl MateRef {
    fn new(read: &str, sequence: &str) -> Self {
        MateRef { read: read.to_string(), sequence: sequence.to_string() }
    }
}

/// Mates that were not assigned to a single gene.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Classification {
    /// Mates with more than one best alignment.
    pub multi_mapped: Vec<MateRef>,
    /// Mates matching multiple genes, listed under each gene signature.
    pub ambiguous: BTreeMap<String, Vec<MateRef>>,
    /// Mates matching no annotated path, by the cluster of the first path crossing the first node.
    pub novel: BTreeMap<Option<String>, Vec<MateRef>>,
    /// Number of mates assigned to a single gene.
    pub unique: usize,
}

impl Classification {
    /// Returns the number of distinct ambiguous mates.
    pub fn ambiguous_count(&self) -> usize {
        let mut mates: Vec<&MateRef> = self.ambiguous.values().flatten().collect();
        mates.sort_unstable();
        mates.dedup();
        mates.len()
    }

    /// Returns the number of novel mates.
    pub fn novel_count(&self) -> usize {
        self.novel.values().map(|x| x.len()).sum()
    }
}

//-----------------------------------------------------------------------------

/// Histogram of substitutions per read, with the normalized substitution load.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SubstitutionHistogram {
    /// Number of reads for each number of substitutions.
    pub counts: BTreeMap<usize, usize>,
    /// Distinct substitution sites divided by the sequence length, summed over genes.
    pub normalized: f64,
}

impl SubstitutionHistogram {
    /// Counts a read with the given number of substitutions.
    pub fn add(&mut self, substitutions: usize) {
        *self.counts.entry(substitutions).or_default() += 1;
    }

    /// Adds the counts and the normalized load of another histogram.
    pub fn merge(&mut self, other: &SubstitutionHistogram) {
        for (&substitutions, &count) in other.counts.iter() {
            *self.counts.entry(substitutions).or_default() += count;
        }
        self.normalized += other.normalized;
    }

    /// Returns the number of reads with the given number of substitutions.
    pub fn count(&self, substitutions: usize) -> usize {
        self.counts.get(&substitutions).copied().unwrap_or(0)
    }

    /// Returns the largest number of substitutions in a read, or [`None`] if the histogram is empty.
    pub fn max_substitutions(&self) -> Option<usize> {
        self.counts.keys().next_back().copied()
    }
}

//-----------------------------------------------------------------------------

/// Abundance of a gene from uniquely assigned mates.
#[derive(Clone, Debug, PartialEq)]
pub struct GeneAbundance {
    /// Sum of mate lengths divided by the gene length.
    pub unique_count: f64,
    /// Accumulated aligned fraction for each distinct node of the gene, in signature order.
    pub node_abundance: Vec<(String, f64)>,
    /// Substitutions in the unique mates.
    pub substitutions: SubstitutionHistogram,
    /// Fraction of nodes with nonzero abundance.
    pub coverage: f64,
    /// Mean node abundance.
    pub mean: f64,
    /// Population standard deviation of node abundances.
    pub std: f64,
    // Total length of the nodes in the signature.
    sequence_len: usize,
}

impl GeneAbundance {
    /// Creates an empty record for the gene.
    ///
    /// Returns a lookup error if a node of the gene is not in the graph.
    pub fn new(gene: &Gene, graph: &Pangenome) -> Result<Self> {
        let mut node_abundance: Vec<(String, f64)> = Vec::new();
        let mut sequence_len = 0;
        for node_id in gene.nodes() {
            sequence_len += graph.get_node(node_id)?.len();
            if !node_abundance.iter().any(|(id, _)| id == node_id) {
                node_abundance.push((node_id.clone(), 0.0));
            }
        }
        Ok(GeneAbundance {
            unique_count: 0.0,
            node_abundance,
            substitutions: SubstitutionHistogram::default(),
            coverage: 0.0,
            mean: 0.0,
            std: 0.0,
            sequence_len,
        })
    }

    /// Adds a uniquely assigned mate with the given sequence length and alignment.
    pub fn add_mate(&mut self, mate_len: usize, alignment: &Alignment) {
        if self.sequence_len > 0 {
            self.unique_count += mate_len as f64 / self.sequence_len as f64;
        }
        for (node_id, fraction) in alignment.nodes.iter() {
            if let Some((_, total)) = self.node_abundance.iter_mut().find(|(id, _)| id == node_id) {
                *total += fraction;
            }
        }
        self.substitutions.add(alignment.substitutions());
    }

    /// Computes coverage, mean, and standard deviation from the node abundances.
    pub fn finalize(&mut self) {
        let values: Vec<f64> = self.node_abundance.iter().map(|(_, x)| *x).collect();
        self.coverage = if values.is_empty() {
            0.0
        } else {
            values.iter().filter(|&&x| x > 0.0).count() as f64 / values.len() as f64
        };
        self.mean = utils::mean(&values);
        self.std = utils::std_dev(&values);
    }
}

//-----------------------------------------------------------------------------

/// Statistics for a strain at one coverage threshold.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StrainStats {
    /// Genes of the strain with coverage at least the threshold.
    pub gene_count: usize,
    /// Mean abundance of each such gene.
    pub samples: Vec<f64>,
    /// Number of copies of each such gene in the strain.
    pub copies: Vec<usize>,
    /// Substitutions over all such genes.
    pub total: SubstitutionHistogram,
    /// Substitutions over such genes found only in this strain.
    pub unique: SubstitutionHistogram,
    /// Mean of the copy-normalized samples.
    pub mean: f64,
    /// Population standard deviation of the copy-normalized samples.
    pub std: f64,
}

impl StrainStats {
    fn add_gene(&mut self, abundance: &GeneAbundance, copies: usize, strain_specific: bool) {
        self.gene_count += 1;
        self.samples.push(abundance.mean);
        self.copies.push(copies);
        self.total.merge(&abundance.substitutions);
        if strain_specific {
            self.unique.merge(&abundance.substitutions);
        }
    }

    /// Returns the samples divided by the copy counts.
    pub fn normalized_samples(&self) -> Vec<f64> {
        self.samples.iter().zip(self.copies.iter()).map(|(&sample, &copies)| {
            if copies == 0 { 0.0 } else { sample / copies as f64 }
        }).collect()
    }

    /// Computes the mean and the standard deviation of the copy-normalized samples.
    pub fn finalize(&mut self) {
        let normalized = self.normalized_samples();
        self.mean = utils::mean(&normalized);
        self.std = utils::std_dev(&normalized);
    }
}

//-----------------------------------------------------------------------------

/// Gene and strain abundances with the classification of the mates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AbundanceReport {
    /// Abundances of genes with at least one unique mate, by gene signature.
    pub genes: BTreeMap<String, GeneAbundance>,
    /// Statistics by strain and coverage threshold in percent.
    pub strains: BTreeMap<String, BTreeMap<usize, StrainStats>>,
    /// Mates that were not assigned to a single gene.
    pub classification: Classification,
    max_substitutions: usize,
}

impl AbundanceReport {
    /// Classifies the mates in the read set and computes gene and strain abundances.
    ///
    /// # Errors
    ///
    /// Returns a lookup error if an alignment or a gene refers to a node or a path that is not in the graph.
    pub fn new(graph: &Pangenome, genes: &GeneIndex, reads: &ReadSet, variants: &VariantTable) -> Result<Self> {
        let mut report = AbundanceReport::default();
        for (read, mates) in reads.iter() {
            for (sequence, alignments) in mates.iter() {
                report.assign(graph, genes, MateRef::new(read, sequence), alignments)?;
            }
        }
        log::info!(
            "Mates: {} unique, {} ambiguous, {} multi-mapped, {} novel",
            report.classification.unique, report.classification.ambiguous_count(),
            report.classification.multi_mapped.len(), report.classification.novel_count()
        );

        report.finalize_genes(graph, genes, variants)?;
        report.roll_up_strains(genes);
        log::info!("Abundances for {} genes in {} strains", report.genes.len(), report.strains.len());
        Ok(report)
    }

    /// Returns the largest number of substitutions in a unique mate.
    pub fn max_substitutions(&self) -> usize {
        self.max_substitutions
    }

    // Classifies a mate and updates the gene abundance for a unique mate.
    fn assign(&mut self, graph: &Pangenome, genes: &GeneIndex, mate: MateRef, alignments: &[Alignment]) -> Result<()> {
        if alignments.len() != 1 {
            self.classification.multi_mapped.push(mate);
            return Ok(());
        }

        let alignment = &alignments[0];
        let nodes = alignment.node_ids();
        let mut found: Vec<&Gene> = Vec::new();
        for path_id in matcher::matching_paths(graph, &nodes)? {
            if let Some(gene) = genes.gene_by_path(path_id) {
                if !found.iter().any(|x| x.signature() == gene.signature()) {
                    found.push(gene);
                }
            }
        }

        match found.len() {
            0 => {
                let cluster = match nodes.first() {
                    Some(first) => graph.get_node(first)?.paths_crossed().keys().next()
                        .and_then(|path_id| genes.cluster_of(path_id)).map(String::from),
                    None => None,
                };
                self.classification.novel.entry(cluster).or_default().push(mate);
            },
            1 => {
                let gene = found[0];
                let abundance = match self.genes.entry(gene.signature().to_string()) {
                    Entry::Occupied(entry) => entry.into_mut(),
                    Entry::Vacant(entry) => entry.insert(GeneAbundance::new(gene, graph)?),
                };
                abundance.add_mate(mate.sequence.len(), alignment);
                self.max_substitutions = self.max_substitutions.max(alignment.substitutions());
                self.classification.unique += 1;
            },
            _ => {
                for gene in found {
                    self.classification.ambiguous.entry(gene.signature().to_string()).or_default().push(mate.clone());
                }
            },
        }
        Ok(())
    }

    // Adds the normalized substitution load and computes the node statistics.
    fn finalize_genes(&mut self, graph: &Pangenome, genes: &GeneIndex, variants: &VariantTable) -> Result<()> {
        for (signature, abundance) in self.genes.iter_mut() {
            if let Some(gene) = genes.gene(signature) {
                let sites: usize = abundance.node_abundance.iter().map(|(id, _)| variants.substitution_sites(id)).sum();
                let len = match gene.paths().first() {
                    Some(path_id) => graph.get_path(path_id)?.sequence().len(),
                    None => 0,
                };
                if len > 0 {
                    abundance.substitutions.normalized = sites as f64 / len as f64;
                }
            }
            abundance.finalize();
        }
        Ok(())
    }

    // Rolls gene statistics up into strain statistics for each coverage threshold.
    fn roll_up_strains(&mut self, genes: &GeneIndex) {
        for (signature, abundance) in self.genes.iter() {
            let Some(gene) = genes.gene(signature) else {
                continue;
            };
            if gene.paths().iter().any(|x| genes::strain_of(x).is_none()) {
                log::warn!("Gene {} has paths without a strain field", signature);
            }
            let strains = gene.strains();
            let strain_specific = strains.len() == 1;
            for strain in strains {
                let copies = gene.copies(strain);
                let by_threshold = self.strains.entry(strain.to_string()).or_insert_with(|| {
                    coverage_thresholds().map(|x| (x, StrainStats::default())).collect()
                });
                for (&percent, stats) in by_threshold.iter_mut() {
                    if abundance.coverage >= threshold_fraction(percent) {
                        stats.add_gene(abundance, copies, strain_specific);
                    }
                }
            }
        }

        for stats in self.strains.values_mut().flat_map(|x| x.values_mut()) {
            stats.finalize();
        }
    }
}

//-----------------------------------------------------------------------------
