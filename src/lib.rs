//! # Pangenome abundance: assigning aligned reads to genes and strains.
//!
//! This crate takes reads aligned to a pangenome graph by `vg mpmap` and assigns them to annotated gene variants.
//! The results are per-gene abundance and substitution statistics, rolled up into per-strain statistics over a sweep of coverage thresholds.
//!
//! ### Basic concepts
//!
//! The graph is a [`Pangenome`] of [`Node`]s and annotated [`Path`]s, loaded from a GFA file with [`gfa::load_graph`].
//! Path identifiers carry metadata as `|`-separated fields; the strain is field 3 (see [`genes::strain_of`]).
//!
//! Paths with the same node sequence up to reversal are copies of the same [`Gene`].
//! The [`GeneIndex`] groups the paths into genes and maps each path to its gene and its cluster in a [`ClusterTable`].
//!
//! Each read is a [`MultipathRecord`]: a DAG of subpaths, each of them a partial alignment with its own score.
//! [`resolve_best_paths`] finds all best-scoring paths through the DAG and turns them into [`Alignment`]s with [`Variant`]s.
//! [`matcher::matching_paths`] finds the annotated paths containing the node sequence of an alignment.
//!
//! ### Pipeline
//!
//! 1. Load the graph and build the gene index.
//! 2. Stream the alignment records through a [`ReadCollector`], which applies the score threshold and groups the alignments by read and mate.
//! 3. Classify the reads and aggregate the abundances with [`AbundanceReport::new`].
//! 4. Write the strain table with [`report::write_strain_table`] and the full results with [`ResultsDb::create`].
//!
//! The `gene-abundance` binary runs the entire pipeline.

pub mod abundance;
pub mod alignment;
pub mod db;
pub mod error;
pub mod genes;
pub mod gfa;
pub mod graph;
pub mod matcher;
pub mod mpmap;
pub mod reads;
pub mod report;
pub mod utils;

#[cfg(test)]
pub(crate) mod internal;

pub use abundance::{AbundanceReport, GeneAbundance, StrainStats, SubstitutionHistogram};
pub use alignment::{resolve_best_paths, Alignment, Variant, VariantPosition};
pub use db::ResultsDb;
pub use error::{Error, Result};
pub use genes::{ClusterTable, Gene, GeneIndex};
pub use gfa::GraphRecord;
pub use graph::{Node, Occurrence, Pangenome, Path};
pub use mpmap::MultipathRecord;
pub use reads::{ReadCollector, ReadSet, VariantTable};
