use super::*;

use crate::internal;
use crate::mpmap::MultipathRecord;
use crate::{ClusterTable, ReadCollector};

//-----------------------------------------------------------------------------

fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

fn report(graph: &Pangenome, clusters: &ClusterTable, records: &[MultipathRecord], threshold: f64) -> AbundanceReport {
    let genes = internal::gene_index(graph, clusters);
    let mut collector = ReadCollector::new(graph, threshold).unwrap();
    for record in records {
        let result = collector.process(record);
        assert!(result.is_ok(), "Failed to process read {}: {}", record.name, result.unwrap_err());
    }
    let (reads, variants) = collector.finish();
    let result = AbundanceReport::new(graph, &genes, &reads, &variants);
    assert!(result.is_ok(), "Failed to compute abundances: {}", result.unwrap_err());
    result.unwrap()
}

// A single subpath over full-length matches to the given 10 bp nodes.
fn full_read(name: &str, nodes: &[&str], score: i64) -> MultipathRecord {
    let mappings = nodes.iter().map(|node| internal::full_match(node, 10)).collect();
    let len = 10 * nodes.len();
    internal::record(name, &internal::read_sequence(len), vec![internal::subpath(mappings, &[], score)], None)
}

fn strain_stats<'a>(report: &'a AbundanceReport, strain: &str, percent: usize) -> &'a StrainStats {
    let stats = report.strains.get(strain).and_then(|x| x.get(&percent));
    assert!(stats.is_some(), "Missing statistics for strain {} at {}%", strain, percent);
    stats.unwrap()
}

//-----------------------------------------------------------------------------

#[test]
fn thresholds() {
    let thresholds: Vec<usize> = coverage_thresholds().collect();
    assert_eq!(thresholds.len(), 21, "Wrong number of coverage thresholds");
    assert_eq!(thresholds.first(), Some(&0), "Wrong first threshold");
    assert_eq!(thresholds.last(), Some(&100), "Wrong last threshold");
    assert_eq!(threshold_fraction(35), 0.35, "Wrong threshold fraction");
}

#[test]
fn linear_end_to_end() {
    let graph = internal::linear_graph();
    let records = vec![full_read("r1", &["N1", "N2", "N3"], 30)];
    let report = report(&graph, &ClusterTable::new(), &records, 0.9);

    assert_eq!(report.classification.unique, 1, "Wrong number of unique mates");
    assert_eq!(report.genes.len(), 1, "Wrong number of genes");
    let gene = report.genes.get("N1-N2-N3");
    assert!(gene.is_some(), "Missing gene N1-N2-N3");
    let gene = gene.unwrap();
    assert_eq!(gene.unique_count, 1.0, "Wrong unique count");
    assert_eq!(gene.coverage, 1.0, "Wrong coverage");
    assert_eq!(gene.mean, 1.0, "Wrong mean abundance");
    assert_eq!(gene.std, 0.0, "Wrong standard deviation");
    let truth = vec![(String::from("N1"), 1.0), (String::from("N2"), 1.0), (String::from("N3"), 1.0)];
    assert_eq!(gene.node_abundance, truth, "Wrong node abundances");
    assert_eq!(gene.substitutions.count(0), 1, "Wrong substitution histogram");
    assert_eq!(report.max_substitutions(), 0, "Wrong maximum number of substitutions");

    // P1 has no strain field.
    assert!(report.strains.is_empty(), "Strain statistics for a path without a strain");
}

#[test]
fn below_threshold_is_not_counted() {
    let graph = internal::linear_graph();
    let records = vec![full_read("r1", &["N1", "N2", "N3"], 20)];
    let report = report(&graph, &ClusterTable::new(), &records, 0.9);
    assert!(report.genes.is_empty(), "Gene abundance from a read below the threshold");
    assert_eq!(report.classification, Classification::default(), "Read below the threshold was classified");
}

#[test]
fn tied_alignments_are_multi_mapped() {
    let graph = internal::bubble_graph();
    let record = internal::record("tie", &internal::read_sequence(20), vec![
        internal::subpath(vec![internal::full_match("N1", 10)], &[1, 2], 10),
        internal::subpath(vec![internal::full_match("N2", 10)], &[], 10),
        internal::subpath(vec![internal::full_match("N3", 10)], &[], 10),
    ], Some(&[0]));
    let report = report(&graph, &internal::bubble_clusters(), &[record], 0.9);

    let mate = MateRef { read: String::from("tie"), sequence: internal::read_sequence(20) };
    assert_eq!(report.classification.multi_mapped, vec![mate], "Tied read was not multi-mapped");
    assert_eq!(report.classification.unique, 0, "Tied read was counted as unique");
    assert!(report.genes.is_empty(), "Tied read contributed to gene abundances");
}

#[test]
fn shared_prefix_is_ambiguous() {
    let graph = internal::bubble_graph();
    let records = vec![full_read("shared", &["N1"], 10)];
    let report = report(&graph, &internal::bubble_clusters(), &records, 0.9);

    let ambiguous: Vec<&String> = report.classification.ambiguous.keys().collect();
    assert_eq!(ambiguous, vec!["N1-N2-N4", "N1-N3-N4"], "Read was not ambiguous for both genes");
    assert_eq!(report.classification.ambiguous_count(), 1, "Wrong number of distinct ambiguous mates");
    assert_eq!(report.classification.unique, 0, "Ambiguous read was counted as unique");
    assert!(report.genes.is_empty(), "Ambiguous read contributed to gene abundances");
}

#[test]
fn novel_reads() {
    let graph = internal::bubble_graph();
    let records = vec![full_read("novel", &["N2", "N3"], 20)];
    let report = report(&graph, &internal::bubble_clusters(), &records, 0.9);
    let novel = report.classification.novel.get(&Some(String::from("c1")));
    assert!(novel.is_some_and(|x| x.len() == 1), "Novel read was not bucketed under cluster c1");
    assert_eq!(report.classification.novel_count(), 1, "Wrong number of novel mates");

    let report = self::report(&graph, &ClusterTable::new(), &records, 0.9);
    assert!(report.classification.novel.contains_key(&None), "Novel read without a cluster was not bucketed under None");
}

#[test]
fn zero_coverage() {
    let graph = internal::graph_from_gfa(concat!(
        "S\tN1\tACGTACGTAC\n",
        "S\tN2\tGGGGCCCCAA\n",
        "P\tc|g|1|S|1\tN1+,N2+\t*\n",
    ));
    // Only inserted bases: the alignment covers no node bases.
    let mapping = internal::mapping("N1", 5, false, &[(0, 5, Some("GATTA"))]);
    let record = internal::record("ins", &internal::read_sequence(5), vec![internal::subpath(vec![mapping], &[], 5)], None);
    let report = report(&graph, &ClusterTable::new(), &[record], 0.9);

    let gene = report.genes.get("N1-N2");
    assert!(gene.is_some(), "Missing gene N1-N2");
    let gene = gene.unwrap();
    assert_eq!(gene.coverage, 0.0, "Wrong coverage for a gene without aligned bases");
    assert_eq!(gene.substitutions.count(0), 1, "Insertions were counted as substitutions");

    assert_eq!(strain_stats(&report, "S", 0).gene_count, 1, "Gene missing at coverage threshold 0");
    for percent in coverage_thresholds().skip(1) {
        let stats = strain_stats(&report, "S", percent);
        assert_eq!(stats.gene_count, 0, "Gene with zero coverage included at {}%", percent);
        assert_eq!(stats.mean, 0.0, "Nonzero mean without genes at {}%", percent);
    }
}

#[test]
fn strain_roll_up() {
    let graph = internal::bubble_graph();
    let with_substitution = {
        let mappings = vec![
            internal::full_match("N1", 10),
            internal::mapping("N2", 0, false, &[(4, 4, None), (1, 1, Some("T")), (5, 5, None)]),
            internal::full_match("N4", 10),
        ];
        internal::record("x", &internal::read_sequence(30), vec![internal::subpath(mappings, &[], 28)], None)
    };
    let records = vec![with_substitution, full_read("y", &["N3", "N4"], 20)];
    let report = report(&graph, &internal::bubble_clusters(), &records, 0.9);
    assert_eq!(report.classification.unique, 2, "Wrong number of unique mates");
    assert_eq!(report.max_substitutions(), 1, "Wrong maximum number of substitutions");

    // Gene X: shared by strains A and B, two copies in B.
    let gene_x = report.genes.get("N1-N2-N4").unwrap();
    assert_eq!(gene_x.coverage, 1.0, "Wrong coverage for gene X");
    assert_eq!(gene_x.substitutions.count(1), 1, "Wrong substitution histogram for gene X");
    assert!(approx_eq(gene_x.substitutions.normalized, 1.0 / 30.0), "Wrong normalized substitutions for gene X");

    let a = strain_stats(&report, "A", 100);
    assert_eq!((a.gene_count, &a.copies), (1, &vec![1]), "Wrong genes for strain A");
    assert_eq!(a.mean, 1.0, "Wrong mean for strain A");
    assert_eq!(a.total.count(1), 1, "Wrong total histogram for strain A");
    assert!(a.unique.counts.is_empty(), "Shared gene in the unique histogram of strain A");

    let b = strain_stats(&report, "B", 100);
    assert_eq!(b.copies, vec![2], "Wrong copy count for strain B");
    assert_eq!(b.samples, vec![1.0], "Wrong samples for strain B");
    assert_eq!(b.mean, 0.5, "Copy count was not used for strain B");
    assert_eq!(b.std, 0.0, "Wrong standard deviation for strain B");

    // Gene Y: only in strain C, N1 not covered.
    let gene_y = report.genes.get("N1-N3-N4").unwrap();
    assert!(approx_eq(gene_y.coverage, 2.0 / 3.0), "Wrong coverage for gene Y");
    assert!(approx_eq(gene_y.unique_count, 20.0 / 30.0), "Wrong unique count for gene Y");
    assert!(approx_eq(gene_y.mean, 2.0 / 3.0), "Wrong mean for gene Y");
    assert!(approx_eq(gene_y.std, (2.0f64 / 9.0).sqrt()), "Wrong standard deviation for gene Y");

    let c = strain_stats(&report, "C", 65);
    assert_eq!(c.gene_count, 1, "Gene Y missing at 65%");
    assert!(approx_eq(c.mean, 2.0 / 3.0), "Wrong mean for strain C");
    assert_eq!(c.unique.count(0), 1, "Strain-specific gene missing from the unique histogram");
    assert_eq!(strain_stats(&report, "C", 70).gene_count, 0, "Gene Y included above its coverage");
    assert_eq!(report.strains.len(), 3, "Wrong number of strains");
}

//-----------------------------------------------------------------------------
