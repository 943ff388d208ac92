//! Strain-level result table in CSV format.
//!
//! The table has one row per strain and coverage threshold, with columns
//! `strain, thr_cov, nb_genes, mean_abund, p_subst, X0, X1, ..., Xmax`.
//! Column `Xn` is the number of unique mates with `n` substitutions over the genes of the strain,
//! and `p_subst` is the normalized substitution load of the genes found only in the strain.

use crate::abundance::{self, AbundanceReport};
use crate::Result;

use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;

//-----------------------------------------------------------------------------

/// A row of the strain table.
#[derive(Clone, Debug, PartialEq)]
pub struct StrainRow {
    pub strain: String,
    /// Coverage threshold as a fraction.
    pub thr_cov: f64,
    pub nb_genes: usize,
    pub mean_abund: f64,
    pub p_subst: f64,
    /// Number of mates with `i` substitutions at position `i`.
    pub substitutions: Vec<usize>,
}

impl StrainRow {
    fn to_record(&self) -> Vec<String> {
        let mut result = vec![
            self.strain.clone(),
            format!("{:.2}", self.thr_cov),
            self.nb_genes.to_string(),
            self.mean_abund.to_string(),
            self.p_subst.to_string(),
        ];
        result.extend(self.substitutions.iter().map(|x| x.to_string()));
        result
    }
}

/// Returns the header of the strain table for the given maximum number of substitutions.
pub fn header(max_substitutions: usize) -> Vec<String> {
    let mut result: Vec<String> = ["strain", "thr_cov", "nb_genes", "mean_abund", "p_subst"]
        .iter().map(|x| x.to_string()).collect();
    result.extend((0..=max_substitutions).map(|x| format!("X{}", x)));
    result
}

/// Returns the rows of the strain table, ordered by strain and threshold.
pub fn strain_rows(report: &AbundanceReport) -> Vec<StrainRow> {
    let columns = report.max_substitutions() + 1;
    let mut result = Vec::new();
    for (strain, by_threshold) in report.strains.iter() {
        for (&percent, stats) in by_threshold.iter() {
            result.push(StrainRow {
                strain: strain.clone(),
                thr_cov: abundance::threshold_fraction(percent),
                nb_genes: stats.gene_count,
                mean_abund: stats.mean,
                p_subst: stats.unique.normalized,
                substitutions: (0..columns).map(|x| stats.total.count(x)).collect(),
            });
        }
    }
    result
}

/// Writes the strain table with a header line.
pub fn write_strain_table<W: Write>(report: &AbundanceReport, writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(writer);
    writer.write_record(header(report.max_substitutions()))?;
    for row in strain_rows(report) {
        writer.write_record(row.to_record())?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the strain table to the given file.
pub fn write_strain_table_file<P: AsRef<Path>>(report: &AbundanceReport, filename: P) -> Result<()> {
    let file = std::fs::File::create(&filename)?;
    write_strain_table(report, file)?;
    log::info!("Wrote the strain table to {}", filename.as_ref().display());
    Ok(())
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    use crate::abundance::StrainStats;

    use std::collections::BTreeMap;

    fn small_report() -> AbundanceReport {
        let mut report = AbundanceReport::default();
        let mut by_threshold = BTreeMap::new();
        let mut stats = StrainStats { gene_count: 2, samples: vec![1.0, 3.0], copies: vec![1, 1], ..StrainStats::default() };
        stats.total.add(0);
        stats.total.add(0);
        stats.unique.normalized = 0.25;
        stats.finalize();
        by_threshold.insert(0, stats);
        by_threshold.insert(100, StrainStats::default());
        report.strains.insert(String::from("K12"), by_threshold);
        report
    }

    #[test]
    fn header_columns() {
        assert_eq!(
            header(2), vec!["strain", "thr_cov", "nb_genes", "mean_abund", "p_subst", "X0", "X1", "X2"],
            "Wrong header"
        );
    }

    #[test]
    fn rows() {
        let report = small_report();
        let rows = strain_rows(&report);
        assert_eq!(rows.len(), 2, "Wrong number of rows");
        assert_eq!(rows[0].strain, "K12", "Wrong strain");
        assert_eq!(rows[0].thr_cov, 0.0, "Wrong threshold");
        assert_eq!(rows[0].nb_genes, 2, "Wrong gene count");
        assert_eq!(rows[0].mean_abund, 2.0, "Wrong mean abundance");
        assert_eq!(rows[0].p_subst, 0.25, "Wrong substitution load");
        assert_eq!(rows[0].substitutions, vec![2], "Wrong substitution counts");
        assert_eq!(rows[1].thr_cov, 1.0, "Wrong threshold");
        assert_eq!(rows[1].substitutions, vec![0], "Missing counts should be 0");
    }

    #[test]
    fn csv_output() {
        let report = small_report();
        let mut buffer: Vec<u8> = Vec::new();
        let result = write_strain_table(&report, &mut buffer);
        assert!(result.is_ok(), "Failed to write the table: {}", result.unwrap_err());
        let text = String::from_utf8(buffer).unwrap();
        let truth = "strain,thr_cov,nb_genes,mean_abund,p_subst,X0\nK12,0.00,2,2,0.25,2\nK12,1.00,0,0,0,0\n";
        assert_eq!(text, truth, "Wrong CSV output");
    }
}

//-----------------------------------------------------------------------------
