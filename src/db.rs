//! SQLite database storing gene and strain abundances.
//!
//! The database contains the following tables:
//!
//! * `Tags`: version, run parameters, and summary counts as key-value pairs.
//! * `Genes`: one row per gene with unique mates.
//! * `GeneNodes`: node abundances for each gene.
//! * `GeneSubstitutions`: substitution histograms for each gene.
//! * `Strains`: statistics for each strain and coverage threshold (in percent).
//! * `StrainSubstitutions`: total and strain-specific substitution histograms.
//! * `Reads`: mates that were not assigned to a single gene, with their class and target.

use crate::abundance::AbundanceReport;
use crate::{utils, Error, Result};

use std::path::Path;

use rusqlite::{Connection, OpenFlags, OptionalExtension, Statement};


//-----------------------------------------------------------------------------

/// Run parameters stored in the database.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResultsParams {
    /// Threshold for the normalized alignment score.
    pub threshold: f64,
    /// Graph file.
    pub graph: String,
    /// Cluster table file.
    pub clusters: String,
    /// Alignment file.
    pub alignments: String,
}

/// A database connection to a results database.
///
/// # Examples
///
/// ```
/// use pangenome_abundance::{AbundanceReport, ResultsDb};
/// use pangenome_abundance::db::ResultsParams;
/// use std::fs;
///
/// let db_file = std::env::temp_dir().join(format!("pangenome-abundance-doc-{}.db", std::process::id()));
/// let report = AbundanceReport::default();
/// let params = ResultsParams { threshold: 0.9, ..ResultsParams::default() };
/// ResultsDb::create(&report, &params, &db_file).unwrap();
///
/// let database = ResultsDb::open(&db_file).unwrap();
/// assert_eq!(database.genes(), 0);
/// assert_eq!(database.threshold(), 0.9);
///
/// drop(database);
/// fs::remove_file(&db_file).unwrap();
/// ```
#[derive(Debug)]
pub struct ResultsDb {
    connection: Connection,
    version: String,
    threshold: f64,
    genes: usize,
    strains: usize,
    unique: usize,
    ambiguous: usize,
    multi_mapped: usize,
    novel: usize,
}

/// Using the database.
impl ResultsDb {
    // Key for database version.
    const KEY_VERSION: &'static str = "version";

    /// Current database version.
    pub const VERSION: &'static str = "Pangenome-abundance v0.1.0";

    // Run parameters.
    const KEY_THRESHOLD: &'static str = "threshold";
    const KEY_GRAPH: &'static str = "graph";
    const KEY_CLUSTERS: &'static str = "clusters";
    const KEY_ALIGNMENTS: &'static str = "alignments";

    // Summary counts.
    const KEY_GENES: &'static str = "genes";
    const KEY_STRAINS: &'static str = "strains";
    const KEY_UNIQUE: &'static str = "unique";
    const KEY_AMBIGUOUS: &'static str = "ambiguous";
    const KEY_MULTI_MAPPED: &'static str = "multi_mapped";
    const KEY_NOVEL: &'static str = "novel";

    /// Class of multi-mapped mates in table `Reads`.
    pub const CLASS_MULTI_MAPPED: &'static str = "multi_mapped";

    /// Class of ambiguous mates in table `Reads`.
    pub const CLASS_AMBIGUOUS: &'static str = "ambiguous";

    /// Class of novel mates in table `Reads`.
    pub const CLASS_NOVEL: &'static str = "novel";

    /// Opens a connection to the database in the given file.
    ///
    /// Reads the header information and passes through any database errors.
    pub fn open<P: AsRef<Path>>(filename: P) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let connection = Connection::open_with_flags(filename, flags)?;

        let mut get_tag = connection.prepare(
            "SELECT value FROM Tags WHERE key = ?1"
        )?;
        let version = get_string_value(&mut get_tag, Self::KEY_VERSION)?;
        if version != Self::VERSION {
            return Err(Error::InvalidParameter(format!("Unsupported database version: {} (expected {})", version, Self::VERSION)));
        }
        let threshold = get_string_value(&mut get_tag, Self::KEY_THRESHOLD)?;
        let threshold = threshold.parse::<f64>().map_err(|x| {
            Error::InvalidParameter(format!("Invalid value for key {}: {}", Self::KEY_THRESHOLD, x))
        })?;
        let genes = get_numeric_value(&mut get_tag, Self::KEY_GENES)?;
        let strains = get_numeric_value(&mut get_tag, Self::KEY_STRAINS)?;
        let unique = get_numeric_value(&mut get_tag, Self::KEY_UNIQUE)?;
        let ambiguous = get_numeric_value(&mut get_tag, Self::KEY_AMBIGUOUS)?;
        let multi_mapped = get_numeric_value(&mut get_tag, Self::KEY_MULTI_MAPPED)?;
        let novel = get_numeric_value(&mut get_tag, Self::KEY_NOVEL)?;
        drop(get_tag);

        Ok(ResultsDb {
            connection,
            version, threshold,
            genes, strains,
            unique, ambiguous, multi_mapped, novel,
        })
    }

    /// Returns the filename of the database or [`None`] if there is no filename.
    pub fn filename(&self) -> Option<&str> {
        self.connection.path()
    }

    /// Returns the size of the database file in a human-readable format.
    pub fn file_size(&self) -> Option<String> {
        let filename = self.filename()?;
        utils::file_size(filename)
    }

    /// Returns the version of the database.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Returns the score threshold used for the run.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Returns the number of genes with unique mates.
    pub fn genes(&self) -> usize {
        self.genes
    }

    /// Returns the number of strains.
    pub fn strains(&self) -> usize {
        self.strains
    }

    /// Returns the number of unique mates.
    pub fn unique(&self) -> usize {
        self.unique
    }

    /// Returns the number of distinct ambiguous mates.
    pub fn ambiguous(&self) -> usize {
        self.ambiguous
    }

    /// Returns the number of multi-mapped mates.
    pub fn multi_mapped(&self) -> usize {
        self.multi_mapped
    }

    /// Returns the number of novel mates.
    pub fn novel(&self) -> usize {
        self.novel
    }

    /// Returns the value of the tag, or [`None`] if there is no such tag.
    pub fn tag(&self, key: &str) -> Result<Option<String>> {
        let mut get_tag = self.connection.prepare_cached(
            "SELECT value FROM Tags WHERE key = ?1"
        )?;
        let value = get_tag.query_row((key,), |row| row.get(0)).optional()?;
        Ok(value)
    }

    /// Returns the unique count and the coverage of the gene, or [`None`] if the gene has no unique mates.
    pub fn gene(&self, signature: &str) -> Result<Option<(f64, f64)>> {
        let mut get_gene = self.connection.prepare_cached(
            "SELECT unique_count, coverage FROM Genes WHERE signature = ?1"
        )?;
        let result = get_gene.query_row((signature,), |row| Ok((row.get(0)?, row.get(1)?))).optional()?;
        Ok(result)
    }

    /// Returns the number of genes and the mean abundance for the strain at the given coverage threshold in percent.
    pub fn strain(&self, strain: &str, percent: usize) -> Result<Option<(usize, f64)>> {
        let mut get_strain = self.connection.prepare_cached(
            "SELECT gene_count, mean FROM Strains WHERE strain = ?1 AND threshold = ?2"
        )?;
        let result = get_strain.query_row((strain, percent), |row| Ok((row.get(0)?, row.get(1)?))).optional()?;
        Ok(result)
    }

    /// Returns the mates of the given class as (read, sequence, target) triples.
    ///
    /// The target is a gene signature for ambiguous mates and a cluster for novel mates.
    pub fn reads(&self, class: &str) -> Result<Vec<(String, String, Option<String>)>> {
        let mut get_reads = self.connection.prepare_cached(
            "SELECT read, sequence, target FROM Reads WHERE class = ?1 ORDER BY read, sequence, target"
        )?;
        let rows = get_reads.query_map((class,), |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}

//-----------------------------------------------------------------------------

/// Creating the database.
impl ResultsDb {
    /// Creates a new database storing the report.
    ///
    /// # Errors
    ///
    /// Returns an error if the database already exists.
    /// Passes through any database errors.
    pub fn create<P: AsRef<Path>>(report: &AbundanceReport, params: &ResultsParams, filename: P) -> Result<()> {
        log::info!("Creating database {}", filename.as_ref().display());
        if utils::file_exists(&filename) {
            return Err(Error::InvalidParameter(format!("Database {} already exists", filename.as_ref().display())));
        }

        let mut connection = Connection::open(filename)?;
        Self::insert_tags(report, params, &mut connection)?;
        Self::insert_genes(report, &mut connection)?;
        Self::insert_strains(report, &mut connection)?;
        Self::insert_reads(report, &mut connection)?;
        Ok(())
    }

    fn insert_tags(report: &AbundanceReport, params: &ResultsParams, connection: &mut Connection) -> rusqlite::Result<()> {
        log::debug!("Inserting header and tags");

        connection.execute(
            "CREATE TABLE Tags (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            ) STRICT",
            (),
        )?;

        let classification = &report.classification;
        let transaction = connection.transaction()?;
        {
            let mut insert = transaction.prepare(
                "INSERT INTO Tags(key, value) VALUES (?1, ?2)"
            )?;
            insert.execute((Self::KEY_VERSION, Self::VERSION))?;
            insert.execute((Self::KEY_THRESHOLD, params.threshold.to_string()))?;
            insert.execute((Self::KEY_GRAPH, &params.graph))?;
            insert.execute((Self::KEY_CLUSTERS, &params.clusters))?;
            insert.execute((Self::KEY_ALIGNMENTS, &params.alignments))?;
            insert.execute((Self::KEY_GENES, report.genes.len().to_string()))?;
            insert.execute((Self::KEY_STRAINS, report.strains.len().to_string()))?;
            insert.execute((Self::KEY_UNIQUE, classification.unique.to_string()))?;
            insert.execute((Self::KEY_AMBIGUOUS, classification.ambiguous_count().to_string()))?;
            insert.execute((Self::KEY_MULTI_MAPPED, classification.multi_mapped.len().to_string()))?;
            insert.execute((Self::KEY_NOVEL, classification.novel_count().to_string()))?;
        }
        transaction.commit()?;
        Ok(())
    }

    fn insert_genes(report: &AbundanceReport, connection: &mut Connection) -> rusqlite::Result<()> {
        log::debug!("Inserting genes");

        connection.execute(
            "CREATE TABLE Genes (
                signature TEXT PRIMARY KEY,
                unique_count REAL NOT NULL,
                coverage REAL NOT NULL,
                mean REAL NOT NULL,
                std REAL NOT NULL,
                substitution_load REAL NOT NULL
            ) STRICT",
            (),
        )?;
        connection.execute(
            "CREATE TABLE GeneNodes (
                signature TEXT NOT NULL,
                node TEXT NOT NULL,
                abundance REAL NOT NULL,
                PRIMARY KEY (signature, node)
            ) STRICT",
            (),
        )?;
        connection.execute(
            "CREATE TABLE GeneSubstitutions (
                signature TEXT NOT NULL,
                substitutions INTEGER NOT NULL,
                reads INTEGER NOT NULL,
                PRIMARY KEY (signature, substitutions)
            ) STRICT",
            (),
        )?;

        let transaction = connection.transaction()?;
        {
            let mut insert_gene = transaction.prepare(
                "INSERT INTO Genes(signature, unique_count, coverage, mean, std, substitution_load)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)"
            )?;
            let mut insert_node = transaction.prepare(
                "INSERT INTO GeneNodes(signature, node, abundance) VALUES (?1, ?2, ?3)"
            )?;
            let mut insert_substitutions = transaction.prepare(
                "INSERT INTO GeneSubstitutions(signature, substitutions, reads) VALUES (?1, ?2, ?3)"
            )?;
            for (signature, gene) in report.genes.iter() {
                insert_gene.execute((
                    signature, gene.unique_count, gene.coverage, gene.mean, gene.std, gene.substitutions.normalized
                ))?;
                for (node, abundance) in gene.node_abundance.iter() {
                    insert_node.execute((signature, node, abundance))?;
                }
                for (substitutions, reads) in gene.substitutions.counts.iter() {
                    insert_substitutions.execute((signature, substitutions, reads))?;
                }
            }
        }
        transaction.commit()?;

        log::debug!("Inserted {} genes", report.genes.len());
        Ok(())
    }

    fn insert_strains(report: &AbundanceReport, connection: &mut Connection) -> rusqlite::Result<()> {
        log::debug!("Inserting strains");

        connection.execute(
            "CREATE TABLE Strains (
                strain TEXT NOT NULL,
                threshold INTEGER NOT NULL,
                gene_count INTEGER NOT NULL,
                mean REAL NOT NULL,
                std REAL NOT NULL,
                total_load REAL NOT NULL,
                unique_load REAL NOT NULL,
                PRIMARY KEY (strain, threshold)
            ) STRICT",
            (),
        )?;
        connection.execute(
            "CREATE TABLE StrainSubstitutions (
                strain TEXT NOT NULL,
                threshold INTEGER NOT NULL,
                substitutions INTEGER NOT NULL,
                total INTEGER NOT NULL,
                uniq INTEGER NOT NULL,
                PRIMARY KEY (strain, threshold, substitutions)
            ) STRICT",
            (),
        )?;

        let transaction = connection.transaction()?;
        {
            let mut insert_strain = transaction.prepare(
                "INSERT INTO Strains(strain, threshold, gene_count, mean, std, total_load, unique_load)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
            )?;
            let mut insert_substitutions = transaction.prepare(
                "INSERT INTO StrainSubstitutions(strain, threshold, substitutions, total, uniq)
                VALUES (?1, ?2, ?3, ?4, ?5)"
            )?;
            for (strain, by_threshold) in report.strains.iter() {
                for (percent, stats) in by_threshold.iter() {
                    insert_strain.execute((
                        strain, percent, stats.gene_count, stats.mean, stats.std,
                        stats.total.normalized, stats.unique.normalized
                    ))?;
                    // Every key of the strain-specific histogram is also in the total histogram.
                    for (&substitutions, total) in stats.total.counts.iter() {
                        insert_substitutions.execute((strain, percent, substitutions, total, stats.unique.count(substitutions)))?;
                    }
                }
            }
        }
        transaction.commit()?;

        log::debug!("Inserted {} strains", report.strains.len());
        Ok(())
    }

    fn insert_reads(report: &AbundanceReport, connection: &mut Connection) -> rusqlite::Result<()> {
        log::debug!("Inserting unassigned reads");

        connection.execute(
            "CREATE TABLE Reads (
                read TEXT NOT NULL,
                sequence TEXT NOT NULL,
                class TEXT NOT NULL,
                target TEXT
            ) STRICT",
            (),
        )?;

        let classification = &report.classification;
        let mut inserted = 0;
        let transaction = connection.transaction()?;
        {
            let mut insert = transaction.prepare(
                "INSERT INTO Reads(read, sequence, class, target) VALUES (?1, ?2, ?3, ?4)"
            )?;
            for mate in classification.multi_mapped.iter() {
                insert.execute((&mate.read, &mate.sequence, Self::CLASS_MULTI_MAPPED, None::<String>))?;
                inserted += 1;
            }
            for (gene, mates) in classification.ambiguous.iter() {
                for mate in mates.iter() {
                    insert.execute((&mate.read, &mate.sequence, Self::CLASS_AMBIGUOUS, Some(gene)))?;
                    inserted += 1;
                }
            }
            for (cluster, mates) in classification.novel.iter() {
                for mate in mates.iter() {
                    insert.execute((&mate.read, &mate.sequence, Self::CLASS_NOVEL, cluster))?;
                    inserted += 1;
                }
            }
        }
        transaction.commit()?;

        log::debug!("Inserted {} unassigned mates", inserted);
        Ok(())
    }
}

//-----------------------------------------------------------------------------

// Executes the statement, which is expected to return a single string value.
fn get_string_value(statement: &mut Statement, key: &str) -> Result<String> {
    let result: rusqlite::Result<String> = statement.query_row(
        (key,),
        |row| row.get(0)
    );
    result.map_err(|x| Error::InvalidParameter(format!("Key not found: {} ({})", key, x)))
}

// Executes the statement, which is expected to return a single string value.
// Then returns the value as an integer.
fn get_numeric_value(statement: &mut Statement, key: &str) -> Result<usize> {
    let value = get_string_value(statement, key)?;
    value.parse::<usize>().map_err(|x| Error::InvalidParameter(format!("Invalid value for key {}: {}", key, x)))
}

//-----------------------------------------------------------------------------
