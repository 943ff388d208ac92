//! Reading pangenome graphs from GFA files.
//!
//! Only the parts of GFA 1 used by the pipeline are interpreted:
//! segments (`S`), paths (`P`), and links (`L`).
//! Link orientations and overlaps are ignored, as the graph model stores plain adjacency.

use crate::{Error, Pangenome, Result};
use crate::utils;

use std::io::BufRead;
use std::path::Path;

use gbwt::Orientation;

//-----------------------------------------------------------------------------

/// A tokenized GFA line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphRecord {
    /// A node with its sequence.
    Segment { id: String, sequence: Vec<u8> },
    /// A named path as a list of oriented nodes.
    Path { id: String, steps: Vec<(String, Orientation)> },
    /// An edge from the first node to the second.
    Link { from: String, to: String },
}

impl GraphRecord {
    /// Parses a GFA line.
    ///
    /// Returns [`None`] for empty lines and line types that are not used.
    /// The line may end with an endline character, which is ignored.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim_end_matches(['\n', '\r']);
        let fields: Vec<&str> = line.split('\t').collect();
        match fields[0] {
            "S" => {
                if fields.len() < 3 {
                    return Err(String::from("Segment line with fewer than 3 fields"));
                }
                Ok(Some(GraphRecord::Segment {
                    id: fields[1].to_string(),
                    sequence: fields[2].as_bytes().to_ascii_uppercase(),
                }))
            },
            "P" => {
                if fields.len() < 3 {
                    return Err(String::from("Path line with fewer than 3 fields"));
                }
                let steps = fields[2].split(',').map(Self::parse_step).collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(Some(GraphRecord::Path { id: fields[1].to_string(), steps }))
            },
            "L" => {
                if fields.len() < 5 {
                    return Err(String::from("Link line with fewer than 5 fields"));
                }
                Ok(Some(GraphRecord::Link { from: fields[1].to_string(), to: fields[3].to_string() }))
            },
            _ => Ok(None),
        }
    }

    // Parses an oriented path step such as `12+`.
    fn parse_step(step: &str) -> std::result::Result<(String, Orientation), String> {
        let orientation = match step.as_bytes().last() {
            Some(b'+') => Orientation::Forward,
            Some(b'-') => Orientation::Reverse,
            _ => return Err(format!("Invalid path step: {}", step)),
        };
        let id = &step[..step.len() - 1];
        if id.is_empty() {
            return Err(format!("Invalid path step: {}", step));
        }
        Ok((id.to_string(), orientation))
    }
}

//-----------------------------------------------------------------------------

/// Tokenizes a GFA file into graph records.
///
/// Returns an error with the line number if a segment, path, or link line is malformed.
pub fn read_records<R: BufRead>(reader: R) -> Result<Vec<GraphRecord>> {
    let mut result = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        let record = GraphRecord::parse(&line).map_err(|message| {
            Error::Gfa { line: line_num + 1, message }
        })?;
        if let Some(record) = record {
            result.push(record);
        }
    }
    Ok(result)
}

/// Loads a pangenome graph from a GFA file, which may be gzip-compressed.
pub fn load_graph<P: AsRef<Path>>(filename: P) -> Result<Pangenome> {
    let reader = utils::open_file(&filename)?;
    let records = read_records(reader)?;
    log::debug!("Read {} GFA records from {}", records.len(), filename.as_ref().display());
    Pangenome::from_records(records)
}

//-----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_lines() {
        let segment = GraphRecord::parse("S\t1\tgatTACA\n");
        assert_eq!(
            segment, Ok(Some(GraphRecord::Segment { id: String::from("1"), sequence: b"GATTACA".to_vec() })),
            "Wrong segment record"
        );

        let path = GraphRecord::parse("P\ts|g|1|A|1\t1+,22-,3+\t*");
        let truth = GraphRecord::Path {
            id: String::from("s|g|1|A|1"),
            steps: vec![
                (String::from("1"), Orientation::Forward),
                (String::from("22"), Orientation::Reverse),
                (String::from("3"), Orientation::Forward),
            ],
        };
        assert_eq!(path, Ok(Some(truth)), "Wrong path record");

        let link = GraphRecord::parse("L\t1\t+\t22\t-\t0M");
        assert_eq!(
            link, Ok(Some(GraphRecord::Link { from: String::from("1"), to: String::from("22") })),
            "Wrong link record"
        );

        assert_eq!(GraphRecord::parse("H\tVN:Z:1.0"), Ok(None), "Header line was not skipped");
        assert_eq!(GraphRecord::parse(""), Ok(None), "Empty line was not skipped");
    }

    #[test]
    fn invalid_lines() {
        assert!(GraphRecord::parse("S\t1").is_err(), "Accepted a segment without sequence");
        assert!(GraphRecord::parse("P\tp1\t1+,2").is_err(), "Accepted a step without orientation");
        assert!(GraphRecord::parse("P\tp1\t+").is_err(), "Accepted a step without node");
        assert!(GraphRecord::parse("L\t1\t+\t2").is_err(), "Accepted a truncated link");
    }

    #[test]
    fn read_file() {
        let gfa = "H\tVN:Z:1.0\nS\t1\tACGT\nS\t2\tGG\nL\t1\t+\t2\t+\t0M\nP\tp1\t1+,2+\t*\n";
        let records = read_records(gfa.as_bytes());
        assert!(records.is_ok(), "Failed to read GFA records: {}", records.unwrap_err());
        assert_eq!(records.unwrap().len(), 4, "Wrong number of records");

        let broken = "S\t1\tACGT\nP\tp1\t1\n";
        match read_records(broken.as_bytes()) {
            Err(Error::Gfa { line, .. }) => assert_eq!(line, 2, "Wrong line number in the error"),
            other => panic!("Expected a GFA error, got {:?}", other.map(|x| x.len())),
        }
    }
}

//-----------------------------------------------------------------------------
