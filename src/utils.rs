//! Utility functions for files, sequences, and summary statistics.

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;
use std::time::Duration;

use flate2::read::MultiGzDecoder;

use gbwt::support;

//-----------------------------------------------------------------------------

// Utilities for working with files.

const SIZE_UNITS: [(f64, &str); 5] = [
    (1.0, "B"),
    (1024.0, "KiB"),
    (1024.0 * 1024.0, "MiB"),
    (1024.0 * 1024.0 * 1024.0, "GiB"),
    (1024.0 * 1024.0 * 1024.0 * 1024.0, "TiB"),
];

/// Returns a human-readable representation of the given number of bytes.
pub fn human_readable_size(bytes: usize) -> String {
    let value = bytes as f64;
    let unit = SIZE_UNITS.iter().rposition(|(size, _)| value >= *size).unwrap_or(0);
    format!("{:.3} {}", value / SIZE_UNITS[unit].0, SIZE_UNITS[unit].1)
}

/// Returns a human-readable size of the file, or [`None`] if the file cannot be accessed.
pub fn file_size<P: AsRef<Path>>(filename: P) -> Option<String> {
    let metadata = fs::metadata(filename).ok()?;
    Some(human_readable_size(metadata.len() as usize))
}

/// Returns `true` if the file exists.
pub fn file_exists<P: AsRef<Path>>(filename: P) -> bool {
    fs::metadata(filename).is_ok()
}

/// Returns `true` if the file appears to be gzip-compressed.
pub fn is_gzipped<P: AsRef<Path>>(filename: P) -> bool {
    let Ok(file) = File::open(filename) else {
        return false;
    };
    let mut reader = BufReader::new(file);
    let mut magic = [0; 2];
    let len = reader.read(&mut magic).ok();
    len == Some(2) && magic == [0x1F, 0x8B]
}

/// Returns a buffered reader for the file, which may be gzip-compressed.
pub fn open_file<P: AsRef<Path>>(filename: P) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(&filename)?;
    let inner = BufReader::new(file);
    if is_gzipped(&filename) {
        let inner = MultiGzDecoder::new(inner);
        Ok(Box::new(BufReader::new(inner)))
    } else {
        Ok(Box::new(inner))
    }
}

/// Returns the file name without the directory and the last extension.
///
/// A trailing `.gz` is removed before the extension.
pub fn file_stem<P: AsRef<Path>>(filename: P) -> String {
    let path = filename.as_ref();
    let path = if path.extension().is_some_and(|ext| ext == "gz") {
        Path::new(path.file_stem().unwrap_or_default())
    } else {
        path
    };
    path.file_stem().map(|x| x.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Formats a duration as `HH:MM:SS.ss`.
pub fn format_duration(duration: Duration) -> String {
    let seconds = duration.as_secs_f64();
    let hours = (seconds / 3600.0).floor();
    let minutes = ((seconds - 3600.0 * hours) / 60.0).floor();
    let rest = seconds - 3600.0 * hours - 60.0 * minutes;
    format!("{:0>2}:{:0>2}:{:05.2}", hours as usize, minutes as usize, rest)
}

//-----------------------------------------------------------------------------

// Sequences.

/// Returns the complement of a single base.
///
/// Bases outside `ACGT` map to `N`.
pub fn complement(base: u8) -> u8 {
    support::reverse_complement(&[base])[0]
}

/// Returns the reverse complement of a sequence.
pub fn reverse_complement(sequence: &[u8]) -> Vec<u8> {
    support::reverse_complement(sequence)
}

//-----------------------------------------------------------------------------

// Statistics.

/// Returns the arithmetic mean of the values, or `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Returns the population standard deviation of the values, or `0.0` for an empty slice.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mean = mean(values);
    let variance = values.iter().map(|x| (x - mean) * (x - mean)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

//-----------------------------------------------------------------------------


//-----------------------------------------------------------------------------
