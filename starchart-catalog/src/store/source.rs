//! Flat text source consumed by the converter.
//!
//! One object per line, whitespace separated:
//!
//! ```text
//! hd hr hip ra_deg dec_deg mag b-v parallax distance bayer_letter bayer_designation proper_name variable_id flamsteed
//! ```
//!
//! `-` marks an absent field and trailing name fields may be omitted. Blank
//! lines and lines starting with `#` are ignored. Files ending in `.gz` are
//! decompressed on the fly.

use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::warn;

use super::record::CatalogueRecord;
use crate::error::{CatalogueError, Result};

const NUMERIC_FIELDS: usize = 9;

/// Opens a source file, transparently gunzipping `.gz` files.
pub fn open_source(path: &Path) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).map_err(|e| CatalogueError::io(path, e))?;
    let is_gz = path.extension().is_some_and(|ext| ext == "gz");
    Ok(if is_gz {
        Box::new(BufReader::new(GzDecoder::new(BufReader::new(file))))
    } else {
        Box::new(BufReader::with_capacity(256 * 1024, file))
    })
}

/// Parses one source line. Returns `None` for lines that do not hold a record.
pub fn parse_line(line: &str) -> Option<CatalogueRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < NUMERIC_FIELDS {
        return None;
    }

    let ra_deg: f64 = fields[3].parse().ok()?;
    let dec_deg: f64 = fields[4].parse().ok()?;
    let mag: f64 = fields[5].parse().ok()?;
    if !(ra_deg.is_finite() && dec_deg.is_finite() && mag.is_finite()) || dec_deg.abs() > 90.0 {
        return None;
    }

    let name = |i: usize| -> String {
        match fields.get(NUMERIC_FIELDS + i) {
            Some(&"-") | None => String::new(),
            Some(s) => (*s).to_string(),
        }
    };

    Some(CatalogueRecord {
        hd_number: catalogue_number(fields[0])?,
        hr_number: catalogue_number(fields[1])?,
        hip_number: catalogue_number(fields[2])?,
        ra: ra_deg.to_radians(),
        dec: dec_deg.to_radians(),
        mag,
        colour_index: optional_value(fields[6])?,
        parallax: optional_value(fields[7])?,
        distance: optional_value(fields[8])?,
        bayer_letter: name(0),
        bayer_designation: name(1),
        proper_name: name(2),
        variable_id: name(3),
        flamsteed_number: name(4),
    })
}

fn catalogue_number(field: &str) -> Option<u32> {
    if field == "-" {
        Some(0)
    } else {
        field.parse().ok()
    }
}

fn optional_value(field: &str) -> Option<f64> {
    if field == "-" {
        Some(0.0)
    } else {
        field.parse().ok()
    }
}

/// Streaming iterator over the records of a source file.
///
/// Malformed lines are logged and skipped; I/O failures end the stream with
/// an error.
pub struct SourceRecords {
    reader: Box<dyn BufRead>,
    path: PathBuf,
    line: String,
    line_number: u64,
    skipped: u64,
}

impl SourceRecords {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            reader: open_source(path)?,
            path: path.to_path_buf(),
            line: String::new(),
            line_number: 0,
            skipped: 0,
        })
    }

    /// Malformed lines seen so far.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl Iterator for SourceRecords {
    type Item = Result<CatalogueRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line.clear();
            match self.reader.read_line(&mut self.line) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(CatalogueError::io(&self.path, e))),
            }
            self.line_number += 1;

            let trimmed = self.line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match parse_line(trimmed) {
                Some(record) => return Some(Ok(record)),
                None => {
                    self.skipped += 1;
                    warn!(
                        path = %self.path.display(),
                        line = self.line_number,
                        "skipping malformed catalogue line"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    const VEGA: &str =
        "172167 7001 91262 279.2347 38.7837 0.03 0.00 130.23 25.04 α Alpha_Lyr Vega - 3";

    #[test]
    fn test_parse_full_line() {
        let star = parse_line(VEGA).unwrap();
        assert_eq!(star.hd_number, 172167);
        assert_eq!(star.hr_number, 7001);
        assert_eq!(star.hip_number, 91262);
        assert_abs_diff_eq!(star.ra, 279.2347f64.to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(star.dec, 38.7837f64.to_radians(), epsilon = 1e-12);
        assert_eq!(star.mag, 0.03);
        assert_eq!(star.bayer_letter, "α");
        assert_eq!(star.proper_name, "Vega");
        assert_eq!(star.variable_id, "");
        assert_eq!(star.flamsteed_number, "3");
    }

    #[test]
    fn test_parse_missing_names_and_numbers() {
        let star = parse_line("- - 12 10.0 -5.0 9.1 - - -").unwrap();
        assert_eq!(star.hd_number, 0);
        assert_eq!(star.hip_number, 12);
        assert_eq!(star.parallax, 0.0);
        assert!(star.proper_name.is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_line("1 2 3 10.0").is_none());
        assert!(parse_line("1 2 3 ten 5.0 6.0 - - -").is_none());
        assert!(parse_line("1 2 3 10.0 95.0 6.0 - - -").is_none());
        assert!(parse_line("1 2 3 10.0 5.0 nan - - -").is_none());
    }

    #[test]
    fn test_source_records_skip_blank_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stars.txt");
        std::fs::write(&path, format!("# header\n\n{}\nbroken line\n- - 1 0 0 5.0 - - -\n", VEGA))
            .unwrap();

        let mut records = SourceRecords::open(&path).unwrap();
        let mags: Vec<f64> = records.by_ref().map(|r| r.unwrap().mag).collect();
        assert_eq!(mags, vec![0.03, 5.0]);
        assert_eq!(records.skipped(), 1);
    }

    #[test]
    fn test_gzipped_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stars.txt.gz");
        let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
        writeln!(encoder, "{}", VEGA).unwrap();
        encoder.finish().unwrap();

        let records: Vec<_> = SourceRecords::open(&path)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].proper_name, "Vega");
    }

    #[test]
    fn test_missing_source_is_io_error() {
        let err = SourceRecords::open(Path::new("/nonexistent/stars.txt"))
            .err()
            .expect("expected error");
        assert!(matches!(err, CatalogueError::Io { .. }));
    }
}
