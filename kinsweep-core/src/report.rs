//! Reads the text reports written by a time-course run.
//!
//! A report starts with one header line naming its columns (`time, A, B`) followed by
//! one line per recorded step. Fields are separated by commas and whitespace; stray
//! punctuation around a field is tolerated.

use crate::error::KinsweepError;
use std::fs;
use std::path::Path;

/// The column header of a report, kept verbatim for labelling the combined table.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportHeader {
    raw: String,
    columns: Vec<String>,
}

impl ReportHeader {
    pub fn parse(line: &str) -> Self {
        let raw = line.trim_end_matches(['\r', '\n']).to_string();
        let columns = split_fields(&raw).map(str::to_string).collect();
        Self { raw, columns }
    }

    /// A header built from column names, joined the way reports join them.
    pub fn from_columns(columns: Vec<String>) -> Self {
        Self {
            raw: columns.join(", "),
            columns,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column by name.
    pub fn position(&self, name: &str) -> Result<usize, KinsweepError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| KinsweepError::ReportFormat {
                column: name.to_string(),
                header: self.columns.join(", "),
            })
    }
}

fn split_fields(line: &str) -> impl Iterator<Item = &str> {
    line.trim_matches(|c: char| c == ',' || c.is_whitespace())
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

/// Keeps the characters a numeric field can be made of.
fn clean_token(token: &str) -> String {
    token
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .collect()
}

/// Parses one report line into its numeric fields. Tokens left empty after
/// cleaning are dropped.
pub fn parse_numeric_fields(line: &str) -> Result<Vec<f64>, String> {
    split_fields(line)
        .map(clean_token)
        .filter(|t| !t.is_empty())
        .map(|t| {
            t.parse::<f64>()
                .map_err(|e| format!("field '{}' is not a number: {}", t, e))
        })
        .collect()
}

/// Column names resolved once against the first report header.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSelection {
    names: Vec<String>,
    indices: Vec<usize>,
}

impl ColumnSelection {
    pub fn resolve(header: &ReportHeader, names: &[String]) -> Result<Self, KinsweepError> {
        let indices = names
            .iter()
            .map(|name| header.position(name))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            names: names.to_vec(),
            indices,
        })
    }

    pub fn header(&self) -> ReportHeader {
        ReportHeader::from_columns(self.names.clone())
    }

    /// The selected values, or `None` if `values` is narrower than the first header.
    pub fn apply(&self, values: &[f64]) -> Option<Vec<f64>> {
        self.indices.iter().map(|&i| values.get(i).copied()).collect()
    }
}

/// The parts of one report the collector needs.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportSnapshot {
    pub header: ReportHeader,
    /// Numeric fields of the requested row, one per header column.
    pub row: Vec<f64>,
    /// The complete report content.
    pub raw: String,
}

/// Reads `path` and extracts data row `row_index` (0-based, the initial state is row 0).
pub fn read_report(path: &Path, row_index: usize) -> Result<ReportSnapshot, KinsweepError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| KinsweepError::FileIO(path.display().to_string(), e))?;
    let parse_error = |reason: String| KinsweepError::ReportParse {
        path: path.display().to_string(),
        reason,
    };

    let mut lines = raw.lines();
    let header = lines
        .next()
        .map(ReportHeader::parse)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| parse_error("report has no header line".to_string()))?;

    let data: Vec<&str> = lines.collect();
    let line = data.get(row_index).ok_or_else(|| {
        parse_error(format!(
            "row {} requested but the report holds {} data rows",
            row_index,
            data.len()
        ))
    })?;

    let row = parse_numeric_fields(line).map_err(&parse_error)?;
    if row.len() != header.len() {
        return Err(parse_error(format!(
            "row {} has {} fields but the header names {} columns",
            row_index,
            row.len(),
            header.len()
        )));
    }

    Ok(ReportSnapshot { header, row, raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn drops_empty_tokens_around_stray_commas() {
        assert_eq!(parse_numeric_fields(",1.0, 2.0,,").unwrap(), vec![1.0, 2.0]);
    }

    #[test]
    fn recovers_numbers_despite_injected_punctuation() {
        let expected = [0.0, 5000.0, 1.25e-7, -3.5, 0.000412, 12.0];
        let decorations = [
            ("", ", "),
            (" ,", ",,"),
            ("\t", " ,\t"),
            ("(", ")"),
            ("", ";"),
            ("[", "] ,"),
        ];
        let line: String = expected
            .iter()
            .zip(decorations.iter().cycle())
            .map(|(v, (pre, post))| format!("{}{}{} ", pre, v, post))
            .collect();
        let parsed = parse_numeric_fields(&line).unwrap();
        assert_eq!(parsed, expected);

        assert_eq!(
            parse_numeric_fields("12, 1.5E-7, 2.0E+3, (4e2)").unwrap(),
            vec![12.0, 1.5e-7, 2000.0, 400.0]
        );
    }

    #[test]
    fn rejects_tokens_that_do_not_form_numbers() {
        assert!(parse_numeric_fields("1.0, 2.0.3").is_err());
        assert!(parse_numeric_fields("1.0, --4").is_err());
    }

    #[test]
    fn header_keeps_raw_line_and_splits_columns() {
        let header = ReportHeader::parse("time, inducer_1, reporter\n");
        assert_eq!(header.raw(), "time, inducer_1, reporter");
        assert_eq!(header.columns(), ["time", "inducer_1", "reporter"]);
        assert_eq!(header.position("reporter").unwrap(), 2);
        assert!(matches!(
            header.position("missing"),
            Err(KinsweepError::ReportFormat { .. })
        ));
    }

    #[test]
    fn column_selection_resolves_by_name() {
        let header = ReportHeader::parse("time, A, B, C");
        let selection =
            ColumnSelection::resolve(&header, &["C".to_string(), "time".to_string()]).unwrap();
        assert_eq!(selection.apply(&[1.0, 2.0, 3.0, 4.0]), Some(vec![4.0, 1.0]));
        assert_eq!(selection.apply(&[1.0, 2.0]), None);
        assert_eq!(selection.header().raw(), "C, time");
        assert!(ColumnSelection::resolve(&header, &["D".to_string()]).is_err());
    }

    #[test]
    fn reads_final_row_of_a_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("run_output.txt");
        fs::write(
            &path,
            "time, A, B\n0, 1, 0\n1, 0.5, 0.5\n2, 0.25, 0.75\n",
        )
        .unwrap();

        let snapshot = read_report(&path, 2).unwrap();
        assert_eq!(snapshot.header.columns(), ["time", "A", "B"]);
        assert_eq!(snapshot.row, vec![2.0, 0.25, 0.75]);
        assert!(snapshot.raw.starts_with("time, A, B\n"));

        // extraction does not depend on earlier reads
        assert_eq!(read_report(&path, 2).unwrap(), snapshot);
    }

    #[test]
    fn short_reports_and_ragged_rows_are_parse_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.txt");
        fs::write(&path, "time, A, B\n0, 1, 0\n1, 0.5\n").unwrap();

        assert!(matches!(
            read_report(&path, 5),
            Err(KinsweepError::ReportParse { .. })
        ));
        assert!(matches!(
            read_report(&path, 1),
            Err(KinsweepError::ReportParse { .. })
        ));
        assert!(matches!(
            read_report(&dir.path().join("absent.txt"), 0),
            Err(KinsweepError::FileIO(..))
        ));
    }
}
