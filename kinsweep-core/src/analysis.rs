//! Reading combined tables back for filtering and charting.

use crate::{
    error::KinsweepError,
    report::ReportHeader,
    table::{CombinedTable, Lead, OutputRow},
};
use csv::ReaderBuilder;
use std::path::Path;

/// Reads a combined table written by [`crate::logger::TableWriter`].
///
/// A row carries a tag when it has two more fields than the header has columns.
pub fn read_table(path: &Path) -> Result<CombinedTable, KinsweepError> {
    let location = path.display().to_string();
    let mut reader = ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(|e| KinsweepError::CsvError(location.clone(), e))?;
    let parse_error = |reason: String| KinsweepError::ReportParse {
        path: location.clone(),
        reason,
    };

    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => {
            let record = record.map_err(|e| KinsweepError::CsvError(location.clone(), e))?;
            ReportHeader::parse(&record.iter().collect::<Vec<_>>().join(" "))
        }
        None => return Ok(CombinedTable::new()),
    };
    let width = header.len();
    let mut table = CombinedTable::with_header(header);

    for (line, record) in records.enumerate() {
        let record = record.map_err(|e| KinsweepError::CsvError(location.clone(), e))?;
        let fields: Vec<&str> = record.iter().filter(|f| !f.is_empty()).collect();
        if fields.is_empty() {
            continue;
        }

        let (tag, values) = if fields.len() == width + 2 {
            (Some(fields[1].to_string()), &fields[2..])
        } else if fields.len() == width + 1 {
            (None, &fields[1..])
        } else {
            return Err(parse_error(format!(
                "line {} has {} fields for {} columns",
                line + 2,
                fields.len(),
                width
            )));
        };

        let lead = Lead::parse(fields[0])
            .ok_or_else(|| parse_error(format!("line {} has no numeric lead", line + 2)))?;
        let values = values
            .iter()
            .map(|v| {
                v.parse::<f64>()
                    .map_err(|e| parse_error(format!("line {}: '{}': {}", line + 2, v, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        table.push(OutputRow { lead, tag, values });
    }

    Ok(table)
}

/// Rows whose tag contains `state`, e.g. `A1` or `A1B2`. The header is kept.
pub fn filter_by_state(table: &CombinedTable, state: &str) -> CombinedTable {
    let mut filtered = match table.header() {
        Some(header) => CombinedTable::with_header(header.clone()),
        None => CombinedTable::new(),
    };
    table
        .rows()
        .iter()
        .filter(|row| row.tag.as_deref().is_some_and(|tag| tag.contains(state)))
        .cloned()
        .for_each(|row| filtered.push(row));
    filtered
}

fn header_of(table: &CombinedTable) -> Result<&ReportHeader, KinsweepError> {
    table
        .header()
        .ok_or_else(|| KinsweepError::Configuration("the table has no header".to_string()))
}

/// `(x, y)` pairs for a line chart. `x` defaults to the lead column.
pub fn series(
    table: &CombinedTable,
    x: Option<&str>,
    y: &str,
) -> Result<Vec<(f64, f64)>, KinsweepError> {
    let header = header_of(table)?;
    let x_index = x.map(|name| header.position(name)).transpose()?;
    let y_index = header.position(y)?;

    Ok(table
        .rows()
        .iter()
        .filter_map(|row| {
            let x = match x_index {
                Some(i) => row.value(i)?,
                None => row.lead.as_f64(),
            };
            Some((x, row.value(y_index)?))
        })
        .collect())
}

/// `(tag, y)` pairs of one sequence index for a bar chart. `column` defaults to the
/// last column.
pub fn bar_series(
    table: &CombinedTable,
    iteration: usize,
    column: Option<&str>,
) -> Result<Vec<(String, f64)>, KinsweepError> {
    let header = header_of(table)?;
    let index = match column {
        Some(name) => header.position(name)?,
        None => header.len().checked_sub(1).ok_or_else(|| {
            KinsweepError::Configuration("the table header names no columns".to_string())
        })?,
    };

    Ok(table
        .rows()
        .iter()
        .filter(|row| row.lead.as_f64() == iteration as f64)
        .filter_map(|row| {
            let label = row.tag.clone().unwrap_or_else(|| row.lead.to_string());
            Some((label, row.value(index)?))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::TableWriter;
    use std::fs;
    use tempfile::tempdir;

    fn ternary_table() -> CombinedTable {
        let mut table = CombinedTable::with_header(ReportHeader::parse("time, A, B, out"));
        for sequence in 1..=2 {
            for (i, tag) in ["A0B0", "A0B1", "A1B0", "A1B1"].iter().enumerate() {
                table.push(OutputRow {
                    lead: Lead::Index(sequence),
                    tag: Some(tag.to_string()),
                    values: vec![50.0, 1.0, 2.0, (sequence * 10 + i) as f64],
                });
            }
        }
        table
    }

    #[test]
    fn reads_back_what_the_writer_wrote() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Parsed_m.txt");
        let table = ternary_table();
        TableWriter::write_table(&path, &table).unwrap();

        let read = read_table(&path).unwrap();
        assert_eq!(read, table);
    }

    #[test]
    fn whole_swept_values_stay_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Parsed_m_p_output.txt");
        let mut table = CombinedTable::with_header(ReportHeader::parse("reporter"));
        for lead in [1.0, 1.5, 2.0] {
            table.push(OutputRow {
                lead: Lead::Value(lead),
                tag: None,
                values: vec![lead * 3.0],
            });
        }
        TableWriter::write_table(&path, &table).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "reporter\n1.0 3\n1.5 4.5\n2.0 6\n"
        );
        assert_eq!(read_table(&path).unwrap(), table);
    }

    #[test]
    fn untagged_rows_read_back_with_value_leads() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Parsed_m_p.txt");
        fs::write(&path, "time, X\n0.25 50 1.5\n0.5 50 3\n").unwrap();

        let table = read_table(&path).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0].lead, Lead::Value(0.25));
        assert_eq!(table.rows()[1].tag, None);
        assert_eq!(series(&table, None, "X").unwrap(), vec![(0.25, 1.5), (0.5, 3.0)]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bad.txt");
        fs::write(&path, "time, X\n1 50\n2 50 1 2 3\n").unwrap();
        assert!(matches!(
            read_table(&path),
            Err(KinsweepError::ReportParse { .. })
        ));
    }

    #[test]
    fn empty_file_is_an_empty_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        fs::write(&path, "").unwrap();
        let table = read_table(&path).unwrap();
        assert!(table.header().is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn filter_keeps_header_and_matching_tags() {
        let table = ternary_table();
        let filtered = filter_by_state(&table, "A1");
        assert_eq!(filtered.header(), table.header());
        assert_eq!(filtered.len(), 4);
        assert!(filtered
            .rows()
            .iter()
            .all(|r| r.tag.as_deref().unwrap().starts_with("A1")));

        assert_eq!(filter_by_state(&table, "A1B0").len(), 2);
        assert!(filter_by_state(&table, "C9").is_empty());
    }

    #[test]
    fn series_uses_named_columns() {
        let table = ternary_table();
        let points = series(&table, Some("A"), "out").unwrap();
        assert_eq!(points.len(), 8);
        assert_eq!(points[3], (1.0, 13.0));
        assert!(matches!(
            series(&table, Some("nope"), "out"),
            Err(KinsweepError::ReportFormat { .. })
        ));
    }

    #[test]
    fn bar_series_picks_one_sequence_and_last_column() {
        let table = ternary_table();
        let bars = bar_series(&table, 2, None).unwrap();
        assert_eq!(
            bars,
            vec![
                ("A0B0".to_string(), 20.0),
                ("A0B1".to_string(), 21.0),
                ("A1B0".to_string(), 22.0),
                ("A1B1".to_string(), 23.0),
            ]
        );
        let bars = bar_series(&table, 1, Some("B")).unwrap();
        assert!(bars.iter().all(|(_, y)| *y == 2.0));
        assert!(bar_series(&table, 7, None).unwrap().is_empty());
    }
}
