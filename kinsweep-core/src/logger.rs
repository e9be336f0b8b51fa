use crate::error::KinsweepError;
use crate::report::ReportHeader;
use crate::table::{CombinedTable, OutputRow};
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the combined table as space-separated lines, flushing after every row.
pub struct TableWriter {
    path: PathBuf,
    writer: Writer<File>,
}

impl TableWriter {
    /// Creates (or truncates) the table file.
    pub fn new(path: &Path) -> Result<Self, KinsweepError> {
        let writer = WriterBuilder::new()
            .delimiter(b' ')
            .quote_style(QuoteStyle::Never)
            .terminator(Terminator::Any(b'\n'))
            .flexible(true)
            .has_headers(false)
            .from_path(path)
            .map_err(|e| KinsweepError::CsvError(path.display().to_string(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            writer,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the header line verbatim.
    pub fn log_header(&mut self, header: &ReportHeader) -> Result<(), KinsweepError> {
        self.writer
            .write_record([header.raw()])
            .map_err(|e| KinsweepError::CsvError(self.path.display().to_string(), e))?;
        self.writer.flush().map_err(|e| self.io_error(e))?;
        Ok(())
    }

    pub fn log_row(&mut self, row: &OutputRow) -> Result<(), KinsweepError> {
        self.writer
            .write_record(row.fields())
            .map_err(|e| KinsweepError::CsvError(self.path.display().to_string(), e))?;
        self.writer.flush().map_err(|e| self.io_error(e))?;
        Ok(())
    }

    /// Writes a complete table to `path` in one go.
    pub fn write_table(path: &Path, table: &CombinedTable) -> Result<(), KinsweepError> {
        let mut writer = Self::new(path)?;
        if let Some(header) = table.header() {
            writer.log_header(header)?;
        }
        for row in table.rows() {
            writer.log_row(row)?;
        }
        Ok(())
    }

    fn io_error(&self, e: std::io::Error) -> KinsweepError {
        KinsweepError::FileIO(self.path.display().to_string(), e)
    }
}

/// Appends the raw content of every report, in run order.
pub struct DumpWriter {
    path: PathBuf,
    file: File,
}

impl DumpWriter {
    /// Creates (or truncates) the dump file.
    pub fn new(path: &Path) -> Result<Self, KinsweepError> {
        fs::write(path, "").map_err(|e| KinsweepError::FileIO(path.display().to_string(), e))?;
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| KinsweepError::FileIO(path.display().to_string(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn log_report(&mut self, raw: &str) -> Result<(), KinsweepError> {
        self.file
            .write_all(raw.as_bytes())
            .and_then(|_| {
                if raw.ends_with('\n') || raw.is_empty() {
                    Ok(())
                } else {
                    self.file.write_all(b"\n")
                }
            })
            .and_then(|_| self.file.flush())
            .map_err(|e| KinsweepError::FileIO(self.path.display().to_string(), e))
    }
}
