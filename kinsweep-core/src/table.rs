//! The combined table a sweep produces: one header plus one row per successful run.

use crate::report::ReportHeader;

/// First field of a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lead {
    Index(usize),
    Value(f64),
}

impl Lead {
    /// Integers read back as indices, anything else as a swept value.
    pub fn parse(field: &str) -> Option<Self> {
        if let Ok(index) = field.parse::<usize>() {
            return Some(Lead::Index(index));
        }
        field.parse::<f64>().ok().map(Lead::Value)
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Lead::Index(i) => *i as f64,
            Lead::Value(v) => *v,
        }
    }
}

impl std::fmt::Display for Lead {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lead::Index(i) => write!(f, "{}", i),
            // keeps a decimal point on whole values so they read back as values
            Lead::Value(v) => write!(f, "{:?}", v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputRow {
    pub lead: Lead,
    pub tag: Option<String>,
    /// Parsed report values, aligned with the table header's columns.
    pub values: Vec<f64>,
}

impl OutputRow {
    /// Every field in output order.
    pub fn fields(&self) -> Vec<String> {
        let mut fields = Vec::with_capacity(self.values.len() + 2);
        fields.push(self.lead.to_string());
        if let Some(tag) = &self.tag {
            fields.push(tag.clone());
        }
        fields.extend(self.values.iter().map(|v| v.to_string()));
        fields
    }

    pub fn value(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombinedTable {
    header: Option<ReportHeader>,
    rows: Vec<OutputRow>,
}

impl CombinedTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(header: ReportHeader) -> Self {
        Self {
            header: Some(header),
            rows: Vec::new(),
        }
    }

    pub fn header(&self) -> Option<&ReportHeader> {
        self.header.as_ref()
    }

    /// Records the header. Only the first call has an effect.
    pub fn set_header(&mut self, header: ReportHeader) -> bool {
        if self.header.is_some() {
            return false;
        }
        self.header = Some(header);
        true
    }

    pub fn push(&mut self, row: OutputRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[OutputRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn into_rows(self) -> Vec<OutputRow> {
        self.rows
    }
}
