use crate::{
    error::KinsweepError,
    grid::Grid,
    logger::{DumpWriter, TableWriter},
    simulation::{engine::SweepEngine, model::SimulationModel, state::{SweepPhase, SweepSummary}},
    table::CombinedTable,
};
use kinsweep_schemas::sweep::{Assignment, FailurePolicy, LeadColumn, TimeCourse};
use std::path::PathBuf;

/// A fluent builder for constructing a `SweepEngine`.
///
/// This builder provides a step-by-step API to configure the model, the grid, the
/// time course and the output files of a sweep.
pub struct SweepBuilder<M> {
    model: Option<M>,
    grid: Option<Grid>,
    time_course: Option<TimeCourse>,
    presets: Vec<Assignment>,
    report_path: Option<PathBuf>,
    table_path: Option<PathBuf>,
    dump_path: Option<PathBuf>,
    columns: Option<Vec<String>>,
    lead_column: LeadColumn,
    failure_policy: FailurePolicy,
}

impl<M> Default for SweepBuilder<M> {
    fn default() -> Self {
        Self {
            model: None,
            grid: None,
            time_course: None,
            presets: Vec::new(),
            report_path: None,
            table_path: None,
            dump_path: None,
            columns: None,
            lead_column: LeadColumn::default(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

impl<M: SimulationModel> SweepBuilder<M> {
    /// Creates a new, empty `SweepBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the model every grid point is written into.
    pub fn with_model(mut self, model: M) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_grid(mut self, grid: Grid) -> Self {
        self.grid = Some(grid);
        self
    }

    pub fn with_time_course(mut self, time_course: TimeCourse) -> Self {
        self.time_course = Some(time_course);
        self
    }

    /// Values written once, before the first grid point.
    pub fn with_presets(mut self, presets: Vec<Assignment>) -> Self {
        self.presets = presets;
        self
    }

    /// The file each run's report is written to. It is overwritten by every run.
    pub fn with_report_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.report_path = Some(path.into());
        self
    }

    /// Writes the combined table to `path` as rows are collected.
    pub fn with_table_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.table_path = Some(path.into());
        self
    }

    /// Appends every raw report to `path`.
    pub fn with_dump_output(mut self, path: impl Into<PathBuf>) -> Self {
        self.dump_path = Some(path.into());
        self
    }

    /// Keeps only the named report columns.
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    pub fn with_lead_column(mut self, lead_column: LeadColumn) -> Self {
        self.lead_column = lead_column;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Consumes the builder and returns a `SweepEngine` in the `Idle` phase.
    ///
    /// # Errors
    ///
    /// Returns a `KinsweepError` if the model, grid, time course or report path is
    /// missing, or if an output file cannot be created. Output files are truncated here.
    pub fn build(self) -> Result<SweepEngine<M>, KinsweepError> {
        let model = self.model.ok_or(KinsweepError::ModelNotProvided)?;
        let grid = self.grid.ok_or(KinsweepError::GridNotDefined)?;
        let time_course = self
            .time_course
            .ok_or(KinsweepError::TimeCourseNotDefined)?;
        let report_path = self.report_path.ok_or_else(|| {
            KinsweepError::Configuration("a report path is required".to_string())
        })?;

        if let Some(columns) = &self.columns {
            if columns.is_empty() {
                return Err(KinsweepError::Configuration(
                    "column selection is empty".to_string(),
                ));
            }
        }

        let table_writer = match &self.table_path {
            Some(path) => Some(TableWriter::new(path)?),
            None => None,
        };
        let dump = match &self.dump_path {
            Some(path) => Some(DumpWriter::new(path)?),
            None => None,
        };

        let points = grid.points();
        Ok(SweepEngine {
            model,
            grid,
            points,
            time_course,
            presets: self.presets,
            report_path,
            table: CombinedTable::new(),
            table_writer,
            dump,
            columns: self.columns,
            selection: None,
            lead_column: self.lead_column,
            failure_policy: self.failure_policy,
            phase: SweepPhase::Idle,
            summary: SweepSummary::default(),
        })
    }
}
