use super::{
    driver::{drive, RunResult},
    model::SimulationModel,
    state::{FailedPoint, SweepPhase, SweepSummary},
};
use crate::{
    error::KinsweepError,
    grid::{Grid, GridPoint, GridPoints},
    logger::{DumpWriter, TableWriter},
    report::{read_report, ColumnSelection},
    table::{CombinedTable, Lead, OutputRow},
};
use kinsweep_schemas::sweep::{Assignment, FailurePolicy, LeadColumn, TimeCourse};
use std::path::PathBuf;
use tracing::{debug, info, warn};

pub struct SweepEngine<M> {
    pub(super) model: M,
    pub(super) grid: Grid,
    pub(super) points: GridPoints,
    pub(super) time_course: TimeCourse,
    pub(super) presets: Vec<Assignment>,
    pub(super) report_path: PathBuf,
    pub(super) table: CombinedTable,
    pub(super) table_writer: Option<TableWriter>,
    pub(super) dump: Option<DumpWriter>,
    pub(super) columns: Option<Vec<String>>,
    pub(super) selection: Option<ColumnSelection>,
    pub(super) lead_column: LeadColumn,
    pub(super) failure_policy: FailurePolicy,
    pub(super) phase: SweepPhase,
    pub(super) summary: SweepSummary,
}

impl<M: SimulationModel> SweepEngine<M> {
    /// Runs every grid point in order and finalizes the outputs.
    pub fn run(&mut self) -> Result<(), KinsweepError> {
        info!(
            points = self.grid.len(),
            duration = self.time_course.duration,
            steps = self.time_course.step_count(),
            "starting sweep"
        );

        loop {
            // tick returns false once the grid is exhausted
            if !self.tick()? {
                break;
            }
        }

        info!(
            attempted = self.summary.attempted,
            succeeded = self.summary.succeeded,
            failed = self.summary.failed(),
            "sweep complete"
        );
        Ok(())
    }

    /// Realizes the next grid point. Returns `false` when there is nothing left to do.
    pub fn tick(&mut self) -> Result<bool, KinsweepError> {
        match self.phase {
            SweepPhase::Idle => self.start()?,
            SweepPhase::Sweeping => {}
            SweepPhase::Finalizing => {
                self.finalize();
                return Ok(false);
            }
            SweepPhase::Done => return Ok(false),
        }

        let Some(point) = self.points.next() else {
            self.phase = SweepPhase::Finalizing;
            self.finalize();
            return Ok(false);
        };

        self.summary.attempted += 1;
        debug!(point = %point.describe(), "running grid point");

        let outcome = drive(
            &mut self.model,
            &point,
            &self.time_course,
            &self.report_path,
        )
        .map_err(|e| self.fail_fast(e))?;

        match outcome {
            RunResult::Succeeded { .. } => match self.collect(&point) {
                Ok(()) => self.summary.succeeded += 1,
                Err(e @ KinsweepError::ReportParse { .. }) => {
                    let reason = e.to_string();
                    self.record_failure(&point, reason, e)?;
                }
                Err(e) => return Err(self.fail_fast(e)),
            },
            RunResult::Failed { reason } => {
                let abort = KinsweepError::RunFailure {
                    sequence: point.sequence(),
                    reason: reason.clone(),
                };
                self.record_failure(&point, reason, abort)?;
            }
        }

        Ok(true)
    }

    fn start(&mut self) -> Result<(), KinsweepError> {
        if let Err(e) = self.apply_presets() {
            return Err(self.fail_fast(e));
        }
        self.phase = SweepPhase::Sweeping;
        Ok(())
    }

    fn apply_presets(&mut self) -> Result<(), KinsweepError> {
        for preset in &self.presets {
            debug!(preset = %preset.target, value = preset.value, "applying preset");
            self.model.set_value(&preset.target, preset.value)?;
        }
        self.model.compile_if_necessary()
    }

    /// Reads the report of a successful run and appends its row to the table.
    fn collect(&mut self, point: &GridPoint) -> Result<(), KinsweepError> {
        let snapshot = read_report(&self.report_path, self.time_course.step_count())?;

        if self.table.header().is_none() {
            let header = match &self.columns {
                Some(names) => {
                    let selection = ColumnSelection::resolve(&snapshot.header, names)?;
                    let header = selection.header();
                    self.selection = Some(selection);
                    header
                }
                None => snapshot.header.clone(),
            };
            if let Some(writer) = &mut self.table_writer {
                writer.log_header(&header)?;
            }
            self.table.set_header(header);
        }

        let values = match &self.selection {
            Some(selection) => {
                selection
                    .apply(&snapshot.row)
                    .ok_or_else(|| KinsweepError::ReportParse {
                        path: self.report_path.display().to_string(),
                        reason: format!(
                            "row has {} fields, too few for the selected columns",
                            snapshot.row.len()
                        ),
                    })?
            }
            None => snapshot.row,
        };

        let lead = match self.lead_column {
            LeadColumn::Index => Lead::Index(point.sequence()),
            LeadColumn::Value => Lead::Value(point.lead_value()),
        };
        let row = OutputRow {
            lead,
            tag: point.tag().map(str::to_string),
            values,
        };

        if let Some(writer) = &mut self.table_writer {
            writer.log_row(&row)?;
        }
        self.table.push(row);

        if let Some(dump) = &mut self.dump {
            dump.log_report(&snapshot.raw)?;
        }
        Ok(())
    }

    fn record_failure(
        &mut self,
        point: &GridPoint,
        reason: String,
        abort: KinsweepError,
    ) -> Result<(), KinsweepError> {
        match self.failure_policy {
            FailurePolicy::Skip => {
                warn!(point = %point.describe(), %reason, "skipping grid point");
                self.summary.failures.push(FailedPoint {
                    sequence: point.sequence(),
                    tag: point.tag().map(str::to_string),
                    reason,
                });
                Ok(())
            }
            FailurePolicy::Abort => {
                self.summary.failures.push(FailedPoint {
                    sequence: point.sequence(),
                    tag: point.tag().map(str::to_string),
                    reason,
                });
                Err(self.fail_fast(abort))
            }
        }
    }

    fn fail_fast(&mut self, error: KinsweepError) -> KinsweepError {
        warn!(error = %error, "aborting sweep");
        self.phase = SweepPhase::Done;
        error
    }

    fn finalize(&mut self) {
        if self.table.header().is_none() {
            warn!("no run succeeded; the combined table has no header");
        }
        self.phase = SweepPhase::Done;
    }

    pub fn phase(&self) -> SweepPhase {
        self.phase
    }

    pub fn table(&self) -> &CombinedTable {
        &self.table
    }

    pub fn summary(&self) -> &SweepSummary {
        &self.summary
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn into_table(self) -> CombinedTable {
        self.table
    }
}
