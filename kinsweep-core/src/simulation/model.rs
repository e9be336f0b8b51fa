use crate::error::KinsweepError;
use kinsweep_schemas::sweep::{Target, TimeCourse};
use std::path::Path;

/// What the engine says about a time course it attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineRun {
    /// The report was written with `recorded_steps` data rows.
    Completed { recorded_steps: usize },
    /// The engine gave up; details are in its message queue.
    Failed,
}

/// A simulation model the sweep can drive.
///
/// The model is an owned handle mutated in place between runs. Concurrent sweeps need
/// one handle (and one report path) each.
pub trait SimulationModel {
    /// Writes `value` to the model value addressed by `target`.
    ///
    /// # Errors
    ///
    /// Returns [`KinsweepError::UnknownTarget`] if the model has no such value.
    fn set_value(&mut self, target: &Target, value: f64) -> Result<(), KinsweepError>;

    /// Brings derived state up to date after values have changed.
    fn compile_if_necessary(&mut self) -> Result<(), KinsweepError>;

    /// Runs a deterministic time course from t = 0 and writes its report to `report_path`,
    /// replacing any previous content.
    fn run_time_course(
        &mut self,
        course: &TimeCourse,
        report_path: &Path,
    ) -> Result<EngineRun, KinsweepError>;

    /// Drains the diagnostic messages gathered since the last call.
    fn take_messages(&mut self) -> Vec<String>;
}

impl<M: SimulationModel + ?Sized> SimulationModel for Box<M> {
    fn set_value(&mut self, target: &Target, value: f64) -> Result<(), KinsweepError> {
        (**self).set_value(target, value)
    }

    fn compile_if_necessary(&mut self) -> Result<(), KinsweepError> {
        (**self).compile_if_necessary()
    }

    fn run_time_course(
        &mut self,
        course: &TimeCourse,
        report_path: &Path,
    ) -> Result<EngineRun, KinsweepError> {
        (**self).run_time_course(course, report_path)
    }

    fn take_messages(&mut self) -> Vec<String> {
        (**self).take_messages()
    }
}
