use super::model::{EngineRun, SimulationModel};
use crate::error::KinsweepError;
use crate::grid::GridPoint;
use kinsweep_schemas::sweep::TimeCourse;
use std::path::{Path, PathBuf};

/// Outcome of realizing one grid point.
#[derive(Debug, Clone, PartialEq)]
pub enum RunResult {
    Succeeded {
        report: PathBuf,
        recorded_steps: usize,
    },
    Failed {
        reason: String,
    },
}

impl RunResult {
    pub fn is_success(&self) -> bool {
        matches!(self, RunResult::Succeeded { .. })
    }
}

/// Writes the point's values into the model and runs one time course.
///
/// Engine failures, including a run that records an unexpected number of steps, come
/// back as [`RunResult::Failed`]. Only errors that would repeat on every point (an
/// unknown target, an unwritable report path) are returned as `Err`.
pub fn drive<M: SimulationModel + ?Sized>(
    model: &mut M,
    point: &GridPoint,
    course: &TimeCourse,
    report_path: &Path,
) -> Result<RunResult, KinsweepError> {
    for (target, value) in point.assignments() {
        model.set_value(target, *value)?;
    }
    model.compile_if_necessary()?;

    let outcome = match model.run_time_course(course, report_path) {
        Ok(outcome) => outcome,
        Err(e @ KinsweepError::FileIO(..)) => return Err(e),
        Err(e @ KinsweepError::Configuration(_)) => return Err(e),
        Err(e) => {
            return Ok(RunResult::Failed {
                reason: failure_reason(e.to_string(), model.take_messages()),
            })
        }
    };

    match outcome {
        EngineRun::Failed => Ok(RunResult::Failed {
            reason: failure_reason(
                "the time course simulation failed".to_string(),
                model.take_messages(),
            ),
        }),
        EngineRun::Completed { recorded_steps } if recorded_steps != course.expected_rows() => {
            Ok(RunResult::Failed {
                reason: failure_reason(
                    format!(
                        "expected {} recorded steps but the engine recorded {}",
                        course.expected_rows(),
                        recorded_steps
                    ),
                    model.take_messages(),
                ),
            })
        }
        EngineRun::Completed { recorded_steps } => {
            let _ = model.take_messages();
            Ok(RunResult::Succeeded {
                report: report_path.to_path_buf(),
                recorded_steps,
            })
        }
    }
}

fn failure_reason(summary: String, messages: Vec<String>) -> String {
    if messages.is_empty() {
        summary
    } else {
        format!("{}: {}", summary, messages.join("; "))
    }
}
